use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

// ── Profile ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Profile {
    /// Base URL of the task service; endpoints are joined onto it ("/terminal/list")
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Per-request timeout. Absent means wait for the service indefinitely.
    #[serde(default)]
    pub request_timeout_secs: Option<u64>,
    /// Optional `Cookie` header forwarded verbatim with every request
    #[serde(default)]
    pub cookie: Option<String>,
}

fn default_base_url() -> String {
    "http://127.0.0.1:5000".to_string()
}

impl Default for Profile {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            request_timeout_secs: None,
            cookie: None,
        }
    }
}

// ── Config file ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigFile {
    /// Which profile to use when none is specified
    #[serde(default = "default_profile_name")]
    pub default_profile: String,

    #[serde(default)]
    pub profiles: HashMap<String, Profile>,
}

fn default_profile_name() -> String {
    "default".to_string()
}

impl Default for ConfigFile {
    fn default() -> Self {
        Self {
            default_profile: default_profile_name(),
            profiles: HashMap::new(),
        }
    }
}

impl ConfigFile {
    /// Load from disk, or return a default config if the file doesn't exist yet.
    pub fn load() -> Result<Self> {
        Self::load_from(&config_path())
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let raw = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file at {}", path.display()))?;
        toml::from_str(&raw)
            .with_context(|| format!("Failed to parse config file at {}", path.display()))
    }

    /// Write a starter config file to disk (only if it doesn't exist).
    pub fn write_default_if_missing() -> Result<PathBuf> {
        let path = config_path();
        write_default_to(&path)?;
        Ok(path)
    }

    pub fn resolve_profile(&self, name: Option<&str>) -> Option<&Profile> {
        let key = name.unwrap_or(&self.default_profile);
        self.profiles.get(key)
    }
}

fn write_default_to(path: &Path) -> Result<()> {
    if path.exists() {
        return Ok(());
    }
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    fs::write(path, DEFAULT_CONFIG_TOML)
        .with_context(|| format!("Failed to write {}", path.display()))
}

// ── Resolved runtime config (after merging file + CLI overrides) ──────────────

#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub base_url: String,
    pub request_timeout_secs: Option<u64>,
    pub cookie: Option<String>,
    /// Profile name that was resolved (for display)
    pub profile_name: String,
}

impl ResolvedConfig {
    /// Merge config file profile with CLI overrides.
    /// Priority: CLI args > env vars (handled by clap) > config file profile > built-in defaults
    pub fn resolve(
        file: &ConfigFile,
        profile_override: Option<&str>,
        base_url_override: Option<&str>,
    ) -> Self {
        let profile_name = profile_override
            .unwrap_or(&file.default_profile)
            .to_string();

        let base = file
            .resolve_profile(profile_override)
            .cloned()
            .unwrap_or_default();

        Self {
            base_url: base_url_override
                .map(str::to_string)
                .unwrap_or(base.base_url),
            request_timeout_secs: base.request_timeout_secs,
            cookie: base.cookie,
            profile_name,
        }
    }
}

// ── Paths ─────────────────────────────────────────────────────────────────────

pub fn config_dir() -> PathBuf {
    config_dir_from(std::env::var_os("XDG_CONFIG_HOME"), std::env::var_os("HOME"))
}

pub fn config_path() -> PathBuf {
    config_dir().join("config.toml")
}

/// `$XDG_CONFIG_HOME/taskterm`, else `$HOME/.config/taskterm`, else
/// `./taskterm`. Empty variables count as unset.
fn config_dir_from(xdg_config_home: Option<OsString>, home: Option<OsString>) -> PathBuf {
    let set = |v: Option<OsString>| v.filter(|v| !v.is_empty()).map(PathBuf::from);
    set(xdg_config_home)
        .or_else(|| set(home).map(|h| h.join(".config")))
        .unwrap_or_else(|| PathBuf::from("."))
        .join("taskterm")
}

// ── Default config template written by --init ─────────────────────────────────

const DEFAULT_CONFIG_TOML: &str = r#"# taskterm configuration
# Run `taskterm --init` to regenerate this file.

default_profile = "local"

# ── Local development server ──────────────────────────────────────────────────
[profiles.local]
base_url = "http://127.0.0.1:5000"
# request_timeout_secs = 30      # omit to wait for the service indefinitely

# ── Hosted instance ───────────────────────────────────────────────────────────
# The service requires a logged-in session. Log in through the browser and
# paste the session cookie here.
# [profiles.hosted]
# base_url = "https://tasks.example.com"
# cookie   = "session=..."
"#;
