mod client;
mod command;
mod config;
mod form;
mod history;
mod interpreter;
mod logging;
mod output;
mod protocol;
mod tui;

use anyhow::Result;
use clap::{CommandFactory, Parser};
use clap_complete::Shell;
use config::{ConfigFile, ResolvedConfig};
use tracing::info;

use client::{HttpTransport, RequestClient};
use form::NoPrompt;
use interpreter::Interpreter;
use output::StdoutSink;

#[derive(Parser, Debug)]
#[command(
    name = "taskterm",
    about = "A command terminal for a remote task service",
    long_about = None,
)]
struct Args {
    /// Command to run directly, e.g. `taskterm view 3` (omit to enter the interactive terminal)
    #[arg(trailing_var_arg = true)]
    command: Vec<String>,

    /// Profile to use from config file
    #[arg(short, long, env = "TASKTERM_PROFILE")]
    profile: Option<String>,

    /// Override the task service base URL
    #[arg(long, env = "TASKTERM_BASE_URL")]
    base_url: Option<String>,

    /// Show timestamps on output lines
    #[arg(long)]
    timestamps: bool,

    /// Debug-level logging to the log file
    #[arg(short, long)]
    verbose: bool,

    /// Write a default config file to ~/.config/taskterm/config.toml and exit
    #[arg(long)]
    init: bool,

    /// List available profiles and exit
    #[arg(long)]
    profiles: bool,

    /// Generate shell completions and print to stdout
    #[arg(long, value_name = "SHELL")]
    completions: Option<Shell>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    logging::init(args.verbose);

    // ── --init ────────────────────────────────────────────────────────────────
    if args.init {
        let path = ConfigFile::write_default_if_missing()?;
        println!("Config written to: {}", path.display());
        println!("Edit it, then run: taskterm");
        return Ok(());
    }

    // ── --completions ─────────────────────────────────────────────────────────
    if let Some(shell) = args.completions {
        clap_complete::generate(shell, &mut Args::command(), "taskterm", &mut std::io::stdout());
        return Ok(());
    }

    let file = ConfigFile::load()?;

    // ── --profiles ────────────────────────────────────────────────────────────
    if args.profiles {
        print_profiles(&file);
        return Ok(());
    }

    let resolved = ResolvedConfig::resolve(&file, args.profile.as_deref(), args.base_url.as_deref());

    // ── Single-shot mode (non-TUI) ────────────────────────────────────────────
    if !args.command.is_empty() {
        return run_single_shot(&args.command.join(" "), resolved, args.timestamps).await;
    }

    // ── Interactive TUI mode ──────────────────────────────────────────────────
    tui::run(resolved, args.timestamps).await
}

// ── Single-shot mode (plain stdout, no TUI) ───────────────────────────────────

/// Forms need the interactive terminal, so `add`/`edit` report that here.
async fn run_single_shot(raw: &str, resolved: ResolvedConfig, timestamps: bool) -> Result<()> {
    info!(profile = %resolved.profile_name, base_url = %resolved.base_url, "single-shot command");
    let transport = HttpTransport::new(&resolved)?;
    let interpreter = Interpreter::new(RequestClient::new(transport), NoPrompt);
    let mut sink = StdoutSink { timestamps };
    interpreter.execute(raw, &mut sink).await;
    Ok(())
}

fn print_profiles(file: &ConfigFile) {
    let mut entries: Vec<(&String, &config::Profile)> = file.profiles.iter().collect();
    entries.sort_by(|a, b| a.0.cmp(b.0));
    println!();
    println!("  Profiles");
    for (name, profile) in entries {
        let marker = if *name == file.default_profile { " ←" } else { "" };
        println!("  {name}{marker}");
        println!("    base_url  {}", profile.base_url);
        if let Some(secs) = profile.request_timeout_secs {
            println!("    timeout   {secs}s");
        }
        if profile.cookie.is_some() {
            println!("    cookie    (set)");
        }
        println!();
    }
}
