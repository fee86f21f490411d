/// File-backed tracing setup.
///
/// The TUI owns stdout, so log records go to `<config dir>/taskterm.log`.
/// `TASKTERM_LOG` accepts any `EnvFilter` directive; `--verbose` bumps the
/// default from `warn` to `debug`.
use std::fs::OpenOptions;
use std::path::Path;
use std::sync::Mutex;

use tracing_subscriber::EnvFilter;

pub const LOG_ENV: &str = "TASKTERM_LOG";

pub fn init(verbose: bool) {
    let path = crate::config::config_dir().join("taskterm.log");
    // Logging is best-effort: an unwritable log dir must not stop the client.
    let _ = init_at(&path, verbose);
}

fn init_at(path: &Path, verbose: bool) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let file = OpenOptions::new().create(true).append(true).open(path)?;

    let default = if verbose { "taskterm=debug" } else { "warn" };
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(default));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .with_target(true)
        .try_init();
    Ok(())
}
