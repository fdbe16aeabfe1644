//! Diagnostics setup.
//!
//! The TUI owns the terminal, so diagnostics go to a file inside the log
//! directory. Without file logging only non-interactive runs print them,
//! on stderr.

use std::fs::{self, OpenOptions};
use std::io;
use std::path::Path;
use std::sync::Mutex;

use color_eyre::eyre::{Result, eyre};
use tracing_subscriber::{filter::EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::LoggingConfig;

pub const FILTER_ENV: &str = "VANISH_LOG";
pub const TRACE_FILE: &str = "vanish-trace.log";

/// Default directive for a `[logging] level` value.
pub fn default_directive(level: &str, interactive: bool) -> String {
    let level = match level.to_ascii_lowercase().as_str() {
        "debug" => "debug",
        "error" => "error",
        // stderr stays quiet unless something went wrong
        _ if !interactive => "warn",
        _ => "info",
    };
    format!("vanish_core={level},vx={level}")
}

/// Install the global subscriber. `interactive` is true when the TUI will run.
pub fn init(config: &LoggingConfig, interactive: bool) -> Result<()> {
    let env_filter = EnvFilter::try_from_env(FILTER_ENV)
        .or_else(|_| EnvFilter::try_new(default_directive(&config.level, interactive)))
        .map_err(|e| eyre!("Failed to create tracing filter: {e}"))?;

    let registry = tracing_subscriber::registry().with(env_filter);

    if config.enabled {
        let dir = config.resolved_directory();
        match open_trace_file(&dir) {
            Ok(file) => {
                let layer = tracing_subscriber::fmt::layer()
                    .with_writer(Mutex::new(file))
                    .with_ansi(false)
                    .with_target(true);
                registry.with(layer).init();
                return Ok(());
            }
            Err(err) if !interactive => {
                eprintln!(
                    "vx: cannot write diagnostics to {}: {err}",
                    dir.join(TRACE_FILE).display()
                );
            }
            Err(_) => {}
        }
    }

    if interactive {
        // Nothing may write to the terminal while the TUI is up
        registry.init();
    } else {
        let layer = tracing_subscriber::fmt::layer()
            .compact()
            .with_writer(io::stderr)
            .with_target(false);
        registry.with(layer).init();
    }
    Ok(())
}

fn open_trace_file(dir: &Path) -> io::Result<fs::File> {
    fs::create_dir_all(dir)?;
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(dir.join(TRACE_FILE))
}
