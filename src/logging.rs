//! Logging setup for processes embedding the bridge.
//!
//! The library itself only emits `tracing` events. These helpers install a
//! `fmt` subscriber for hosts that have none; if a global subscriber already
//! exists they leave it in place.

use std::fs::{self, File};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

use crate::error::{BridgeError, Result};

const LOG_DIR: &str = "sqldb-bridge";
const LOG_FILE: &str = "sqldb-bridge.log";

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Sends log events to the default log file, see [`get_log_path`].
pub fn init_file_logging() -> Result<bool> {
    init_file_logging_at(&get_log_path())
}

/// Sends log events to `path`, truncating it first.
///
/// Returns `false` if another subscriber was already installed.
pub fn init_file_logging_at(path: &Path) -> Result<bool> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| {
            BridgeError::config(format!(
                "Could not create log directory {}: {e}",
                parent.display()
            ))
        })?;
    }

    let log_file = File::create(path).map_err(|e| {
        BridgeError::config(format!("Could not create log file {}: {e}", path.display()))
    })?;

    Ok(tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_writer(log_file)
        .with_ansi(false)
        .try_init()
        .is_ok())
}

/// Sends log events to stderr.
///
/// Returns `false` if another subscriber was already installed.
pub fn init_stderr_logging() -> bool {
    tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_writer(std::io::stderr)
        .try_init()
        .is_ok()
}

/// Returns the default log file location.
///
/// `~/.local/state/sqldb-bridge/sqldb-bridge.log` on Linux, the config
/// directory on platforms without a state directory, the temp dir otherwise.
pub fn get_log_path() -> PathBuf {
    if let Some(state_dir) = dirs::state_dir() {
        return state_dir.join(LOG_DIR).join(LOG_FILE);
    }

    if let Some(config_dir) = dirs::config_dir() {
        return config_dir.join(LOG_DIR).join(LOG_FILE);
    }

    std::env::temp_dir().join(LOG_FILE)
}
