//! Tracing subscriber setup
//!
//! The dashboard owns the terminal, so logs go to a file in the cache
//! directory. One-shot commands log to stderr instead. `RUST_LOG` overrides
//! the default filter.

use std::fs::{self, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use thiserror::Error;
use tracing_subscriber::EnvFilter;

/// Filter used when `RUST_LOG` is unset
pub const DEFAULT_FILTER: &str = "solardash=info";

/// Log file name inside the cache directory
pub const LOG_FILE_NAME: &str = "solardash.log";

#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("cannot open log file: {0}")]
    Io(#[from] io::Error),

    #[error("cannot install log subscriber: {0}")]
    Init(String),
}

/// Where log lines are written
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogTarget {
    /// Append to a file
    File(PathBuf),
    Stderr,
}

/// Path of the log file for a cache directory
pub fn log_path(cache_dir: &Path) -> PathBuf {
    cache_dir.join(LOG_FILE_NAME)
}

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| DEFAULT_FILTER.into())
}

/// Installs the global subscriber
pub fn init(target: &LogTarget) -> Result<(), LoggingError> {
    let builder = tracing_subscriber::fmt().with_env_filter(env_filter());

    let result = match target {
        LogTarget::File(path) => {
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)?;
            }
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            builder
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .try_init()
        }
        LogTarget::Stderr => builder.with_writer(io::stderr).try_init(),
    };
    result.map_err(|e| LoggingError::Init(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_log_path_in_cache_dir() {
        let path = log_path(Path::new("/tmp/solardash"));
        assert_eq!(path, PathBuf::from("/tmp/solardash/solardash.log"));
    }

    #[test]
    fn test_init_creates_log_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = log_path(&temp_dir.path().join("nested"));

        // Another test may already own the global subscriber
        let _ = init(&LogTarget::File(path.clone()));

        assert!(path.exists());
    }
}
