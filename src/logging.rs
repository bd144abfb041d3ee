//! Tracing setup for the `sqltutor` binary.
//!
//! Evaluation JSON is printed on stdout, so diagnostics never go there. They
//! are written to stderr, or to a log file when `--log-file` is passed.
//! `RUST_LOG` selects the verbosity.

use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tracing_subscriber::EnvFilter;

/// Directive used when `RUST_LOG` is unset or unparsable.
const DEFAULT_DIRECTIVE: &str = "info";

const LOG_FILE_NAME: &str = "sqltutor.log";

/// Destination for diagnostics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogTarget {
    Stderr,
    /// Truncated when logging starts.
    File(PathBuf),
}

impl LogTarget {
    /// Maps the `--log-file` flag to a target under the default log location.
    pub fn from_flag(log_file: bool) -> Self {
        if log_file {
            Self::File(default_log_file())
        } else {
            Self::Stderr
        }
    }
}

/// Installs the global subscriber and returns the target in effect.
///
/// If the log file cannot be opened, logging continues on stderr and the
/// failure is the first event recorded there.
pub fn init(target: LogTarget) -> LogTarget {
    let subscriber = tracing_subscriber::fmt().with_env_filter(env_filter());

    match target {
        LogTarget::Stderr => {
            subscriber.with_writer(io::stderr).init();
            LogTarget::Stderr
        }
        LogTarget::File(path) => match open_log_file(&path) {
            Ok(file) => {
                subscriber
                    .with_writer(Mutex::new(file))
                    .with_ansi(false)
                    .init();
                LogTarget::File(path)
            }
            Err(e) => {
                subscriber.with_writer(io::stderr).init();
                tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "Log file unavailable, using stderr"
                );
                LogTarget::Stderr
            }
        },
    }
}

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVE))
}

/// Creates the parent directories and an empty log file at `path`.
fn open_log_file(path: &Path) -> io::Result<File> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    File::create(path)
}

/// `sqltutor/sqltutor.log` under the state directory, then the config
/// directory; the temp directory when neither is known.
pub fn default_log_file() -> PathBuf {
    dirs::state_dir()
        .or_else(dirs::config_dir)
        .map(|base| base.join("sqltutor").join(LOG_FILE_NAME))
        .unwrap_or_else(|| std::env::temp_dir().join(LOG_FILE_NAME))
}
