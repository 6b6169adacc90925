//! Diagnostics for the command line tool
//!
//! Log lines go to stderr so stdout stays free for command output. The long
//! running commands (`run`, `demo`) also append to a size-rotated file in the
//! platform data directory (`~/.local/share/camoverlay/` on Linux).
//!
//! `RUST_LOG` replaces the level selection entirely. Otherwise `--verbose`
//! or a set `DEBUG_LOGGING` variable turn on debug output for the camoverlay
//! crates.

use std::path::PathBuf;

use rolling_file::{BasicRollingFileAppender, RollingConditionBasic};
use thiserror::Error;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

const LOG_FILE: &str = "camoverlay.log";

/// Rotate once the active file grows past this many bytes
const MAX_LOG_SIZE: u64 = 5 * 1024 * 1024;

/// Rotated files kept next to the active one
const MAX_ROTATED: usize = 2;

const QUIET_DIRECTIVE: &str = "warn,camoverlay=info,camoverlay_overlay=info";
const VERBOSE_DIRECTIVE: &str = "warn,camoverlay=debug,camoverlay_overlay=debug";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LogOptions {
    /// Debug output for the camoverlay crates
    pub verbose: bool,
    /// Also write to the rotating log file
    pub file: bool,
}

impl LogOptions {
    /// `verbose` is forced on when `DEBUG_LOGGING` is set
    pub fn new(verbose: bool, file: bool) -> Self {
        Self {
            verbose: verbose || std::env::var_os("DEBUG_LOGGING").is_some(),
            file,
        }
    }
}

#[derive(Debug, Error)]
enum LogFileError {
    #[error("no data directory on this platform")]
    NoDataDir,

    #[error("cannot open log file {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Directory holding the log file, if the platform has a data directory
pub fn log_dir() -> Option<PathBuf> {
    dirs::data_local_dir().map(|dir| dir.join("camoverlay"))
}

fn directive(verbose: bool) -> &'static str {
    if verbose {
        VERBOSE_DIRECTIVE
    } else {
        QUIET_DIRECTIVE
    }
}

fn filter(verbose: bool) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(directive(verbose)))
}

fn open_log_file() -> Result<(BasicRollingFileAppender, PathBuf), LogFileError> {
    let dir = log_dir().ok_or(LogFileError::NoDataDir)?;
    std::fs::create_dir_all(&dir).map_err(|source| LogFileError::Io {
        path: dir.clone(),
        source,
    })?;

    let path = dir.join(LOG_FILE);
    let appender = BasicRollingFileAppender::new(
        &path,
        RollingConditionBasic::new().max_size(MAX_LOG_SIZE),
        MAX_ROTATED,
    )
    .map_err(|source| LogFileError::Io {
        path: path.clone(),
        source,
    })?;
    Ok((appender, path))
}

/// Install the global subscriber.
///
/// Hold the returned guard until exit so buffered file output is flushed.
/// When the log file can't be opened, logging continues on stderr alone and
/// the reason is logged as a warning.
pub fn init(options: LogOptions) -> Option<WorkerGuard> {
    let mut file_error = None;
    let log_file = match options.file.then(open_log_file) {
        Some(Ok(file)) => Some(file),
        Some(Err(err)) => {
            file_error = Some(err);
            None
        }
        None => None,
    };

    let mut guard = None;
    let mut log_path = None;
    let file_layer = log_file.map(|(appender, path)| {
        let (writer, worker) = tracing_appender::non_blocking(appender);
        guard = Some(worker);
        log_path = Some(path);
        fmt::layer().with_writer(writer).with_ansi(false)
    });

    let stderr_layer = fmt::layer().with_writer(std::io::stderr).with_target(true);

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(file_layer)
        .with(filter(options.verbose))
        .init();

    if let Some(err) = file_error {
        tracing::warn!(error = %err, "File logging disabled");
    }
    tracing::debug!(log_file = ?log_path, verbose = options.verbose, "Logging initialized");

    guard
}
