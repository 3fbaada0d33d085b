// src/utils/error.rs
use crate::types::SessionId;
use std::io;
use thiserror::Error;

/// Main error type for the miner supervisor
///
/// Only [`MinerError::LaunchError`] crosses the session `start()` boundary
/// as a hard failure. Worker output that cannot be classified is data,
/// not an error, and never shows up here.
#[derive(Error, Debug)]
pub enum MinerError {
    /// The worker subprocess could not be spawned
    /// (missing executable, permission denied, ...)
    #[error("Failed to launch worker `{command}`: {source}")]
    LaunchError {
        /// Command line that was attempted
        command: String,
        /// Underlying spawn failure
        #[source]
        source: io::Error,
    },

    /// Best-effort termination of a worker failed
    ///
    /// Callers suppress this; a worker that already exited is the common case.
    #[error("Failed to terminate worker: {0}")]
    TerminationError(String),

    /// Operation not valid in the session's current lifecycle state
    #[error("Invalid session state: {0}")]
    InvalidState(String),

    /// No session is registered under the given id
    #[error("Unknown session: {0}")]
    UnknownSession(SessionId),

    /// Configuration file or parameter errors
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Standard I/O operation errors
    #[error("I/O error: {0}")]
    IoError(#[from] io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// Logger installation errors
    #[error("Logger error: {0}")]
    LoggerError(String),
}

/// Converts logger installation failures into MinerError
///
/// Happens when a global logger was already installed, e.g. when
/// `init_logging` is called twice.
impl From<log::SetLoggerError> for MinerError {
    fn from(e: log::SetLoggerError) -> Self {
        MinerError::LoggerError(e.to_string())
    }
}

impl MinerError {
    /// Returns `true` if this is a launch failure
    pub fn is_launch_error(&self) -> bool {
        matches!(self, MinerError::LaunchError { .. })
    }
}
