//! Unified error types for Shardline.
//!
//! This module groups the engine's detailed errors into the handful of cases
//! a caller acts on differently.

use shardline_core::WorkerExit;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// All Shardline errors.
///
/// This is the canonical error type of the facade. Configuration errors are
/// always raised before any file is created or process spawned.
#[derive(Debug, Error)]
pub enum Error {
    /// Unsupported payload or channel, unknown backend, invalid setting
    #[error("configuration error: {0}")]
    Configuration(String),

    /// A sink could not be created
    #[error("cannot create sink {path}: {source}")]
    Resource {
        /// Sink location
        path: PathBuf,
        /// Underlying OS error
        #[source]
        source: std::io::Error,
    },

    /// A worker process failed
    #[error("worker for shard {shard} failed: {exit}")]
    WorkerFailed {
        /// Lowest failing shard index
        shard: usize,
        /// How the worker ended
        exit: WorkerExit,
    },

    /// Shard or manifest data is corrupt or incompatible
    #[error("deserialization error: {0}")]
    Deserialize(String),

    /// A bounded wait expired
    #[error("timed out after {waited:?} waiting for {what}")]
    Timeout {
        /// Configured bound
        waited: Duration,
        /// What was being waited on
        what: String,
    },

    /// The run was cancelled
    #[error("cancelled while waiting for {what}")]
    Cancelled {
        /// What was being waited on
        what: String,
    },

    /// A shard could not be encoded
    #[error("serialization error: {0}")]
    Serialization(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for Shardline operations.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Check if this is a configuration error.
    pub fn is_configuration(&self) -> bool {
        matches!(self, Error::Configuration(_))
    }

    /// Check if a wait timed out or was cancelled.
    pub fn is_interrupted(&self) -> bool {
        matches!(self, Error::Timeout { .. } | Error::Cancelled { .. })
    }

    /// Shard whose worker failed, if this is a worker failure.
    pub fn failed_shard(&self) -> Option<usize> {
        match self {
            Error::WorkerFailed { shard, .. } => Some(*shard),
            _ => None,
        }
    }
}

// Convert from engine errors
impl From<shardline_core::Error> for Error {
    fn from(e: shardline_core::Error) -> Self {
        use shardline_core::Error as CoreError;
        match e {
            CoreError::UnsupportedPayload(_)
            | CoreError::UnsupportedChannel { .. }
            | CoreError::UnknownBackend(_)
            | CoreError::InvalidConfig(_) => Error::Configuration(e.to_string()),
            CoreError::SinkCreation { path, source } => Error::Resource { path, source },
            CoreError::WorkerFailed { shard, exit } => Error::WorkerFailed { shard, exit },
            CoreError::Deserialize(msg) => Error::Deserialize(msg),
            CoreError::ShapeMismatch { .. } | CoreError::Manifest(_) => {
                Error::Deserialize(e.to_string())
            }
            CoreError::Timeout { waited, what } => Error::Timeout { waited, what },
            CoreError::Cancelled { what } => Error::Cancelled { what },
            CoreError::Serialization(msg) => Error::Serialization(msg),
            CoreError::Io(io_err) => Error::Io(io_err),
        }
    }
}
