//! Error types shared by every Shardline crate.
//!
//! ## Taxonomy
//!
//! | Kind | Variants | When |
//! |------|----------|------|
//! | Configuration | `UnsupportedPayload`, `UnsupportedChannel`, `UnknownBackend`, `InvalidConfig` | before any process is spawned |
//! | Resource | `SinkCreation` | creating a sink failed |
//! | WorkerFailure | `WorkerFailed` | a worker exited non-zero or was killed |
//! | Deserialize | `Deserialize`, `ShapeMismatch`, `Manifest` | corrupt or incompatible data |
//! | Interrupted | `Timeout`, `Cancelled` | a bounded wait expired or was cancelled |
//! | Io | `Serialization`, `Io` | everything else |
//!
//! Nothing in the engine retries: every error surfaces to the direct caller.

use crate::payload::Shape;
use crate::wait::Interrupt;
use std::fmt;
use std::io;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// How a worker process ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerExit {
    /// Exited with a non-zero status code
    Code(i32),
    /// Terminated by a signal
    Signal(i32),
}

impl fmt::Display for WorkerExit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WorkerExit::Code(code) => write!(f, "exit status {}", code),
            WorkerExit::Signal(sig) => write!(f, "killed by signal {}", sig),
        }
    }
}

/// Coarse error category.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Bad input or setup, raised before any side effect
    Configuration,
    /// A sink could not be created
    Resource,
    /// A worker process failed
    WorkerFailure,
    /// Shard or manifest data is corrupt or incompatible
    Deserialize,
    /// Timed out or cancelled
    Interrupted,
    /// Other I/O or encoding failure
    Io,
}

/// All Shardline errors.
#[derive(Debug, Error)]
pub enum Error {
    /// Payload is neither a mapping nor a sequence
    #[error("unsupported payload: expected a mapping or a sequence, got {0}")]
    UnsupportedPayload(&'static str),

    /// Primary channel is neither a regular file nor a FIFO
    #[error("unsupported channel {path}: {file_type}")]
    UnsupportedChannel {
        /// Channel location
        path: PathBuf,
        /// Detected file type
        file_type: &'static str,
    },

    /// No backend registered under this name
    #[error("unknown backend: {0}")]
    UnknownBackend(String),

    /// Invalid configuration value
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// A sink could not be created
    #[error("cannot create sink {path}: {source}")]
    SinkCreation {
        /// Sink location
        path: PathBuf,
        /// Underlying OS error
        #[source]
        source: io::Error,
    },

    /// A worker process failed
    #[error("worker for shard {shard} failed: {exit}")]
    WorkerFailed {
        /// Index of the failing shard (lowest one if several failed)
        shard: usize,
        /// How the worker ended
        exit: WorkerExit,
    },

    /// Backend could not encode a shard
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Backend could not decode a shard
    #[error("deserialization error: {0}")]
    Deserialize(String),

    /// Shards of different shapes in one run
    #[error("shape mismatch: expected {expected} shard, got {actual}")]
    ShapeMismatch {
        /// Shape fixed by the first shard
        expected: Shape,
        /// Shape of the offending shard
        actual: Shape,
    },

    /// Manifest cannot be encoded or parsed
    #[error("manifest error: {0}")]
    Manifest(String),

    /// A bounded wait expired
    #[error("timed out after {waited:?} waiting for {what}")]
    Timeout {
        /// Configured bound
        waited: Duration,
        /// What was being waited on
        what: String,
    },

    /// A wait was cancelled through its token
    #[error("cancelled while waiting for {what}")]
    Cancelled {
        /// What was being waited on
        what: String,
    },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(io::Error),
}

/// Result type for Shardline operations.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Coarse category of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::UnsupportedPayload(_)
            | Error::UnsupportedChannel { .. }
            | Error::UnknownBackend(_)
            | Error::InvalidConfig(_) => ErrorKind::Configuration,
            Error::SinkCreation { .. } => ErrorKind::Resource,
            Error::WorkerFailed { .. } => ErrorKind::WorkerFailure,
            Error::Deserialize(_) | Error::ShapeMismatch { .. } | Error::Manifest(_) => {
                ErrorKind::Deserialize
            }
            Error::Timeout { .. } | Error::Cancelled { .. } => ErrorKind::Interrupted,
            Error::Serialization(_) | Error::Io(_) => ErrorKind::Io,
        }
    }

    /// Check if this is a configuration error.
    pub fn is_configuration(&self) -> bool {
        self.kind() == ErrorKind::Configuration
    }

    /// Check if a wait timed out or was cancelled.
    pub fn is_interrupted(&self) -> bool {
        self.kind() == ErrorKind::Interrupted
    }
}

/// Recovers deadline and cancellation errors that travelled through
/// `Read`/`Write` as `io::Error`.
impl From<io::Error> for Error {
    fn from(e: io::Error) -> Self {
        let interrupt = e
            .get_ref()
            .and_then(|inner| inner.downcast_ref::<Interrupt>())
            .cloned();
        match interrupt {
            Some(interrupt) => interrupt.into(),
            None => Error::Io(e),
        }
    }
}

impl From<Interrupt> for Error {
    fn from(interrupt: Interrupt) -> Self {
        match interrupt {
            Interrupt::TimedOut { waited, what } => Error::Timeout { waited, what },
            Interrupt::Cancelled { what } => Error::Cancelled { what },
        }
    }
}
