//! Bounded waits and cancellation.
//!
//! Every blocking point in the engine (opening or draining a FIFO, publishing
//! the manifest, joining workers) is driven by a [`Wait`]: an optional deadline
//! plus a shared [`CancelToken`]. Blocking calls sleep in short slices and
//! check the wait between slices, so a hung peer turns into a `Timeout` or
//! `Cancelled` error instead of blocking forever.

use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;

/// Longest single sleep/poll between deadline and cancellation checks.
pub const POLL_SLICE: Duration = Duration::from_millis(50);

/// Shared cancellation flag.
///
/// Clones observe the same flag. Cancellation is sticky.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    /// Create a token that is not cancelled
    pub fn new() -> Self {
        Self::default()
    }

    /// Cancel every wait observing this token
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    /// Check if cancelled
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// Why a wait stopped early.
#[derive(Debug, Clone, Error)]
pub enum Interrupt {
    /// Deadline expired
    #[error("timed out after {waited:?} waiting for {what}")]
    TimedOut {
        /// Configured bound
        waited: Duration,
        /// What was being waited on
        what: String,
    },

    /// Token was cancelled
    #[error("cancelled while waiting for {what}")]
    Cancelled {
        /// What was being waited on
        what: String,
    },
}

/// Carries an interrupt through `Read`/`Write` signatures.
///
/// Uses `TimedOut`/`Other` kinds: `Interrupted` would be retried by
/// `read_to_end` and `write_all`.
impl From<Interrupt> for io::Error {
    fn from(interrupt: Interrupt) -> Self {
        let kind = match interrupt {
            Interrupt::TimedOut { .. } => io::ErrorKind::TimedOut,
            Interrupt::Cancelled { .. } => io::ErrorKind::Other,
        };
        io::Error::new(kind, interrupt)
    }
}

/// A deadline plus a cancellation token.
#[derive(Debug, Clone)]
pub struct Wait {
    timeout: Option<Duration>,
    deadline: Option<Instant>,
    cancel: CancelToken,
}

impl Wait {
    /// Start a wait that expires `timeout` from now (never if `None`).
    pub fn new(timeout: Option<Duration>, cancel: CancelToken) -> Self {
        Self {
            timeout,
            deadline: timeout.map(|t| Instant::now() + t),
            cancel,
        }
    }

    /// A wait with no deadline and a fresh token.
    pub fn unbounded() -> Self {
        Self::new(None, CancelToken::new())
    }

    /// Configured bound
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Token observed by this wait
    pub fn cancel_token(&self) -> &CancelToken {
        &self.cancel
    }

    /// Time left before the deadline (`None` if unbounded).
    pub fn remaining(&self) -> Option<Duration> {
        self.deadline
            .map(|d| d.saturating_duration_since(Instant::now()))
    }

    /// Fail if cancelled or past the deadline.
    pub fn check(&self, what: &str) -> Result<(), Interrupt> {
        if self.cancel.is_cancelled() {
            return Err(Interrupt::Cancelled {
                what: what.to_string(),
            });
        }
        if let (Some(deadline), Some(waited)) = (self.deadline, self.timeout) {
            if Instant::now() >= deadline {
                return Err(Interrupt::TimedOut {
                    waited,
                    what: what.to_string(),
                });
            }
        }
        Ok(())
    }

    /// Push the deadline back to a full timeout from now.
    ///
    /// Handles call this after making progress, so the bound applies to each
    /// stall rather than to a whole transfer.
    pub fn restart(&mut self) {
        self.deadline = self.timeout.map(|t| Instant::now() + t);
    }

    /// Length of the next sleep/poll slice: at most [`POLL_SLICE`], never past
    /// the deadline.
    pub fn slice(&self) -> Duration {
        match self.remaining() {
            Some(left) => left.min(POLL_SLICE),
            None => POLL_SLICE,
        }
    }

    /// Sleep one slice, then check the wait.
    pub fn pause(&self, what: &str) -> Result<(), Interrupt> {
        std::thread::sleep(self.slice());
        self.check(what)
    }
}

impl Default for Wait {
    fn default() -> Self {
        Self::unbounded()
    }
}
