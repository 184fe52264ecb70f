//! Worker: marshal one shard into one sink.
//!
//! A worker usually runs in a forked child, so it does not log: a subscriber
//! lock held by another parent thread at fork time would never be released.

use crate::backend::Backend;
use crate::handoff::Handoff;
use shardline_channel::TimedFile;
use shardline_core::{Error, ErrorKind, Result, Shard, Wait};
use std::io::{BufWriter, Write};
use std::path::PathBuf;
use std::sync::Arc;

/// Exit status of a worker that finished its shard.
pub const EXIT_OK: i32 = 0;
/// Exit status when the backend could not encode the shard.
pub const EXIT_SERIALIZATION: i32 = 1;
/// Exit status on an I/O failure.
pub const EXIT_IO: i32 = 2;
/// Exit status when a wait timed out or was cancelled.
pub const EXIT_INTERRUPTED: i32 = 3;
/// Exit status when the worker panicked.
pub const EXIT_PANIC: i32 = 101;

/// One (shard, sink) pair and the means to marshal it.
#[derive(Debug)]
pub struct Worker {
    index: usize,
    shard: Shard,
    sink: PathBuf,
    backend: Arc<dyn Backend>,
    wait: Wait,
    handoff: Handoff,
}

impl Worker {
    /// Bind a shard to its sink.
    pub fn new(index: usize, shard: Shard, sink: PathBuf, backend: Arc<dyn Backend>, wait: Wait) -> Self {
        Self {
            index,
            shard,
            sink,
            backend,
            wait,
            handoff: Handoff::none(),
        }
    }

    /// Wait for the previous shard's worker before looking for a reader.
    pub fn with_handoff(mut self, handoff: Handoff) -> Self {
        self.handoff = handoff;
        self
    }

    /// Shard index within the run
    pub fn index(&self) -> usize {
        self.index
    }

    /// Write the shard to the sink.
    ///
    /// The sink must already exist. On a FIFO this waits for the loader to
    /// open the read end; the bound on that wait starts once the previous
    /// worker has finished, since the loader cannot get here any earlier.
    pub fn run(mut self) -> Result<()> {
        let turn = Wait::new(None, self.wait.cancel_token().clone());
        self.handoff.await_turn(&turn)?;
        self.wait.restart();

        let file = TimedFile::open_write(&self.sink, &self.wait)?;
        let mut out = BufWriter::new(file);
        self.backend.dump(&self.shard, &mut out)?;
        out.flush()?;
        drop(out);
        self.handoff.release();
        Ok(())
    }

    /// Run and translate the outcome to a process exit status.
    pub fn run_to_exit(self) -> i32 {
        match self.run() {
            Ok(()) => EXIT_OK,
            Err(e) => exit_code(&e),
        }
    }
}

/// Exit status a worker reports for an error.
pub fn exit_code(error: &Error) -> i32 {
    match error.kind() {
        ErrorKind::Interrupted => EXIT_INTERRUPTED,
        ErrorKind::Io if matches!(error, Error::Io(_)) => EXIT_IO,
        _ => EXIT_SERIALIZATION,
    }
}
