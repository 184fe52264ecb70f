//! Deadline-aware file handles.
//!
//! [`TimedFile`] opens regular files and FIFOs with `O_NONBLOCK` and turns
//! every would-block into a `poll(2)` of at most one [`Wait`] slice, checking
//! the deadline and cancel token in between. Every successful read or write
//! restarts the deadline, so the bound is on a stall, not on a transfer.
//!
//! The same code path serves both channel modes: a regular file always polls
//! ready, a FIFO polls ready only once its peer has shown up.
//!
//! ## FIFO rules relied on here
//!
//! - Opening the read end with `O_NONBLOCK` succeeds immediately.
//! - Opening the write end with `O_NONBLOCK` fails with `ENXIO` until a reader
//!   exists, so writers retry until the wait expires.
//! - A reader that has never seen a writer does not poll ready, so reads only
//!   happen after `poll` and an EOF is never reported before the writer came
//!   and went.

use nix::errno::Errno;
use nix::fcntl::OFlag;
use nix::poll::{poll, PollFd, PollFlags, PollTimeout};
use shardline_core::{Result, Wait};
use std::fs::{File, OpenOptions};
use std::io::{self, Read, Write};
use std::os::fd::AsFd;
use std::os::unix::fs::OpenOptionsExt;
use std::path::Path;
use tracing::debug;

/// File handle whose reads and writes honour a [`Wait`].
#[derive(Debug)]
pub struct TimedFile {
    file: File,
    wait: Wait,
    label: String,
}

impl TimedFile {
    /// Open for reading. Never blocks, even on a FIFO.
    pub fn open_read(path: &Path, wait: &Wait) -> Result<Self> {
        let file = OpenOptions::new()
            .read(true)
            .custom_flags(OFlag::O_NONBLOCK.bits())
            .open(path)?;
        Ok(Self::new(file, wait, path))
    }

    /// Open an existing file or FIFO for writing, truncating regular files.
    ///
    /// On a FIFO this waits, within `wait`, for a reader to open the other end.
    pub fn open_write(path: &Path, wait: &Wait) -> Result<Self> {
        Self::open_writer(path, wait, false)
    }

    /// Like [`open_write`](Self::open_write) but creates a missing regular file.
    pub fn create_write(path: &Path, wait: &Wait) -> Result<Self> {
        Self::open_writer(path, wait, true)
    }

    fn open_writer(path: &Path, wait: &Wait, create: bool) -> Result<Self> {
        let label = path.display().to_string();
        let mut attempts = 0u64;
        loop {
            let opened = OpenOptions::new()
                .write(true)
                .create(create)
                .truncate(true)
                .custom_flags(OFlag::O_NONBLOCK.bits())
                .open(path);
            match opened {
                Ok(file) => {
                    if attempts > 0 {
                        debug!(path = %label, attempts, "Reader connected");
                    }
                    return Ok(Self::new(file, wait, path));
                }
                Err(e) if e.raw_os_error() == Some(Errno::ENXIO as i32) => {
                    attempts += 1;
                    wait.pause(&label)?;
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    fn new(file: File, wait: &Wait, path: &Path) -> Self {
        Self {
            file,
            wait: wait.clone(),
            label: path.display().to_string(),
        }
    }

    /// Path this handle was opened from
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Read until the writer closes its end.
    pub fn read_all(&mut self) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        self.read_to_end(&mut buf)?;
        Ok(buf)
    }

    /// Check that nothing is left to read.
    pub fn at_eof(&mut self) -> Result<bool> {
        let mut probe = [0u8; 1];
        Ok(self.read(&mut probe)? == 0)
    }

    fn ready(&self, events: PollFlags) -> io::Result<()> {
        loop {
            self.wait.check(&self.label)?;
            let slice_ms = self.wait.slice().as_millis().min(u128::from(u16::MAX)) as u16;
            let mut fds = [PollFd::new(self.file.as_fd(), events)];
            match poll(&mut fds, PollTimeout::from(slice_ms)) {
                Ok(0) => continue,
                Ok(_) => return Ok(()),
                Err(Errno::EINTR) => continue,
                Err(errno) => return Err(errno.into()),
            }
        }
    }
}

impl Read for TimedFile {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        loop {
            self.ready(PollFlags::POLLIN)?;
            match self.file.read(buf) {
                Ok(n) => {
                    self.wait.restart();
                    return Ok(n);
                }
                Err(e)
                    if e.kind() == io::ErrorKind::WouldBlock
                        || e.kind() == io::ErrorKind::Interrupted => {}
                other => return other,
            }
        }
    }
}

impl Write for TimedFile {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        loop {
            self.ready(PollFlags::POLLOUT)?;
            match self.file.write(buf) {
                Ok(n) => {
                    self.wait.restart();
                    return Ok(n);
                }
                Err(e)
                    if e.kind() == io::ErrorKind::WouldBlock
                        || e.kind() == io::ErrorKind::Interrupted => {}
                other => return other,
            }
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        self.file.flush()
    }
}
