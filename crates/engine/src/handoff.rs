//! Turn-taking between streaming workers.
//!
//! The loader drains sinks strictly in manifest order, so the worker for
//! shard `i` cannot expect a reader on its FIFO before shard `i - 1` has been
//! drained. Each adjacent pair of workers shares an anonymous pipe: the earlier
//! worker holds the write end until it is done, the later one polls the read
//! end and sees `POLLHUP` once every write end is closed.
//!
//! A worker's bounded wait for its reader only starts after its turn comes,
//! so a long but progressing drain of earlier sinks never times it out.
//!
//! Handoffs are created before any worker is forked. A worker forked early
//! inherits write ends meant for later pairs; it exits before the loader can
//! reach those pairs, so the extra copies close in time.

use nix::errno::Errno;
use nix::poll::{poll, PollFd, PollFlags, PollTimeout};
use nix::unistd::pipe;
use shardline_core::{Interrupt, Result, Wait};
use std::io;
use std::os::fd::{AsFd, OwnedFd};

/// One worker's ends of the pipes it shares with its neighbours.
#[derive(Debug, Default)]
pub struct Handoff {
    turn: Option<OwnedFd>,
    release: Option<OwnedFd>,
}

impl Handoff {
    /// A worker that never waits for anyone (disk mode, first shard).
    pub fn none() -> Self {
        Self::default()
    }

    /// Handoffs for `count` workers, chained in index order.
    pub fn chain(count: usize) -> Result<Vec<Self>> {
        let mut handoffs: Vec<Self> = (0..count).map(|_| Self::none()).collect();
        for index in 1..count {
            let (read, write) = pipe().map_err(io::Error::from)?;
            handoffs[index - 1].release = Some(write);
            handoffs[index].turn = Some(read);
        }
        Ok(handoffs)
    }

    /// Check if this worker has to wait for a predecessor
    pub fn has_predecessor(&self) -> bool {
        self.turn.is_some()
    }

    /// Block until the previous worker is done, checking `wait` between slices.
    pub fn await_turn(&self, wait: &Wait) -> std::result::Result<(), Interrupt> {
        let Some(turn) = &self.turn else {
            return Ok(());
        };
        loop {
            wait.check("previous shard")?;
            let slice_ms = wait.slice().as_millis().min(u128::from(u16::MAX)) as u16;
            let mut fds = [PollFd::new(turn.as_fd(), PollFlags::POLLIN)];
            match poll(&mut fds, PollTimeout::from(slice_ms)) {
                Ok(0) | Err(Errno::EINTR) => continue,
                // POLLHUP, or POLLERR on a broken pipe; nothing is ever written
                Ok(_) | Err(_) => return Ok(()),
            }
        }
    }

    /// Signal the next worker that its turn has come.
    pub fn release(&mut self) {
        self.release = None;
    }
}
