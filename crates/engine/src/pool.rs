//! Forked worker processes.
//!
//! Each job runs in its own child created with `fork(2)`. The child runs the
//! job under `catch_unwind` and leaves with `_exit(2)`, so it never returns
//! into the caller's stack, never runs the parent's destructors and never
//! flushes buffers it inherited.
//!
//! ## Lifecycle
//!
//! ```text
//! spawn ──► Running ──waitpid──► Succeeded | Failed(exit)
//!              │
//!              └── a sibling failed / join interrupted / pool dropped
//!                      ──► SIGKILL + reap ──► Killed
//! ```
//!
//! No child outlives the pool: `Drop` kills and reaps whatever is still
//! running. Workers the pool killed itself are never reported as failures.

use crate::worker::EXIT_PANIC;
use nix::errno::Errno;
use nix::sys::signal::{kill, Signal};
use nix::sys::wait::{waitpid, WaitPidFlag, WaitStatus};
use nix::unistd::{fork, ForkResult, Pid};
use shardline_core::{Error, Result, Wait, WorkerExit};
use std::io;
use std::panic::{self, AssertUnwindSafe};
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Running,
    Succeeded,
    Failed(WorkerExit),
    Killed,
}

#[derive(Debug)]
struct Child {
    shard: usize,
    pid: Pid,
    state: State,
    killed: bool,
}

/// Set of worker processes for one dump.
#[derive(Debug, Default)]
pub struct WorkerPool {
    children: Vec<Child>,
    stop_on_failure: bool,
}

impl WorkerPool {
    /// Empty pool
    pub fn new() -> Self {
        Self::default()
    }

    /// Kill the remaining workers as soon as one fails.
    ///
    /// Streaming runs need this: once a sink fails the loader aborts, and the
    /// workers for later sinks would wait for a reader that never comes.
    pub fn stop_on_failure(mut self) -> Self {
        self.stop_on_failure = true;
        self
    }

    /// Number of processes spawned so far
    pub fn len(&self) -> usize {
        self.children.len()
    }

    /// Check if nothing was spawned
    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    /// Run `job` in a new process; its return value is the exit status.
    ///
    /// Only the forking thread exists in the child. Call this from a process
    /// where no other thread can hold a lock `job` needs (allocator aside), in
    /// particular a blocking log writer: the child would wait on it forever.
    pub fn spawn<F>(&mut self, shard: usize, job: F) -> Result<()>
    where
        F: FnOnce() -> i32,
    {
        // SAFETY: the child runs `job` and leaves through `libc::_exit`, which
        // skips atexit handlers, destructors and stdio flushing inherited from
        // the parent. `job` must not depend on other parent threads.
        match unsafe { fork() } {
            Ok(ForkResult::Child) => {
                let code = panic::catch_unwind(AssertUnwindSafe(job)).unwrap_or(EXIT_PANIC);
                // SAFETY: terminates this process immediately; nothing runs after.
                unsafe { nix::libc::_exit(code) }
            }
            Ok(ForkResult::Parent { child }) => {
                debug!(shard, pid = child.as_raw(), "Spawned worker");
                self.children.push(Child {
                    shard,
                    pid: child,
                    state: State::Running,
                    killed: false,
                });
                Ok(())
            }
            Err(errno) => Err(Error::Io(io::Error::from(errno))),
        }
    }

    /// Wait for every worker to exit.
    ///
    /// With [`stop_on_failure`](Self::stop_on_failure) the first failure
    /// kills the other workers; otherwise every worker is joined.
    ///
    /// # Errors
    ///
    /// - `WorkerFailed` naming the lowest failing shard if any worker exited
    ///   non-zero or was killed by a signal it did not get from the pool; the
    ///   other failures are logged.
    /// - `Timeout`/`Cancelled` if `wait` ran out first and no worker had
    ///   failed; the remaining workers are killed and reaped before returning.
    pub fn join(&mut self, wait: &Wait) -> Result<()> {
        loop {
            let running = self.reap(false)?;
            if self.stop_on_failure && self.has_failure() {
                if running > 0 {
                    warn!(running, "Worker failed, killing the rest");
                    self.terminate();
                }
                return self.outcome();
            }
            if running == 0 {
                return Ok(());
            }
            if let Err(interrupt) = wait.pause("workers") {
                warn!(running = self.running(), "Interrupted while joining workers, killing the rest");
                self.terminate();
                return match self.outcome() {
                    Ok(()) => Err(interrupt.into()),
                    failed => failed,
                };
            }
        }
    }

    fn has_failure(&self) -> bool {
        self.children
            .iter()
            .any(|c| matches!(c.state, State::Failed(_)))
    }

    /// `WorkerFailed` for the lowest failing shard, logging the others.
    fn outcome(&self) -> Result<()> {
        let mut failures = self.children.iter().filter_map(|c| match c.state {
            State::Failed(exit) => Some((c.shard, exit)),
            _ => None,
        });
        let first = failures.next();
        for (shard, exit) in failures {
            warn!(shard, %exit, "Worker failed");
        }
        match first {
            Some((shard, exit)) => Err(Error::WorkerFailed { shard, exit }),
            None => Ok(()),
        }
    }

    fn running(&self) -> usize {
        self.children
            .iter()
            .filter(|c| c.state == State::Running)
            .count()
    }

    /// Collect exited children; returns how many are still running.
    fn reap(&mut self, block: bool) -> Result<usize> {
        let flags = if block { None } else { Some(WaitPidFlag::WNOHANG) };
        let mut running = 0;
        for child in self.children.iter_mut().filter(|c| c.state == State::Running) {
            let state = loop {
                match waitpid(child.pid, flags) {
                    Ok(WaitStatus::Exited(_, 0)) => break State::Succeeded,
                    Ok(WaitStatus::Exited(_, code)) => break State::Failed(WorkerExit::Code(code)),
                    Ok(WaitStatus::Signaled(_, Signal::SIGKILL, _)) if child.killed => {
                        break State::Killed
                    }
                    Ok(WaitStatus::Signaled(_, signal, _)) => {
                        break State::Failed(WorkerExit::Signal(signal as i32))
                    }
                    Ok(_) if block => continue,
                    Ok(_) => break State::Running,
                    Err(Errno::EINTR) => continue,
                    Err(errno) => return Err(Error::Io(io::Error::from(errno))),
                }
            };
            if state == State::Running {
                running += 1;
            } else {
                debug!(shard = child.shard, pid = child.pid.as_raw(), ?state, "Worker exited");
            }
            child.state = state;
        }
        Ok(running)
    }

    /// SIGKILL and reap every running worker.
    fn terminate(&mut self) {
        for child in self.children.iter_mut().filter(|c| c.state == State::Running) {
            match kill(child.pid, Signal::SIGKILL) {
                Ok(()) => child.killed = true,
                Err(e) => {
                    warn!(shard = child.shard, pid = child.pid.as_raw(), error = %e, "Failed to kill worker")
                }
            }
        }
        if let Err(e) = self.reap(true) {
            warn!(error = %e, "Failed to reap killed workers");
        }
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        if self.running() > 0 {
            self.terminate();
        }
    }
}
