//! Dump orchestration: partition, create sinks, publish, fan out.
//!
//! ## Order of operations
//!
//! 1. Detect the channel mode and derive the sink paths; nothing touches the
//!    filesystem before the manifest is known to be encodable.
//! 2. Create every sink. A FIFO must exist before the loader reads the
//!    manifest, or the loader could try to open a sink that is not there yet.
//! 3. Publish the manifest. In streaming mode this is where the dump first
//!    waits for the loader.
//! 4. Marshal: inline for one worker, one forked process per shard otherwise.
//!    In streaming mode each worker starts looking for its reader only after
//!    the previous one is done (see [`Handoff`]).
//! 5. Join. The lowest failing shard is reported; in streaming mode the first
//!    failure also kills the other workers.
//!
//! `wait_timeout_ms` bounds each stall, never the whole run: every worker
//! enforces it on its own sink, and the join only waits for the workers to
//! exit (or the cancel token).
//!
//! Sinks are removed if step 2 or 3 fails. After step 4 has started they are
//! left in place for the caller to inspect.

use crate::backend::{self, Backend};
use crate::config::EngineConfig;
use crate::handoff::Handoff;
use crate::pool::WorkerPool;
use crate::worker::Worker;
use shardline_channel::{create_sinks, ChannelMode, Manifest, ManifestSink};
use shardline_core::{CancelToken, Error, Payload, Result, Shard, Wait};
use shardline_partition::{Partitioner, Shards};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Outcome of a successful dump.
#[derive(Debug, Clone)]
pub struct DumpReport {
    /// Channel mode of the run
    pub mode: ChannelMode,
    /// Number of shards, equal to the number of sinks
    pub workers: usize,
    /// Published manifest
    pub manifest: Manifest,
    /// Estimated size of each shard, by shard index
    pub totals: Vec<u64>,
    /// Entries in the payload
    pub entries: usize,
    /// Wall time of the dump
    pub elapsed: Duration,
}

/// Splits a payload across worker processes and publishes where they wrote.
#[derive(Debug, Clone)]
pub struct DumpOrchestrator {
    workers: usize,
    backend: Arc<dyn Backend>,
    timeout: Option<Duration>,
    sink_base: Option<PathBuf>,
    cancel: CancelToken,
}

impl DumpOrchestrator {
    /// Build from a configuration.
    ///
    /// # Errors
    ///
    /// Configuration errors (unknown backend, zero workers).
    pub fn new(config: &EngineConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            workers: config.effective_workers(),
            backend: backend::resolve(&config.backend)?,
            timeout: config.timeout(),
            sink_base: config.sink_base.clone(),
            cancel: CancelToken::new(),
        })
    }

    /// Use a specific backend instance instead of the configured one.
    pub fn with_backend(mut self, backend: Arc<dyn Backend>) -> Self {
        self.backend = backend;
        self
    }

    /// Observe an external cancel token.
    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Worker count every dump uses
    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Backend shards are written with
    pub fn backend(&self) -> &Arc<dyn Backend> {
        &self.backend
    }

    /// Token that cancels every wait of this orchestrator
    pub fn cancel_token(&self) -> &CancelToken {
        &self.cancel
    }

    fn wait(&self) -> Wait {
        Wait::new(self.timeout, self.cancel.clone())
    }

    /// Base path sinks are derived from.
    ///
    /// Disk mode prefers the channel's own path, streaming mode the
    /// configured base; either falls back to the other.
    fn sink_base<'a>(&'a self, mode: ChannelMode, location: Option<&'a Path>) -> Result<&'a Path> {
        let base = match mode {
            ChannelMode::Disk => location.or(self.sink_base.as_deref()),
            ChannelMode::Streaming => self.sink_base.as_deref().or(location),
        };
        base.ok_or_else(|| {
            Error::InvalidConfig(
                "channel has no filesystem location and no sink base is configured".to_string(),
            )
        })
    }

    /// Dump `payload` through `channel`.
    ///
    /// In streaming mode this returns only once the loader has drained every
    /// sink.
    ///
    /// With more than one worker this forks. Call it where no other thread
    /// holds a lock the workers need; a blocking log writer is the usual one.
    pub fn dump(&self, payload: Payload, channel: impl ManifestSink) -> Result<DumpReport> {
        let started = Instant::now();
        let mode = channel.mode();
        let manifest = Manifest::for_base(self.sink_base(mode, channel.location())?, self.workers);
        manifest.encode()?;

        let entries = payload.len();
        let (totals, job) = if self.workers == 1 {
            let total: u64 = payload.entry_sizes().iter().sum();
            (vec![total], Job::Inline(Shard::from(payload)))
        } else {
            let shards = Partitioner::new(self.workers)?.split(payload)?;
            (shards.totals().to_vec(), Job::Forked(shards))
        };

        create_sinks(&manifest, mode)?;
        if let Err(e) = channel.publish(&manifest, &self.wait()) {
            warn!(error = %e, "Publishing manifest failed, removing sinks");
            if let Err(cleanup) = manifest.remove_sinks() {
                warn!(error = %cleanup, "Failed to remove sinks");
            }
            return Err(e);
        }
        debug!(mode = %mode, sinks = manifest.len(), "Manifest published");

        match job {
            Job::Inline(shard) => {
                Worker::new(0, shard, manifest.sinks()[0].clone(), self.backend.clone(), self.wait())
                    .run()?;
                debug!(sink = %manifest.sinks()[0].display(), "Shard written inline");
            }
            Job::Forked(shards) => {
                let (mut pool, handoffs): (WorkerPool, Vec<Handoff>) = match mode {
                    ChannelMode::Disk => (
                        WorkerPool::new(),
                        (0..self.workers).map(|_| Handoff::none()).collect(),
                    ),
                    ChannelMode::Streaming => (
                        WorkerPool::new().stop_on_failure(),
                        Handoff::chain(self.workers)?,
                    ),
                };
                for ((index, shard), handoff) in shards.enumerate().zip(handoffs) {
                    let worker = Worker::new(
                        index,
                        shard,
                        manifest.sinks()[index].clone(),
                        self.backend.clone(),
                        self.wait(),
                    )
                    .with_handoff(handoff);
                    pool.spawn(index, move || worker.run_to_exit())?;
                }
                pool.join(&Wait::new(None, self.cancel.clone()))?;
            }
        }

        let report = DumpReport {
            mode,
            workers: self.workers,
            manifest,
            totals,
            entries,
            elapsed: started.elapsed(),
        };
        info!(
            mode = %report.mode,
            workers = report.workers,
            entries = report.entries,
            elapsed_ms = report.elapsed.as_millis() as u64,
            backend = self.backend.name(),
            "Dump complete"
        );
        Ok(report)
    }
}

enum Job {
    Inline(Shard),
    Forked(Shards),
}
