//! Main entry point for Shardline.
//!
//! This module provides the `Marshaller` struct: one configured dumper and
//! loader pair sharing a backend and a cancel token.

use crate::error::Result;
use shardline_channel::{FileChannel, ManifestSink, ManifestSource};
use shardline_core::{CancelToken, Payload};
use shardline_engine::{
    Backend, DumpOrchestrator, DumpReport, EngineConfig, LoadOrchestrator, LoadReport,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Parallel scatter/gather marshaller.
///
/// Create one using [`Marshaller::new`] or [`Marshaller::builder`].
///
/// # Example
///
/// ```ignore
/// use shardline::prelude::*;
///
/// let marshaller = Marshaller::builder().workers(4).build()?;
///
/// // Producer
/// marshaller.dump_to(payload, "/data/run.manifest")?;
///
/// // Consumer (another process, or later)
/// let payload = marshaller.load_from("/data/run.manifest")?;
/// ```
#[derive(Debug, Clone)]
pub struct Marshaller {
    config: EngineConfig,
    dumper: DumpOrchestrator,
    loader: LoadOrchestrator,
}

impl Marshaller {
    /// Marshaller with default settings: one worker per core, bincode.
    pub fn new() -> Result<Self> {
        Self::builder().build()
    }

    /// Create a builder for marshaller configuration.
    pub fn builder() -> MarshallerBuilder {
        MarshallerBuilder::new()
    }

    /// Build directly from an engine configuration.
    pub fn from_config(config: EngineConfig) -> Result<Self> {
        Self::builder().config(config).build()
    }

    /// Effective configuration
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Worker count every dump uses
    pub fn workers(&self) -> usize {
        self.dumper.workers()
    }

    /// Token that cancels every wait of this marshaller.
    ///
    /// Cancellation is sticky: a cancelled marshaller fails every later call.
    pub fn cancel_token(&self) -> &CancelToken {
        self.dumper.cancel_token()
    }

    /// Dump a payload through a primary channel.
    pub fn dump(&self, payload: impl Into<Payload>, channel: impl ManifestSink) -> Result<DumpReport> {
        Ok(self.dumper.dump(payload.into(), channel)?)
    }

    /// Load the payload published on a primary channel.
    pub fn load(&self, channel: impl ManifestSource) -> Result<Payload> {
        Ok(self.loader.load(channel)?)
    }

    /// Load and report what was read.
    pub fn load_with_report(&self, channel: impl ManifestSource) -> Result<(Payload, LoadReport)> {
        Ok(self.loader.load_with_report(channel)?)
    }

    /// Dump through the regular file or FIFO at `path`.
    pub fn dump_to(&self, payload: impl Into<Payload>, path: impl AsRef<Path>) -> Result<DumpReport> {
        let channel = FileChannel::new(path.as_ref())?;
        self.dump(payload, channel)
    }

    /// Load through the regular file or FIFO at `path`.
    pub fn load_from(&self, path: impl AsRef<Path>) -> Result<Payload> {
        let channel = FileChannel::new(path.as_ref())?;
        self.load(channel)
    }
}

/// Builder for marshaller configuration.
///
/// # Example
///
/// ```ignore
/// // Streaming between two processes over a FIFO
/// let marshaller = Marshaller::builder()
///     .workers(8)
///     .backend("msgpack")
///     .sink_base("/dev/shm/run")
///     .wait_timeout(Duration::from_secs(30))
///     .build()?;
///
/// // Deterministic single-process run, e.g. in tests
/// let marshaller = Marshaller::builder().sequential().build()?;
/// ```
#[derive(Debug, Default)]
pub struct MarshallerBuilder {
    config: EngineConfig,
    backend: Option<Arc<dyn Backend>>,
    cancel: Option<CancelToken>,
}

impl MarshallerBuilder {
    /// Create a new builder with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an existing configuration, replacing earlier settings.
    pub fn config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// Load settings from a TOML file, replacing earlier settings.
    pub fn config_file(mut self, path: impl AsRef<Path>) -> Result<Self> {
        self.config = EngineConfig::load_from(path.as_ref())?;
        Ok(self)
    }

    /// Set requested worker count (clamped to the available cores).
    pub fn workers(mut self, workers: usize) -> Self {
        self.config = self.config.workers(workers);
        self
    }

    /// Run everything in the calling process.
    pub fn sequential(self) -> Self {
        self.workers(1)
    }

    /// Allow more workers than cores.
    pub fn allow_oversubscription(mut self) -> Self {
        self.config = self.config.allow_oversubscription(true);
        self
    }

    /// Select a backend by name.
    pub fn backend(mut self, name: impl Into<String>) -> Self {
        self.config = self.config.backend(name);
        self
    }

    /// Use a backend instance instead of a registered one.
    pub fn custom_backend(mut self, backend: Arc<dyn Backend>) -> Self {
        self.backend = Some(backend);
        self
    }

    /// Bound every blocking wait.
    pub fn wait_timeout(mut self, timeout: Duration) -> Self {
        self.config = self.config.wait_timeout(Some(timeout));
        self
    }

    /// Never time out.
    pub fn no_timeout(mut self) -> Self {
        self.config = self.config.wait_timeout(None);
        self
    }

    /// Base path for sinks in streaming mode.
    pub fn sink_base(mut self, base: impl Into<PathBuf>) -> Self {
        self.config = self.config.sink_base(base);
        self
    }

    /// Unlink sinks after a successful load.
    pub fn remove_sinks_after_load(mut self) -> Self {
        self.config = self.config.remove_sinks_after_load(true);
        self
    }

    /// Share a cancel token with the caller.
    pub fn cancel_token(mut self, token: CancelToken) -> Self {
        self.cancel = Some(token);
        self
    }

    /// Validate the settings and build.
    pub fn build(self) -> Result<Marshaller> {
        let cancel = self.cancel.unwrap_or_default();
        let mut dumper = DumpOrchestrator::new(&self.config)?.with_cancel(cancel.clone());
        let mut loader = LoadOrchestrator::new(&self.config)?.with_cancel(cancel);
        if let Some(backend) = self.backend {
            dumper = dumper.with_backend(backend.clone());
            loader = loader.with_backend(backend);
        }
        debug!(
            workers = dumper.workers(),
            backend = dumper.backend().name(),
            timeout_ms = self.config.wait_timeout_ms,
            "Marshaller ready"
        );
        Ok(Marshaller {
            config: self.config,
            dumper,
            loader,
        })
    }
}
