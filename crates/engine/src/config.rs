//! Engine configuration.
//!
//! `EngineConfig` is plain data: it can be built in code with the chained
//! setters or loaded from TOML, where every field is optional.
//!
//! ```toml
//! workers = 8
//! backend = "msgpack"
//! wait_timeout_ms = 30000
//! sink_base = "/dev/shm/shardline"
//! remove_sinks_after_load = true
//! ```

use crate::backend;
use serde::{Deserialize, Serialize};
use shardline_core::{Error, Result};
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;
use tracing::debug;

/// Default bound on a single blocking wait (10 minutes).
pub const DEFAULT_WAIT_TIMEOUT_MS: u64 = 600_000;

/// Number of cores the process may run on (at least 1).
pub fn available_cores() -> usize {
    thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

/// Settings shared by dump and load.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Requested worker count; available cores when unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub workers: Option<usize>,
    /// Allow more workers than cores
    pub allow_oversubscription: bool,
    /// Backend name
    pub backend: String,
    /// Bound on each blocking wait in milliseconds; 0 disables it
    pub wait_timeout_ms: u64,
    /// Base path for sinks in streaming mode
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sink_base: Option<PathBuf>,
    /// Unlink sinks after a successful load
    pub remove_sinks_after_load: bool,
    /// Log verbosity for hosts that install a subscriber
    pub log_level: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            workers: None,
            allow_oversubscription: false,
            backend: backend::DEFAULT_BACKEND.to_string(),
            wait_timeout_ms: DEFAULT_WAIT_TIMEOUT_MS,
            sink_base: None,
            remove_sinks_after_load: false,
            log_level: "info".to_string(),
        }
    }
}

impl EngineConfig {
    /// Default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// One worker, no processes spawned.
    pub fn sequential() -> Self {
        Self {
            workers: Some(1),
            ..Default::default()
        }
    }

    /// One worker per core, unbounded waits.
    ///
    /// For batch jobs where a slow peer is expected rather than a fault.
    pub fn batch() -> Self {
        Self {
            wait_timeout_ms: 0,
            ..Default::default()
        }
    }

    /// Parse TOML text.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        toml::from_str(text).map_err(|e| Error::InvalidConfig(e.to_string()))
    }

    /// Load a TOML file.
    pub fn load_from(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&text)
            .map_err(|e| Error::InvalidConfig(format!("{}: {}", path.display(), e)))?;
        debug!(path = %path.display(), "Loaded engine config");
        Ok(config)
    }

    /// Set requested worker count
    pub fn workers(mut self, workers: usize) -> Self {
        self.workers = Some(workers);
        self
    }

    /// Allow more workers than cores
    pub fn allow_oversubscription(mut self, allow: bool) -> Self {
        self.allow_oversubscription = allow;
        self
    }

    /// Set backend name
    pub fn backend(mut self, name: impl Into<String>) -> Self {
        self.backend = name.into();
        self
    }

    /// Set wait bound; `None` waits forever
    pub fn wait_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.wait_timeout_ms = timeout.map_or(0, |t| t.as_millis().max(1) as u64);
        self
    }

    /// Set sink base for streaming mode
    pub fn sink_base(mut self, base: impl Into<PathBuf>) -> Self {
        self.sink_base = Some(base.into());
        self
    }

    /// Unlink sinks after a successful load
    pub fn remove_sinks_after_load(mut self, remove: bool) -> Self {
        self.remove_sinks_after_load = remove;
        self
    }

    /// Bound on each blocking wait.
    pub fn timeout(&self) -> Option<Duration> {
        match self.wait_timeout_ms {
            0 => None,
            ms => Some(Duration::from_millis(ms)),
        }
    }

    /// Worker count a dump will actually use.
    ///
    /// Clamped to the available cores unless oversubscription is allowed.
    pub fn effective_workers(&self) -> usize {
        let cores = available_cores();
        let requested = self.workers.unwrap_or(cores).max(1);
        if self.allow_oversubscription {
            requested
        } else {
            requested.min(cores)
        }
    }

    /// Reject settings no run could use.
    pub fn validate(&self) -> Result<()> {
        if self.workers == Some(0) {
            return Err(Error::InvalidConfig("workers must be at least 1".to_string()));
        }
        backend::resolve(&self.backend)?;
        Ok(())
    }
}
