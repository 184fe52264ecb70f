//! Load orchestration: receive the manifest, drain sinks in order, merge.

use crate::backend::{self, Backend};
use crate::config::EngineConfig;
use shardline_channel::{ChannelMode, ManifestSource, TimedFile};
use shardline_core::{CancelToken, Error, Key, Payload, Result, Shape, Shard, Value, Wait};
use std::collections::BTreeMap;
use std::io::{self, BufReader, Read};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Outcome of a successful load.
#[derive(Debug, Clone)]
pub struct LoadReport {
    /// Channel mode of the run
    pub mode: ChannelMode,
    /// Number of shards drained
    pub shards: usize,
    /// Entries in the merged payload
    pub entries: usize,
    /// Wall time of the load
    pub elapsed: Duration,
}

/// Reads a manifest and merges the shards it lists.
#[derive(Debug, Clone)]
pub struct LoadOrchestrator {
    backend: Arc<dyn Backend>,
    timeout: Option<Duration>,
    remove_sinks: bool,
    cancel: CancelToken,
}

impl LoadOrchestrator {
    /// Build from a configuration.
    pub fn new(config: &EngineConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            backend: backend::resolve(&config.backend)?,
            timeout: config.timeout(),
            remove_sinks: config.remove_sinks_after_load,
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

    /// Token that cancels every wait of this orchestrator
    pub fn cancel_token(&self) -> &CancelToken {
        &self.cancel
    }

    fn wait(&self) -> Wait {
        Wait::new(self.timeout, self.cancel.clone())
    }

    /// Load the payload published on `channel`.
    pub fn load(&self, channel: impl ManifestSource) -> Result<Payload> {
        self.load_with_report(channel).map(|(payload, _)| payload)
    }

    /// Load and report what was read.
    ///
    /// Sinks are drained strictly in manifest order. In streaming mode each
    /// open waits for the sink's worker.
    pub fn load_with_report(&self, channel: impl ManifestSource) -> Result<(Payload, LoadReport)> {
        let started = Instant::now();
        let mode = channel.mode();
        let manifest = channel.receive(&self.wait())?;

        let mut assembler = Assembler::default();
        for (index, sink) in manifest.sinks().iter().enumerate() {
            let file = TimedFile::open_read(sink, &self.wait())?;
            let mut input = BufReader::new(file);
            let shard = self.backend.load(&mut input)?;
            if !at_eof(&mut input)? {
                return Err(Error::Deserialize(format!(
                    "trailing bytes after shard {} in {}",
                    index,
                    sink.display()
                )));
            }
            debug!(shard = index, entries = shard.len(), "Shard drained");
            assembler.push(shard)?;
        }
        let payload = assembler.finish()?;

        if self.remove_sinks {
            manifest.remove_sinks()?;
        }

        let report = LoadReport {
            mode,
            shards: manifest.len(),
            entries: payload.len(),
            elapsed: started.elapsed(),
        };
        info!(
            mode = %report.mode,
            shards = report.shards,
            entries = report.entries,
            elapsed_ms = report.elapsed.as_millis() as u64,
            "Load complete"
        );
        Ok((payload, report))
    }
}

fn at_eof(input: &mut impl Read) -> io::Result<bool> {
    let mut probe = [0u8; 1];
    Ok(input.read(&mut probe)? == 0)
}

/// Merges shards into one payload.
///
/// The first shard fixes the shape. Mapping keys merge last-write-wins;
/// sequence elements are put back at their original indices.
#[derive(Debug, Default)]
pub struct Assembler {
    shape: Option<Shape>,
    mapping: BTreeMap<Key, Value>,
    sequence: Vec<(u64, Value)>,
}

impl Assembler {
    /// Add one shard.
    ///
    /// # Errors
    ///
    /// `ShapeMismatch` if the shard's shape differs from the first one.
    pub fn push(&mut self, shard: Shard) -> Result<()> {
        let actual = shard.shape();
        let expected = *self.shape.get_or_insert(actual);
        if expected != actual {
            return Err(Error::ShapeMismatch { expected, actual });
        }
        match shard {
            Shard::Mapping(entries) => self.mapping.extend(entries),
            Shard::Sequence(items) => self.sequence.extend(items),
        }
        Ok(())
    }

    /// Build the payload.
    ///
    /// # Errors
    ///
    /// `Deserialize` if sequence indices are not exactly `0..len`.
    pub fn finish(self) -> Result<Payload> {
        match self.shape {
            None | Some(Shape::Mapping) => Ok(Payload::Mapping(self.mapping)),
            Some(Shape::Sequence) => {
                let mut items = self.sequence;
                items.sort_by_key(|(index, _)| *index);
                for (position, (index, _)) in items.iter().enumerate() {
                    if *index != position as u64 {
                        return Err(Error::Deserialize(format!(
                            "sequence index {} found at position {}: elements missing or duplicated",
                            index, position
                        )));
                    }
                }
                Ok(Payload::Sequence(
                    items.into_iter().map(|(_, value)| value).collect(),
                ))
            }
        }
    }
}
