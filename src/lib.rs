//! # Shardline
//!
//! Parallel scatter/gather marshalling over files and named pipes.
//!
//! Shardline splits a large mapping or sequence into size-balanced shards,
//! serializes each shard in its own worker process, and reassembles the
//! result in a loader, moving bytes through regular files or FIFOs.
//!
//! ## Quick Start
//!
//! ```ignore
//! use shardline::prelude::*;
//!
//! let marshaller = Marshaller::builder().workers(4).build()?;
//!
//! // Producer: writes run.manifest and run.manifest_0 .. run.manifest_3
//! let payload = Payload::from_json(serde_json::json!({"a": [1, 2, 3], "b": "text"}))?;
//! marshaller.dump_to(payload, "/data/run.manifest")?;
//!
//! // Consumer
//! let payload = marshaller.load_from("/data/run.manifest")?;
//! ```
//!
//! ## Channel Modes
//!
//! | Primary channel | Sinks | Dump and load |
//! |-----------------|-------|---------------|
//! | regular file | regular files next to it | one after the other |
//! | FIFO | FIFOs under the sink base | concurrently, in two processes |
//!
//! ## Crates
//!
//! - [`shardline_core`] - value model, payloads, errors, bounded waits
//! - [`shardline_partition`] - size-balanced partitioning
//! - [`shardline_channel`] - channel modes, manifest, sinks
//! - [`shardline_engine`] - backends, worker processes, orchestrators

#![warn(missing_docs)]

mod error;
mod marshal;

pub mod prelude;

// Re-export main entry points
pub use error::{Error, Result};
pub use marshal::{Marshaller, MarshallerBuilder};

// Re-export crates
pub use shardline_channel;
pub use shardline_core;
pub use shardline_engine;
pub use shardline_partition;

// Re-export types
pub use shardline_channel::{ChannelMode, FileChannel, HandleChannel, Manifest, ManifestSink, ManifestSource};
pub use shardline_core::{CancelToken, Key, Payload, Shape, Shard, Value, WorkerExit};
pub use shardline_engine::{Backend, DumpReport, EngineConfig, LoadReport};
