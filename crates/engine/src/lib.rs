//! Scatter/gather engine for Shardline
//!
//! This crate runs a dump or a load end to end:
//! - Backend: shard serializers (bincode, MessagePack, JSON)
//! - EngineConfig: worker count, backend, wait bounds, sink placement
//! - Worker / WorkerPool: one forked process per shard
//! - DumpOrchestrator: partition, create sinks, publish manifest, fan out
//! - LoadOrchestrator: receive manifest, drain sinks in order, merge

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod backend;
pub mod config;
pub mod dump;
pub mod handoff;
pub mod load;
pub mod pool;
pub mod worker;

pub use backend::{resolve as resolve_backend, Backend, DEFAULT_BACKEND};
pub use config::{available_cores, EngineConfig};
pub use dump::{DumpOrchestrator, DumpReport};
pub use handoff::Handoff;
pub use load::{Assembler, LoadOrchestrator, LoadReport};
pub use pool::WorkerPool;
pub use worker::Worker;
