//! Core types for Shardline
//!
//! This crate defines the types every other crate shares:
//! - Value: the eight-variant element model
//! - Payload / Key / Shape: the mapping and sequence containers
//! - Shard: the unit a backend marshals
//! - Error / ErrorKind / WorkerExit: the error taxonomy
//! - Wait / CancelToken: bounded waits for every blocking point

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod payload;
pub mod shard;
pub mod value;
pub mod wait;

pub use error::{Error, ErrorKind, Result, WorkerExit};
pub use payload::{Key, Payload, Shape};
pub use shard::Shard;
pub use value::Value;
pub use wait::{CancelToken, Interrupt, Wait, POLL_SLICE};
