//! Size-balanced partitioning for Shardline
//!
//! This crate splits a payload into N shards whose estimated sizes are as
//! equal as possible:
//! - PartitionPlan: pure LPT bin packing over size estimates
//! - Partitioner: plans a payload and yields its shards lazily

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod plan;
pub mod split;

pub use plan::{Bin, PartitionPlan};
pub use split::{Partitioner, Shards};
