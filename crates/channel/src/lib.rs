//! Channels and sinks for Shardline
//!
//! This crate owns everything that touches the filesystem:
//! - ChannelMode: disk (regular file) vs streaming (FIFO) detection
//! - Manifest: sink list and its newline-delimited wire format
//! - create_sinks: all-or-nothing sink creation
//! - TimedFile: non-blocking handles driven by a bounded wait
//! - ManifestSink / ManifestSource: the two ends of the primary channel

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod io;
pub mod manifest;
pub mod mode;
pub mod primary;
pub mod sink;

pub use io::TimedFile;
pub use manifest::{sink_path, Manifest};
pub use mode::ChannelMode;
pub use primary::{FileChannel, HandleChannel, ManifestSink, ManifestSource};
pub use sink::{create_sink, create_sinks};
