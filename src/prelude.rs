//! Convenient imports for Shardline.
//!
//! This module re-exports the most commonly used types so you can get started
//! with a single import:
//!
//! ```ignore
//! use shardline::prelude::*;
//!
//! let marshaller = Marshaller::new()?;
//! let payload = marshaller.load_from("/data/run.manifest")?;
//! ```

// Main entry point
pub use crate::marshal::{Marshaller, MarshallerBuilder};

// Error handling
pub use crate::error::{Error, Result};

// Data model
pub use shardline_core::{Key, Payload, Shape, Value};

// Channels
pub use shardline_channel::{ChannelMode, FileChannel, HandleChannel, ManifestSink, ManifestSource};

// Run control
pub use shardline_core::CancelToken;
pub use shardline_engine::{DumpReport, EngineConfig, LoadReport};
