//! Sink creation.
//!
//! Every sink exists before any worker starts: an empty regular file in disk
//! mode, a FIFO in streaming mode. For FIFOs this ordering is mandatory, the
//! loader must be able to open every sink listed in the manifest even if its
//! worker has not been scheduled yet.

use crate::manifest::Manifest;
use crate::mode::ChannelMode;
use nix::sys::stat::Mode;
use nix::unistd::mkfifo;
use shardline_core::{Error, Result};
use std::fs::{self, OpenOptions};
use std::io;
use std::path::Path;
use tracing::{debug, warn};

/// Create one sink. Fails if anything already exists at `path`.
pub fn create_sink(path: &Path, mode: ChannelMode) -> io::Result<()> {
    match mode {
        ChannelMode::Disk => {
            OpenOptions::new().write(true).create_new(true).open(path)?;
        }
        ChannelMode::Streaming => {
            mkfifo(path, Mode::S_IRUSR | Mode::S_IWUSR)?;
        }
    }
    Ok(())
}

/// Create every sink in the manifest.
///
/// All or nothing: on the first failure the sinks created so far are removed
/// and a `SinkCreation` error names the sink that could not be created.
pub fn create_sinks(manifest: &Manifest, mode: ChannelMode) -> Result<()> {
    for (index, sink) in manifest.sinks().iter().enumerate() {
        if let Err(source) = create_sink(sink, mode) {
            for created in &manifest.sinks()[..index] {
                if let Err(e) = fs::remove_file(created) {
                    warn!(path = %created.display(), error = %e, "Failed to remove sink after creation error");
                }
            }
            return Err(Error::SinkCreation {
                path: sink.clone(),
                source,
            });
        }
    }
    debug!(count = manifest.len(), mode = %mode, "Created sinks");
    Ok(())
}
