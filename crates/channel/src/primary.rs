//! Primary channel: where the manifest travels.
//!
//! The dump side publishes the manifest once and closes the channel; the load
//! side receives the whole manifest text before touching any sink. Two
//! implementations cover the common cases:
//!
//! - [`FileChannel`]: a path to a regular file or FIFO, opened lazily with
//!   bounded waits.
//! - [`HandleChannel`]: an already open handle, or any `Read`/`Write` value
//!   standing in for one. Waits are not enforced on it.

use crate::io::TimedFile;
use crate::manifest::Manifest;
use crate::mode::ChannelMode;
use shardline_core::{Error, Result, Wait};
use std::fs::File;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Dump side of the primary channel.
pub trait ManifestSink {
    /// Mode every sink of the run uses
    fn mode(&self) -> ChannelMode;

    /// Filesystem location of the channel, if it has one.
    fn location(&self) -> Option<&Path>;

    /// Write the manifest and close the channel.
    ///
    /// In streaming mode this waits for the loader to open the channel.
    fn publish(self, manifest: &Manifest, wait: &Wait) -> Result<()>;
}

/// Load side of the primary channel.
pub trait ManifestSource {
    /// Mode the sinks are expected in
    fn mode(&self) -> ChannelMode;

    /// Read the whole manifest and close the channel.
    fn receive(self, wait: &Wait) -> Result<Manifest>;
}

/// Primary channel addressed by path.
#[derive(Debug, Clone)]
pub struct FileChannel {
    path: PathBuf,
    mode: ChannelMode,
}

impl FileChannel {
    /// Classify `path` without opening it.
    ///
    /// # Errors
    ///
    /// `UnsupportedChannel` if the path is neither a regular file nor a FIFO.
    pub fn new(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let mode = ChannelMode::detect(&path)?;
        Ok(Self { path, mode })
    }

    /// Channel location
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ManifestSink for FileChannel {
    fn mode(&self) -> ChannelMode {
        self.mode
    }

    fn location(&self) -> Option<&Path> {
        Some(&self.path)
    }

    fn publish(self, manifest: &Manifest, wait: &Wait) -> Result<()> {
        let text = manifest.encode()?;
        let mut out = TimedFile::create_write(&self.path, wait)?;
        out.write_all(text.as_bytes())?;
        out.flush()?;
        debug!(path = %self.path.display(), sinks = manifest.len(), "Published manifest");
        Ok(())
    }
}

impl ManifestSource for FileChannel {
    fn mode(&self) -> ChannelMode {
        self.mode
    }

    fn receive(self, wait: &Wait) -> Result<Manifest> {
        let bytes = TimedFile::open_read(&self.path, wait)?.read_all()?;
        let manifest = decode(bytes)?;
        debug!(path = %self.path.display(), sinks = manifest.len(), "Received manifest");
        Ok(manifest)
    }
}

/// Primary channel wrapping an open handle.
///
/// The handle is used as is: a blocking FIFO handle blocks without a bound.
#[derive(Debug)]
pub struct HandleChannel<T> {
    handle: T,
    mode: ChannelMode,
    location: Option<PathBuf>,
}

impl<T> HandleChannel<T> {
    /// Wrap a handle whose mode is known to the caller.
    pub fn new(handle: T, mode: ChannelMode) -> Self {
        Self {
            handle,
            mode,
            location: None,
        }
    }

    /// Record where the handle lives, used as the default sink base.
    pub fn with_location(mut self, path: impl Into<PathBuf>) -> Self {
        self.location = Some(path.into());
        self
    }

    /// Give the handle back
    pub fn into_inner(self) -> T {
        self.handle
    }
}

impl HandleChannel<File> {
    /// Wrap an open file, detecting its mode from `fstat`.
    ///
    /// # Errors
    ///
    /// `UnsupportedChannel` if the handle is neither a regular file nor a pipe.
    pub fn from_file(file: File) -> Result<Self> {
        let mode = ChannelMode::of_file(&file)?;
        Ok(Self::new(file, mode))
    }
}

impl<T: Write> ManifestSink for HandleChannel<T> {
    fn mode(&self) -> ChannelMode {
        self.mode
    }

    fn location(&self) -> Option<&Path> {
        self.location.as_deref()
    }

    fn publish(mut self, manifest: &Manifest, _wait: &Wait) -> Result<()> {
        let text = manifest.encode()?;
        self.handle.write_all(text.as_bytes())?;
        self.handle.flush()?;
        debug!(sinks = manifest.len(), mode = %self.mode, "Published manifest to handle");
        Ok(())
    }
}

impl<T: Read> ManifestSource for HandleChannel<T> {
    fn mode(&self) -> ChannelMode {
        self.mode
    }

    fn receive(mut self, _wait: &Wait) -> Result<Manifest> {
        let mut bytes = Vec::new();
        self.handle.read_to_end(&mut bytes)?;
        decode(bytes)
    }
}

fn decode(bytes: Vec<u8>) -> Result<Manifest> {
    let text = String::from_utf8(bytes)
        .map_err(|e| Error::Manifest(format!("manifest is not valid UTF-8: {}", e)))?;
    Manifest::parse(&text)
}
