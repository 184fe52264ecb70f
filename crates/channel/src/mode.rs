//! Channel mode detection.
//!
//! The primary channel's file type decides how every later step blocks:
//!
//! | Mode | File type | Open | Write |
//! |------|-----------|------|-------|
//! | Disk | regular file | never blocks | never blocks on a peer |
//! | Streaming | FIFO | blocks until the peer opens | blocks when the pipe buffer is full |
//!
//! Detection uses `stat`, never `open`: opening a FIFO would itself block.

use shardline_core::{Error, Result};
use std::fs::{self, File, FileType, Metadata};
use std::io;
use std::os::unix::fs::FileTypeExt;
use std::path::Path;

/// How a run moves bytes between processes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelMode {
    /// Primary channel and sinks are regular files
    Disk,
    /// Primary channel and sinks are named pipes
    Streaming,
}

impl ChannelMode {
    /// Classify a path without opening it.
    ///
    /// A path that does not exist yet is a disk channel: it is created as a
    /// regular file when the manifest is published.
    pub fn detect(path: &Path) -> Result<Self> {
        match fs::metadata(path) {
            Ok(meta) => Self::of_metadata(path, &meta),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(ChannelMode::Disk),
            Err(e) => Err(e.into()),
        }
    }

    /// Classify an already open handle.
    pub fn of_file(file: &File) -> Result<Self> {
        let meta = file.metadata()?;
        Self::of_metadata(Path::new("<handle>"), &meta)
    }

    /// Classify from metadata; `path` only labels the error.
    pub fn of_metadata(path: &Path, meta: &Metadata) -> Result<Self> {
        let file_type = meta.file_type();
        if file_type.is_file() {
            Ok(ChannelMode::Disk)
        } else if file_type.is_fifo() {
            Ok(ChannelMode::Streaming)
        } else {
            Err(Error::UnsupportedChannel {
                path: path.to_path_buf(),
                file_type: describe(&file_type),
            })
        }
    }

    /// Whether opening a channel in this mode waits for a peer.
    pub fn blocks_on_open(&self) -> bool {
        matches!(self, ChannelMode::Streaming)
    }

    /// Lowercase name for logs
    pub fn as_str(&self) -> &'static str {
        match self {
            ChannelMode::Disk => "disk",
            ChannelMode::Streaming => "streaming",
        }
    }
}

impl std::fmt::Display for ChannelMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

fn describe(file_type: &FileType) -> &'static str {
    if file_type.is_dir() {
        "directory"
    } else if file_type.is_socket() {
        "socket"
    } else if file_type.is_char_device() {
        "character device"
    } else if file_type.is_block_device() {
        "block device"
    } else if file_type.is_symlink() {
        "symbolic link"
    } else {
        "unknown file type"
    }
}
