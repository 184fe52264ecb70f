//! Manifest: the ordered list of sink locations for one run.
//!
//! Wire format is newline-delimited UTF-8, one path per line, each followed by
//! `\n`. The manifest is the only thing that travels over the primary channel.
//!
//! Sink locations are derived from a base path by appending `_<index>`:
//!
//! ```text
//! /data/run.manifest   ->   /data/run.manifest_0
//!                           /data/run.manifest_1
//!                           ...
//! ```

use shardline_core::{Error, Result};
use std::ffi::OsString;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Location of sink `index` for a base path.
pub fn sink_path(base: &Path, index: usize) -> PathBuf {
    let mut name = OsString::from(base.as_os_str());
    name.push(format!("_{}", index));
    PathBuf::from(name)
}

/// Ordered sink locations
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Manifest {
    sinks: Vec<PathBuf>,
}

impl Manifest {
    /// Manifest from explicit sink locations.
    pub fn new(sinks: Vec<PathBuf>) -> Self {
        Self { sinks }
    }

    /// `count` sinks derived from `base`.
    pub fn for_base(base: &Path, count: usize) -> Self {
        Self {
            sinks: (0..count).map(|i| sink_path(base, i)).collect(),
        }
    }

    /// Sink locations in drain order
    pub fn sinks(&self) -> &[PathBuf] {
        &self.sinks
    }

    /// Number of sinks
    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    /// Check if manifest lists no sinks
    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }

    /// Encode as newline-delimited UTF-8.
    ///
    /// # Errors
    ///
    /// `Manifest` if a path is not valid UTF-8 or contains a newline.
    pub fn encode(&self) -> Result<String> {
        let mut out = String::new();
        for sink in &self.sinks {
            let text = sink.to_str().ok_or_else(|| {
                Error::Manifest(format!("sink path is not valid UTF-8: {}", sink.display()))
            })?;
            if text.contains('\n') || text.contains('\r') {
                return Err(Error::Manifest(format!(
                    "sink path contains a line break: {:?}",
                    text
                )));
            }
            out.push_str(text);
            out.push('\n');
        }
        Ok(out)
    }

    /// Parse manifest text.
    ///
    /// Blank lines are ignored.
    ///
    /// # Errors
    ///
    /// `Manifest` if no sink is listed.
    pub fn parse(text: &str) -> Result<Self> {
        let sinks: Vec<PathBuf> = text
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(PathBuf::from)
            .collect();
        if sinks.is_empty() {
            return Err(Error::Manifest("manifest lists no sinks".to_string()));
        }
        Ok(Self { sinks })
    }

    /// Remove every sink that still exists.
    ///
    /// Returns how many were removed. Missing sinks are skipped.
    pub fn remove_sinks(&self) -> Result<usize> {
        let mut removed = 0;
        for sink in &self.sinks {
            match fs::remove_file(sink) {
                Ok(()) => removed += 1,
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
        }
        debug!(removed, total = self.sinks.len(), "Removed sinks");
        Ok(removed)
    }
}
