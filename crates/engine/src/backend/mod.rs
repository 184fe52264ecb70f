//! Serialization backends.
//!
//! A backend turns one [`Shard`] into bytes on a writer and back. Every
//! worker of a run and the loader must use the same backend; nothing on the
//! wire records which one was used.
//!
//! | Name | Crate | Notes |
//! |------|-------|-------|
//! | `bincode` | bincode | default, compact |
//! | `msgpack` / `messagepack` | rmp-serde | self-describing |
//! | `json` | serde_json | readable; non-finite floats do not survive |

mod bincode;
mod json;
mod msgpack;

pub use self::bincode::BincodeBackend;
pub use self::json::JsonBackend;
pub use self::msgpack::MsgpackBackend;

use shardline_core::{Error, Result, Shard};
use std::fmt;
use std::io::{self, Read, Write};
use std::sync::Arc;

/// Backend used when none is configured.
pub const DEFAULT_BACKEND: &str = "bincode";

/// Names accepted by [`resolve`].
pub const BACKEND_NAMES: &[&str] = &["bincode", "msgpack", "messagepack", "json"];

/// Shard serializer.
///
/// `dump` and `load` must be inverse: `load` reads exactly what `dump` wrote
/// and nothing more. I/O failures of the underlying handle (including
/// timeouts and cancellation) must surface as I/O errors, not as encoding
/// errors.
pub trait Backend: Send + Sync + fmt::Debug {
    /// Registry name
    fn name(&self) -> &'static str;

    /// Serialize one shard.
    fn dump(&self, shard: &Shard, out: &mut dyn Write) -> Result<()>;

    /// Deserialize one shard.
    fn load(&self, input: &mut dyn Read) -> Result<Shard>;

    /// Serialize into memory.
    fn encode(&self, shard: &Shard) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        self.dump(shard, &mut buf)?;
        Ok(buf)
    }
}

/// Look up a backend by name (case-insensitive).
///
/// # Errors
///
/// `UnknownBackend` if no backend has this name.
pub fn resolve(name: &str) -> Result<Arc<dyn Backend>> {
    match name.to_ascii_lowercase().as_str() {
        "bincode" => Ok(Arc::new(BincodeBackend)),
        "msgpack" | "messagepack" => Ok(Arc::new(MsgpackBackend)),
        "json" => Ok(Arc::new(JsonBackend)),
        _ => Err(Error::UnknownBackend(name.to_string())),
    }
}

/// Wraps the handle a backend works on and keeps the first real I/O error.
///
/// Encoding crates flatten I/O errors into their own error types; the trapped
/// error lets timeouts and cancellation come back out intact.
pub(crate) struct IoTrap<T> {
    inner: T,
    error: Option<io::Error>,
}

impl<T> IoTrap<T> {
    pub(crate) fn new(inner: T) -> Self {
        Self { inner, error: None }
    }

    fn trap(&mut self, e: io::Error) -> io::Error {
        if e.kind() == io::ErrorKind::Interrupted {
            return e;
        }
        let echo = io::Error::new(e.kind(), e.to_string());
        self.error.get_or_insert(e);
        echo
    }

    /// Error for a failed dump.
    pub(crate) fn encode_failure(&mut self, e: impl fmt::Display) -> Error {
        match self.error.take() {
            Some(io) => Error::from(io),
            None => Error::Serialization(e.to_string()),
        }
    }

    /// Error for a failed load. A clean end of input mid-shard is corruption.
    pub(crate) fn decode_failure(&mut self, e: impl fmt::Display) -> Error {
        match self.error.take() {
            Some(io) => Error::from(io),
            None => Error::Deserialize(e.to_string()),
        }
    }
}

impl<T: Write> Write for IoTrap<T> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.inner.write(buf).map_err(|e| self.trap(e))
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush().map_err(|e| self.trap(e))
    }
}

impl<T: Read> Read for IoTrap<T> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.inner.read(buf).map_err(|e| self.trap(e))
    }
}
