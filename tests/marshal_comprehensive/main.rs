//! Marshal Comprehensive Test Suite
//!
//! End-to-end dumps and loads through the `Marshaller` facade, covering both
//! channel modes, every backend and the failure paths.
//!
//! ## Running Tests
//!
//! ```bash
//! # Run the whole suite
//! cargo test --test marshal_comprehensive
//!
//! # Streaming (FIFO) tests only
//! cargo test --test marshal_comprehensive streaming::
//! ```

use std::collections::HashMap;
use std::io::{Read, Write};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use nix::sys::stat::Mode;
use nix::unistd::mkfifo;
use shardline::prelude::*;
use shardline::shardline_engine::backend::BincodeBackend;
use shardline::shardline_engine::Backend;
use shardline::Shard;

// Test modules
pub mod channels;
pub mod failures;
pub mod partitioning;
pub mod streaming;

// =============================================================================
// SHARED TEST UTILITIES
// =============================================================================

/// Bound used by every test that could otherwise hang
pub const TEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Marshaller with exactly `workers` shards, regardless of core count
pub fn marshaller(workers: usize) -> Marshaller {
    Marshaller::builder()
        .workers(workers)
        .allow_oversubscription()
        .wait_timeout(TEST_TIMEOUT)
        .build()
        .expect("Failed to build marshaller")
}

/// Marshaller with a given backend name
pub fn marshaller_with_backend(workers: usize, backend: &str) -> Marshaller {
    Marshaller::builder()
        .workers(workers)
        .allow_oversubscription()
        .backend(backend)
        .wait_timeout(TEST_TIMEOUT)
        .build()
        .expect("Failed to build marshaller")
}

/// Create a FIFO at `path`
pub fn make_fifo(path: &Path) {
    mkfifo(path, Mode::S_IRUSR | Mode::S_IWUSR).expect("Failed to create FIFO");
}

/// Standard test values covering every variant
pub fn standard_test_values() -> Vec<(&'static str, Value)> {
    vec![
        ("null", Value::Null),
        ("bool_true", Value::Bool(true)),
        ("bool_false", Value::Bool(false)),
        ("int_pos", Value::Int(42)),
        ("int_neg", Value::Int(-42)),
        ("int_zero", Value::Int(0)),
        ("float_pos", Value::Float(3.14159)),
        ("float_neg", Value::Float(-2.71828)),
        ("string", Value::String("hello world".into())),
        ("string_unicode", Value::String("日本語 🌍".into())),
        ("string_empty", Value::String("".into())),
        ("bytes", Value::Bytes(vec![0x00, 0x01, 0xFF, 0xFE])),
        ("bytes_empty", Value::Bytes(vec![])),
        (
            "array",
            Value::Array(vec![Value::Int(1), Value::String("two".into())]),
        ),
        ("object", {
            let mut m = HashMap::new();
            m.insert("nested".to_string(), Value::Int(123));
            Value::Object(m)
        }),
    ]
}

/// Mapping with `n` entries of uneven sizes plus every value variant
pub fn sample_mapping(n: usize) -> Payload {
    let mut entries: Vec<(Key, Value)> = (0..n)
        .map(|i| (Key::Int(i as i64), Value::String("x".repeat(i % 37))))
        .collect();
    for (name, value) in standard_test_values() {
        entries.push((Key::from(name), value));
    }
    entries.into_iter().collect()
}

/// Sequence of `n` elements whose sizes do not follow their order
pub fn sample_sequence(n: usize) -> Payload {
    (0..n)
        .map(|i| match i % 3 {
            0 => Value::Int(i as i64),
            1 => Value::String("y".repeat((i * 7) % 50)),
            _ => Value::Array(vec![Value::Int(i as i64); i % 5]),
        })
        .collect::<Vec<_>>()
        .into()
}

/// Backend that refuses to encode any shard containing one key
#[derive(Debug)]
pub struct FailOnKey(pub Key);

impl Backend for FailOnKey {
    fn name(&self) -> &'static str {
        "fail-on-key"
    }

    fn dump(&self, shard: &Shard, out: &mut dyn Write) -> shardline::shardline_core::Result<()> {
        if let Shard::Mapping(entries) = shard {
            if entries.iter().any(|(k, _)| *k == self.0) {
                return Err(shardline::shardline_core::Error::Serialization(format!(
                    "refusing key {}",
                    self.0
                )));
            }
        }
        BincodeBackend.dump(shard, out)
    }

    fn load(&self, input: &mut dyn Read) -> shardline::shardline_core::Result<Shard> {
        BincodeBackend.load(input)
    }
}

/// Backend that panics while encoding
#[derive(Debug)]
pub struct Panicking;

impl Backend for Panicking {
    fn name(&self) -> &'static str {
        "panicking"
    }

    fn dump(&self, _shard: &Shard, _out: &mut dyn Write) -> shardline::shardline_core::Result<()> {
        panic!("backend exploded")
    }

    fn load(&self, input: &mut dyn Read) -> shardline::shardline_core::Result<Shard> {
        BincodeBackend.load(input)
    }
}

/// Backend that writes its bincode encoding in small flushed pieces, pausing
/// between them, so one shard takes longer than a short wait bound while
/// never stalling for that long
#[derive(Debug)]
pub struct Trickle {
    /// Number of pieces
    pub pieces: usize,
    /// Pause before each piece
    pub pause: Duration,
}

impl Backend for Trickle {
    fn name(&self) -> &'static str {
        "trickle"
    }

    fn dump(&self, shard: &Shard, out: &mut dyn Write) -> shardline::shardline_core::Result<()> {
        let bytes = BincodeBackend.encode(shard)?;
        let piece = (bytes.len() / self.pieces).max(1);
        for chunk in bytes.chunks(piece) {
            std::thread::sleep(self.pause);
            out.write_all(chunk)?;
            out.flush()?;
        }
        Ok(())
    }

    fn load(&self, input: &mut dyn Read) -> shardline::shardline_core::Result<Shard> {
        BincodeBackend.load(input)
    }
}

/// Marshaller using a custom backend instance
pub fn marshaller_with(workers: usize, backend: Arc<dyn Backend>) -> Marshaller {
    Marshaller::builder()
        .workers(workers)
        .allow_oversubscription()
        .custom_backend(backend)
        .wait_timeout(TEST_TIMEOUT)
        .build()
        .expect("Failed to build marshaller")
}

/// Trickling marshaller whose wait bound is shorter than one shard's transfer
pub fn trickling_marshaller(workers: usize) -> Marshaller {
    Marshaller::builder()
        .workers(workers)
        .allow_oversubscription()
        .custom_backend(Arc::new(Trickle {
            pieces: 25,
            pause: Duration::from_millis(40),
        }))
        .wait_timeout(Duration::from_millis(300))
        .build()
        .expect("Failed to build marshaller")
}
