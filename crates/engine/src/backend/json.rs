use super::{Backend, IoTrap};
use shardline_core::{Result, Shard};
use std::io::{Read, Write};

/// JSON encoding via `serde_json`.
///
/// `load` reads to the end of its input: a shard must be alone in its sink.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonBackend;

impl Backend for JsonBackend {
    fn name(&self) -> &'static str {
        "json"
    }

    fn dump(&self, shard: &Shard, out: &mut dyn Write) -> Result<()> {
        let mut out = IoTrap::new(out);
        serde_json::to_writer(&mut out, shard).map_err(|e| out.encode_failure(e))
    }

    fn load(&self, input: &mut dyn Read) -> Result<Shard> {
        let mut input = IoTrap::new(input);
        serde_json::from_reader(&mut input).map_err(|e| input.decode_failure(e))
    }
}
