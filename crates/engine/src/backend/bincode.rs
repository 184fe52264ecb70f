use super::{Backend, IoTrap};
use shardline_core::{Result, Shard};
use std::io::{Read, Write};

/// Compact binary encoding via `bincode`.
#[derive(Debug, Clone, Copy, Default)]
pub struct BincodeBackend;

impl Backend for BincodeBackend {
    fn name(&self) -> &'static str {
        "bincode"
    }

    fn dump(&self, shard: &Shard, out: &mut dyn Write) -> Result<()> {
        let mut out = IoTrap::new(out);
        ::bincode::serialize_into(&mut out, shard).map_err(|e| out.encode_failure(e))
    }

    fn load(&self, input: &mut dyn Read) -> Result<Shard> {
        let mut input = IoTrap::new(input);
        ::bincode::deserialize_from(&mut input).map_err(|e| input.decode_failure(e))
    }
}
