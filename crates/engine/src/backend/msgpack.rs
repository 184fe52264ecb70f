use super::{Backend, IoTrap};
use shardline_core::{Result, Shard};
use std::io::{Read, Write};

/// MessagePack encoding via `rmp-serde`.
#[derive(Debug, Clone, Copy, Default)]
pub struct MsgpackBackend;

impl Backend for MsgpackBackend {
    fn name(&self) -> &'static str {
        "msgpack"
    }

    fn dump(&self, shard: &Shard, out: &mut dyn Write) -> Result<()> {
        let mut out = IoTrap::new(out);
        rmp_serde::encode::write(&mut out, shard).map_err(|e| out.encode_failure(e))
    }

    fn load(&self, input: &mut dyn Read) -> Result<Shard> {
        let mut input = IoTrap::new(input);
        rmp_serde::decode::from_read(&mut input).map_err(|e| input.decode_failure(e))
    }
}
