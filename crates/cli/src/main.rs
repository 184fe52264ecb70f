//! Shardline CLI: dump and load JSON documents through files or FIFOs.
//!
//! ```text
//! shardline dump --input data.json --channel /tmp/run.manifest --workers 4
//! shardline load --channel /tmp/run.manifest --output copy.json --cleanup
//! shardline plan --input data.json --workers 4
//! shardline clean --channel /tmp/run.manifest
//! ```
//!
//! Streaming mode needs two processes: create a FIFO with `mkfifo`, start
//! `load` on it, then `dump` into it.

mod commands;
mod parse;

use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::Path;
use std::process;

use shardline::shardline_partition::Partitioner;
use shardline::{ChannelMode, EngineConfig, Manifest, Marshaller, Payload};
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use commands::build_cli;
use parse::{matches_to_invocation, CliAction, Input};

fn main() {
    let matches = build_cli().get_matches();

    let invocation = match matches_to_invocation(&matches) {
        Ok(invocation) => invocation,
        Err(e) => {
            eprintln!("(error) {}", e);
            process::exit(1);
        }
    };

    init_logging(&invocation.config.log_level);

    let code = match run(invocation.action, invocation.config) {
        Ok(()) => 0,
        Err(e) => {
            eprintln!("(error) {}", e);
            1
        }
    };
    process::exit(code);
}

/// Log to stderr; `RUST_LOG` overrides the configured level.
fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(filter)
        .init();
}

fn run(action: CliAction, config: EngineConfig) -> Result<(), String> {
    match action {
        CliAction::Dump { input, channel } => {
            let payload = read_payload(&input)?;
            let marshaller = Marshaller::from_config(config).map_err(|e| e.to_string())?;
            let report = marshaller
                .dump_to(payload, &channel)
                .map_err(|e| e.to_string())?;
            for sink in report.manifest.sinks() {
                println!("{}", sink.display());
            }
            Ok(())
        }
        CliAction::Load { channel, output } => {
            let marshaller = Marshaller::from_config(config).map_err(|e| e.to_string())?;
            let payload = marshaller.load_from(&channel).map_err(|e| e.to_string())?;
            let json = payload.into_json();
            match output {
                Some(path) => {
                    let file = File::create(&path)
                        .map_err(|e| format!("Failed to create {}: {}", path.display(), e))?;
                    write_json(BufWriter::new(file), &json)
                }
                None => write_json(io::stdout().lock(), &json),
            }
        }
        CliAction::Plan { input } => {
            let payload = read_payload(&input)?;
            let partitioner = Partitioner::new(config.effective_workers()).map_err(|e| e.to_string())?;
            let plan = partitioner.plan(&payload).map_err(|e| e.to_string())?;
            for (index, bin) in plan.bins().iter().enumerate() {
                println!("bin {:>3}: {:>8} entries {:>12} bytes", index, bin.len(), bin.total);
            }
            println!(
                "{} entries in {} bins, spread {} bytes, largest entry {} bytes",
                plan.entries(),
                plan.bins().len(),
                plan.spread(),
                plan.largest()
            );
            Ok(())
        }
        CliAction::Clean { channel } => {
            let removed = clean(&channel)?;
            info!(removed, "Removed sinks");
            println!("{}", removed);
            Ok(())
        }
    }
}

fn read_payload(input: &Input) -> Result<Payload, String> {
    let mut text = String::new();
    match input {
        Input::Stdin => io::stdin().read_to_string(&mut text),
        Input::File(path) => BufReader::new(
            File::open(path).map_err(|e| format!("Failed to open {}: {}", path.display(), e))?,
        )
        .read_to_string(&mut text),
    }
    .map_err(|e| format!("Failed to read input: {}", e))?;
    let json: serde_json::Value =
        serde_json::from_str(&text).map_err(|e| format!("Invalid JSON input: {}", e))?;
    Payload::from_json(json).map_err(|e| e.to_string())
}

fn write_json(mut out: impl Write, json: &serde_json::Value) -> Result<(), String> {
    serde_json::to_writer_pretty(&mut out, json).map_err(|e| e.to_string())?;
    writeln!(out).map_err(|e| e.to_string())?;
    out.flush().map_err(|e| e.to_string())
}

/// Remove the sinks a disk-mode manifest lists.
///
/// A FIFO channel cannot be inspected without consuming it.
fn clean(channel: &Path) -> Result<usize, String> {
    match ChannelMode::detect(channel).map_err(|e| e.to_string())? {
        ChannelMode::Disk => {}
        ChannelMode::Streaming => {
            return Err(format!("{} is a FIFO; clean needs a disk-mode manifest", channel.display()))
        }
    }
    let text = fs::read_to_string(channel)
        .map_err(|e| format!("Failed to read {}: {}", channel.display(), e))?;
    let manifest = Manifest::parse(&text).map_err(|e| e.to_string())?;
    manifest.remove_sinks().map_err(|e| e.to_string())
}
