//! ArgMatches → CliAction conversion.
//!
//! Global flags are folded into one `EngineConfig`: the `--config` file
//! first, then command-line overrides on top.

use clap::ArgMatches;
use shardline::EngineConfig;
use std::path::PathBuf;
use std::time::Duration;

/// Where a JSON document comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    /// Read from standard input
    Stdin,
    /// Read from a file
    File(PathBuf),
}

/// One parsed invocation.
#[derive(Debug, Clone, PartialEq)]
pub enum CliAction {
    /// Dump a JSON document through a primary channel
    Dump { input: Input, channel: PathBuf },
    /// Load from a primary channel and print JSON
    Load { channel: PathBuf, output: Option<PathBuf> },
    /// Print the partition plan for a JSON document
    Plan { input: Input },
    /// Remove the sinks of a disk-mode manifest
    Clean { channel: PathBuf },
}

/// Parsed invocation plus the configuration it runs with.
#[derive(Debug, Clone)]
pub struct Invocation {
    pub action: CliAction,
    pub config: EngineConfig,
}

/// Convert clap ArgMatches into an invocation.
pub fn matches_to_invocation(matches: &ArgMatches) -> Result<Invocation, String> {
    let (sub_name, m) = matches
        .subcommand()
        .ok_or_else(|| "No command provided".to_string())?;

    let mut config = match m.get_one::<String>("config") {
        Some(path) => EngineConfig::load_from(&PathBuf::from(path))
            .map_err(|e| format!("Failed to load config: {}", e))?,
        None => EngineConfig::default(),
    };
    if let Some(level) = m.get_one::<String>("log-level") {
        config.log_level = level.clone();
    }
    if let Some(raw) = m.get_one::<String>("timeout-ms") {
        let ms = parse_number(raw, "timeout")?;
        config = config.wait_timeout((ms > 0).then(|| Duration::from_millis(ms)));
    }

    let action = match sub_name {
        "dump" => {
            apply_workers(m, &mut config)?;
            apply_backend(m, &mut config);
            if let Some(base) = m.get_one::<String>("sink-base") {
                config = config.sink_base(base);
            }
            if m.get_flag("oversubscribe") {
                config = config.allow_oversubscription(true);
            }
            CliAction::Dump {
                input: input(m),
                channel: required_path(m, "channel")?,
            }
        }
        "load" => {
            apply_backend(m, &mut config);
            if m.get_flag("cleanup") {
                config = config.remove_sinks_after_load(true);
            }
            CliAction::Load {
                channel: required_path(m, "channel")?,
                output: m.get_one::<String>("output").map(PathBuf::from),
            }
        }
        "plan" => {
            apply_workers(m, &mut config)?;
            CliAction::Plan { input: input(m) }
        }
        "clean" => CliAction::Clean {
            channel: required_path(m, "channel")?,
        },
        other => return Err(format!("Unknown command: {}", other)),
    };

    Ok(Invocation { action, config })
}

fn parse_number(raw: &str, what: &str) -> Result<u64, String> {
    raw.parse::<u64>()
        .map_err(|e| format!("Invalid {}: {} ({})", what, raw, e))
}

fn apply_workers(m: &ArgMatches, config: &mut EngineConfig) -> Result<(), String> {
    if let Some(raw) = m.get_one::<String>("workers") {
        let workers = parse_number(raw, "worker count")? as usize;
        *config = config.clone().workers(workers);
    }
    Ok(())
}

fn apply_backend(m: &ArgMatches, config: &mut EngineConfig) {
    if let Some(name) = m.get_one::<String>("backend") {
        config.backend = name.clone();
    }
}

fn input(m: &ArgMatches) -> Input {
    match m.get_one::<String>("input").map(String::as_str) {
        None | Some("-") => Input::Stdin,
        Some(path) => Input::File(PathBuf::from(path)),
    }
}

fn required_path(m: &ArgMatches, name: &str) -> Result<PathBuf, String> {
    m.get_one::<String>(name)
        .map(PathBuf::from)
        .ok_or_else(|| format!("Missing --{}", name))
}
