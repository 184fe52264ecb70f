//! Clap command tree.

use clap::{Arg, ArgAction, Command};
use shardline::shardline_engine::backend::BACKEND_NAMES;

/// Build the `shardline` command.
pub fn build_cli() -> Command {
    Command::new("shardline")
        .about("Parallel scatter/gather marshalling over files and named pipes")
        .version(env!("CARGO_PKG_VERSION"))
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(
            Arg::new("config")
                .long("config")
                .short('c')
                .global(true)
                .value_name("TOML")
                .help("Engine configuration file"),
        )
        .arg(
            Arg::new("log-level")
                .long("log-level")
                .global(true)
                .value_name("LEVEL")
                .help("Log verbosity (error, warn, info, debug, trace); RUST_LOG wins"),
        )
        .arg(
            Arg::new("timeout-ms")
                .long("timeout-ms")
                .global(true)
                .value_name("MS")
                .help("Bound on each blocking wait in milliseconds, 0 for none"),
        )
        .subcommand(
            Command::new("dump")
                .about("Split a JSON document into shards and publish the manifest")
                .arg(input_arg())
                .arg(channel_arg())
                .arg(
                    Arg::new("sink-base")
                        .long("sink-base")
                        .value_name("PATH")
                        .help("Base path for sinks (streaming mode defaults to the channel path)"),
                )
                .arg(workers_arg())
                .arg(backend_arg())
                .arg(
                    Arg::new("oversubscribe")
                        .long("oversubscribe")
                        .action(ArgAction::SetTrue)
                        .help("Allow more workers than cores"),
                ),
        )
        .subcommand(
            Command::new("load")
                .about("Read a manifest, drain its sinks and print the merged JSON")
                .arg(channel_arg())
                .arg(
                    Arg::new("output")
                        .long("output")
                        .short('o')
                        .value_name("PATH")
                        .help("Write JSON here instead of stdout"),
                )
                .arg(backend_arg())
                .arg(
                    Arg::new("cleanup")
                        .long("cleanup")
                        .action(ArgAction::SetTrue)
                        .help("Remove the sinks after a successful load"),
                ),
        )
        .subcommand(
            Command::new("plan")
                .about("Show how a JSON document would be partitioned")
                .arg(input_arg())
                .arg(workers_arg()),
        )
        .subcommand(
            Command::new("clean")
                .about("Remove the sinks listed in a disk-mode manifest")
                .arg(channel_arg()),
        )
}

fn input_arg() -> Arg {
    Arg::new("input")
        .long("input")
        .short('i')
        .required(true)
        .value_name("JSON")
        .help("JSON file holding an object or array, - for stdin")
}

fn channel_arg() -> Arg {
    Arg::new("channel")
        .long("channel")
        .required(true)
        .value_name("PATH")
        .help("Primary channel: a regular file or a FIFO")
}

fn workers_arg() -> Arg {
    Arg::new("workers")
        .long("workers")
        .short('w')
        .value_name("N")
        .help("Number of shards and worker processes")
}

fn backend_arg() -> Arg {
    Arg::new("backend")
        .long("backend")
        .short('b')
        .value_name("NAME")
        .value_parser(BACKEND_NAMES.to_vec())
        .help("Serialization backend")
}
