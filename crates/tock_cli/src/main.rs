//! Tock CLI: runs and inspects the built-in circuits.
//!
//! `tock list` shows the circuit catalog, `tock sim` clocks a circuit for a
//! number of cycles and writes a trace, and `tock tree` prints the elaborated
//! hierarchy.

#![warn(missing_docs)]

mod circuits;
mod list;
mod sim;
mod tree;

use std::path::Path;
use std::process;

use clap::{Parser, Subcommand, ValueEnum};
use tock_config::TockConfig;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Tock: a discrete-event digital logic simulator.
#[derive(Parser, Debug)]
#[command(name = "tock", version, about = "Tock logic simulator")]
pub struct Cli {
    /// Suppress all output except errors.
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Enable verbose (debug-level) output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to a custom `tock.toml` configuration file.
    #[arg(long, global = true)]
    pub config: Option<String>,

    /// The subcommand to run.
    #[command(subcommand)]
    pub command: Command,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// List the built-in circuits.
    List(ListArgs),
    /// Simulate a circuit for a number of clock cycles.
    Sim(SimArgs),
    /// Print the elaborated hierarchy of a circuit.
    Tree(TreeArgs),
}

/// Arguments for `tock list`.
#[derive(Parser, Debug)]
pub struct ListArgs {
    /// Print the catalog as JSON.
    #[arg(long)]
    pub json: bool,
}

/// Arguments for `tock sim`.
#[derive(Parser, Debug)]
pub struct SimArgs {
    /// Circuit name from `tock list`.
    pub circuit: String,

    /// Size parameter of the circuit (see `tock list`).
    #[arg(short, long)]
    pub param: Option<u64>,

    /// Number of full clock cycles (or ticks for circuits without a clock).
    #[arg(short, long, default_value_t = 16)]
    pub cycles: u64,

    /// Drive an input before running, as `name=value` (decimal, 0x, or 0b).
    #[arg(long = "set", value_parser = parse_assignment)]
    pub set: Vec<(String, u64)>,

    /// Trace output format; overrides `[trace] format`.
    #[arg(long, value_enum)]
    pub trace_format: Option<TraceFormatArg>,

    /// Trace output path; overrides `[trace] path`.
    #[arg(short, long)]
    pub output: Option<String>,
}

/// Arguments for `tock tree`.
#[derive(Parser, Debug)]
pub struct TreeArgs {
    /// Circuit name from `tock list`.
    pub circuit: String,

    /// Size parameter of the circuit.
    #[arg(short, long)]
    pub param: Option<u64>,

    /// Also list signals, memories, and processes.
    #[arg(long)]
    pub detail: bool,
}

/// Trace output format.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum TraceFormatArg {
    /// Value Change Dump (IEEE 1364).
    Vcd,
    /// JSON dump of the recorded changes.
    Json,
    /// No trace file.
    None,
}

/// Global settings derived from CLI flags.
pub struct GlobalArgs {
    /// Whether to suppress non-error output.
    pub quiet: bool,
    /// Optional path to a custom config file.
    pub config: Option<String>,
}

impl GlobalArgs {
    /// Loads the explicit config file, else `./tock.toml` if present, else defaults.
    pub fn load_config(&self) -> Result<TockConfig, tock_config::ConfigError> {
        match &self.config {
            Some(path) => tock_config::load_config_file(Path::new(path)),
            None if Path::new(tock_config::CONFIG_FILE_NAME).is_file() => {
                tock_config::load_config(Path::new("."))
            }
            None => Ok(TockConfig::default()),
        }
    }
}

/// Parses `name=value` where value is decimal, `0x` hex, or `0b` binary.
fn parse_assignment(s: &str) -> Result<(String, u64), String> {
    let (name, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected name=value, got '{s}'"))?;
    let value = value.trim().replace('_', "");
    let parsed = if let Some(hex) = value.strip_prefix("0x") {
        u64::from_str_radix(hex, 16)
    } else if let Some(bin) = value.strip_prefix("0b") {
        u64::from_str_radix(bin, 2)
    } else {
        value.parse()
    };
    let value = parsed.map_err(|e| format!("bad value in '{s}': {e}"))?;
    Ok((name.trim().to_string(), value))
}

fn init_logging(cli: &Cli) {
    let filter = if cli.quiet {
        "warn"
    } else if cli.verbose {
        "debug"
    } else {
        "info"
    };
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()))
        .with(tracing_subscriber::fmt::layer().without_time().with_writer(std::io::stderr))
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_logging(&cli);

    let global = GlobalArgs {
        quiet: cli.quiet,
        config: cli.config,
    };

    let result = match cli.command {
        Command::List(ref args) => list::run(args, &global),
        Command::Sim(ref args) => sim::run(args, &global),
        Command::Tree(ref args) => tree::run(args, &global),
    };

    match result {
        Ok(code) => process::exit(code),
        Err(e) => {
            eprintln!("error: {e}");
            process::exit(1);
        }
    }
}
