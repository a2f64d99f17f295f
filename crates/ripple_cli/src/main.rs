//! Ripple CLI: runs the decrementer testbench and its equivalence checks.
//!
//! Provides `ripple run` for a single simulation of one encoding,
//! `ripple verify` for comparing encodings against an external collaborator,
//! and `ripple variants` for listing the available encodings.

#![warn(missing_docs)]

mod project;
mod run;
mod verify;

use std::process;

use clap::{Parser, Subcommand, ValueEnum};
use ripple_bench::{DecVariant, EXIT_ERROR};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// Ripple: a delta-cycle simulator for a decrementing counter.
#[derive(Parser, Debug)]
#[command(name = "ripple", version, about = "Ripple decrementer testbench")]
pub struct Cli {
    /// Suppress all output except errors.
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Enable verbose (debug-level) output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to a `ripple.toml` file or a directory containing one.
    #[arg(long, global = true)]
    pub config: Option<String>,

    /// The subcommand to run.
    #[command(subcommand)]
    pub command: Command,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Simulate one encoding and print the checker trace.
    Run(RunArgs),
    /// Compare encodings against an external simulator.
    Verify(VerifyArgs),
    /// List the available encodings.
    Variants,
}

/// Arguments for the `ripple run` subcommand.
#[derive(Parser, Debug)]
pub struct RunArgs {
    /// Encoding to simulate.
    #[arg(long, default_value_t = DecVariant::Reference)]
    pub variant: DecVariant,

    /// Seed of the random enable sequence (overrides `bench.seed`).
    #[arg(long)]
    pub seed: Option<u64>,

    /// Counter range `[-n, n)` (overrides `bench.n`).
    #[arg(long)]
    pub n: Option<i64>,

    /// Write a VCD waveform to this path.
    #[arg(long)]
    pub vcd: Option<String>,

    /// Output format of the trace.
    #[arg(short, long, value_enum, default_value_t = ReportFormat::Text)]
    pub format: ReportFormat,
}

/// Arguments for the `ripple verify` subcommand.
#[derive(Parser, Debug)]
pub struct VerifyArgs {
    /// Encoding to check.
    #[arg(long, conflicts_with = "all")]
    pub variant: Option<DecVariant>,

    /// Check every encoding.
    #[arg(long)]
    pub all: bool,

    /// External re-simulation command, program first.
    #[arg(
        long,
        num_args = 1..,
        allow_hyphen_values = true,
        conflicts_with_all = ["trace_file", "against"]
    )]
    pub command: Option<Vec<String>>,

    /// Previously captured trace to compare against.
    #[arg(long, conflicts_with = "against")]
    pub trace_file: Option<String>,

    /// Native encoding to compare against.
    #[arg(long)]
    pub against: Option<DecVariant>,

    /// Seed of the random enable sequence (overrides `bench.seed`).
    #[arg(long)]
    pub seed: Option<u64>,

    /// Counter range `[-n, n)` (overrides `bench.n`).
    #[arg(long)]
    pub n: Option<i64>,
}

/// Trace output format.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum ReportFormat {
    /// One sample per line.
    Text,
    /// Machine-readable JSON output.
    Json,
}

/// Global settings derived from CLI flags.
pub struct GlobalArgs {
    /// Whether to suppress non-error output.
    pub quiet: bool,
    /// Whether to print verbose/debug information.
    pub verbose: bool,
    /// Optional path to a custom config file.
    pub config: Option<String>,
}

fn main() {
    let cli = Cli::parse();

    let global = GlobalArgs {
        quiet: cli.quiet,
        verbose: cli.verbose,
        config: cli.config,
    };
    init_tracing(&global);

    let result = match cli.command {
        Command::Run(ref args) => run::run(args, &global),
        Command::Verify(ref args) => verify::run(args, &global),
        Command::Variants => list_variants(),
    };

    match result {
        Ok(code) => process::exit(code),
        Err(e) => {
            eprintln!("error: {e}");
            process::exit(EXIT_ERROR);
        }
    }
}

/// Installs the stderr log subscriber. `RUST_LOG` wins over the flags.
fn init_tracing(global: &GlobalArgs) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_log_level(global)));

    let _ = tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .with(filter)
        .try_init();
}

fn default_log_level(global: &GlobalArgs) -> &'static str {
    if global.verbose {
        "debug"
    } else if global.quiet {
        "error"
    } else {
        "warn"
    }
}

fn list_variants() -> Result<i32, Box<dyn std::error::Error>> {
    for variant in DecVariant::ALL {
        println!("{:<20} {}", variant.name(), variant.description());
    }
    Ok(0)
}
