//! `ripple run`: simulate one encoding and print its trace.
//!
//! The checker's samples go to stdout, one per line or as a JSON document;
//! status lines go to stderr unless `--quiet` is set.

use ripple_bench::{run_bench_with, BenchRun};

use crate::project::{bench_params, load_project_config, sim_config};
use crate::{GlobalArgs, ReportFormat, RunArgs};

/// Runs the `ripple run` command.
///
/// Returns exit code 0 when the simulation finishes; engine failures are
/// reported as errors.
pub fn run(args: &RunArgs, global: &GlobalArgs) -> Result<i32, Box<dyn std::error::Error>> {
    let config = load_project_config(global)?;
    let params = bench_params(&config.bench, args.seed, args.n);
    let sim = sim_config(&config, args.vcd.as_deref());

    if !global.quiet {
        eprintln!("   Simulating {} (n = {}, seed = {})", args.variant, params.n, params.seed);
    }

    let result = run_bench_with(args.variant, &params, &sim)?;
    print!("{}", render(&result, args.format)?);

    if !global.quiet {
        eprintln!(
            "   Finished {} samples at {} ({} delta cycles)",
            result.trace.len(),
            result.final_time,
            result.total_deltas
        );
        if let Some(path) = &sim.waveform_path {
            eprintln!("   Waveform {}", path.display());
        }
    }
    Ok(0)
}

/// Formats a finished run for stdout.
fn render(result: &BenchRun, format: ReportFormat) -> Result<String, serde_json::Error> {
    match format {
        ReportFormat::Text => Ok(result.trace.to_string()),
        ReportFormat::Json => {
            let mut out = serde_json::to_string_pretty(result)?;
            out.push('\n');
            Ok(out)
        }
    }
}
