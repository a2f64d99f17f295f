//! `ripple verify`: compare encodings against an external simulator.
//!
//! The collaborator comes from the flags when one is given, then from the
//! `[verify]` section, and falls back to the native `dec-ref` encoding.
//! The exit code is the worst outcome over all checked encodings.

use ripple_bench::{
    exit_code, run_equivalence_check, BenchParams, CommandSimulator, DecVariant,
    ExternalSimulator, TraceFileSimulator, VariantSimulator, EXIT_MATCH,
};
use ripple_config::VerifyConfig;

use crate::project::{bench_params, load_project_config};
use crate::{GlobalArgs, VerifyArgs};

/// Runs the `ripple verify` command.
///
/// Returns 0 when every trace matches, 1 when any differs and 2 when a
/// simulation or the collaborator failed.
pub fn run(args: &VerifyArgs, global: &GlobalArgs) -> Result<i32, Box<dyn std::error::Error>> {
    let config = load_project_config(global)?;
    let params = bench_params(&config.bench, args.seed, args.n);
    let mut external = select_external(args, &config.verify)?;

    let variants: Vec<DecVariant> = if args.all {
        DecVariant::ALL.to_vec()
    } else {
        vec![args.variant.unwrap_or(DecVariant::Reference)]
    };

    if !global.quiet {
        eprintln!(
            "   Verifying {} encoding(s) against {}",
            variants.len(),
            external.name()
        );
    }
    Ok(check_variants(&variants, &params, external.as_mut(), global.quiet))
}

/// Picks the collaborator: flags first, then `[verify]`, then `dec-ref`.
fn select_external(
    args: &VerifyArgs,
    config: &VerifyConfig,
) -> Result<Box<dyn ExternalSimulator>, Box<dyn std::error::Error>> {
    if let Some(argv) = &args.command {
        return Ok(Box::new(CommandSimulator::from_argv(argv)?));
    }
    if let Some(path) = &args.trace_file {
        return Ok(Box::new(TraceFileSimulator::new(path)));
    }
    if let Some(variant) = args.against {
        return Ok(Box::new(VariantSimulator::new(variant)));
    }
    if let Some(argv) = &config.command {
        return Ok(Box::new(CommandSimulator::from_argv(argv)?));
    }
    if let Some(path) = &config.trace_file {
        return Ok(Box::new(TraceFileSimulator::new(path)));
    }
    Ok(Box::new(VariantSimulator::default()))
}

/// Checks each variant once and returns the worst exit code.
fn check_variants(
    variants: &[DecVariant],
    params: &BenchParams,
    external: &mut dyn ExternalSimulator,
    quiet: bool,
) -> i32 {
    let mut worst = EXIT_MATCH;
    for &variant in variants {
        let result = run_equivalence_check(variant, params, external);
        let code = exit_code(&result);
        match &result {
            Ok(report) => match &report.mismatch {
                None if !quiet => {
                    println!("ok       {variant} ({} samples)", report.native.len())
                }
                None => {}
                Some(mismatch) => println!("MISMATCH {variant}: {mismatch}"),
            },
            Err(e) => println!("FAILED   {variant}: {e}"),
        }
        worst = worst.max(code);
    }
    worst
}
