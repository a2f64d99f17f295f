//! Equivalence checking against an external simulator.
//!
//! The native bench is run once, the external collaborator is asked once
//! for its trace of the same variant and parameters, and the two traces are
//! diffed. A mismatch never aborts the check: both traces are produced in
//! full and the whole diff is reported.

use std::path::PathBuf;
use std::process::Command;

use serde::Serialize;
use tracing::{error, info, warn};

use crate::bench::{run_bench, BenchParams};
use crate::dec::DecVariant;
use crate::error::BenchError;
use crate::trace::{Trace, TraceMismatch};

/// Exit code for matching traces.
pub const EXIT_MATCH: i32 = 0;
/// Exit code for differing traces.
pub const EXIT_MISMATCH: i32 = 1;
/// Exit code for engine or collaborator failures.
pub const EXIT_ERROR: i32 = 2;

/// Something that can produce a trace for a variant from outside the
/// native engine, typically by converting the design and re-simulating it.
pub trait ExternalSimulator {
    /// Name used in reports and errors.
    fn name(&self) -> &str;

    /// Produces the external trace.
    fn simulate(&mut self, variant: DecVariant, params: &BenchParams)
        -> Result<Trace, BenchError>;
}

/// Runs a user-supplied command and parses its standard output as a trace.
///
/// The bench parameters are passed in `RIPPLE_*` environment variables.
#[derive(Clone, Debug)]
pub struct CommandSimulator {
    program: String,
    args: Vec<String>,
}

impl CommandSimulator {
    /// Creates a simulator running `program` with `args`.
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    /// Creates a simulator from a full command line, program first.
    pub fn from_argv(argv: &[String]) -> Result<Self, BenchError> {
        let (program, args) = argv.split_first().ok_or_else(|| BenchError::InvalidParameter {
            name: "command",
            reason: "empty command line".into(),
        })?;
        Ok(Self::new(program.clone(), args.to_vec()))
    }

    fn env(variant: DecVariant, params: &BenchParams) -> Vec<(&'static str, String)> {
        vec![
            ("RIPPLE_VARIANT", variant.name().to_string()),
            ("RIPPLE_N", params.n.to_string()),
            ("RIPPLE_SEED", params.seed.to_string()),
            ("RIPPLE_HALF_PERIOD", params.half_period.to_string()),
            ("RIPPLE_WARMUP_CYCLES", params.warmup_cycles.to_string()),
            ("RIPPLE_RANDOM_CYCLES", params.random_cycles.to_string()),
            ("RIPPLE_SAMPLE_DELAY", params.sample_delay.to_string()),
        ]
    }
}

impl ExternalSimulator for CommandSimulator {
    fn name(&self) -> &str {
        &self.program
    }

    fn simulate(
        &mut self,
        variant: DecVariant,
        params: &BenchParams,
    ) -> Result<Trace, BenchError> {
        let output = Command::new(&self.program)
            .args(&self.args)
            .envs(Self::env(variant, params))
            .output()
            .map_err(|e| BenchError::External {
                tool: self.program.clone(),
                reason: format!("cannot start: {e}"),
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(BenchError::External {
                tool: self.program.clone(),
                reason: format!("{}: {}", output.status, stderr.trim()),
            });
        }
        Trace::parse(&String::from_utf8_lossy(&output.stdout))
    }
}

/// Reads a previously captured trace file.
#[derive(Clone, Debug)]
pub struct TraceFileSimulator {
    path: PathBuf,
    name: String,
}

impl TraceFileSimulator {
    /// Creates a simulator that replays `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let name = path.display().to_string();
        Self { path, name }
    }
}

impl ExternalSimulator for TraceFileSimulator {
    fn name(&self) -> &str {
        &self.name
    }

    fn simulate(&mut self, _variant: DecVariant, _params: &BenchParams) -> Result<Trace, BenchError> {
        Trace::read_file(&self.path)
    }
}

/// Runs the native bench with another variant, for cross-variant checks.
#[derive(Clone, Debug)]
pub struct VariantSimulator {
    variant: DecVariant,
    name: String,
}

impl VariantSimulator {
    /// Compares against `variant`.
    pub fn new(variant: DecVariant) -> Self {
        Self {
            variant,
            name: format!("native:{variant}"),
        }
    }
}

impl Default for VariantSimulator {
    fn default() -> Self {
        Self::new(DecVariant::Reference)
    }
}

impl ExternalSimulator for VariantSimulator {
    fn name(&self) -> &str {
        &self.name
    }

    fn simulate(&mut self, _variant: DecVariant, params: &BenchParams) -> Result<Trace, BenchError> {
        run_bench(self.variant, params)
    }
}

/// The outcome of one equivalence check.
#[derive(Clone, Debug, Serialize)]
pub struct EquivalenceReport {
    /// Variant under test.
    pub variant: DecVariant,
    /// Name of the external collaborator.
    pub external: String,
    /// Trace of the native run.
    pub native: Trace,
    /// Trace produced by the collaborator.
    pub external_trace: Trace,
    /// The first difference, if any.
    pub mismatch: Option<TraceMismatch>,
}

impl EquivalenceReport {
    /// Returns `true` when both traces are identical.
    pub fn is_match(&self) -> bool {
        self.mismatch.is_none()
    }
}

/// Runs `variant` natively and through `external`, then diffs the traces.
///
/// The collaborator is invoked exactly once.
pub fn run_equivalence_check(
    variant: DecVariant,
    params: &BenchParams,
    external: &mut dyn ExternalSimulator,
) -> Result<EquivalenceReport, BenchError> {
    let native = run_bench(variant, params)?;
    let external_trace = external.simulate(variant, params)?;
    let mismatch = native.diff(&external_trace);

    match &mismatch {
        None => info!(%variant, external = external.name(), samples = native.len(), "traces match"),
        Some(m) => warn!(%variant, external = external.name(), "{m}"),
    }
    Ok(EquivalenceReport {
        variant,
        external: external.name().to_string(),
        native,
        external_trace,
        mismatch,
    })
}

/// Maps a check result to a process exit code.
pub fn exit_code(result: &Result<EquivalenceReport, BenchError>) -> i32 {
    match result {
        Ok(report) if report.is_match() => EXIT_MATCH,
        Ok(_) => EXIT_MISMATCH,
        Err(e) => {
            error!("{e}");
            EXIT_ERROR
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small() -> BenchParams {
        BenchParams {
            n: 8,
            warmup_cycles: 20,
            random_cycles: 20,
            ..BenchParams::default()
        }
    }

    /// Replays a fixed trace and counts its invocations.
    struct Stub {
        trace: Trace,
        calls: usize,
    }

    impl ExternalSimulator for Stub {
        fn name(&self) -> &str {
            "stub"
        }

        fn simulate(&mut self, _: DecVariant, _: &BenchParams) -> Result<Trace, BenchError> {
            self.calls += 1;
            Ok(self.trace.clone())
        }
    }

    struct Failing;

    impl ExternalSimulator for Failing {
        fn name(&self) -> &str {
            "failing"
        }

        fn simulate(&mut self, _: DecVariant, _: &BenchParams) -> Result<Trace, BenchError> {
            Err(BenchError::External {
                tool: "failing".into(),
                reason: "compile error".into(),
            })
        }
    }

    #[test]
    fn matching_stub_exits_zero_and_is_called_once() {
        let p = small();
        let mut stub = Stub {
            trace: run_bench(DecVariant::Reference, &p).unwrap(),
            calls: 0,
        };
        let result = run_equivalence_check(DecVariant::Shadow, &p, &mut stub);
        assert_eq!(exit_code(&result), EXIT_MATCH);
        assert_eq!(stub.calls, 1);
        assert_eq!(result.unwrap().external, "stub");
    }

    #[test]
    fn perturbed_stub_reports_cycle() {
        let p = small();
        let mut samples = run_bench(DecVariant::Reference, &p)
            .unwrap()
            .samples()
            .to_vec();
        samples[17] += 1;
        let mut stub = Stub {
            trace: Trace::new(samples),
            calls: 0,
        };
        let result = run_equivalence_check(DecVariant::Reference, &p, &mut stub);
        assert_eq!(exit_code(&result), EXIT_MISMATCH);
        let mismatch = result.unwrap().mismatch.unwrap();
        assert_eq!(mismatch.cycle, 17);
        assert_eq!(mismatch.mismatches, 1);
    }

    #[test]
    fn collaborator_error_exits_two() {
        let result = run_equivalence_check(DecVariant::Direct, &small(), &mut Failing);
        assert_eq!(exit_code(&result), EXIT_ERROR);
        assert!(matches!(result, Err(BenchError::External { .. })));
    }

    #[test]
    fn engine_error_exits_two() {
        let p = BenchParams {
            n: 0,
            ..small()
        };
        let result = run_equivalence_check(DecVariant::Direct, &p, &mut VariantSimulator::default());
        assert_eq!(exit_code(&result), EXIT_ERROR);
    }

    #[test]
    fn variant_simulator_compares_variants() {
        let mut reference = VariantSimulator::default();
        assert_eq!(reference.name(), "native:dec-ref");
        for v in DecVariant::ALL {
            let report = run_equivalence_check(v, &small(), &mut reference).unwrap();
            assert!(report.is_match(), "{v}");
        }
    }

    #[test]
    fn trace_file_simulator_replays_file() {
        let p = small();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("golden.trace");
        run_bench(DecVariant::Reference, &p)
            .unwrap()
            .write_file(&path)
            .unwrap();
        let mut sim = TraceFileSimulator::new(&path);
        let result = run_equivalence_check(DecVariant::Function, &p, &mut sim);
        assert_eq!(exit_code(&result), EXIT_MATCH);
    }

    #[test]
    fn missing_trace_file_is_an_error() {
        let mut sim = TraceFileSimulator::new("/nonexistent/ripple.trace");
        let result = run_equivalence_check(DecVariant::Function, &small(), &mut sim);
        assert!(matches!(result, Err(BenchError::Io(_))));
    }

    #[test]
    fn command_env_carries_parameters() {
        let env = CommandSimulator::env(DecVariant::Closure, &small());
        assert!(env.contains(&("RIPPLE_VARIANT", "dec-task-free-var".to_string())));
        assert!(env.contains(&("RIPPLE_N", "8".to_string())));
        assert!(env.contains(&("RIPPLE_SEED", "2".to_string())));
        assert_eq!(env.len(), 7);
    }

    #[test]
    fn empty_command_line_is_rejected() {
        assert!(CommandSimulator::from_argv(&[]).is_err());
        let sim = CommandSimulator::from_argv(&["sh".to_string(), "-c".to_string()]).unwrap();
        assert_eq!(sim.name(), "sh");
    }

    #[cfg(unix)]
    #[test]
    fn command_simulator_parses_stdout() {
        let mut sim = CommandSimulator::new(
            "sh",
            vec!["-c".into(), "echo 0; echo; echo $RIPPLE_N".into()],
        );
        let trace = sim.simulate(DecVariant::Reference, &small()).unwrap();
        assert_eq!(trace.samples(), &[0, 8]);
    }

    #[cfg(unix)]
    #[test]
    fn command_failure_is_external_error() {
        let mut sim = CommandSimulator::new("sh", vec!["-c".into(), "echo boom >&2; exit 3".into()]);
        let err = sim.simulate(DecVariant::Reference, &small()).unwrap_err();
        match err {
            BenchError::External { tool, reason } => {
                assert_eq!(tool, "sh");
                assert!(reason.contains("boom"), "{reason}");
            }
            other => panic!("expected external error, got {other:?}"),
        }
    }
}
