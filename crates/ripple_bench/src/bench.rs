//! Testbench orchestration around one decrementer instance.
//!
//! A [`Bench`] owns a fresh kernel with four signals (`count`, `enable`,
//! `clock`, `reset`), the FSM under test and four testbench processes:
//!
//! - a clock generator toggling every half period after an initial delay,
//! - a reset sequencer pulsing reset low for one clock period,
//! - a stimulus generator driving enable at falling clock edges, first a
//!   run of warm-up ones, then a seeded pseudo-random 0/1 sequence, and
//!   finally raising Stop,
//! - a checker printing `count` at reset release and shortly after every
//!   rising clock edge.
//!
//! The checker's printed lines form the run's [`Trace`].

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use ripple_sim::{
    EndReason, Process, ProcessContext, Signal, SimConfig, SimError, SimKernel, SimTime, Trigger,
    Wait,
};
use serde::Serialize;
use tracing::{debug, info};

use crate::dec::{DecVariant, ACTIVE_LOW, INACTIVE_HIGH};
use crate::error::BenchError;
use crate::trace::Trace;

/// Parameters of a bench run.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct BenchParams {
    /// Counter range is `[-n, n)`.
    pub n: i64,
    /// Ticks between clock toggles.
    pub half_period: u64,
    /// Cycles with enable held high after reset.
    pub warmup_cycles: usize,
    /// Cycles driven from the random enable sequence.
    pub random_cycles: usize,
    /// Seed of the random enable sequence.
    pub seed: u64,
    /// Ticks between a rising clock edge and the checker's sample.
    pub sample_delay: u64,
}

impl Default for BenchParams {
    fn default() -> Self {
        Self {
            n: 128,
            half_period: 10,
            warmup_cycles: 1000,
            random_cycles: 1000,
            seed: 2,
            sample_delay: 1,
        }
    }
}

impl BenchParams {
    /// Checks the parameters against each other.
    pub fn validate(&self) -> Result<(), BenchError> {
        if self.n <= 0 {
            return Err(BenchError::InvalidParameter {
                name: "n",
                reason: format!("must be positive, got {}", self.n),
            });
        }
        if self.half_period == 0 {
            return Err(BenchError::InvalidParameter {
                name: "half_period",
                reason: "must be at least one tick".into(),
            });
        }
        if self.sample_delay == 0 || self.sample_delay >= self.half_period {
            return Err(BenchError::InvalidParameter {
                name: "sample_delay",
                reason: format!(
                    "must lie in [1, {}) so samples land before the next clock edge, got {}",
                    self.half_period, self.sample_delay
                ),
            });
        }
        Ok(())
    }

    /// Number of samples a complete run produces.
    pub fn expected_samples(&self) -> usize {
        1 + self.warmup_cycles + self.random_cycles
    }
}

/// The random part of the enable stimulus.
///
/// Each entry is high with probability 4/5.
pub fn enable_sequence(seed: u64, len: usize) -> Vec<bool> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    (0..len).map(|_| rng.gen_range(0..5u32).min(1) == 1).collect()
}

/// Handles to the bench's signals.
#[derive(Clone, Copy, Debug)]
pub struct BenchSignals {
    /// FSM output.
    pub count: Signal<i64>,
    /// FSM enable input.
    pub enable: Signal<bool>,
    /// Clock.
    pub clock: Signal<bool>,
    /// Active-low asynchronous reset.
    pub reset: Signal<bool>,
}

struct ClockGen {
    clock: Signal<bool>,
    half_period: u64,
    started: bool,
}

impl Process for ClockGen {
    fn name(&self) -> &str {
        "clock_gen"
    }

    fn resume(&mut self, ctx: &mut ProcessContext<'_>) -> Result<Wait, SimError> {
        if self.started {
            let level = ctx.read(self.clock);
            ctx.commit(self.clock, !level)?;
        }
        self.started = true;
        Ok(Wait::Delay(self.half_period))
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum ResetPhase {
    Start,
    AwaitAssert,
    AwaitRelease,
}

struct ResetSequencer {
    reset: Signal<bool>,
    clock: Signal<bool>,
    phase: ResetPhase,
}

impl Process for ResetSequencer {
    fn name(&self) -> &str {
        "reset_seq"
    }

    fn resume(&mut self, ctx: &mut ProcessContext<'_>) -> Result<Wait, SimError> {
        let falling = Wait::On(vec![Trigger::negedge(self.clock)]);
        match self.phase {
            ResetPhase::Start => {
                ctx.commit(self.reset, INACTIVE_HIGH)?;
                self.phase = ResetPhase::AwaitAssert;
                Ok(falling)
            }
            ResetPhase::AwaitAssert => {
                ctx.commit(self.reset, ACTIVE_LOW)?;
                self.phase = ResetPhase::AwaitRelease;
                Ok(falling)
            }
            ResetPhase::AwaitRelease => {
                ctx.commit(self.reset, INACTIVE_HIGH)?;
                Ok(Wait::Done)
            }
        }
    }
}

struct Stimulus {
    enable: Signal<bool>,
    clock: Signal<bool>,
    reset: Signal<bool>,
    warmup_cycles: usize,
    enables: Vec<bool>,
    /// Next cycle to drive; `None` until reset has been released.
    cycle: Option<usize>,
}

impl Process for Stimulus {
    fn name(&self) -> &str {
        "stimulus"
    }

    fn resume(&mut self, ctx: &mut ProcessContext<'_>) -> Result<Wait, SimError> {
        let Some(cycle) = self.cycle else {
            self.cycle = Some(0);
            return Ok(Wait::On(vec![Trigger::posedge(self.reset)]));
        };

        let level = if cycle < self.warmup_cycles {
            Some(true)
        } else {
            self.enables.get(cycle - self.warmup_cycles).copied()
        };
        match level {
            Some(level) => {
                ctx.commit(self.enable, level)?;
                self.cycle = Some(cycle + 1);
                Ok(Wait::On(vec![Trigger::negedge(self.clock)]))
            }
            None => Ok(Wait::Stop),
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum CheckPhase {
    Start,
    AwaitResetAssert,
    AwaitResetRelease,
    AwaitClock,
    Settling,
}

struct Checker {
    count: Signal<i64>,
    clock: Signal<bool>,
    reset: Signal<bool>,
    sample_delay: u64,
    phase: CheckPhase,
}

impl Process for Checker {
    fn name(&self) -> &str {
        "check"
    }

    fn resume(&mut self, ctx: &mut ProcessContext<'_>) -> Result<Wait, SimError> {
        let (next, wait) = match self.phase {
            CheckPhase::Start => (
                CheckPhase::AwaitResetAssert,
                Wait::On(vec![Trigger::negedge(self.reset)]),
            ),
            CheckPhase::AwaitResetAssert => (
                CheckPhase::AwaitResetRelease,
                Wait::On(vec![Trigger::posedge(self.reset)]),
            ),
            CheckPhase::AwaitResetRelease | CheckPhase::Settling => {
                let count = ctx.read(self.count);
                ctx.display(count.to_string());
                (CheckPhase::AwaitClock, Wait::On(vec![Trigger::posedge(self.clock)]))
            }
            CheckPhase::AwaitClock => (CheckPhase::Settling, Wait::Delay(self.sample_delay)),
        };
        self.phase = next;
        Ok(wait)
    }
}

/// The outcome of a completed bench run.
#[derive(Clone, Debug, Serialize)]
pub struct BenchRun {
    /// Variant under test.
    pub variant: DecVariant,
    /// Why the kernel returned.
    pub end: EndReason,
    /// Simulation time at the end of the run.
    pub final_time: SimTime,
    /// Delta cycles executed.
    pub total_deltas: u64,
    /// Checker samples.
    pub trace: Trace,
}

/// One bench instance: kernel, signals, FSM and testbench processes.
pub struct Bench {
    kernel: SimKernel,
    variant: DecVariant,
    signals: BenchSignals,
}

impl Bench {
    /// Builds the bench for `variant`. Nothing runs until [`Bench::run`].
    pub fn new(variant: DecVariant, params: &BenchParams) -> Result<Self, BenchError> {
        params.validate()?;

        let mut kernel = SimKernel::new();
        let count = kernel.int_signal("count", 0, -params.n, params.n)?;
        let enable = kernel.bool_signal("enable", false);
        let clock = kernel.bool_signal("clock", true);
        let reset = kernel.bool_signal("reset", INACTIVE_HIGH);

        kernel.add_process(variant.instantiate(count, enable, clock, reset, params.n));
        kernel.spawn(ClockGen {
            clock,
            half_period: params.half_period,
            started: false,
        });
        kernel.spawn(ResetSequencer {
            reset,
            clock,
            phase: ResetPhase::Start,
        });
        kernel.spawn(Stimulus {
            enable,
            clock,
            reset,
            warmup_cycles: params.warmup_cycles,
            enables: enable_sequence(params.seed, params.random_cycles),
            cycle: None,
        });
        kernel.spawn(Checker {
            count,
            clock,
            reset,
            sample_delay: params.sample_delay,
            phase: CheckPhase::Start,
        });

        debug!(%variant, n = params.n, seed = params.seed, "bench built");
        Ok(Self {
            kernel,
            variant,
            signals: BenchSignals {
                count,
                enable,
                clock,
                reset,
            },
        })
    }

    /// The variant under test.
    pub fn variant(&self) -> DecVariant {
        self.variant
    }

    /// Handles to the bench's signals.
    pub fn signals(&self) -> BenchSignals {
        self.signals
    }

    /// Read access to the kernel.
    pub fn kernel(&self) -> &SimKernel {
        &self.kernel
    }

    /// Applies limits and waveform output to the kernel.
    pub fn configure(&mut self, config: &SimConfig) -> Result<(), BenchError> {
        config.apply(&mut self.kernel)?;
        Ok(())
    }

    /// Runs to Stop or Halt and collects the checker's trace.
    ///
    /// A run that hits the time limit is reported as [`BenchError::Aborted`].
    pub fn run(&mut self) -> Result<BenchRun, BenchError> {
        let result = self.kernel.run()?;
        if result.end == EndReason::TimeLimit {
            return Err(BenchError::Aborted {
                reason: format!("time limit reached at {}", result.final_time),
            });
        }
        let trace = Trace::from_lines(&result.display_output)?;
        info!(
            variant = %self.variant,
            end = ?result.end,
            time = %result.final_time,
            samples = trace.len(),
            "bench finished"
        );
        Ok(BenchRun {
            variant: self.variant,
            end: result.end,
            final_time: result.final_time,
            total_deltas: result.total_deltas,
            trace,
        })
    }
}

/// Builds and runs a bench with default engine settings, returning the trace.
pub fn run_bench(variant: DecVariant, params: &BenchParams) -> Result<Trace, BenchError> {
    Ok(run_bench_with(variant, params, &SimConfig::default())?.trace)
}

/// Builds, configures and runs a bench.
pub fn run_bench_with(
    variant: DecVariant,
    params: &BenchParams,
    config: &SimConfig,
) -> Result<BenchRun, BenchError> {
    let mut bench = Bench::new(variant, params)?;
    bench.configure(config)?;
    bench.run()
}

#[cfg(test)]
mod tests {
    use super::*;
    use ripple_sim::SchedulerState;

    fn small() -> BenchParams {
        BenchParams {
            n: 4,
            warmup_cycles: 10,
            random_cycles: 10,
            ..BenchParams::default()
        }
    }

    #[test]
    fn defaults_match_reference_bench() {
        let p = BenchParams::default();
        assert_eq!(p.n, 128);
        assert_eq!(p.half_period, 10);
        assert_eq!(p.seed, 2);
        assert_eq!(p.expected_samples(), 2001);
        p.validate().unwrap();
    }

    #[test]
    fn validate_rejects_bad_parameters() {
        let bad_n = BenchParams {
            n: 0,
            ..BenchParams::default()
        };
        assert!(matches!(
            bad_n.validate(),
            Err(BenchError::InvalidParameter { name: "n", .. })
        ));

        let bad_delay = BenchParams {
            sample_delay: 10,
            ..BenchParams::default()
        };
        assert!(matches!(
            bad_delay.validate(),
            Err(BenchError::InvalidParameter {
                name: "sample_delay",
                ..
            })
        ));

        let bad_period = BenchParams {
            half_period: 0,
            ..BenchParams::default()
        };
        assert!(bad_period.validate().is_err());
    }

    #[test]
    fn enable_sequence_is_seeded() {
        let a = enable_sequence(2, 200);
        assert_eq!(a, enable_sequence(2, 200));
        assert_ne!(a, enable_sequence(3, 200));
        let ones = a.iter().filter(|e| **e).count();
        // Expect about 160 of 200; allow generous slack.
        assert!((120..=195).contains(&ones), "{ones} ones");
    }

    #[test]
    fn small_run_samples_every_cycle() {
        let p = small();
        let mut bench = Bench::new(DecVariant::Reference, &p).unwrap();
        let run = bench.run().unwrap();
        assert_eq!(run.end, EndReason::Stopped);
        assert_eq!(bench.kernel().state(), SchedulerState::Stopped);
        assert_eq!(run.trace.len(), p.expected_samples());
        // Reset release, then ten enabled cycles from 0 with wrap at -4.
        assert_eq!(
            &run.trace.samples()[..11],
            &[0, -1, -2, -3, -4, 3, 2, 1, 0, -1, -2]
        );
    }

    #[test]
    fn stop_time_follows_stimulus_length() {
        let p = small();
        let run = run_bench_with(DecVariant::Direct, &p, &SimConfig::default()).unwrap();
        // Reset releases at 3 * half_period; each stimulus cycle is a period.
        let cycles = (p.warmup_cycles + p.random_cycles) as u64;
        let expected = 3 * p.half_period + 2 * p.half_period * cycles;
        assert_eq!(run.final_time.ticks, expected);
    }

    #[test]
    fn time_limit_aborts_run() {
        let config = SimConfig {
            time_limit: Some(100),
            ..SimConfig::default()
        };
        let err = run_bench_with(DecVariant::Reference, &small(), &config).unwrap_err();
        assert!(matches!(err, BenchError::Aborted { .. }));
    }

    #[test]
    fn invalid_params_fail_before_running() {
        let p = BenchParams {
            n: -1,
            ..small()
        };
        assert!(Bench::new(DecVariant::Shadow, &p).is_err());
    }

    #[test]
    fn signals_keep_their_names() {
        let bench = Bench::new(DecVariant::Closure, &small()).unwrap();
        let s = bench.signals();
        let k = bench.kernel();
        assert_eq!(k.find_signal("count"), Some(s.count.id()));
        assert_eq!(k.find_signal("enable"), Some(s.enable.id()));
        assert_eq!(k.find_signal("clock"), Some(s.clock.id()));
        assert_eq!(k.find_signal("reset"), Some(s.reset.id()));
        assert_eq!(bench.variant(), DecVariant::Closure);
    }

    #[test]
    fn vcd_output_covers_bench_signals() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dec.vcd");
        let config = SimConfig {
            waveform_path: Some(path.clone()),
            ..SimConfig::default()
        };
        run_bench_with(DecVariant::Function, &small(), &config).unwrap();
        let vcd = std::fs::read_to_string(&path).unwrap();
        assert!(vcd.contains("$var reg 3 ! count $end"));
        assert!(vcd.contains("$var reg 1 $ reset $end"));
        assert!(vcd.contains("$enddefinitions $end"));
    }
}
