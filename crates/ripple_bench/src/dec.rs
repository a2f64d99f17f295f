//! The decrementer FSM and its equivalent encodings.
//!
//! Every variant waits on the rising clock edge or the falling reset edge.
//! While reset reads asserted the count is cleared; otherwise, when enabled,
//! the count decrements and wraps from `-n` to `n - 1`. With enable low the
//! count holds. The variants differ only in how they express this.

use std::fmt;
use std::str::FromStr;

use ripple_sim::{
    BoundedInt, OutOfRange, Process, ProcessContext, Signal, SimError, Trigger, Value, Wait,
};
use serde::{Deserialize, Serialize};

use crate::error::BenchError;

/// Reset level that clears the counter.
pub const ACTIVE_LOW: bool = false;
/// Reset level that lets the counter run.
pub const INACTIVE_HIGH: bool = true;

/// Signature shared by every variant's constructor:
/// `(count, enable, clock, reset, n)`.
pub type DecConstructor =
    fn(Signal<i64>, Signal<bool>, Signal<bool>, Signal<bool>, i64) -> Box<dyn Process>;

/// The encodings of the decrementer kept under equivalence test.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DecVariant {
    /// Inline logic, enable tested as a plain boolean.
    #[serde(rename = "dec-ref")]
    Reference,
    /// Inline logic with explicit value comparisons.
    #[serde(rename = "dec")]
    Direct,
    /// Next value computed by a pure helper.
    #[serde(rename = "dec-func")]
    Function,
    /// Decrement staged in a private shadow counter, copied out every cycle.
    #[serde(rename = "dec-task")]
    Shadow,
    /// Decrement performed by a closure that captures the port handles.
    #[serde(rename = "dec-task-free-var")]
    Closure,
}

impl DecVariant {
    /// Every variant, reference first.
    pub const ALL: [DecVariant; 5] = [
        DecVariant::Reference,
        DecVariant::Direct,
        DecVariant::Function,
        DecVariant::Shadow,
        DecVariant::Closure,
    ];

    /// The variant's command-line name.
    pub fn name(self) -> &'static str {
        match self {
            DecVariant::Reference => "dec-ref",
            DecVariant::Direct => "dec",
            DecVariant::Function => "dec-func",
            DecVariant::Shadow => "dec-task",
            DecVariant::Closure => "dec-task-free-var",
        }
    }

    /// One-line description for listings.
    pub fn description(self) -> &'static str {
        match self {
            DecVariant::Reference => "inline logic, enable tested as a boolean",
            DecVariant::Direct => "inline logic, explicit value comparisons",
            DecVariant::Function => "next value from a pure helper function",
            DecVariant::Shadow => "private shadow counter copied to the output",
            DecVariant::Closure => "closure capturing the port handles",
        }
    }

    /// The constructor for this variant.
    pub fn constructor(self) -> DecConstructor {
        match self {
            DecVariant::Reference => dec_ref,
            DecVariant::Direct => dec,
            DecVariant::Function => dec_func,
            DecVariant::Shadow => dec_task,
            DecVariant::Closure => dec_task_free_var,
        }
    }

    /// Builds an instance of this variant on the given ports.
    pub fn instantiate(
        self,
        count: Signal<i64>,
        enable: Signal<bool>,
        clock: Signal<bool>,
        reset: Signal<bool>,
        n: i64,
    ) -> Box<dyn Process> {
        (self.constructor())(count, enable, clock, reset, n)
    }
}

impl fmt::Display for DecVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for DecVariant {
    type Err = BenchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DecVariant::ALL
            .into_iter()
            .find(|v| v.name() == s)
            .ok_or_else(|| BenchError::InvalidParameter {
                name: "variant",
                reason: format!(
                    "unknown variant '{s}', expected one of: {}",
                    DecVariant::ALL.map(DecVariant::name).join(", ")
                ),
            })
    }
}

/// Port handles of one decrementer instance.
#[derive(Clone, Copy, Debug)]
struct DecPorts {
    count: Signal<i64>,
    enable: Signal<bool>,
    clock: Signal<bool>,
    reset: Signal<bool>,
    n: i64,
}

impl DecPorts {
    fn sensitivity(&self) -> Wait {
        Wait::On(vec![Trigger::posedge(self.clock), Trigger::negedge(self.reset)])
    }
}

/// Suspension points shared by every variant.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Phase {
    /// Not yet run.
    Start,
    /// Suspended on the clock or reset edge.
    AwaitEdge,
}

/// Reference encoding.
pub fn dec_ref(
    count: Signal<i64>,
    enable: Signal<bool>,
    clock: Signal<bool>,
    reset: Signal<bool>,
    n: i64,
) -> Box<dyn Process> {
    Box::new(DecRef {
        ports: DecPorts { count, enable, clock, reset, n },
        phase: Phase::Start,
    })
}

struct DecRef {
    ports: DecPorts,
    phase: Phase,
}

impl Process for DecRef {
    fn name(&self) -> &str {
        DecVariant::Reference.name()
    }

    fn resume(&mut self, ctx: &mut ProcessContext<'_>) -> Result<Wait, SimError> {
        let p = self.ports;
        if self.phase == Phase::AwaitEdge {
            if ctx.read(p.reset) == ACTIVE_LOW {
                ctx.commit(p.count, 0)?;
            } else if ctx.read(p.enable) {
                let count = ctx.read(p.count);
                if count == -p.n {
                    ctx.commit(p.count, p.n - 1)?;
                } else {
                    ctx.commit(p.count, count - 1)?;
                }
            }
        }
        self.phase = Phase::AwaitEdge;
        Ok(p.sensitivity())
    }
}

/// Direct encoding: every test compares untyped signal values.
pub fn dec(
    count: Signal<i64>,
    enable: Signal<bool>,
    clock: Signal<bool>,
    reset: Signal<bool>,
    n: i64,
) -> Box<dyn Process> {
    Box::new(Dec {
        ports: DecPorts { count, enable, clock, reset, n },
        phase: Phase::Start,
    })
}

struct Dec {
    ports: DecPorts,
    phase: Phase,
}

impl Process for Dec {
    fn name(&self) -> &str {
        DecVariant::Direct.name()
    }

    fn resume(&mut self, ctx: &mut ProcessContext<'_>) -> Result<Wait, SimError> {
        let p = self.ports;
        if self.phase == Phase::AwaitEdge {
            if ctx.read_value(p.reset.id()) == Value::Bool(ACTIVE_LOW) {
                ctx.commit(p.count, 0)?;
            } else if ctx.read_value(p.enable.id()) == Value::Bool(true) {
                if ctx.read_value(p.count.id()) == Value::Int(-p.n) {
                    ctx.commit(p.count, p.n - 1)?;
                } else {
                    let count = ctx.read(p.count);
                    ctx.commit(p.count, count - 1)?;
                }
            }
        }
        self.phase = Phase::AwaitEdge;
        Ok(p.sensitivity())
    }
}

/// Computes the decremented count inside a fresh bounded integer.
///
/// Fails if `cnt - 1` (or `n - 1` on wrap) does not fit `[-n, n)`, which
/// only happens when `cnt` itself was out of range.
pub fn next_count(cnt: i64, n: i64) -> Result<BoundedInt, OutOfRange> {
    let mut next = BoundedInt::new(0, -n, n)?;
    if cnt == -n {
        next.set(n - 1)?;
    } else {
        next.set(cnt - 1)?;
    }
    Ok(next)
}

/// Function encoding: the next value comes from [`next_count`].
pub fn dec_func(
    count: Signal<i64>,
    enable: Signal<bool>,
    clock: Signal<bool>,
    reset: Signal<bool>,
    n: i64,
) -> Box<dyn Process> {
    Box::new(DecFunc {
        ports: DecPorts { count, enable, clock, reset, n },
        phase: Phase::Start,
    })
}

struct DecFunc {
    ports: DecPorts,
    phase: Phase,
}

impl Process for DecFunc {
    fn name(&self) -> &str {
        DecVariant::Function.name()
    }

    fn resume(&mut self, ctx: &mut ProcessContext<'_>) -> Result<Wait, SimError> {
        let p = self.ports;
        if self.phase == Phase::AwaitEdge {
            if ctx.read(p.reset) == ACTIVE_LOW {
                ctx.commit(p.count, 0)?;
            } else if ctx.read(p.enable) {
                let next = next_count(ctx.read(p.count), p.n).map_err(|e| e.on("count"))?;
                ctx.commit(p.count, next.get())?;
            }
        }
        self.phase = Phase::AwaitEdge;
        Ok(p.sensitivity())
    }
}

/// Decrements the shadow counter in place when enabled.
fn shadow_step(cnt: &mut BoundedInt, enable: bool) -> Result<(), OutOfRange> {
    if enable {
        if cnt.get() == cnt.min() {
            cnt.set(cnt.max() - 1)?;
        } else {
            cnt.set(cnt.get() - 1)?;
        }
    }
    Ok(())
}

/// Shadow encoding: the count lives in a private [`BoundedInt`] created when
/// the process first runs, and is copied to the port every cycle.
pub fn dec_task(
    count: Signal<i64>,
    enable: Signal<bool>,
    clock: Signal<bool>,
    reset: Signal<bool>,
    n: i64,
) -> Box<dyn Process> {
    Box::new(DecTask {
        ports: DecPorts { count, enable, clock, reset, n },
        state: ShadowState::Start,
    })
}

enum ShadowState {
    Start,
    AwaitEdge(BoundedInt),
}

struct DecTask {
    ports: DecPorts,
    state: ShadowState,
}

impl Process for DecTask {
    fn name(&self) -> &str {
        DecVariant::Shadow.name()
    }

    fn resume(&mut self, ctx: &mut ProcessContext<'_>) -> Result<Wait, SimError> {
        let p = self.ports;
        match self.state {
            ShadowState::Start => {
                let cnt = BoundedInt::new(0, -p.n, p.n).map_err(|e| e.on("cnt"))?;
                self.state = ShadowState::AwaitEdge(cnt);
            }
            ShadowState::AwaitEdge(ref mut cnt) => {
                if ctx.read(p.reset) == ACTIVE_LOW {
                    cnt.set(0).map_err(|e| e.on("cnt"))?;
                    ctx.commit(p.count, 0)?;
                } else {
                    shadow_step(cnt, ctx.read(p.enable)).map_err(|e| e.on("cnt"))?;
                    ctx.commit(p.count, cnt.get())?;
                }
            }
        }
        Ok(p.sensitivity())
    }
}

type DecStep = Box<dyn FnMut(&mut ProcessContext<'_>) -> Result<(), SimError>>;

/// Closure encoding: the decrement is a boxed closure that owns its own
/// copies of the `count` and `enable` handles.
pub fn dec_task_free_var(
    count: Signal<i64>,
    enable: Signal<bool>,
    clock: Signal<bool>,
    reset: Signal<bool>,
    n: i64,
) -> Box<dyn Process> {
    let step: DecStep = Box::new(move |ctx| {
        if ctx.read(enable) {
            let c = ctx.read(count);
            if c == -n {
                ctx.commit(count, n - 1)?;
            } else {
                ctx.commit(count, c - 1)?;
            }
        }
        Ok(())
    });
    Box::new(DecTaskFreeVar {
        count,
        clock,
        reset,
        step,
        phase: Phase::Start,
    })
}

struct DecTaskFreeVar {
    count: Signal<i64>,
    clock: Signal<bool>,
    reset: Signal<bool>,
    step: DecStep,
    phase: Phase,
}

impl Process for DecTaskFreeVar {
    fn name(&self) -> &str {
        DecVariant::Closure.name()
    }

    fn resume(&mut self, ctx: &mut ProcessContext<'_>) -> Result<Wait, SimError> {
        if self.phase == Phase::AwaitEdge {
            if ctx.read(self.reset) == ACTIVE_LOW {
                ctx.commit(self.count, 0)?;
            } else {
                (self.step)(ctx)?;
            }
        }
        self.phase = Phase::AwaitEdge;
        Ok(Wait::On(vec![
            Trigger::posedge(self.clock),
            Trigger::negedge(self.reset),
        ]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ripple_sim::{FnProcess, SimKernel};

    /// Runs one variant through a single clock edge at tick 5 and returns
    /// the count afterwards.
    fn one_edge(variant: DecVariant, n: i64, count: i64, enable: bool, reset: bool) -> i64 {
        let mut k = SimKernel::new();
        let count = k.int_signal("count", count, -n, n).unwrap();
        let enable = k.bool_signal("enable", enable);
        let clock = k.bool_signal("clock", false);
        let reset = k.bool_signal("reset", reset);
        k.add_process(variant.instantiate(count, enable, clock, reset, n));
        k.schedule(5, clock, true).unwrap();
        let mut started = false;
        k.spawn(FnProcess::new("stop", move |_| {
            if started {
                return Ok(Wait::Stop);
            }
            started = true;
            Ok(Wait::Delay(10))
        }));
        k.run().unwrap();
        k.value(count)
    }

    #[test]
    fn names_round_trip_through_from_str() {
        for v in DecVariant::ALL {
            assert_eq!(v.name().parse::<DecVariant>().unwrap(), v);
            assert_eq!(v.to_string(), v.name());
        }
        assert!(matches!(
            "dec-nope".parse::<DecVariant>(),
            Err(BenchError::InvalidParameter { name: "variant", .. })
        ));
    }

    #[test]
    fn serde_uses_variant_names() {
        let json = serde_json::to_string(&DecVariant::Closure).unwrap();
        assert_eq!(json, "\"dec-task-free-var\"");
    }

    #[test]
    fn enabled_decrement() {
        for v in DecVariant::ALL {
            // The shadow counter starts at 0 and never reads the port.
            if v != DecVariant::Shadow {
                assert_eq!(one_edge(v, 4, 2, true, INACTIVE_HIGH), 1, "{v}");
            }
            assert_eq!(one_edge(v, 4, 0, true, INACTIVE_HIGH), -1, "{v}");
        }
    }

    #[test]
    fn enable_low_holds() {
        for v in DecVariant::ALL.into_iter().filter(|v| *v != DecVariant::Shadow) {
            assert_eq!(one_edge(v, 4, -3, false, INACTIVE_HIGH), -3, "{v}");
        }
        assert_eq!(one_edge(DecVariant::Shadow, 4, 0, false, INACTIVE_HIGH), 0);
    }

    #[test]
    fn asserted_reset_clears_on_clock_edge() {
        for v in DecVariant::ALL {
            assert_eq!(one_edge(v, 4, 3, true, ACTIVE_LOW), 0, "{v}");
        }
    }

    #[test]
    fn wraps_from_minimum() {
        for v in DecVariant::ALL.into_iter().filter(|v| *v != DecVariant::Shadow) {
            assert_eq!(one_edge(v, 4, -4, true, INACTIVE_HIGH), 3, "{v}");
        }
    }

    /// Clock rises at 5, reset falls at 7, the run stops at `stop_at`.
    fn clock_then_reset(variant: DecVariant, stop_at: u64) -> i64 {
        let mut k = SimKernel::new();
        let count = k.int_signal("count", 0, -8, 8).unwrap();
        let enable = k.bool_signal("enable", true);
        let clock = k.bool_signal("clock", false);
        let reset = k.bool_signal("reset", INACTIVE_HIGH);
        k.add_process(variant.instantiate(count, enable, clock, reset, 8));
        k.schedule(5, clock, true).unwrap();
        k.schedule(7, reset, ACTIVE_LOW).unwrap();
        let mut started = false;
        k.spawn(FnProcess::new("stop", move |_| {
            if started {
                return Ok(Wait::Stop);
            }
            started = true;
            Ok(Wait::Delay(stop_at))
        }));
        k.run().unwrap();
        k.value(count)
    }

    #[test]
    fn reset_falling_edge_clears_without_clock() {
        for v in DecVariant::ALL {
            assert_eq!(clock_then_reset(v, 6), -1, "{v}");
            assert_eq!(clock_then_reset(v, 8), 0, "{v}");
        }
    }

    #[test]
    fn next_count_wraps_and_checks_range() {
        assert_eq!(next_count(-128, 128).unwrap().get(), 127);
        assert_eq!(next_count(0, 128).unwrap().get(), -1);
        assert_eq!(next_count(127, 128).unwrap().get(), 126);
        assert!(next_count(-200, 128).is_err());
        assert!(next_count(0, 0).is_err());
    }

    #[test]
    fn shadow_counter_wraps() {
        let mut cnt = BoundedInt::new(-2, -2, 2).unwrap();
        shadow_step(&mut cnt, true).unwrap();
        assert_eq!(cnt.get(), 1);
        shadow_step(&mut cnt, false).unwrap();
        assert_eq!(cnt.get(), 1);
        shadow_step(&mut cnt, true).unwrap();
        assert_eq!(cnt.get(), 0);
    }

    #[test]
    fn shadow_rejects_non_positive_n() {
        let mut k = SimKernel::new();
        let count = k.int_signal("count", 0, -1, 1).unwrap();
        let enable = k.bool_signal("enable", false);
        let clock = k.bool_signal("clock", false);
        let reset = k.bool_signal("reset", true);
        k.add_process(DecVariant::Shadow.instantiate(count, enable, clock, reset, 0));
        let err = k.run().unwrap_err();
        assert!(matches!(err, SimError::RangeViolation { ref signal, .. } if signal == "cnt"));
    }

    #[test]
    fn process_names_match_variants() {
        let mut k = SimKernel::new();
        let count = k.int_signal("count", 0, -4, 4).unwrap();
        let enable = k.bool_signal("enable", false);
        let clock = k.bool_signal("clock", false);
        let reset = k.bool_signal("reset", true);
        for v in DecVariant::ALL {
            let id = k.add_process(v.instantiate(count, enable, clock, reset, 4));
            assert_eq!(k.process_name(id), Some(v.name()));
        }
    }
}
