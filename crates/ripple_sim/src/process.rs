//! Suspendable processes, their wait conditions, and the context they run in.
//!
//! A process is an explicit state machine. The kernel calls
//! [`Process::resume`] whenever the process's current wait condition is
//! satisfied; the process does its work, then returns the next [`Wait`].
//! Returning is the only suspension point, so everything a process does
//! between two waits is atomic with respect to every other process.

use crate::error::SimError;
use crate::ids::SignalId;
use crate::time::SimTime;
use crate::value::{Signal, SignalState, SignalValue, Value};

/// The transition a trigger waits for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Edge {
    /// False to true. Boolean signals only.
    Posedge,
    /// True to false. Boolean signals only.
    Negedge,
    /// Any change of value.
    Change,
}

impl Edge {
    /// Returns `true` if the transition `prev -> curr` satisfies this edge.
    pub fn fired(self, prev: Value, curr: Value) -> bool {
        match self {
            Edge::Posedge => prev == Value::Bool(false) && curr == Value::Bool(true),
            Edge::Negedge => prev == Value::Bool(true) && curr == Value::Bool(false),
            Edge::Change => prev != curr,
        }
    }
}

/// A single wake-up condition on a signal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Trigger {
    /// The observed signal.
    pub signal: SignalId,
    /// The transition that wakes the process.
    pub edge: Edge,
}

impl Trigger {
    /// Rising edge of a boolean signal.
    pub fn posedge(signal: Signal<bool>) -> Self {
        Self {
            signal: signal.id(),
            edge: Edge::Posedge,
        }
    }

    /// Falling edge of a boolean signal.
    pub fn negedge(signal: Signal<bool>) -> Self {
        Self {
            signal: signal.id(),
            edge: Edge::Negedge,
        }
    }

    /// Any value change of a signal.
    pub fn change<T>(signal: Signal<T>) -> Self {
        Self {
            signal: signal.id(),
            edge: Edge::Change,
        }
    }
}

/// What a process waits for after it yields.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Wait {
    /// Resume when any of the triggers fires.
    On(Vec<Trigger>),
    /// Resume after the given number of ticks (must be non-zero).
    Delay(u64),
    /// The process has finished and never resumes.
    Done,
    /// The process has finished and asks the kernel to stop the run.
    Stop,
}

/// A suspendable unit of simulation logic.
pub trait Process {
    /// Name used in logs and error messages.
    fn name(&self) -> &str;

    /// Runs the process up to its next suspension point.
    ///
    /// The first call happens at time 0 before any signal activity.
    fn resume(&mut self, ctx: &mut ProcessContext<'_>) -> Result<Wait, SimError>;
}

/// The view of the kernel a process gets while it runs.
///
/// Reads see current values only; commits become visible at the end of the
/// delta cycle.
pub struct ProcessContext<'a> {
    pub(crate) now: SimTime,
    pub(crate) signals: &'a mut [SignalState],
    pub(crate) dirty: &'a mut Vec<SignalId>,
    pub(crate) display: &'a mut Vec<String>,
}

impl ProcessContext<'_> {
    /// Current simulation time.
    pub fn now(&self) -> SimTime {
        self.now
    }

    /// Reads the current value of a signal.
    pub fn read<T: SignalValue>(&self, signal: Signal<T>) -> T {
        T::from_value(self.signals[signal.id().index()].value)
    }

    /// Reads the current untyped value of a signal.
    pub fn read_value(&self, id: SignalId) -> Value {
        self.signals[id.index()].value
    }

    /// Commits a value for the next delta cycle.
    ///
    /// Fails without side effects if the value is outside the signal's domain.
    pub fn commit<T: SignalValue>(&mut self, signal: Signal<T>, value: T) -> Result<(), SimError> {
        commit_value(self.signals, self.dirty, signal.id(), value.into_value())
    }

    /// Emits one line of testbench output.
    pub fn display(&mut self, line: impl Into<String>) {
        self.display.push(line.into());
    }
}

/// Shared commit path for processes and external drivers.
pub(crate) fn commit_value(
    signals: &mut [SignalState],
    dirty: &mut Vec<SignalId>,
    id: SignalId,
    value: Value,
) -> Result<(), SimError> {
    let state = &mut signals[id.index()];
    state.domain.check(&state.name, value)?;
    if state.next.replace(value).is_none() {
        dirty.push(id);
    }
    Ok(())
}

/// A process backed by a closure.
///
/// Handy for small testbench helpers whose whole state fits in captured
/// variables.
pub struct FnProcess<F> {
    name: String,
    body: F,
}

impl<F> FnProcess<F>
where
    F: FnMut(&mut ProcessContext<'_>) -> Result<Wait, SimError>,
{
    /// Wraps `body` as a process named `name`.
    pub fn new(name: impl Into<String>, body: F) -> Self {
        Self {
            name: name.into(),
            body,
        }
    }
}

impl<F> Process for FnProcess<F>
where
    F: FnMut(&mut ProcessContext<'_>) -> Result<Wait, SimError>,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn resume(&mut self, ctx: &mut ProcessContext<'_>) -> Result<Wait, SimError> {
        (self.body)(ctx)
    }
}
