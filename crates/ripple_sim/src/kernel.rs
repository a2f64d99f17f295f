//! Simulation kernel with timed event queue and delta-cycle loop.
//!
//! [`SimKernel`] owns every signal and process of a run. Each delta cycle
//! runs all runnable processes, applies their commits at once, and wakes the
//! processes whose triggers fired across that transition. When a timestep
//! settles, time advances to the earliest queued event.

use std::cmp::Reverse;
use std::collections::BinaryHeap;
use std::mem;

use serde::Serialize;
use tracing::{debug, trace};

use crate::error::SimError;
use crate::ids::{ProcessId, SignalId};
use crate::process::{commit_value, Edge, Process, ProcessContext, Trigger, Wait};
use crate::time::SimTime;
use crate::value::{Domain, Signal, SignalState, SignalValue, Value};
use crate::waveform::WaveformRecorder;

/// Default bound on delta cycles within one timestep.
pub const DEFAULT_MAX_DELTAS: u32 = 10_000;

/// Work queued for a future tick.
#[derive(Debug, Clone)]
enum TimedAction {
    /// Resume a process suspended on a delay.
    Resume(ProcessId),
    /// Commit a value on behalf of the testbench.
    Drive(SignalId, Value),
}

/// An entry in the timed queue. Equal ticks are served in insertion order.
#[derive(Debug, Clone)]
struct TimedEvent {
    ticks: u64,
    seq: u64,
    action: TimedAction,
}

impl PartialEq for TimedEvent {
    fn eq(&self, other: &Self) -> bool {
        (self.ticks, self.seq) == (other.ticks, other.seq)
    }
}

impl Eq for TimedEvent {}

impl PartialOrd for TimedEvent {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for TimedEvent {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        (self.ticks, self.seq).cmp(&(other.ticks, other.seq))
    }
}

/// Lifecycle of a kernel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SchedulerState {
    /// Built but not yet started.
    Idle,
    /// Executing; may also be paused at a time limit.
    Running,
    /// Nothing left to do anywhere.
    Halted,
    /// A process raised Stop.
    Stopped,
    /// A run returned an engine error; the kernel cannot continue.
    Failed,
}

/// Why a run returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum EndReason {
    /// A process raised Stop.
    Stopped,
    /// No runnable process and no pending event remained.
    Halted,
    /// The next event lies beyond the configured time limit.
    TimeLimit,
}

/// The result of a completed run.
#[derive(Debug, Clone, Serialize)]
pub struct SimResult {
    /// Simulation time when the run returned.
    pub final_time: SimTime,
    /// Why the run returned.
    pub end: EndReason,
    /// Total number of delta cycles executed.
    pub total_deltas: u64,
    /// Every line processes emitted through [`ProcessContext::display`].
    pub display_output: Vec<String>,
}

/// The result of a single delta-cycle step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepResult {
    /// Simulation can continue.
    Continued,
    /// Simulation is done (stopped, halted, or at the time limit).
    Done,
}

#[derive(Debug)]
enum ProcState {
    Runnable,
    Waiting(Vec<Trigger>),
    Delayed,
    Done,
}

struct ProcessSlot {
    name: String,
    body: Option<Box<dyn Process>>,
    state: ProcState,
}

/// The simulation kernel: signals, processes, event queue and scheduler.
///
/// Build signals and register processes, then call [`run`](SimKernel::run),
/// [`run_until`](SimKernel::run_until) or [`step`](SimKernel::step).
pub struct SimKernel {
    /// Lifecycle state.
    state: SchedulerState,
    /// Current simulation time.
    current_time: SimTime,
    /// Min-heap of future work (earliest first).
    timed_queue: BinaryHeap<Reverse<TimedEvent>>,
    /// Insertion counter for stable ordering of equal-tick events.
    next_seq: u64,
    /// All signals, indexed by `SignalId`.
    signals: Vec<SignalState>,
    /// All processes, indexed by `ProcessId`.
    processes: Vec<ProcessSlot>,
    /// Processes to run in the next delta cycle.
    runnable: Vec<ProcessId>,
    /// Signals with a pending commit.
    dirty: Vec<SignalId>,
    /// Optional waveform recorder.
    recorder: Option<Box<dyn WaveformRecorder>>,
    /// Collected display output.
    display_output: Vec<String>,
    /// Optional time limit in ticks.
    time_limit: Option<u64>,
    /// Maximum delta cycles per timestep.
    max_delta_per_step: u32,
    /// Delta cycles executed at the current tick.
    deltas_at_current_time: u32,
    /// Total delta cycles executed.
    total_deltas: u64,
    /// Set when a process returned [`Wait::Stop`] in the current delta.
    stop_requested: bool,
}

impl Default for SimKernel {
    fn default() -> Self {
        Self::new()
    }
}

impl SimKernel {
    /// Creates an idle kernel with no signals or processes.
    pub fn new() -> Self {
        Self {
            state: SchedulerState::Idle,
            current_time: SimTime::zero(),
            timed_queue: BinaryHeap::new(),
            next_seq: 0,
            signals: Vec::new(),
            processes: Vec::new(),
            runnable: Vec::new(),
            dirty: Vec::new(),
            recorder: None,
            display_output: Vec::new(),
            time_limit: None,
            max_delta_per_step: DEFAULT_MAX_DELTAS,
            deltas_at_current_time: 0,
            total_deltas: 0,
            stop_requested: false,
        }
    }

    /// Creates a boolean signal.
    pub fn bool_signal(&mut self, name: impl Into<String>, init: bool) -> Signal<bool> {
        let id = SignalId::from_index(self.signals.len());
        self.signals.push(SignalState {
            name: name.into(),
            domain: Domain::Bool,
            value: Value::Bool(init),
            previous_value: Value::Bool(init),
            next: None,
            waiters: Vec::new(),
        });
        Signal::new(id)
    }

    /// Creates an integer signal constrained to `[min, max)`.
    pub fn int_signal(
        &mut self,
        name: impl Into<String>,
        init: i64,
        min: i64,
        max: i64,
    ) -> Result<Signal<i64>, SimError> {
        let state = SignalState::new(name.into(), Domain::Int { min, max }, Value::Int(init))?;
        let id = SignalId::from_index(self.signals.len());
        self.signals.push(state);
        Ok(Signal::new(id))
    }

    /// Registers a process. It first runs at time 0 when the kernel starts,
    /// or in the next delta cycle if the run is already under way.
    pub fn add_process(&mut self, process: Box<dyn Process>) -> ProcessId {
        let id = ProcessId::from_index(self.processes.len());
        let state = if self.state == SchedulerState::Running {
            self.runnable.push(id);
            ProcState::Runnable
        } else {
            ProcState::Delayed
        };
        self.processes.push(ProcessSlot {
            name: process.name().to_string(),
            body: Some(process),
            state,
        });
        id
    }

    /// Registers a process by value.
    pub fn spawn<P: Process + 'static>(&mut self, process: P) -> ProcessId {
        self.add_process(Box::new(process))
    }

    /// Sets the time limit in ticks.
    pub fn set_time_limit(&mut self, limit: u64) {
        self.time_limit = Some(limit);
    }

    /// Sets the maximum number of delta cycles per timestep.
    pub fn set_max_delta(&mut self, max: u32) {
        self.max_delta_per_step = max;
    }

    /// Attaches a waveform recorder.
    ///
    /// Signals are registered and their current values dumped when the run
    /// starts, or immediately if it already has.
    pub fn set_recorder(&mut self, recorder: Box<dyn WaveformRecorder>) -> Result<(), SimError> {
        self.recorder = Some(recorder);
        if self.state != SchedulerState::Idle {
            self.register_waveform()?;
        }
        Ok(())
    }

    /// Returns the lifecycle state.
    pub fn state(&self) -> SchedulerState {
        self.state
    }

    /// Returns the current simulation time.
    pub fn current_time(&self) -> SimTime {
        self.current_time
    }

    /// Reads the current value of a signal.
    pub fn value<T: SignalValue>(&self, signal: Signal<T>) -> T {
        T::from_value(self.signals[signal.id().index()].value)
    }

    /// Finds a signal by name.
    pub fn find_signal(&self, name: &str) -> Option<SignalId> {
        self.signals
            .iter()
            .position(|s| s.name == name)
            .map(SignalId::from_index)
    }

    /// Returns the number of signals.
    pub fn signal_count(&self) -> usize {
        self.signals.len()
    }

    /// Returns the number of registered processes.
    pub fn process_count(&self) -> usize {
        self.processes.len()
    }

    /// Returns the name of a registered process.
    pub fn process_name(&self, id: ProcessId) -> Option<&str> {
        self.processes.get(id.index()).map(|p| p.name.as_str())
    }

    /// Commits a value from outside any process, effective in the next delta
    /// cycle at the current time.
    pub fn drive<T: SignalValue>(&mut self, signal: Signal<T>, value: T) -> Result<(), SimError> {
        commit_value(&mut self.signals, &mut self.dirty, signal.id(), value.into_value())
    }

    /// Queues a commit at a future tick.
    ///
    /// The value is checked against the signal's domain immediately. A tick
    /// earlier than the current time is rejected.
    pub fn schedule<T: SignalValue>(
        &mut self,
        ticks: u64,
        signal: Signal<T>,
        value: T,
    ) -> Result<(), SimError> {
        if ticks < self.current_time.ticks {
            return Err(SimError::ScheduleInPast {
                requested: ticks,
                time: self.current_time,
            });
        }
        let state = &self.signals[signal.id().index()];
        let value = value.into_value();
        state.domain.check(&state.name, value)?;
        self.push_timed(ticks, TimedAction::Drive(signal.id(), value));
        Ok(())
    }

    /// Runs until Stop, Halt, or the configured time limit.
    pub fn run(&mut self) -> Result<SimResult, SimError> {
        while self.step()? == StepResult::Continued {}

        if let Some(rec) = &mut self.recorder {
            rec.finalize()?;
        }

        let end = match self.state {
            SchedulerState::Stopped => EndReason::Stopped,
            SchedulerState::Halted => EndReason::Halted,
            SchedulerState::Idle | SchedulerState::Running => EndReason::TimeLimit,
            SchedulerState::Failed => {
                return Err(SimError::Failed {
                    time: self.current_time,
                })
            }
        };
        debug!(time = %self.current_time, ?end, deltas = self.total_deltas, "run ended");

        Ok(SimResult {
            final_time: self.current_time,
            end,
            total_deltas: self.total_deltas,
            display_output: self.display_output.clone(),
        })
    }

    /// Runs until the given tick (inclusive), Stop, or Halt.
    pub fn run_until(&mut self, limit: u64) -> Result<SimResult, SimError> {
        self.time_limit = Some(limit);
        self.run()
    }

    /// Executes a single delta cycle, first advancing time if the current
    /// timestep has settled.
    ///
    /// Any engine error moves the kernel to [`SchedulerState::Failed`]; every
    /// later call returns [`SimError::Failed`].
    pub fn step(&mut self) -> Result<StepResult, SimError> {
        match self.state {
            SchedulerState::Halted | SchedulerState::Stopped => return Ok(StepResult::Done),
            SchedulerState::Failed => {
                return Err(SimError::Failed {
                    time: self.current_time,
                })
            }
            SchedulerState::Idle | SchedulerState::Running => {}
        }

        let result = self.step_inner();
        if let Err(e) = &result {
            self.fail(e);
        }
        result
    }

    fn step_inner(&mut self) -> Result<StepResult, SimError> {
        if self.state == SchedulerState::Idle {
            self.start()?;
        }

        if self.runnable.is_empty() && self.dirty.is_empty() && !self.advance_time()? {
            return Ok(StepResult::Done);
        }

        self.run_delta()?;

        if self.state == SchedulerState::Running {
            Ok(StepResult::Continued)
        } else {
            Ok(StepResult::Done)
        }
    }

    /// Discards all pending work after an engine error.
    fn fail(&mut self, error: &SimError) {
        self.state = SchedulerState::Failed;
        self.runnable.clear();
        self.timed_queue.clear();
        for id in mem::take(&mut self.dirty) {
            self.signals[id.index()].next = None;
        }
        self.stop_requested = false;
        debug!(time = %self.current_time, %error, "simulation failed");
    }

    /// Makes every process runnable at time 0.
    fn start(&mut self) -> Result<(), SimError> {
        self.state = SchedulerState::Running;
        for (idx, slot) in self.processes.iter_mut().enumerate() {
            slot.state = ProcState::Runnable;
            self.runnable.push(ProcessId::from_index(idx));
        }
        if self.recorder.is_some() {
            self.register_waveform()?;
        }
        debug!(
            signals = self.signals.len(),
            processes = self.processes.len(),
            "simulation started"
        );
        Ok(())
    }

    /// Moves to the earliest queued tick and releases its events.
    ///
    /// Returns `false` when the run cannot continue.
    fn advance_time(&mut self) -> Result<bool, SimError> {
        let Some(Reverse(next)) = self.timed_queue.peek() else {
            return self.drain();
        };
        let ticks = next.ticks;

        if self.time_limit.is_some_and(|limit| ticks > limit) {
            return Ok(false);
        }

        if ticks > self.current_time.ticks {
            self.deltas_at_current_time = 0;
        }
        self.current_time = self.current_time.advance_to(ticks);

        while self.timed_queue.peek().is_some_and(|Reverse(e)| e.ticks == ticks) {
            let Some(Reverse(event)) = self.timed_queue.pop() else {
                break;
            };
            match event.action {
                TimedAction::Resume(pid) => {
                    self.processes[pid.index()].state = ProcState::Runnable;
                    self.runnable.push(pid);
                }
                TimedAction::Drive(id, value) => {
                    commit_value(&mut self.signals, &mut self.dirty, id, value)?;
                }
            }
        }
        Ok(true)
    }

    /// Handles an empty event queue.
    ///
    /// Processes still waiting on triggers cannot wake any more, which is a
    /// normal halt. A process marked runnable with nothing queued to run it is
    /// work the scheduler cannot service.
    fn drain(&mut self) -> Result<bool, SimError> {
        let names = |pred: fn(&ProcState) -> bool| -> Vec<String> {
            self.processes
                .iter()
                .filter(|p| pred(&p.state))
                .map(|p| p.name.clone())
                .collect()
        };

        let orphaned = names(|s| matches!(s, ProcState::Runnable));
        if !orphaned.is_empty() {
            return Err(SimError::SchedulingDeadlock {
                time: self.current_time,
                blocked: orphaned,
            });
        }

        let waiting = names(|s| matches!(s, ProcState::Waiting(_)));
        self.state = SchedulerState::Halted;
        debug!(time = %self.current_time, ?waiting, "simulation halted");
        Ok(false)
    }

    /// Runs one delta cycle: resume, apply, wake.
    fn run_delta(&mut self) -> Result<(), SimError> {
        if self.deltas_at_current_time >= self.max_delta_per_step {
            return Err(SimError::DeltaCycleLimit {
                time: self.current_time,
                max_deltas: self.max_delta_per_step,
            });
        }

        let mut batch = mem::take(&mut self.runnable);
        batch.sort_unstable();
        batch.dedup();
        trace!(time = %self.current_time, runnable = batch.len(), "delta cycle");

        for pid in batch {
            self.resume(pid)?;
        }

        let changed = self.apply_commits()?;

        if self.stop_requested {
            self.state = SchedulerState::Stopped;
            self.runnable.clear();
            self.timed_queue.clear();
            debug!(time = %self.current_time, "stop raised, pending events discarded");
        } else {
            self.wake_waiters(&changed);
        }

        self.total_deltas += 1;
        self.deltas_at_current_time += 1;
        self.current_time = self.current_time.next_delta();
        Ok(())
    }

    /// Resumes one process and records its next wait.
    fn resume(&mut self, pid: ProcessId) -> Result<(), SimError> {
        let idx = pid.index();
        let Some(mut body) = self.processes[idx].body.take() else {
            return Ok(());
        };

        let mut ctx = ProcessContext {
            now: self.current_time,
            signals: self.signals.as_mut_slice(),
            dirty: &mut self.dirty,
            display: &mut self.display_output,
        };
        let wait = body.resume(&mut ctx)?;
        trace!(process = %self.processes[idx].name, ?wait, "process suspended");

        match wait {
            Wait::On(triggers) => {
                self.check_triggers(idx, &triggers)?;
                for t in &triggers {
                    self.signals[t.signal.index()].waiters.push((pid, t.edge));
                }
                let slot = &mut self.processes[idx];
                slot.state = ProcState::Waiting(triggers);
                slot.body = Some(body);
            }
            Wait::Delay(0) => {
                return Err(SimError::InvalidWait {
                    process: self.processes[idx].name.clone(),
                    reason: "delay must be at least one tick".into(),
                });
            }
            Wait::Delay(ticks) => {
                let Some(at) = self.current_time.ticks.checked_add(ticks) else {
                    return Err(SimError::InvalidWait {
                        process: self.processes[idx].name.clone(),
                        reason: format!("delay of {ticks} ticks overflows simulation time"),
                    });
                };
                self.push_timed(at, TimedAction::Resume(pid));
                let slot = &mut self.processes[idx];
                slot.state = ProcState::Delayed;
                slot.body = Some(body);
            }
            Wait::Done => {
                self.processes[idx].state = ProcState::Done;
                debug!(process = %self.processes[idx].name, "process finished");
            }
            Wait::Stop => {
                self.processes[idx].state = ProcState::Done;
                self.stop_requested = true;
                debug!(process = %self.processes[idx].name, time = %self.current_time, "stop raised");
            }
        }
        Ok(())
    }

    fn check_triggers(&self, idx: usize, triggers: &[Trigger]) -> Result<(), SimError> {
        let invalid = |reason: &str| SimError::InvalidWait {
            process: self.processes[idx].name.clone(),
            reason: reason.to_string(),
        };
        if triggers.is_empty() {
            return Err(invalid("empty trigger set"));
        }
        for t in triggers {
            let Some(sig) = self.signals.get(t.signal.index()) else {
                return Err(invalid("trigger on unknown signal"));
            };
            if t.edge != Edge::Change && !sig.domain.is_boolean() {
                return Err(SimError::EdgeOnNonBoolean {
                    signal: sig.name.clone(),
                });
            }
        }
        Ok(())
    }

    /// Applies every pending commit at once and returns the signals whose
    /// value changed.
    fn apply_commits(&mut self) -> Result<Vec<SignalId>, SimError> {
        let dirty = mem::take(&mut self.dirty);
        let mut changed = Vec::with_capacity(dirty.len());
        for id in dirty {
            let sig = &mut self.signals[id.index()];
            let Some(next) = sig.next.take() else {
                continue;
            };
            if next != sig.value {
                sig.previous_value = sig.value;
                sig.value = next;
                changed.push(id);
            }
        }

        if let Some(rec) = &mut self.recorder {
            for &id in &changed {
                rec.record_change(self.current_time.ticks, id, self.signals[id.index()].value)?;
            }
        }
        Ok(changed)
    }

    /// Wakes processes whose triggers fired across the last transition.
    fn wake_waiters(&mut self, changed: &[SignalId]) {
        let mut woken = Vec::new();
        for &id in changed {
            let sig = &self.signals[id.index()];
            for &(pid, edge) in &sig.waiters {
                if edge.fired(sig.previous_value, sig.value) {
                    woken.push(pid);
                }
            }
        }
        woken.sort_unstable();
        woken.dedup();

        for pid in woken {
            let state = mem::replace(&mut self.processes[pid.index()].state, ProcState::Runnable);
            if let ProcState::Waiting(triggers) = state {
                for t in triggers {
                    self.signals[t.signal.index()]
                        .waiters
                        .retain(|(p, _)| *p != pid);
                }
            }
            self.runnable.push(pid);
        }
    }

    fn push_timed(&mut self, ticks: u64, action: TimedAction) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.timed_queue
            .push(Reverse(TimedEvent { ticks, seq, action }));
    }

    /// Registers all signals with the recorder and dumps their values.
    fn register_waveform(&mut self) -> Result<(), SimError> {
        let Some(rec) = &mut self.recorder else {
            return Ok(());
        };
        rec.begin_scope("top")?;
        for (idx, sig) in self.signals.iter().enumerate() {
            rec.register_signal(SignalId::from_index(idx), &sig.name, sig.domain.bit_width())?;
        }
        rec.end_scope()?;
        for (idx, sig) in self.signals.iter().enumerate() {
            rec.record_change(self.current_time.ticks, SignalId::from_index(idx), sig.value)?;
        }
        Ok(())
    }
}
