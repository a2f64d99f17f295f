//! Discrete-event, delta-cycle simulation kernel.
//!
//! This crate implements the engine the Ripple testbench runs on: typed
//! signals with checked value domains, suspendable processes that wait on
//! signal edges or timed delays, and a scheduler that enforces delta-cycle
//! ordering so results never depend on the order processes happen to run in.
//!
//! # Architecture
//!
//! The [`SimKernel`] owns every signal and process of a run. Processes are
//! explicit state machines implementing [`Process`]; each call to
//! [`Process::resume`] returns the next [`Wait`]. Commits made during a delta
//! cycle are applied together at its end, after which the kernel wakes the
//! processes whose triggers fired across that transition.
//!
//! # Usage
//!
//! ```
//! use ripple_sim::{FnProcess, SimKernel, Trigger, Wait};
//!
//! let mut kernel = SimKernel::new();
//! let clk = kernel.bool_signal("clk", false);
//! let mut armed = false;
//! kernel.spawn(FnProcess::new("watch", move |ctx| {
//!     if armed {
//!         ctx.display(format!("rise at {}", ctx.now().ticks));
//!         return Ok(Wait::Done);
//!     }
//!     armed = true;
//!     Ok(Wait::On(vec![Trigger::posedge(clk)]))
//! }));
//! kernel.schedule(10, clk, true).unwrap();
//! let result = kernel.run().unwrap();
//! assert_eq!(result.display_output, vec!["rise at 10"]);
//! ```
//!
//! # Modules
//!
//! - `error`: Simulation error types
//! - `ids`: Signal and process IDs
//! - `time`: Tick time with delta cycles
//! - `value`: Values, domains, typed signal handles, signal state
//! - `process`: The process trait, triggers and waits
//! - `waveform`: Waveform recording (VCD format)
//! - `kernel`: Simulation kernel with event queue and delta-cycle loop

#![warn(missing_docs)]

pub mod error;
pub mod ids;
pub mod kernel;
pub mod process;
pub mod time;
pub mod value;
pub mod waveform;

use std::fs::{self, File};
use std::io::BufWriter;
use std::path::PathBuf;

pub use error::SimError;
pub use ids::{ProcessId, SignalId};
pub use kernel::{EndReason, SchedulerState, SimKernel, SimResult, StepResult, DEFAULT_MAX_DELTAS};
pub use process::{Edge, FnProcess, Process, ProcessContext, Trigger, Wait};
pub use time::SimTime;
pub use value::{BoundedInt, Domain, OutOfRange, Signal, SignalValue, Value};
pub use waveform::{VcdRecorder, WaveformRecorder};

/// Configuration for a simulation run.
///
/// Controls limits and waveform output.
#[derive(Debug, Clone)]
pub struct SimConfig {
    /// Optional time limit in ticks. If `None`, the run ends on Stop or Halt.
    pub time_limit: Option<u64>,
    /// Maximum delta cycles at a single tick.
    pub max_deltas: u32,
    /// Path for VCD output. No waveform is recorded when `None`.
    pub waveform_path: Option<PathBuf>,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            time_limit: None,
            max_deltas: DEFAULT_MAX_DELTAS,
            waveform_path: None,
        }
    }
}

impl SimConfig {
    /// Applies the limits to `kernel` and attaches a VCD recorder if a
    /// waveform path is set. Missing parent directories are created.
    pub fn apply(&self, kernel: &mut SimKernel) -> Result<(), SimError> {
        if let Some(limit) = self.time_limit {
            kernel.set_time_limit(limit);
        }
        kernel.set_max_delta(self.max_deltas);

        if let Some(path) = &self.waveform_path {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                fs::create_dir_all(parent)?;
            }
            let writer = BufWriter::new(File::create(path)?);
            kernel.set_recorder(Box::new(VcdRecorder::new(writer)))?;
        }
        Ok(())
    }
}
