//! Simulation error types for the delta-cycle kernel.
//!
//! All errors that can occur while building or running a simulation are
//! represented as variants of [`SimError`]. Every variant aborts the run that
//! produced it; the kernel never retries.

use std::io;

use crate::time::SimTime;

/// Errors that can occur during simulation setup or execution.
#[derive(Debug, thiserror::Error)]
pub enum SimError {
    /// A committed value lies outside the signal's integer domain.
    #[error("range violation on '{signal}': {value} is outside [{min}, {max})")]
    RangeViolation {
        /// Name of the signal that rejected the value.
        signal: String,
        /// The offending value.
        value: i64,
        /// Inclusive lower bound of the domain.
        min: i64,
        /// Exclusive upper bound of the domain.
        max: i64,
    },

    /// A value of the wrong kind was committed to a signal.
    #[error("type mismatch on '{signal}': expected {expected} value")]
    TypeMismatch {
        /// Name of the signal that rejected the value.
        signal: String,
        /// The kind of value the signal accepts.
        expected: &'static str,
    },

    /// A process asked to wait on an edge of a non-boolean signal.
    #[error("edge trigger on non-boolean signal '{signal}'")]
    EdgeOnNonBoolean {
        /// Name of the signal.
        signal: String,
    },

    /// A process returned a wait that can never be satisfied.
    #[error("invalid wait in process '{process}': {reason}")]
    InvalidWait {
        /// Name of the offending process.
        process: String,
        /// Description of what is wrong with the wait.
        reason: String,
    },

    /// The event queue drained while processes were still marked runnable
    /// with nothing left to run them.
    #[error("scheduling deadlock at {time}: blocked processes [{}]", blocked.join(", "))]
    SchedulingDeadlock {
        /// Simulation time at which the queue drained.
        time: SimTime,
        /// Names of the processes that can never be serviced.
        blocked: Vec<String>,
    },

    /// A drive was scheduled before the current simulation time.
    #[error("cannot schedule at tick {requested}: simulation is already at {time}")]
    ScheduleInPast {
        /// The requested tick.
        requested: u64,
        /// Simulation time when the request was made.
        time: SimTime,
    },

    /// The kernel was used again after a run failed.
    #[error("simulation already failed at {time}")]
    Failed {
        /// Simulation time of the original failure.
        time: SimTime,
    },

    /// Too many delta cycles at a single time step, indicating a combinational loop.
    #[error("delta cycle limit exceeded at {time} (max {max_deltas} deltas)")]
    DeltaCycleLimit {
        /// The time step where the limit was hit.
        time: SimTime,
        /// The maximum number of delta cycles allowed.
        max_deltas: u32,
    },

    /// An I/O error occurred while writing waveform data.
    #[error("waveform I/O error: {0}")]
    WaveformIo(#[from] io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn range_violation_display() {
        let e = SimError::RangeViolation {
            signal: "count".into(),
            value: 128,
            min: -128,
            max: 128,
        };
        assert_eq!(
            e.to_string(),
            "range violation on 'count': 128 is outside [-128, 128)"
        );
    }

    #[test]
    fn type_mismatch_display() {
        let e = SimError::TypeMismatch {
            signal: "clock".into(),
            expected: "boolean",
        };
        assert_eq!(e.to_string(), "type mismatch on 'clock': expected boolean value");
    }

    #[test]
    fn edge_on_non_boolean_display() {
        let e = SimError::EdgeOnNonBoolean {
            signal: "count".into(),
        };
        assert_eq!(e.to_string(), "edge trigger on non-boolean signal 'count'");
    }

    #[test]
    fn invalid_wait_display() {
        let e = SimError::InvalidWait {
            process: "clock_gen".into(),
            reason: "zero delay".into(),
        };
        assert_eq!(e.to_string(), "invalid wait in process 'clock_gen': zero delay");
    }

    #[test]
    fn deadlock_display() {
        let e = SimError::SchedulingDeadlock {
            time: SimTime::from_ticks(40),
            blocked: vec!["dec".into(), "check".into()],
        };
        assert_eq!(
            e.to_string(),
            "scheduling deadlock at 40: blocked processes [dec, check]"
        );
    }

    #[test]
    fn schedule_in_past_display() {
        let e = SimError::ScheduleInPast {
            requested: 50,
            time: SimTime { ticks: 100, delta: 1 },
        };
        assert_eq!(
            e.to_string(),
            "cannot schedule at tick 50: simulation is already at 100+d1"
        );
        let e = SimError::Failed {
            time: SimTime::from_ticks(7),
        };
        assert_eq!(e.to_string(), "simulation already failed at 7");
    }

    #[test]
    fn delta_cycle_limit_display() {
        let e = SimError::DeltaCycleLimit {
            time: SimTime::from_ticks(100),
            max_deltas: 10000,
        };
        assert_eq!(
            e.to_string(),
            "delta cycle limit exceeded at 100 (max 10000 deltas)"
        );
    }

    #[test]
    fn waveform_io_display() {
        let e = SimError::WaveformIo(io::Error::new(io::ErrorKind::NotFound, "file not found"));
        assert!(e.to_string().contains("waveform I/O error"));
    }
}
