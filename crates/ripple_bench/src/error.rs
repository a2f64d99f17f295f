//! Error types for testbench runs and equivalence checks.

use std::io;

use ripple_sim::SimError;

/// Errors raised while building or running a bench, or while talking to an
/// external simulator.
#[derive(Debug, thiserror::Error)]
pub enum BenchError {
    /// The simulation engine failed.
    #[error(transparent)]
    Sim(#[from] SimError),

    /// A bench parameter is out of its accepted range.
    #[error("invalid parameter '{name}': {reason}")]
    InvalidParameter {
        /// Parameter name.
        name: &'static str,
        /// What is wrong with it.
        reason: String,
    },

    /// A trace line is not a decimal integer.
    #[error("trace line {line}: cannot parse '{text}' as an integer")]
    TraceParse {
        /// One-based line number.
        line: usize,
        /// The offending text.
        text: String,
    },

    /// An external simulator could not produce a trace.
    #[error("external simulator '{tool}' failed: {reason}")]
    External {
        /// Name of the collaborator.
        tool: String,
        /// Failure description.
        reason: String,
    },

    /// Reading or writing a file failed.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The run ended without a Stop or a Halt.
    #[error("bench run aborted: {reason}")]
    Aborted {
        /// Why the run is considered incomplete.
        reason: String,
    },
}
