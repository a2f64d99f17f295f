//! Decrementer testbench and equivalence harness for the Ripple simulator.
//!
//! The circuit under test is a decrementing counter with enable and an
//! asynchronous active-low reset, expressed as several encodings that must
//! behave identically. A [`Bench`] wraps one encoding with clock, reset,
//! stimulus and checker processes and records the checker's [`Trace`].
//! [`run_equivalence_check`] compares that trace with one produced by an
//! [`ExternalSimulator`].
//!
//! # Modules
//!
//! - `dec`: FSM variants and their constructors
//! - `bench`: Bench parameters and orchestration
//! - `trace`: Trace parsing and diffing
//! - `harness`: External simulators and the equivalence check
//! - `error`: Bench error types

#![warn(missing_docs)]

pub mod bench;
pub mod dec;
pub mod error;
pub mod harness;
pub mod trace;

pub use bench::{enable_sequence, run_bench, run_bench_with, Bench, BenchParams, BenchRun, BenchSignals};
pub use dec::{next_count, DecConstructor, DecVariant, ACTIVE_LOW, INACTIVE_HIGH};
pub use error::BenchError;
pub use harness::{
    exit_code, run_equivalence_check, CommandSimulator, EquivalenceReport, ExternalSimulator,
    TraceFileSimulator, VariantSimulator, EXIT_ERROR, EXIT_MATCH, EXIT_MISMATCH,
};
pub use trace::{Trace, TraceMismatch};
