//! Signal values, value domains, typed signal handles and per-signal state.
//!
//! A signal stores an untyped [`Value`] constrained by a [`Domain`]. Processes
//! and testbenches hold typed [`Signal<T>`] handles, so a boolean clock can
//! never be read as an integer and vice versa. Every commit is checked
//! against the domain before it becomes pending.

use std::fmt;
use std::marker::PhantomData;

use serde::{Deserialize, Serialize};

use crate::error::SimError;
use crate::ids::{ProcessId, SignalId};
use crate::process::Edge;

/// The contents of a signal cell.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Value {
    /// A single-bit boolean value.
    Bool(bool),
    /// A signed integer value.
    Int(i64),
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Bool(b) => write!(f, "{}", u8::from(*b)),
            Value::Int(v) => write!(f, "{v}"),
        }
    }
}

/// The set of values a signal accepts.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Domain {
    /// Booleans only. Edges are defined only on this domain.
    Bool,
    /// Integers in the closed-open range `[min, max)`.
    Int {
        /// Inclusive lower bound.
        min: i64,
        /// Exclusive upper bound.
        max: i64,
    },
}

impl Domain {
    /// Returns `true` for the boolean domain.
    pub fn is_boolean(&self) -> bool {
        matches!(self, Domain::Bool)
    }

    /// Checks that `value` belongs to this domain.
    pub fn check(&self, signal: &str, value: Value) -> Result<(), SimError> {
        match (self, value) {
            (Domain::Bool, Value::Bool(_)) => Ok(()),
            (Domain::Bool, Value::Int(_)) => Err(SimError::TypeMismatch {
                signal: signal.to_string(),
                expected: "boolean",
            }),
            (Domain::Int { min, max }, Value::Int(v)) => {
                if (*min..*max).contains(&v) {
                    Ok(())
                } else {
                    Err(SimError::RangeViolation {
                        signal: signal.to_string(),
                        value: v,
                        min: *min,
                        max: *max,
                    })
                }
            }
            (Domain::Int { .. }, Value::Bool(_)) => Err(SimError::TypeMismatch {
                signal: signal.to_string(),
                expected: "integer",
            }),
        }
    }

    /// Number of bits needed to hold every value of the domain.
    ///
    /// Domains with a negative lower bound use two's complement.
    pub fn bit_width(&self) -> u32 {
        match *self {
            Domain::Bool => 1,
            Domain::Int { min, max } => {
                let hi = max - 1;
                if min >= 0 {
                    (u64::BITS - (hi as u64).leading_zeros()).max(1)
                } else {
                    let magnitude = hi.max(-(min + 1)).max(0) as u64;
                    u64::BITS - magnitude.leading_zeros() + 1
                }
            }
        }
    }
}

/// Rust types that can live in a signal.
pub trait SignalValue: Copy + fmt::Debug + 'static {
    /// Human-readable kind, used in error messages.
    const KIND: &'static str;

    /// Wraps the value.
    fn into_value(self) -> Value;

    /// Unwraps a value of this kind.
    ///
    /// Typed handles guarantee the kind matches; the other arm is a lossless
    /// best effort rather than a panic.
    fn from_value(value: Value) -> Self;
}

impl SignalValue for bool {
    const KIND: &'static str = "boolean";

    fn into_value(self) -> Value {
        Value::Bool(self)
    }

    fn from_value(value: Value) -> Self {
        match value {
            Value::Bool(b) => b,
            Value::Int(v) => v != 0,
        }
    }
}

impl SignalValue for i64 {
    const KIND: &'static str = "integer";

    fn into_value(self) -> Value {
        Value::Int(self)
    }

    fn from_value(value: Value) -> Self {
        match value {
            Value::Int(v) => v,
            Value::Bool(b) => i64::from(b),
        }
    }
}

/// A typed, copyable handle to a kernel-owned signal.
///
/// Handles are only created by the kernel's signal constructors, which pick
/// a domain matching `T`.
pub struct Signal<T> {
    id: SignalId,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Signal<T> {
    pub(crate) fn new(id: SignalId) -> Self {
        Self {
            id,
            _marker: PhantomData,
        }
    }

    /// Returns the untyped signal ID.
    pub fn id(&self) -> SignalId {
        self.id
    }
}

impl<T> Clone for Signal<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Signal<T> {}

impl<T> PartialEq for Signal<T> {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl<T> Eq for Signal<T> {}

impl<T> fmt::Debug for Signal<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Signal").field(&self.id.as_raw()).finish()
    }
}

/// A value outside a [`BoundedInt`]'s range.
#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
#[error("{value} is outside [{min}, {max})")]
pub struct OutOfRange {
    /// The rejected value.
    pub value: i64,
    /// Inclusive lower bound.
    pub min: i64,
    /// Exclusive upper bound.
    pub max: i64,
}

impl OutOfRange {
    /// Attributes the violation to a named cell, producing a [`SimError`].
    pub fn on(self, signal: &str) -> SimError {
        SimError::RangeViolation {
            signal: signal.to_string(),
            value: self.value,
            min: self.min,
            max: self.max,
        }
    }
}

/// An integer constrained to `[min, max)`, held outside any signal.
///
/// A failed [`set`](BoundedInt::set) leaves the old value in place.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BoundedInt {
    value: i64,
    min: i64,
    max: i64,
}

impl BoundedInt {
    /// Creates a bounded integer holding `value`.
    pub fn new(value: i64, min: i64, max: i64) -> Result<Self, OutOfRange> {
        if (min..max).contains(&value) {
            Ok(Self { value, min, max })
        } else {
            Err(OutOfRange { value, min, max })
        }
    }

    /// Current value.
    pub fn get(&self) -> i64 {
        self.value
    }

    /// Inclusive lower bound.
    pub fn min(&self) -> i64 {
        self.min
    }

    /// Exclusive upper bound.
    pub fn max(&self) -> i64 {
        self.max
    }

    /// Replaces the value if it is in range.
    pub fn set(&mut self, value: i64) -> Result<(), OutOfRange> {
        if (self.min..self.max).contains(&value) {
            self.value = value;
            Ok(())
        } else {
            Err(OutOfRange {
                value,
                min: self.min,
                max: self.max,
            })
        }
    }
}

/// The full runtime state of a simulation signal.
///
/// Tracks the readable value, the value before the last transition (for
/// edge detection), the pending value for the next delta cycle, and the
/// processes currently suspended on this signal.
#[derive(Clone, Debug)]
pub struct SignalState {
    /// Hierarchical name for error messages and waveform output.
    pub name: String,
    /// Accepted values.
    pub domain: Domain,
    /// Current readable value.
    pub value: Value,
    /// Value before the most recent transition.
    pub previous_value: Value,
    /// Value committed for the next delta cycle, if any.
    pub next: Option<Value>,
    /// Processes waiting on this signal and the edge each one waits for.
    pub waiters: Vec<(ProcessId, Edge)>,
}

impl SignalState {
    /// Creates a signal state holding `init`, which must satisfy `domain`.
    pub fn new(name: String, domain: Domain, init: Value) -> Result<Self, SimError> {
        domain.check(&name, init)?;
        Ok(Self {
            name,
            domain,
            value: init,
            previous_value: init,
            next: None,
            waiters: Vec::new(),
        })
    }
}
