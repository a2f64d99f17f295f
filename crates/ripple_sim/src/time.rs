//! Simulation time: integer ticks plus a delta-cycle index.
//!
//! [`SimTime`] orders events first by tick, then by delta cycle. Ticks carry
//! no physical unit; a testbench picks its own clock period in ticks.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// A simulation time point with delta cycle tracking.
///
/// Delta cycles are the settle-and-propagate passes that happen within a
/// single tick before time is allowed to advance.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SimTime {
    /// Simulated time in ticks.
    pub ticks: u64,
    /// Delta cycle index within the current tick.
    pub delta: u32,
}

impl SimTime {
    /// Creates a time point at tick zero, delta zero.
    pub fn zero() -> Self {
        Self { ticks: 0, delta: 0 }
    }

    /// Creates a time at the given tick with delta 0.
    pub fn from_ticks(ticks: u64) -> Self {
        Self { ticks, delta: 0 }
    }

    /// Returns the next delta cycle at the same tick.
    pub fn next_delta(&self) -> Self {
        Self {
            ticks: self.ticks,
            delta: self.delta + 1,
        }
    }

    /// Advances to a later tick, resetting the delta counter.
    ///
    /// Advancing to the current tick keeps the delta counter, so time never
    /// moves backwards.
    pub fn advance_to(&self, ticks: u64) -> Self {
        debug_assert!(
            ticks >= self.ticks,
            "cannot advance backwards: {} -> {}",
            self.ticks,
            ticks
        );
        if ticks == self.ticks {
            *self
        } else {
            Self { ticks, delta: 0 }
        }
    }
}

impl Default for SimTime {
    fn default() -> Self {
        Self::zero()
    }
}

impl Ord for SimTime {
    fn cmp(&self, other: &Self) -> Ordering {
        self.ticks
            .cmp(&other.ticks)
            .then(self.delta.cmp(&other.delta))
    }
}

impl PartialOrd for SimTime {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for SimTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.ticks)?;
        if self.delta > 0 {
            write!(f, "+d{}", self.delta)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_time() {
        let t = SimTime::zero();
        assert_eq!(t.ticks, 0);
        assert_eq!(t.delta, 0);
    }

    #[test]
    fn next_delta_keeps_tick() {
        let t = SimTime::from_ticks(5);
        let t2 = t.next_delta();
        assert_eq!(t2.ticks, 5);
        assert_eq!(t2.delta, 1);
        assert_eq!(t2.next_delta().delta, 2);
    }

    #[test]
    fn advance_resets_delta() {
        let t = SimTime { ticks: 100, delta: 5 };
        let t2 = t.advance_to(200);
        assert_eq!(t2, SimTime::from_ticks(200));
    }

    #[test]
    fn advance_to_same_tick_keeps_delta() {
        let t = SimTime { ticks: 100, delta: 5 };
        assert_eq!(t.advance_to(100), t);
        assert!(t.advance_to(100) >= t);
    }

    #[test]
    fn ordering_ticks_take_precedence() {
        let a = SimTime { ticks: 200, delta: 0 };
        let b = SimTime { ticks: 100, delta: 99 };
        assert!(a > b);
        assert!(SimTime { ticks: 100, delta: 0 } < SimTime { ticks: 100, delta: 1 });
    }

    #[test]
    fn display() {
        assert_eq!(SimTime::zero().to_string(), "0");
        assert_eq!(SimTime::from_ticks(40).to_string(), "40");
        assert_eq!(SimTime { ticks: 40, delta: 3 }.to_string(), "40+d3");
    }

    #[test]
    fn serde_roundtrip() {
        let t = SimTime {
            ticks: 12345,
            delta: 7,
        };
        let json = serde_json::to_string(&t).unwrap();
        let back: SimTime = serde_json::from_str(&json).unwrap();
        assert_eq!(t, back);
    }
}
