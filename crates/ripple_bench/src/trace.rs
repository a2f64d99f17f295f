//! Checker traces and trace comparison.
//!
//! A [`Trace`] is the ordered list of `count` samples a bench run printed.
//! The text form is one decimal integer per line; blank lines are ignored,
//! so traces captured from other tools compare cleanly.

use std::fmt;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::BenchError;

/// Ordered sequence of sampled counter values.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Trace(Vec<i64>);

impl Trace {
    /// Wraps a list of samples.
    pub fn new(samples: Vec<i64>) -> Self {
        Self(samples)
    }

    /// The samples in order.
    pub fn samples(&self) -> &[i64] {
        &self.0
    }

    /// Number of samples.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` if nothing was sampled.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Parses text lines, skipping blank ones.
    pub fn from_lines<I, S>(lines: I) -> Result<Self, BenchError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut samples = Vec::new();
        for (idx, line) in lines.into_iter().enumerate() {
            let text = line.as_ref().trim();
            if text.is_empty() {
                continue;
            }
            let value = text.parse::<i64>().map_err(|_| BenchError::TraceParse {
                line: idx + 1,
                text: text.to_string(),
            })?;
            samples.push(value);
        }
        Ok(Self(samples))
    }

    /// Parses the text form.
    pub fn parse(text: &str) -> Result<Self, BenchError> {
        Self::from_lines(text.lines())
    }

    /// Reads and parses a trace file.
    pub fn read_file(path: &Path) -> Result<Self, BenchError> {
        Self::parse(&fs::read_to_string(path)?)
    }

    /// Writes the text form to a file.
    pub fn write_file(&self, path: &Path) -> Result<(), BenchError> {
        fs::write(path, self.to_string())?;
        Ok(())
    }

    /// Compares against `actual`, treating `self` as the expected trace.
    ///
    /// Returns `None` when both traces are identical.
    pub fn diff(&self, actual: &Trace) -> Option<TraceMismatch> {
        let longest = self.len().max(actual.len());
        let mut first = None;
        let mut mismatches = 0;
        for cycle in 0..longest {
            let expected = self.0.get(cycle).copied();
            let got = actual.0.get(cycle).copied();
            if expected != got {
                mismatches += 1;
                first.get_or_insert((cycle, expected, got));
            }
        }
        first.map(|(cycle, expected, actual_value)| TraceMismatch {
            cycle,
            expected,
            actual: actual_value,
            mismatches,
            expected_len: self.len(),
            actual_len: actual.len(),
        })
    }
}

impl fmt::Display for Trace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for v in &self.0 {
            writeln!(f, "{v}")?;
        }
        Ok(())
    }
}

impl FromIterator<i64> for Trace {
    fn from_iter<I: IntoIterator<Item = i64>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// The difference between two traces.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, thiserror::Error)]
#[error(
    "traces differ at cycle {cycle}: expected {}, got {} ({mismatches} differing cycles)",
    show(.expected),
    show(.actual)
)]
pub struct TraceMismatch {
    /// Index of the first differing sample.
    pub cycle: usize,
    /// Expected sample, `None` past the end of the expected trace.
    pub expected: Option<i64>,
    /// Actual sample, `None` past the end of the actual trace.
    pub actual: Option<i64>,
    /// Total number of differing cycles.
    pub mismatches: usize,
    /// Length of the expected trace.
    pub expected_len: usize,
    /// Length of the actual trace.
    pub actual_len: usize,
}

fn show(v: &Option<i64>) -> String {
    match v {
        Some(v) => v.to_string(),
        None => "end of trace".to_string(),
    }
}
