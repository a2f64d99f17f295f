//! Configuration types deserialized from `ripple.toml`.

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer};

/// The top-level project configuration parsed from `ripple.toml`.
///
/// Every section is optional; missing sections take their defaults.
#[derive(Debug, Default, Deserialize)]
pub struct ProjectConfig {
    /// Testbench parameters.
    #[serde(default)]
    pub bench: BenchConfig,
    /// Engine limits.
    #[serde(default)]
    pub sim: SimSettings,
    /// Waveform dump settings.
    #[serde(default)]
    pub waveform: WaveformConfig,
    /// Equivalence-check collaborator.
    #[serde(default)]
    pub verify: VerifyConfig,
}

/// Testbench parameters.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct BenchConfig {
    /// Counter range is `[-n, n)`.
    pub n: i64,
    /// Ticks between clock toggles.
    pub half_period: u64,
    /// Cycles with enable held high after reset.
    pub warmup_cycles: usize,
    /// Cycles driven from the random enable sequence.
    pub random_cycles: usize,
    /// Seed of the random enable sequence.
    pub seed: u64,
    /// Ticks between a rising clock edge and the checker's sample.
    pub sample_delay: u64,
}

impl Default for BenchConfig {
    fn default() -> Self {
        Self {
            n: 128,
            half_period: 10,
            warmup_cycles: 1000,
            random_cycles: 1000,
            seed: 2,
            sample_delay: 1,
        }
    }
}

/// Engine limits.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SimSettings {
    /// Maximum delta cycles at one tick before the run fails.
    pub max_deltas: u32,
    /// Optional time limit in ticks.
    pub time_limit: Option<u64>,
}

impl Default for SimSettings {
    fn default() -> Self {
        Self {
            max_deltas: 10_000,
            time_limit: None,
        }
    }
}

/// Waveform dump settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct WaveformConfig {
    /// Whether `ripple run` writes a VCD file.
    pub enabled: bool,
    /// Output path of the VCD file.
    pub path: String,
}

impl Default for WaveformConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            path: "out/dec.vcd".to_string(),
        }
    }
}

/// The external collaborator used by `ripple verify`.
///
/// At most one of `command` and `trace_file` may be set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct VerifyConfig {
    /// Command line of the re-simulation tool, program first.
    ///
    /// Accepts either a single string (`"./resim.sh"`) or a list of strings
    /// (`["python3", "resim.py"]`).
    #[serde(default, deserialize_with = "deserialize_opt_string_or_vec")]
    pub command: Option<Vec<String>>,
    /// Path of a previously captured trace.
    #[serde(default)]
    pub trace_file: Option<String>,
}

/// Deserializes a field that can be either a single string or a list of strings.
///
/// Allows TOML config to accept both `command = "./resim.sh"` (string) and
/// `command = ["python3", "resim.py"]` (array of strings).
fn deserialize_opt_string_or_vec<'de, D>(deserializer: D) -> Result<Option<Vec<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    struct StringOrVec;

    impl<'de> Visitor<'de> for StringOrVec {
        type Value = Vec<String>;

        fn expecting(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            formatter.write_str("a string or a list of strings")
        }

        fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
            Ok(vec![v.to_string()])
        }

        fn visit_seq<A: de::SeqAccess<'de>>(self, mut seq: A) -> Result<Self::Value, A::Error> {
            let mut vec = Vec::new();
            while let Some(val) = seq.next_element::<String>()? {
                vec.push(val);
            }
            Ok(vec)
        }
    }

    deserializer.deserialize_any(StringOrVec).map(Some)
}
