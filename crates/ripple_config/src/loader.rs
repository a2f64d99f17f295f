//! Configuration file loading and validation.

use crate::error::ConfigError;
use crate::types::ProjectConfig;
use std::path::Path;

/// File name looked up in a project directory.
pub const CONFIG_FILE_NAME: &str = "ripple.toml";

/// Loads and validates a `ripple.toml` configuration from a project directory.
///
/// Reads `<project_dir>/ripple.toml`, parses it, and validates its values.
pub fn load_config(project_dir: &Path) -> Result<ProjectConfig, ConfigError> {
    load_config_file(&project_dir.join(CONFIG_FILE_NAME))
}

/// Loads and validates a configuration file at an explicit path.
pub fn load_config_file(path: &Path) -> Result<ProjectConfig, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    load_config_from_str(&content)
}

/// Parses and validates a `ripple.toml` configuration from a string.
///
/// Useful for testing without filesystem dependencies.
pub fn load_config_from_str(content: &str) -> Result<ProjectConfig, ConfigError> {
    let config: ProjectConfig =
        toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))?;
    validate_config(&config)?;
    Ok(config)
}

/// Validates that configuration values are in range and consistent.
fn validate_config(config: &ProjectConfig) -> Result<(), ConfigError> {
    let invalid = |msg: String| Err(ConfigError::ValidationError(msg));
    let bench = &config.bench;

    if bench.n <= 0 {
        return invalid(format!("bench.n must be positive, got {}", bench.n));
    }
    if bench.half_period == 0 {
        return invalid("bench.half_period must be at least 1".to_string());
    }
    if bench.sample_delay == 0 || bench.sample_delay >= bench.half_period {
        return invalid(format!(
            "bench.sample_delay must be in [1, {}), got {}",
            bench.half_period, bench.sample_delay
        ));
    }
    if config.sim.max_deltas == 0 {
        return invalid("sim.max_deltas must be at least 1".to_string());
    }
    if config.waveform.enabled && config.waveform.path.is_empty() {
        return invalid("waveform.path must not be empty when waveforms are enabled".to_string());
    }
    if config.verify.command.as_ref().is_some_and(|c| c.is_empty()) {
        return invalid("verify.command must not be empty".to_string());
    }
    if config.verify.command.is_some() && config.verify.trace_file.is_some() {
        return invalid("verify.command and verify.trace_file are mutually exclusive".to_string());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_full_config() {
        let toml = r#"
[bench]
n = 16
half_period = 5
warmup_cycles = 40
random_cycles = 60
seed = 11
sample_delay = 2

[sim]
max_deltas = 500
time_limit = 100000

[waveform]
enabled = true
path = "build/wave.vcd"

[verify]
trace_file = "golden.trace"
"#;
        let config = load_config_from_str(toml).unwrap();
        assert_eq!(config.bench.n, 16);
        assert_eq!(config.bench.half_period, 5);
        assert_eq!(config.bench.warmup_cycles, 40);
        assert_eq!(config.bench.random_cycles, 60);
        assert_eq!(config.bench.seed, 11);
        assert_eq!(config.bench.sample_delay, 2);
        assert_eq!(config.sim.max_deltas, 500);
        assert_eq!(config.sim.time_limit, Some(100_000));
        assert!(config.waveform.enabled);
        assert_eq!(config.waveform.path, "build/wave.vcd");
        assert_eq!(config.verify.trace_file.as_deref(), Some("golden.trace"));
    }

    #[test]
    fn parse_error_invalid_toml() {
        let result = load_config_from_str("[bench\nn = 3");
        assert!(matches!(result.unwrap_err(), ConfigError::ParseError(_)));
    }

    #[test]
    fn reject_non_positive_n() {
        let err = load_config_from_str("[bench]\nn = 0\n").unwrap_err();
        match err {
            ConfigError::ValidationError(msg) => assert!(msg.contains("bench.n")),
            other => panic!("expected ValidationError, got {other:?}"),
        }
    }

    #[test]
    fn reject_sample_delay_past_half_period() {
        let toml = "[bench]\nhalf_period = 4\nsample_delay = 4\n";
        assert!(matches!(
            load_config_from_str(toml),
            Err(ConfigError::ValidationError(_))
        ));
        let toml = "[bench]\nsample_delay = 0\n";
        assert!(load_config_from_str(toml).is_err());
    }

    #[test]
    fn reject_zero_max_deltas() {
        assert!(load_config_from_str("[sim]\nmax_deltas = 0\n").is_err());
    }

    #[test]
    fn reject_empty_command() {
        let err = load_config_from_str("[verify]\ncommand = []\n").unwrap_err();
        assert!(err.to_string().contains("verify.command"));
    }

    #[test]
    fn reject_command_and_trace_file() {
        let toml = r#"
[verify]
command = "./resim.sh"
trace_file = "golden.trace"
"#;
        let err = load_config_from_str(toml).unwrap_err();
        assert!(err.to_string().contains("mutually exclusive"));
    }

    #[test]
    fn reject_enabled_waveform_without_path() {
        let toml = "[waveform]\nenabled = true\npath = \"\"\n";
        assert!(load_config_from_str(toml).is_err());
    }

    #[test]
    fn load_from_directory() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(CONFIG_FILE_NAME), "[bench]\nseed = 9\n").unwrap();
        let config = load_config(dir.path()).unwrap();
        assert_eq!(config.bench.seed, 9);
    }

    #[test]
    fn missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_config(dir.path()).unwrap_err();
        assert!(matches!(err, ConfigError::IoError(_)));
    }
}
