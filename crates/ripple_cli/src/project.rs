//! Shared helpers for CLI commands.
//!
//! Resolves the `ripple.toml` in effect and converts its sections into the
//! bench and engine settings used by `run` and `verify`.

use std::path::{Path, PathBuf};

use ripple_bench::BenchParams;
use ripple_config::{BenchConfig, ProjectConfig, CONFIG_FILE_NAME};
use ripple_sim::SimConfig;
use tracing::debug;

use crate::GlobalArgs;

/// Loads the project configuration selected by the global flags.
///
/// If `--config` is specified it may name a file or a directory containing
/// `ripple.toml`; a missing path is an error. Otherwise `./ripple.toml` is
/// used when present and built-in defaults when not.
pub fn load_project_config(
    global: &GlobalArgs,
) -> Result<ProjectConfig, Box<dyn std::error::Error>> {
    let cwd = std::env::current_dir()?;
    load_project_config_from(global.config.as_deref(), &cwd)
}

fn load_project_config_from(
    config: Option<&str>,
    cwd: &Path,
) -> Result<ProjectConfig, Box<dyn std::error::Error>> {
    let path = match config {
        Some(config_path) => {
            let p = PathBuf::from(config_path);
            if p.is_dir() {
                p.join(CONFIG_FILE_NAME)
            } else if p.is_file() {
                p
            } else {
                return Err(format!("config path does not exist: {config_path}").into());
            }
        }
        None => {
            let p = cwd.join(CONFIG_FILE_NAME);
            if !p.is_file() {
                debug!("no {CONFIG_FILE_NAME} in {}, using defaults", cwd.display());
                return Ok(ProjectConfig::default());
            }
            p
        }
    };

    debug!(path = %path.display(), "loading configuration");
    ripple_config::load_config_file(&path)
        .map_err(|e| format!("{}: {e}", path.display()).into())
}

/// Converts the `[bench]` section into bench parameters, applying flag overrides.
pub fn bench_params(config: &BenchConfig, seed: Option<u64>, n: Option<i64>) -> BenchParams {
    BenchParams {
        n: n.unwrap_or(config.n),
        half_period: config.half_period,
        warmup_cycles: config.warmup_cycles,
        random_cycles: config.random_cycles,
        seed: seed.unwrap_or(config.seed),
        sample_delay: config.sample_delay,
    }
}

/// Builds the engine configuration.
///
/// `vcd` overrides the `[waveform]` section; without it a waveform is only
/// written when `waveform.enabled` is set.
pub fn sim_config(config: &ProjectConfig, vcd: Option<&str>) -> SimConfig {
    let waveform_path = match vcd {
        Some(path) => Some(PathBuf::from(path)),
        None if config.waveform.enabled => Some(PathBuf::from(&config.waveform.path)),
        None => None,
    };
    SimConfig {
        time_limit: config.sim.time_limit,
        max_deltas: config.sim.max_deltas,
        waveform_path,
    }
}
