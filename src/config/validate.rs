// src/config/validate.rs

use crate::config::model::{ConfigFile, ProgressSection, RawConfigFile};
use crate::errors::{BigzipError, Result};
use crate::exec::progress::parse_duration;
use crate::exec::{ProgressSettings, RunnerSettings};

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = crate::errors::BigzipError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        validate_executable(&raw)?;
        validate_extension(&raw)?;
        let progress = validate_progress(&raw.progress)?;

        let runner = RunnerSettings {
            executable_name: raw.executable.name,
            executable_dir: raw.executable.dir,
            progress,
        };
        Ok(ConfigFile::new_unchecked(
            runner,
            raw.paths.archive_extension,
            raw.defaults.factor,
            raw.defaults.fill_pattern,
        ))
    }
}

fn validate_executable(cfg: &RawConfigFile) -> Result<()> {
    if cfg.executable.name.trim().is_empty() {
        return Err(BigzipError::ConfigError(
            "[executable].name must not be empty".to_string(),
        ));
    }
    Ok(())
}

fn validate_extension(cfg: &RawConfigFile) -> Result<()> {
    let ext = &cfg.paths.archive_extension;
    if ext.len() < 2 || !ext.starts_with('.') || !ext.is_ascii() {
        return Err(BigzipError::ConfigError(format!(
            "[paths].archive_extension must be an ASCII extension starting with '.' (got {ext:?})"
        )));
    }
    Ok(())
}

fn validate_progress(p: &ProgressSection) -> Result<ProgressSettings> {
    let ordered = 0.0 <= p.init
        && p.init <= p.args_ready
        && p.args_ready <= p.process_started
        && p.process_started <= p.max_incremental
        && p.max_incremental < 1.0;
    if !ordered {
        return Err(BigzipError::ConfigError(format!(
            "[progress] checkpoints must satisfy \
             0 <= init <= args_ready <= process_started <= max_incremental < 1 \
             (got {}, {}, {}, {})",
            p.init, p.args_ready, p.process_started, p.max_incremental
        )));
    }

    if !(p.increment > 0.0) {
        return Err(BigzipError::ConfigError(format!(
            "[progress].increment must be > 0 (got {})",
            p.increment
        )));
    }

    let tick_interval = parse_duration(&p.tick_interval)
        .map_err(|e| BigzipError::ConfigError(format!("[progress].tick_interval: {e}")))?;
    if tick_interval.is_zero() {
        return Err(BigzipError::ConfigError(
            "[progress].tick_interval must be greater than zero".to_string(),
        ));
    }

    Ok(ProgressSettings {
        init: p.init,
        args_ready: p.args_ready,
        process_started: p.process_started,
        increment: p.increment,
        max_incremental: p.max_incremental,
        tick_interval,
    })
}
