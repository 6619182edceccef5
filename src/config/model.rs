// src/config/model.rs

use std::path::PathBuf;

use serde::Deserialize;

use crate::exec::{ProgressSettings, RunnerSettings, DEFAULT_EXECUTABLE_NAME};
use crate::routing::ARCHIVE_EXTENSION;
use crate::types::{FillPattern, SizeFactor};

/// Configuration as read from a TOML file, before validation.
///
/// ```toml
/// [executable]
/// name = "bz"
/// dir = "/opt/bigzip"
///
/// [paths]
/// archive_extension = ".bigzip"
///
/// [progress]
/// tick_interval = "200ms"
///
/// [defaults]
/// factor = 64
/// fill_pattern = "repeat"
/// ```
///
/// All sections are optional and have reasonable defaults.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawConfigFile {
    #[serde(default)]
    pub executable: ExecutableSection,

    #[serde(default)]
    pub paths: PathsSection,

    #[serde(default)]
    pub progress: ProgressSection,

    #[serde(default)]
    pub defaults: DefaultsSection,
}

/// `[executable]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct ExecutableSection {
    /// File name of the bigzip executable.
    #[serde(default = "default_executable_name")]
    pub name: String,

    /// Directory to look in. If `None`, the directory of the running
    /// application is used.
    #[serde(default)]
    pub dir: Option<PathBuf>,
}

fn default_executable_name() -> String {
    DEFAULT_EXECUTABLE_NAME.to_string()
}

impl Default for ExecutableSection {
    fn default() -> Self {
        Self {
            name: default_executable_name(),
            dir: None,
        }
    }
}

/// `[paths]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct PathsSection {
    #[serde(default = "default_archive_extension")]
    pub archive_extension: String,
}

fn default_archive_extension() -> String {
    ARCHIVE_EXTENSION.to_string()
}

impl Default for PathsSection {
    fn default() -> Self {
        Self {
            archive_extension: default_archive_extension(),
        }
    }
}

/// `[progress]` section. Fractions are in `[0, 1]`.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ProgressSection {
    pub init: f64,
    pub args_ready: f64,
    pub process_started: f64,
    pub increment: f64,
    pub max_incremental: f64,
    /// Duration string such as `"200ms"` or `"1s"`.
    pub tick_interval: String,
}

impl Default for ProgressSection {
    fn default() -> Self {
        let p = ProgressSettings::default();
        Self {
            init: p.init,
            args_ready: p.args_ready,
            process_started: p.process_started,
            increment: p.increment,
            max_incremental: p.max_incremental,
            tick_interval: format!("{}ms", p.tick_interval.as_millis()),
        }
    }
}

/// `[defaults]` section: initial selections for a fresh controller.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct DefaultsSection {
    #[serde(default)]
    pub factor: SizeFactor,

    #[serde(default)]
    pub fill_pattern: FillPattern,
}

/// Validated configuration.
///
/// Only constructed through `TryFrom<RawConfigFile>` (see `validate.rs`) or
/// [`Default`].
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigFile {
    pub runner: RunnerSettings,
    pub archive_extension: String,
    pub default_factor: SizeFactor,
    pub default_fill_pattern: FillPattern,
}

impl ConfigFile {
    pub(crate) fn new_unchecked(
        runner: RunnerSettings,
        archive_extension: String,
        default_factor: SizeFactor,
        default_fill_pattern: FillPattern,
    ) -> Self {
        Self {
            runner,
            archive_extension,
            default_factor,
            default_fill_pattern,
        }
    }

    pub fn progress(&self) -> ProgressSettings {
        self.runner.progress
    }
}

impl Default for ConfigFile {
    fn default() -> Self {
        Self::new_unchecked(
            RunnerSettings::default(),
            ARCHIVE_EXTENSION.to_string(),
            SizeFactor::default(),
            FillPattern::default(),
        )
    }
}
