// src/types.rs

//! Shared value types for a single bigzip invocation.

use std::fmt;
use std::str::FromStr;

use serde::Deserialize;

/// Which direction the executable runs in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    #[default]
    Compress,
    Decompress,
}

impl Mode {
    /// `true` for [`Mode::Decompress`]; this is the UI's "unbigzip" toggle.
    pub fn is_decompress(self) -> bool {
        matches!(self, Mode::Decompress)
    }

    pub fn from_decompress(decompress: bool) -> Self {
        if decompress {
            Mode::Decompress
        } else {
            Mode::Compress
        }
    }
}

/// Size multiplier applied when compressing.
///
/// Only the fixed set accepted by the executable is representable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(try_from = "u32")]
pub enum SizeFactor {
    X32,
    #[default]
    X64,
    X128,
    X256,
    X512,
}

impl SizeFactor {
    pub const ALL: [SizeFactor; 5] = [
        SizeFactor::X32,
        SizeFactor::X64,
        SizeFactor::X128,
        SizeFactor::X256,
        SizeFactor::X512,
    ];

    pub fn value(self) -> u32 {
        match self {
            SizeFactor::X32 => 32,
            SizeFactor::X64 => 64,
            SizeFactor::X128 => 128,
            SizeFactor::X256 => 256,
            SizeFactor::X512 => 512,
        }
    }
}

impl TryFrom<u32> for SizeFactor {
    type Error = String;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        SizeFactor::ALL
            .into_iter()
            .find(|f| f.value() == value)
            .ok_or_else(|| {
                format!("invalid factor: {value} (expected one of 32, 64, 128, 256, 512)")
            })
    }
}

impl FromStr for SizeFactor {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value: u32 = s
            .trim()
            .parse()
            .map_err(|_| format!("invalid factor: {s} (expected one of 32, 64, 128, 256, 512)"))?;
        SizeFactor::try_from(value)
    }
}

impl fmt::Display for SizeFactor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.value())
    }
}

/// Synthetic data pattern used to inflate compressed output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FillPattern {
    #[default]
    Repeat,
    Zero,
    Random,
}

impl FillPattern {
    pub fn as_str(self) -> &'static str {
        match self {
            FillPattern::Repeat => "repeat",
            FillPattern::Zero => "zero",
            FillPattern::Random => "random",
        }
    }
}

impl FromStr for FillPattern {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "repeat" => Ok(FillPattern::Repeat),
            "zero" => Ok(FillPattern::Zero),
            "random" => Ok(FillPattern::Random),
            other => Err(format!(
                "invalid fill pattern: {other} (expected \"repeat\", \"zero\" or \"random\")"
            )),
        }
    }
}

impl fmt::Display for FillPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Everything the process runner needs for one invocation.
///
/// `factor` and `fill_pattern` are ignored unless `mode` is
/// [`Mode::Compress`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunRequest {
    pub input_path: String,
    pub output_path: Option<String>,
    pub mode: Mode,
    pub factor: SizeFactor,
    pub fill_pattern: FillPattern,
    pub force_overwrite: bool,
}

/// Fully buffered result of a finished process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunResult {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl RunResult {
    /// Exit code reported when the process never started.
    pub const FAILED_TO_START: i32 = -1;

    pub fn failed_to_start(reason: impl fmt::Display) -> Self {
        Self {
            exit_code: Self::FAILED_TO_START,
            stdout: String::new(),
            stderr: format!("Failed to start process: {reason}"),
        }
    }

    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}
