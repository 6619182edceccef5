// src/exec/mod.rs

//! Process execution layer.
//!
//! This module is responsible for actually running the bigzip executable
//! with `tokio::process::Command` and turning what it prints into something
//! the controller can use.
//!
//! - [`args`] builds the argument vector for a [`RunRequest`](crate::types::RunRequest).
//! - [`progress`] holds the progress checkpoints and the synthetic ticker.
//! - [`runner`] provides the `ProcessRunner` trait and the concrete
//!   `RealProcessRunner`, which tests replace with fakes.
//! - [`summary`] parses the executable's one-line summary.

pub mod args;
pub mod progress;
pub mod runner;
pub mod summary;

pub use args::build_args;
pub use progress::{NoProgress, ProgressSample, ProgressSettings, ProgressSink};
pub use runner::{ProcessRunner, RealProcessRunner, RunnerSettings, DEFAULT_EXECUTABLE_NAME};
pub use summary::parse_output_path;
