// src/engine/mod.rs

//! Run controller for the bigzip front end.
//!
//! This module ties together:
//! - the path router (input/output/mode edits)
//! - validation and overwrite confirmation
//! - the process runner and its progress stream
//! - finalisation of every run, however it ended
//!
//! The pure core state machine lives in [`core`] and [`event_handlers`]; the
//! per-run async work is in [`pipeline`]; the async shell that serialises
//! every state change through one queue is [`runtime`].

use crate::exec::ProgressSample;
use crate::types::{FillPattern, Mode, RunRequest, SizeFactor};

/// Identifies one run attempt; never reused.
pub type RunId = u64;

/// Externally visible controller phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    #[default]
    Idle,
    Validating,
    Running,
    Cancelling,
}

/// How a run attempt ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// Stopped before launching anything. `status` is `None` when the
    /// message already went to a message collaborator.
    Rejected { status: Option<String> },
    /// Exit code 0.
    Succeeded { summary: String, output_path: String },
    /// Non-zero exit code, with trimmed stderr.
    Failed { stderr: String },
    Cancelled,
    /// Anything unexpected, including a panic inside the run.
    Errored(String),
}

impl RunOutcome {
    /// Status line to show once the run is finalised, if any.
    pub fn status_message(&self) -> Option<String> {
        match self {
            RunOutcome::Rejected { status } => status.clone(),
            RunOutcome::Succeeded { summary, .. } => Some(format!("Success: {summary}")),
            RunOutcome::Failed { stderr } => Some(format!("Error: {stderr}")),
            RunOutcome::Cancelled => Some("Cancelled".to_string()),
            RunOutcome::Errored(message) => Some(format!("Error: {message}")),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, RunOutcome::Succeeded { .. })
    }
}

/// Field values captured when a run is requested.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunDraft {
    pub run_id: RunId,
    pub input_path: String,
    /// `None` when the output field is blank.
    pub output_path: Option<String>,
    pub mode: Mode,
    pub factor: SizeFactor,
    pub fill_pattern: FillPattern,
}

impl RunDraft {
    pub fn to_request(&self, force_overwrite: bool) -> RunRequest {
        RunRequest {
            input_path: self.input_path.clone(),
            output_path: self.output_path.clone(),
            mode: self.mode,
            factor: self.factor,
            fill_pattern: self.fill_pattern,
            force_overwrite,
        }
    }
}

/// Events flowing into the controller from the front end and from
/// background run tasks.
#[derive(Debug, Clone)]
pub enum ControllerEvent {
    InputPathChanged(String),
    OutputPathChanged(String),
    ModeChanged(Mode),
    FactorChanged(SizeFactor),
    FillPatternChanged(FillPattern),
    /// Start a run when idle; cancel the current one when running.
    RunOrCancel,
    BrowseInput,
    BrowseOutput,
    /// Status text posted by background work (e.g. a failed picker).
    StatusPosted(String),
    /// Validation passed and the runner is about to be invoked.
    RunStarted {
        run_id: RunId,
    },
    ProgressReported {
        run_id: RunId,
        sample: ProgressSample,
    },
    RunFinished {
        run_id: RunId,
        outcome: RunOutcome,
    },
    ShutdownRequested,
}

pub mod core;
pub mod event_handlers;
pub mod pipeline;
pub mod runtime;

pub use self::core::{ControllerSnapshot, CoreController, CANCEL_LABEL, RUN_LABEL};
pub use event_handlers::{CoreCommand, CoreStep};
pub use runtime::{Controller, ControllerHandle};
