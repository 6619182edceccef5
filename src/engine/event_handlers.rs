// src/engine/event_handlers.rs

//! Run lifecycle handlers for the core controller.

use tracing::{debug, info};

use crate::engine::core::CoreState;
use crate::engine::{Phase, RunDraft, RunId, RunOutcome};
use crate::exec::ProgressSample;

/// Command produced by the pure core, to be executed by the outer IO shell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CoreCommand {
    /// Open a fresh cancellation scope and start the run pipeline.
    StartRun(RunDraft),
    /// Signal the run's cancellation scope.
    CancelRun(RunId),
    /// The run is finalised; drop its cancellation scope.
    RetireRun(RunId),
    /// Ask the open-file picker for a new input path.
    PickInput,
    /// Ask the save-file picker for a new output path.
    PickOutput,
}

/// Decision returned by the core after handling a single event.
#[derive(Debug, Clone)]
pub struct CoreStep {
    /// Commands the IO shell should execute.
    pub commands: Vec<CoreCommand>,
    /// Whether the outer loop should keep running.
    pub keep_running: bool,
}

impl CoreStep {
    pub fn none() -> Self {
        Self {
            commands: Vec::new(),
            keep_running: true,
        }
    }

    pub fn command(command: CoreCommand) -> Self {
        Self {
            commands: vec![command],
            keep_running: true,
        }
    }
}

/// Handle the single run/cancel button.
///
/// - Idle: capture the current fields and start validating.
/// - Validating / Running: optimistic UI reset, then cancel.
/// - Cancelling: ignored; only one run may be in flight.
pub fn handle_run_or_cancel(state: &mut CoreState) -> CoreStep {
    match state.phase {
        Phase::Idle => {
            let run_id = state.next_run_id;
            state.next_run_id += 1;
            state.current_run = Some(run_id);
            state.phase = Phase::Validating;

            let paths = state.router.state();
            let output = paths.output.trim();
            let draft = RunDraft {
                run_id,
                input_path: paths.input.clone(),
                output_path: (!output.is_empty()).then(|| paths.output.clone()),
                mode: paths.mode,
                factor: state.factor,
                fill_pattern: state.fill_pattern,
            };

            debug!(run_id, input = %draft.input_path, "run requested");
            CoreStep::command(CoreCommand::StartRun(draft))
        }
        Phase::Validating | Phase::Running => {
            let Some(run_id) = state.current_run else {
                return CoreStep::none();
            };
            info!(run_id, "cancel requested");
            state.reset_execution_flags();
            state.status = "Cancelling...".to_string();
            state.phase = Phase::Cancelling;
            CoreStep::command(CoreCommand::CancelRun(run_id))
        }
        Phase::Cancelling => {
            debug!("run/cancel ignored while cancelling");
            CoreStep::none()
        }
    }
}

/// Validation passed: make the run visible.
pub fn handle_run_started(state: &mut CoreState, run_id: RunId) -> CoreStep {
    if state.current_run != Some(run_id) || state.phase != Phase::Validating {
        debug!(run_id, phase = ?state.phase, "ignoring stale run start");
        return CoreStep::none();
    }

    state.phase = Phase::Running;
    state.is_running = true;
    state.progress_visible = true;
    state.progress = 0.0;
    state.status = "Starting operation...".to_string();
    CoreStep::none()
}

/// Apply a progress sample from the current run.
///
/// Samples from other runs, or after a cancel request, are dropped. Applied
/// progress never decreases.
pub fn handle_progress(state: &mut CoreState, run_id: RunId, sample: ProgressSample) -> CoreStep {
    if state.current_run != Some(run_id) || state.phase != Phase::Running {
        return CoreStep::none();
    }

    let fraction = sample.fraction().max(state.progress);
    state.progress = fraction;
    state.status = state.progress_settings.stage_label(fraction).to_string();
    CoreStep::none()
}

/// Finalise a run. Runs for every outcome, so the flags are always reset.
pub fn handle_run_finished(state: &mut CoreState, run_id: RunId, outcome: RunOutcome) -> CoreStep {
    if state.current_run != Some(run_id) {
        debug!(run_id, "ignoring completion of a run that is not current");
        return CoreStep::none();
    }

    info!(run_id, ?outcome, "run finished");

    if let Some(status) = outcome.status_message() {
        state.status = status;
    }
    state.reset_execution_flags();
    state.phase = Phase::Idle;
    state.current_run = None;
    state.last_outcome = Some(outcome);
    state.completed_runs += 1;

    CoreStep::command(CoreCommand::RetireRun(run_id))
}
