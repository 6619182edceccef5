// src/engine/core.rs

//! Pure core controller state machine.
//!
//! This module contains a synchronous, deterministic "core controller" that
//! consumes [`ControllerEvent`]s and produces:
//! - an updated core state
//! - a list of "commands" describing what the IO shell should do next
//!
//! The async shell (`engine::runtime::Controller`) is responsible for:
//! - reading events from the queue
//! - spawning and cancelling run tasks
//! - asking pickers for paths
//! - publishing snapshots
//!
//! The core is intended to be extensively unit tested without any Tokio,
//! channels, filesystem, or processes.

use crate::engine::event_handlers::{
    handle_progress, handle_run_finished, handle_run_or_cancel, handle_run_started, CoreCommand,
    CoreStep,
};
use crate::engine::{ControllerEvent, Phase, RunId, RunOutcome};
use crate::exec::ProgressSettings;
use crate::routing::PathRouter;
use crate::types::{FillPattern, Mode, SizeFactor};

pub const RUN_LABEL: &str = "Run BigZip";
pub const CANCEL_LABEL: &str = "Cancel";

/// Everything a front end needs to render the controller.
#[derive(Debug, Clone, PartialEq)]
pub struct ControllerSnapshot {
    pub phase: Phase,
    pub input_path: String,
    pub output_path: String,
    pub mode: Mode,
    pub factor: SizeFactor,
    pub fill_pattern: FillPattern,
    pub status: String,
    pub is_running: bool,
    pub progress_visible: bool,
    /// Fraction in `[0, 1]`.
    pub progress: f64,
    pub run_button_label: &'static str,
    /// Factor and fill pattern only apply when compressing.
    pub mode_options_enabled: bool,
    pub last_outcome: Option<RunOutcome>,
    pub completed_runs: u64,
}

impl Default for ControllerSnapshot {
    fn default() -> Self {
        CoreController::new(PathRouter::default(), ProgressSettings::default()).snapshot()
    }
}

/// Mutable core state. Event handlers operate on this directly.
#[derive(Debug)]
pub struct CoreState {
    pub(crate) router: PathRouter,
    pub(crate) factor: SizeFactor,
    pub(crate) fill_pattern: FillPattern,
    pub(crate) progress_settings: ProgressSettings,
    pub(crate) phase: Phase,
    pub(crate) status: String,
    pub(crate) is_running: bool,
    pub(crate) progress_visible: bool,
    pub(crate) progress: f64,
    pub(crate) current_run: Option<RunId>,
    pub(crate) next_run_id: RunId,
    pub(crate) last_outcome: Option<RunOutcome>,
    pub(crate) completed_runs: u64,
}

impl CoreState {
    /// Reset the running/visible/progress flags. Runs on every exit path.
    pub(crate) fn reset_execution_flags(&mut self) {
        self.is_running = false;
        self.progress_visible = false;
        self.progress = 0.0;
    }
}

/// Pure core controller.
///
/// It has **no** channels, no Tokio types, and does not perform any IO.
#[derive(Debug)]
pub struct CoreController {
    state: CoreState,
}

impl CoreController {
    pub fn new(router: PathRouter, progress_settings: ProgressSettings) -> Self {
        Self {
            state: CoreState {
                router,
                factor: SizeFactor::default(),
                fill_pattern: FillPattern::default(),
                progress_settings,
                phase: Phase::Idle,
                status: String::new(),
                is_running: false,
                progress_visible: false,
                progress: 0.0,
                current_run: None,
                next_run_id: 1,
                last_outcome: None,
                completed_runs: 0,
            },
        }
    }

    pub fn with_defaults(mut self, factor: SizeFactor, fill_pattern: FillPattern) -> Self {
        self.state.factor = factor;
        self.state.fill_pattern = fill_pattern;
        self
    }

    pub fn phase(&self) -> Phase {
        self.state.phase
    }

    pub fn current_run(&self) -> Option<RunId> {
        self.state.current_run
    }

    /// Handle a single event, updating core state and returning the
    /// resulting commands for the IO shell.
    pub fn step(&mut self, event: ControllerEvent) -> CoreStep {
        let state = &mut self.state;
        match event {
            ControllerEvent::InputPathChanged(path) => {
                state.router.set_input(path);
                CoreStep::none()
            }
            ControllerEvent::OutputPathChanged(path) => {
                state.router.set_output(path);
                CoreStep::none()
            }
            ControllerEvent::ModeChanged(mode) => {
                state.router.set_mode(mode);
                CoreStep::none()
            }
            ControllerEvent::FactorChanged(factor) => {
                state.factor = factor;
                CoreStep::none()
            }
            ControllerEvent::FillPatternChanged(pattern) => {
                state.fill_pattern = pattern;
                CoreStep::none()
            }
            ControllerEvent::RunOrCancel => handle_run_or_cancel(state),
            ControllerEvent::BrowseInput => CoreStep::command(CoreCommand::PickInput),
            ControllerEvent::BrowseOutput => CoreStep::command(CoreCommand::PickOutput),
            ControllerEvent::StatusPosted(message) => {
                state.status = message;
                CoreStep::none()
            }
            ControllerEvent::RunStarted { run_id } => handle_run_started(state, run_id),
            ControllerEvent::ProgressReported { run_id, sample } => {
                handle_progress(state, run_id, sample)
            }
            ControllerEvent::RunFinished { run_id, outcome } => {
                handle_run_finished(state, run_id, outcome)
            }
            ControllerEvent::ShutdownRequested => {
                let mut commands = Vec::new();
                if let Some(run_id) = state.current_run {
                    commands.push(CoreCommand::CancelRun(run_id));
                }
                CoreStep {
                    commands,
                    keep_running: false,
                }
            }
        }
    }

    pub fn snapshot(&self) -> ControllerSnapshot {
        let s = &self.state;
        let paths = s.router.state();
        ControllerSnapshot {
            phase: s.phase,
            input_path: paths.input.clone(),
            output_path: paths.output.clone(),
            mode: paths.mode,
            factor: s.factor,
            fill_pattern: s.fill_pattern,
            status: s.status.clone(),
            is_running: s.is_running,
            progress_visible: s.progress_visible,
            progress: s.progress,
            run_button_label: if s.is_running { CANCEL_LABEL } else { RUN_LABEL },
            mode_options_enabled: !paths.mode.is_decompress(),
            last_outcome: s.last_outcome.clone(),
            completed_runs: s.completed_runs,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exec::ProgressSample;

    fn core() -> CoreController {
        CoreController::new(PathRouter::default(), ProgressSettings::default())
    }

    fn start(core: &mut CoreController, input: &str) -> RunId {
        core.step(ControllerEvent::InputPathChanged(input.to_string()));
        let step = core.step(ControllerEvent::RunOrCancel);
        let run_id = match step.commands.as_slice() {
            [CoreCommand::StartRun(draft)] => draft.run_id,
            other => panic!("expected StartRun, got {other:?}"),
        };
        core.step(ControllerEvent::RunStarted { run_id });
        run_id
    }

    fn progress(core: &mut CoreController, run_id: RunId, sample: ProgressSample) -> CoreStep {
        core.step(ControllerEvent::ProgressReported { run_id, sample })
    }

    fn finish(core: &mut CoreController, run_id: RunId, outcome: RunOutcome) -> CoreStep {
        core.step(ControllerEvent::RunFinished { run_id, outcome })
    }

    #[test]
    fn run_request_captures_fields() {
        let mut c = core();
        c.step(ControllerEvent::InputPathChanged("/in/a.txt".to_string()));
        c.step(ControllerEvent::FactorChanged(SizeFactor::X512));
        c.step(ControllerEvent::FillPatternChanged(FillPattern::Random));

        let step = c.step(ControllerEvent::RunOrCancel);
        match step.commands.as_slice() {
            [CoreCommand::StartRun(draft)] => {
                assert_eq!(draft.input_path, "/in/a.txt");
                assert_eq!(draft.output_path.as_deref(), Some("/in/a.txt.bigzip"));
                assert_eq!(draft.mode, Mode::Compress);
                assert_eq!(draft.factor, SizeFactor::X512);
                assert_eq!(draft.fill_pattern, FillPattern::Random);
            }
            other => panic!("expected StartRun, got {other:?}"),
        }
        assert_eq!(c.phase(), Phase::Validating);
        assert!(!c.snapshot().is_running);
    }

    #[test]
    fn blank_output_becomes_none() {
        let mut c = core();
        c.step(ControllerEvent::InputPathChanged("/in/a.txt".to_string()));
        c.step(ControllerEvent::OutputPathChanged("  ".to_string()));
        let step = c.step(ControllerEvent::RunOrCancel);
        match step.commands.as_slice() {
            [CoreCommand::StartRun(draft)] => assert_eq!(draft.output_path, None),
            other => panic!("expected StartRun, got {other:?}"),
        }
    }

    #[test]
    fn started_run_is_visible() {
        let mut c = core();
        start(&mut c, "/in/a.txt");
        let snap = c.snapshot();
        assert_eq!(snap.phase, Phase::Running);
        assert!(snap.is_running);
        assert!(snap.progress_visible);
        assert_eq!(snap.progress, 0.0);
        assert_eq!(snap.run_button_label, CANCEL_LABEL);
        assert_eq!(snap.status, "Starting operation...");
    }

    #[test]
    fn progress_is_monotonic_and_labelled() {
        let mut c = core();
        let run_id = start(&mut c, "/in/a.txt");

        progress(&mut c, run_id, ProgressSample::new(0.1));
        assert_eq!(c.snapshot().status, "Preparing...");
        progress(&mut c, run_id, ProgressSample::new(0.5));
        assert_eq!(c.snapshot().status, "Processing...");
        progress(&mut c, run_id, ProgressSample::new(0.4));
        assert_eq!(c.snapshot().progress, 0.5);
        progress(&mut c, run_id, ProgressSample::COMPLETE);
        assert_eq!(c.snapshot().status, "Finalizing...");
        assert_eq!(c.snapshot().progress, 1.0);
    }

    #[test]
    fn run_request_while_running_cancels() {
        let mut c = core();
        let run_id = start(&mut c, "/in/a.txt");
        progress(&mut c, run_id, ProgressSample::new(0.4));

        let step = c.step(ControllerEvent::RunOrCancel);
        assert!(matches!(step.commands.as_slice(), [CoreCommand::CancelRun(id)] if *id == run_id));

        let snap = c.snapshot();
        assert_eq!(snap.phase, Phase::Cancelling);
        assert!(!snap.is_running);
        assert!(!snap.progress_visible);
        assert_eq!(snap.progress, 0.0);
        assert_eq!(snap.status, "Cancelling...");

        // Late ticks from the cancelled run are dropped.
        progress(&mut c, run_id, ProgressSample::new(0.6));
        assert_eq!(c.snapshot().progress, 0.0);

        // A second request while cancelling does not start anything.
        assert!(c.step(ControllerEvent::RunOrCancel).commands.is_empty());

        let step = finish(&mut c, run_id, RunOutcome::Cancelled);
        assert!(matches!(step.commands.as_slice(), [CoreCommand::RetireRun(id)] if *id == run_id));
        let snap = c.snapshot();
        assert_eq!(snap.phase, Phase::Idle);
        assert_eq!(snap.status, "Cancelled");
        assert_eq!(snap.last_outcome, Some(RunOutcome::Cancelled));
    }

    #[test]
    fn request_while_validating_cancels() {
        let mut c = core();
        c.step(ControllerEvent::InputPathChanged("/in/a.txt".to_string()));
        let step = c.step(ControllerEvent::RunOrCancel);
        let run_id = match step.commands.as_slice() {
            [CoreCommand::StartRun(draft)] => draft.run_id,
            other => panic!("expected StartRun, got {other:?}"),
        };

        let step = c.step(ControllerEvent::RunOrCancel);
        assert!(matches!(step.commands.as_slice(), [CoreCommand::CancelRun(id)] if *id == run_id));
        assert_eq!(c.phase(), Phase::Cancelling);

        // Validation finishing late does not make the run visible.
        c.step(ControllerEvent::RunStarted { run_id });
        assert_eq!(c.phase(), Phase::Cancelling);
        assert!(!c.snapshot().is_running);
    }

    #[test]
    fn every_outcome_finalises() {
        let outcomes = [
            (
                RunOutcome::Succeeded {
                    summary: "Wrote x (size: 1 bytes)".into(),
                    output_path: "x".into(),
                },
                "Success: Wrote x (size: 1 bytes)",
            ),
            (
                RunOutcome::Failed {
                    stderr: "bad input".into(),
                },
                "Error: bad input",
            ),
            (RunOutcome::Errored("boom".into()), "Error: boom"),
            (RunOutcome::Cancelled, "Cancelled"),
        ];
        for (outcome, status) in outcomes {
            let mut c = core();
            let run_id = start(&mut c, "/in/a.txt");
            progress(&mut c, run_id, ProgressSample::new(0.7));
            finish(&mut c, run_id, outcome.clone());

            let snap = c.snapshot();
            assert_eq!(snap.phase, Phase::Idle);
            assert!(!snap.is_running);
            assert!(!snap.progress_visible);
            assert_eq!(snap.progress, 0.0);
            assert_eq!(snap.status, status);
            assert_eq!(snap.completed_runs, 1);
            assert_eq!(snap.run_button_label, RUN_LABEL);
        }
    }

    #[test]
    fn rejection_keeps_status_when_none() {
        let mut c = core();
        c.step(ControllerEvent::StatusPosted("previous".to_string()));
        let step = c.step(ControllerEvent::RunOrCancel);
        let run_id = match step.commands.as_slice() {
            [CoreCommand::StartRun(draft)] => draft.run_id,
            other => panic!("expected StartRun, got {other:?}"),
        };
        finish(&mut c, run_id, RunOutcome::Rejected { status: None });
        assert_eq!(c.snapshot().status, "previous");
        assert_eq!(c.phase(), Phase::Idle);
    }

    #[test]
    fn stale_completion_is_ignored() {
        let mut c = core();
        let first = start(&mut c, "/in/a.txt");
        finish(&mut c, first, RunOutcome::Cancelled);
        let second = start(&mut c, "/in/a.txt");
        assert_ne!(first, second);

        finish(&mut c, first, RunOutcome::Cancelled);
        assert_eq!(c.phase(), Phase::Running);
        assert_eq!(c.current_run(), Some(second));
    }

    #[test]
    fn mode_toggle_disables_compress_options() {
        let mut c = core();
        c.step(ControllerEvent::InputPathChanged("/in/a.bigzip".to_string()));
        let snap = c.snapshot();
        assert_eq!(snap.mode, Mode::Decompress);
        assert!(!snap.mode_options_enabled);

        c.step(ControllerEvent::ModeChanged(Mode::Compress));
        let snap = c.snapshot();
        assert!(snap.mode_options_enabled);
        assert_eq!(snap.output_path, "/in/a.bigzip.bigzip");
    }

    #[test]
    fn shutdown_cancels_active_run() {
        let mut c = core();
        let run_id = start(&mut c, "/in/a.txt");
        let step = c.step(ControllerEvent::ShutdownRequested);
        assert!(!step.keep_running);
        assert!(matches!(step.commands.as_slice(), [CoreCommand::CancelRun(id)] if *id == run_id));
    }
}
