// src/engine/runtime.rs

use std::fmt;
use std::sync::Arc;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::errors::{BigzipError, Result};
use crate::exec::ProcessRunner;
use crate::fs::FileSystem;
use crate::types::{FillPattern, Mode, SizeFactor};
use crate::ui::{Collaborators, FilePicker};

use super::core::{ControllerSnapshot, CoreController};
use super::pipeline::{spawn_run, RunContext};
use super::{ControllerEvent, CoreCommand, RunId, RunOutcome};

/// Internal handle for the run currently in flight.
///
/// The controller is the sole owner of `cancel`; it is dropped (retired)
/// once the run has been finalised and never reused.
struct ActiveRun {
    run_id: RunId,
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

/// Drives the core controller in response to [`ControllerEvent`]s.
///
/// This is the single serialisation point: every externally visible state
/// change, whether from the front end, a progress tick or a finished
/// process, arrives on one queue and is applied here in order. The struct
/// itself only does async IO: spawning run tasks, signalling cancellation,
/// asking pickers and publishing snapshots.
pub struct Controller {
    core: CoreController,
    event_rx: mpsc::UnboundedReceiver<ControllerEvent>,
    /// Weak so that dropping every [`ControllerHandle`] ends the loop.
    event_tx: mpsc::WeakUnboundedSender<ControllerEvent>,
    runner: Arc<dyn ProcessRunner>,
    fs: Arc<dyn FileSystem>,
    collaborators: Collaborators,
    active: Option<ActiveRun>,
    snapshot_tx: watch::Sender<ControllerSnapshot>,
}

impl fmt::Debug for Controller {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Controller")
            .field("core", &self.core)
            .field("collaborators", &self.collaborators)
            .field("active_run", &self.active.as_ref().map(|a| a.run_id))
            .finish_non_exhaustive()
    }
}

impl Controller {
    pub fn new(
        core: CoreController,
        runner: Arc<dyn ProcessRunner>,
        fs: Arc<dyn FileSystem>,
        collaborators: Collaborators,
    ) -> (Self, ControllerHandle) {
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let (snapshot_tx, snapshot_rx) = watch::channel(core.snapshot());

        let controller = Self {
            core,
            event_rx,
            event_tx: event_tx.downgrade(),
            runner,
            fs,
            collaborators,
            active: None,
            snapshot_tx,
        };
        let handle = ControllerHandle {
            event_tx,
            snapshot_rx,
        };
        (controller, handle)
    }

    /// Convenience: build the controller and run it on a Tokio task.
    pub fn spawn(
        core: CoreController,
        runner: Arc<dyn ProcessRunner>,
        fs: Arc<dyn FileSystem>,
        collaborators: Collaborators,
    ) -> (ControllerHandle, JoinHandle<Result<()>>) {
        let (controller, handle) = Self::new(core, runner, fs, collaborators);
        (handle, tokio::spawn(controller.run()))
    }

    /// Main event loop.
    ///
    /// - Consumes events from the queue.
    /// - Feeds them into the core controller.
    /// - Executes the commands the core returns.
    /// - Publishes a fresh snapshot after each event.
    pub async fn run(mut self) -> Result<()> {
        info!("bigzip controller started");

        while let Some(event) = self.event_rx.recv().await {
            if !matches!(event, ControllerEvent::ProgressReported { .. }) {
                debug!(?event, "controller received event");
            }

            let step = self.core.step(event);
            for command in step.commands {
                self.execute_command(command);
            }
            self.snapshot_tx.send_replace(self.core.snapshot());

            if !step.keep_running {
                info!("shutdown requested; stopping controller");
                break;
            }
        }

        self.wait_for_active_run().await;
        info!("controller exiting");
        Ok(())
    }

    fn execute_command(&mut self, command: CoreCommand) {
        match command {
            CoreCommand::StartRun(draft) => {
                let Some(events) = self.event_tx.upgrade() else {
                    warn!(run_id = draft.run_id, "no event sender left; not starting run");
                    return;
                };
                let run_id = draft.run_id;
                let cancel = CancellationToken::new();
                let ctx = RunContext {
                    runner: Arc::clone(&self.runner),
                    fs: Arc::clone(&self.fs),
                    collaborators: self.collaborators.clone(),
                    events,
                };
                let handle = spawn_run(draft, ctx, cancel.clone());
                self.active = Some(ActiveRun {
                    run_id,
                    cancel,
                    handle,
                });
            }
            CoreCommand::CancelRun(run_id) => match &self.active {
                Some(active) if active.run_id == run_id => active.cancel.cancel(),
                _ => debug!(run_id, "cancel for a run that is not active"),
            },
            CoreCommand::RetireRun(run_id) => {
                if self.active.as_ref().is_some_and(|a| a.run_id == run_id) {
                    self.active = None;
                }
            }
            CoreCommand::PickInput => {
                let picker = self.collaborators.open_picker.clone();
                self.spawn_picker(picker, ControllerEvent::InputPathChanged)
            }
            CoreCommand::PickOutput => {
                let picker = self.collaborators.save_picker.clone();
                self.spawn_picker(picker, ControllerEvent::OutputPathChanged)
            }
        }
    }

    /// Ask a picker off the queue and post the answer back to it.
    fn spawn_picker(
        &self,
        picker: Option<Arc<dyn FilePicker>>,
        apply: fn(String) -> ControllerEvent,
    ) {
        let Some(picker) = picker else {
            debug!("no picker available");
            return;
        };
        let Some(events) = self.event_tx.upgrade() else {
            return;
        };

        tokio::spawn(async move {
            let event = match picker.pick().await {
                Ok(Some(path)) if !path.is_empty() => apply(path),
                Ok(_) => return,
                Err(e) => ControllerEvent::StatusPosted(format!("Error: {e}")),
            };
            let _ = events.send(event);
        });
    }

    /// On exit, make sure no run (and so no child process) outlives us.
    async fn wait_for_active_run(&mut self) {
        if let Some(active) = self.active.take() {
            active.cancel.cancel();
            if let Err(e) = active.handle.await {
                warn!(run_id = active.run_id, error = %e, "run task failed during shutdown");
            }
        }
    }
}

/// Cloneable front-end handle: posts events and observes snapshots.
#[derive(Debug, Clone)]
pub struct ControllerHandle {
    event_tx: mpsc::UnboundedSender<ControllerEvent>,
    snapshot_rx: watch::Receiver<ControllerSnapshot>,
}

impl ControllerHandle {
    pub fn send(&self, event: ControllerEvent) -> Result<()> {
        self.event_tx
            .send(event)
            .map_err(|_| BigzipError::Other(anyhow::anyhow!("controller has stopped")))
    }

    pub fn set_input_path(&self, path: impl Into<String>) -> Result<()> {
        self.send(ControllerEvent::InputPathChanged(path.into()))
    }

    pub fn set_output_path(&self, path: impl Into<String>) -> Result<()> {
        self.send(ControllerEvent::OutputPathChanged(path.into()))
    }

    pub fn set_mode(&self, mode: Mode) -> Result<()> {
        self.send(ControllerEvent::ModeChanged(mode))
    }

    pub fn set_factor(&self, factor: SizeFactor) -> Result<()> {
        self.send(ControllerEvent::FactorChanged(factor))
    }

    pub fn set_fill_pattern(&self, pattern: FillPattern) -> Result<()> {
        self.send(ControllerEvent::FillPatternChanged(pattern))
    }

    pub fn run_or_cancel(&self) -> Result<()> {
        self.send(ControllerEvent::RunOrCancel)
    }

    pub fn browse_input(&self) -> Result<()> {
        self.send(ControllerEvent::BrowseInput)
    }

    pub fn browse_output(&self) -> Result<()> {
        self.send(ControllerEvent::BrowseOutput)
    }

    pub fn shutdown(&self) -> Result<()> {
        self.send(ControllerEvent::ShutdownRequested)
    }

    /// Latest published snapshot.
    pub fn snapshot(&self) -> ControllerSnapshot {
        self.snapshot_rx.borrow().clone()
    }

    /// A receiver that is notified on every published snapshot.
    pub fn subscribe(&self) -> watch::Receiver<ControllerSnapshot> {
        self.snapshot_rx.clone()
    }

    /// Wait until a snapshot satisfies `predicate`.
    pub async fn wait_for(
        &self,
        predicate: impl FnMut(&ControllerSnapshot) -> bool,
    ) -> Result<ControllerSnapshot> {
        let mut rx = self.snapshot_rx.clone();
        let snapshot = rx
            .wait_for(predicate)
            .await
            .map_err(|_| BigzipError::Other(anyhow::anyhow!("controller has stopped")))?;
        Ok(snapshot.clone())
    }

    /// Press run, then wait for that run to be finalised.
    ///
    /// If a run was already in flight this cancels it instead, and the
    /// outcome returned is the cancelled run's.
    pub async fn run_to_completion(&self) -> Result<RunOutcome> {
        let before = self.snapshot().completed_runs;
        self.run_or_cancel()?;
        let snapshot = self.wait_for(|s| s.completed_runs > before).await?;
        snapshot
            .last_outcome
            .ok_or_else(|| BigzipError::Other(anyhow::anyhow!("run finished without an outcome")))
    }
}
