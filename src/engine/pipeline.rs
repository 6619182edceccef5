// src/engine/pipeline.rs

//! One run attempt, from validation to result presentation.
//!
//! The pipeline runs off the controller's queue. It never touches
//! controller state: everything it wants to change is posted back as a
//! [`ControllerEvent`], and it always ends by posting exactly one
//! `RunFinished`.

use std::any::Any;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::engine::{ControllerEvent, RunDraft, RunId, RunOutcome};
use crate::errors::{BigzipError, Result};
use crate::exec::{parse_output_path, ProcessRunner, ProgressSample, ProgressSink};
use crate::fs::FileSystem;
use crate::ui::Collaborators;

/// Shown through the message collaborator when no input was chosen.
pub const INPUT_REQUIRED_PROMPT: &str = "You must select a file first";

/// Shared dependencies for run tasks.
#[derive(Clone)]
pub struct RunContext {
    pub runner: Arc<dyn ProcessRunner>,
    pub fs: Arc<dyn FileSystem>,
    pub collaborators: Collaborators,
    pub events: mpsc::UnboundedSender<ControllerEvent>,
}

/// Forwards progress samples to the controller queue, tagged with the run.
struct QueuedProgress {
    run_id: RunId,
    events: mpsc::UnboundedSender<ControllerEvent>,
}

impl ProgressSink for QueuedProgress {
    fn report(&self, sample: ProgressSample) {
        let _ = self.events.send(ControllerEvent::ProgressReported {
            run_id: self.run_id,
            sample,
        });
    }
}

/// Spawn a run attempt.
///
/// The attempt itself runs in an inner task so that a panic is converted to
/// [`RunOutcome::Errored`] instead of leaving the controller stuck.
pub fn spawn_run(draft: RunDraft, ctx: RunContext, cancel: CancellationToken) -> JoinHandle<()> {
    tokio::spawn(async move {
        let run_id = draft.run_id;
        let events = ctx.events.clone();

        let outcome = match tokio::spawn(execute(draft, ctx, cancel)).await {
            Ok(outcome) => outcome,
            Err(e) => {
                error!(run_id, error = %e, "run task aborted unexpectedly");
                RunOutcome::Errored(join_error_message(e))
            }
        };

        if events
            .send(ControllerEvent::RunFinished { run_id, outcome })
            .is_err()
        {
            debug!(run_id, "controller gone before run finished");
        }
    })
}

async fn execute(draft: RunDraft, ctx: RunContext, cancel: CancellationToken) -> RunOutcome {
    match execute_inner(&draft, &ctx, &cancel).await {
        Ok(outcome) => outcome,
        Err(BigzipError::Cancelled) => RunOutcome::Cancelled,
        Err(e) if e.is_validation() => {
            info!(run_id = draft.run_id, error = %e, "run rejected");
            RunOutcome::Rejected {
                status: Some(rejection_status(&e)),
            }
        }
        Err(e) => {
            error!(run_id = draft.run_id, error = %e, "run failed unexpectedly");
            RunOutcome::Errored(e.to_string())
        }
    }
}

async fn execute_inner(
    draft: &RunDraft,
    ctx: &RunContext,
    cancel: &CancellationToken,
) -> Result<RunOutcome> {
    let run_id = draft.run_id;

    if draft.input_path.trim().is_empty() {
        if let Some(messages) = &ctx.collaborators.messages {
            messages.show(INPUT_REQUIRED_PROMPT.to_string()).await?;
            return Ok(RunOutcome::Rejected { status: None });
        }
        return Err(BigzipError::InputRequired);
    }

    if !ctx.fs.is_file(Path::new(&draft.input_path)) {
        return Err(BigzipError::InputMissing(PathBuf::from(&draft.input_path)));
    }

    let force_overwrite = confirm_overwrite(draft, ctx, cancel).await?;

    if ctx.runner.resolve_executable().is_none() {
        return Err(BigzipError::ExecutableNotFound(
            ctx.runner.executable_name().to_string(),
        ));
    }

    if cancel.is_cancelled() {
        return Err(BigzipError::Cancelled);
    }

    let request = draft.to_request(force_overwrite);
    let _ = ctx.events.send(ControllerEvent::RunStarted { run_id });
    info!(run_id, force_overwrite, mode = ?request.mode, "invoking process runner");

    let progress: Arc<dyn ProgressSink> = Arc::new(QueuedProgress {
        run_id,
        events: ctx.events.clone(),
    });
    let result = ctx.runner.run(request, cancel.clone(), progress).await?;

    if cancel.is_cancelled() {
        return Err(BigzipError::Cancelled);
    }

    if result.success() {
        let summary = result.stdout.trim().to_string();
        let output_path = parse_output_path(&result.stdout, draft.mode);

        if let Some(results) = &ctx.collaborators.results {
            results.present(true, output_path.clone()).await?;
        } else if let Some(messages) = &ctx.collaborators.messages {
            messages.show(format!("Finished: {output_path}")).await?;
        }

        Ok(RunOutcome::Succeeded {
            summary,
            output_path,
        })
    } else {
        let stderr = result.stderr.trim().to_string();
        info!(run_id, exit_code = result.exit_code, stderr = %stderr, "bigzip reported failure");

        if let Some(results) = &ctx.collaborators.results {
            results.present(false, stderr.clone()).await?;
        } else if let Some(messages) = &ctx.collaborators.messages {
            messages.show(format!("Error: {stderr}")).await?;
        }

        Ok(RunOutcome::Failed { stderr })
    }
}

/// Returns whether the run must force-overwrite an existing output.
async fn confirm_overwrite(
    draft: &RunDraft,
    ctx: &RunContext,
    cancel: &CancellationToken,
) -> Result<bool> {
    let Some(output) = draft.output_path.as_deref() else {
        return Ok(false);
    };
    if !ctx.fs.is_file(Path::new(output)) {
        return Ok(false);
    }

    let Some(confirm) = &ctx.collaborators.confirm else {
        return Err(BigzipError::ConfirmationUnavailable);
    };

    let confirmed = tokio::select! {
        biased;
        _ = cancel.cancelled() => return Err(BigzipError::Cancelled),
        answer = confirm.confirm(format!("The file '{output}' already exists")) => answer?,
    };

    if confirmed {
        debug!(run_id = draft.run_id, output, "overwrite confirmed");
        Ok(true)
    } else {
        Err(BigzipError::OverwriteDeclined)
    }
}

fn rejection_status(err: &BigzipError) -> String {
    match err {
        BigzipError::InputRequired => "Error: Input file is required".to_string(),
        BigzipError::InputMissing(_) => "Error: Input file does not exist".to_string(),
        BigzipError::OverwriteDeclined => "Overwrite declined".to_string(),
        other => format!("Error: {other}"),
    }
}

fn join_error_message(err: tokio::task::JoinError) -> String {
    if err.is_panic() {
        panic_message(err.into_panic())
    } else {
        err.to_string()
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "run task panicked".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejection_statuses() {
        assert_eq!(
            rejection_status(&BigzipError::InputRequired),
            "Error: Input file is required"
        );
        assert_eq!(
            rejection_status(&BigzipError::InputMissing(PathBuf::from("/x"))),
            "Error: Input file does not exist"
        );
        assert_eq!(
            rejection_status(&BigzipError::ExecutableNotFound("bz".to_string())),
            "Error: bz not found"
        );
        assert_eq!(
            rejection_status(&BigzipError::ConfirmationUnavailable),
            "Error: Output file already exists and no confirmation dialog available"
        );
        assert_eq!(rejection_status(&BigzipError::OverwriteDeclined), "Overwrite declined");
    }

    #[test]
    fn panic_payloads() {
        assert_eq!(panic_message(Box::new("static")), "static");
        assert_eq!(panic_message(Box::new(String::from("owned"))), "owned");
        assert_eq!(panic_message(Box::new(7_u8)), "run task panicked");
    }
}
