// src/lib.rs

pub mod cli;
pub mod config;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod fs;
pub mod logging;
pub mod routing;
pub mod types;
pub mod ui;

use std::path::Path;
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::cli::CliArgs;
use crate::config::load_or_default;
use crate::engine::{
    Controller, ControllerEvent, ControllerHandle, ControllerSnapshot, CoreController, Phase,
    RunOutcome,
};
use crate::exec::{build_args, ProcessRunner, RealProcessRunner};
use crate::fs::{FileSystem, RealFileSystem};
use crate::routing::PathRouter;
use crate::types::RunRequest;
use crate::ui::console::{ConsoleConfirm, ConsoleMessages, ConsoleResults};
use crate::ui::Collaborators;

/// Exit status used when Ctrl-C arrives before anything was launched.
const INTERRUPTED_EXIT_CODE: i32 = 130;

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - config loading
/// - the core controller, seeded with the command-line fields
/// - the real process runner and terminal collaborators
/// - Ctrl-C handling and progress rendering
pub async fn run(args: CliArgs) -> Result<()> {
    let cfg = load_or_default(args.config.as_deref().map(Path::new))?;
    let runner = Arc::new(RealProcessRunner::new(cfg.runner.clone()));

    let router = PathRouter::new(cfg.archive_extension.clone());
    let mut core = CoreController::new(router, cfg.progress())
        .with_defaults(
            args.factor.unwrap_or(cfg.default_factor),
            args.fill_pattern.unwrap_or(cfg.default_fill_pattern),
        );

    // Same order a user would edit the window in: input, then mode, then a
    // manual output override.
    core.step(ControllerEvent::InputPathChanged(args.input.clone()));
    if let Some(mode) = args.mode_override() {
        core.step(ControllerEvent::ModeChanged(mode));
    }
    if let Some(output) = &args.output {
        core.step(ControllerEvent::OutputPathChanged(output.clone()));
    }

    if args.dry_run {
        print_dry_run(runner.as_ref(), &RealFileSystem, &core.snapshot(), args.yes);
        return Ok(());
    }

    let collaborators = Collaborators::new()
        .with_messages(ConsoleMessages)
        .with_confirm(ConsoleConfirm {
            assume_yes: args.yes,
        })
        .with_results(ConsoleResults);

    let (handle, controller_task) =
        Controller::spawn(core, runner, Arc::new(RealFileSystem), collaborators);

    let render_task = spawn_renderer(handle.subscribe());
    let interrupt_task = spawn_interrupt_handler(handle.clone());

    let outcome = handle.run_to_completion().await;

    interrupt_task.abort();
    let _ = handle.shutdown();
    drop(handle);

    controller_task
        .await
        .context("controller task panicked")??;
    if let Err(e) = render_task.await {
        debug!(error = %e, "progress renderer ended abnormally");
    }

    match outcome? {
        RunOutcome::Succeeded { output_path, .. } => {
            info!(output = %output_path, "bigzip finished");
            Ok(())
        }
        RunOutcome::Rejected { status: None } => Err(anyhow!("no input file selected")),
        other => Err(anyhow!(
            "{}",
            other.status_message().unwrap_or_else(|| "run did not succeed".to_string())
        )),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum InterruptAction {
    Cancel,
    Ignore,
    Exit,
}

/// A run may already have a child process while the snapshot still reads
/// `Validating`, so only `Idle` is safe to exit from.
fn interrupt_action(phase: Phase) -> InterruptAction {
    match phase {
        Phase::Validating | Phase::Running => InterruptAction::Cancel,
        Phase::Cancelling => InterruptAction::Ignore,
        Phase::Idle => InterruptAction::Exit,
    }
}

/// Ctrl-C cancels the run in flight. With nothing in flight it just ends
/// the program.
fn spawn_interrupt_handler(handle: ControllerHandle) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!(error = %e, "failed to listen for Ctrl+C");
                return;
            }

            match interrupt_action(handle.snapshot().phase) {
                InterruptAction::Cancel => {
                    info!("Ctrl+C received; cancelling run");
                    let _ = handle.run_or_cancel();
                }
                InterruptAction::Ignore => debug!("Ctrl+C received; already cancelling"),
                InterruptAction::Exit => {
                    eprintln!("interrupted");
                    std::process::exit(INTERRUPTED_EXIT_CODE);
                }
            }
        }
    })
}

/// Render status and progress changes to stderr until the controller stops.
fn spawn_renderer(mut rx: watch::Receiver<ControllerSnapshot>) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut last: Option<(String, u32)> = None;
        while rx.changed().await.is_ok() {
            let (status, percent) = {
                let snapshot = rx.borrow_and_update();
                (snapshot.status.clone(), percent(&snapshot))
            };
            if status.is_empty() {
                continue;
            }
            let current = (status, percent);
            if last.as_ref() == Some(&current) {
                continue;
            }
            eprintln!("[{:>3}%] {}", current.1, current.0);
            last = Some(current);
        }
    })
}

fn percent(snapshot: &ControllerSnapshot) -> u32 {
    if snapshot.progress_visible {
        (snapshot.progress * 100.0).round() as u32
    } else {
        0
    }
}

/// Dry-run output: the executable and the argument vector it would get.
fn print_dry_run(
    runner: &dyn ProcessRunner,
    fs: &dyn FileSystem,
    snapshot: &ControllerSnapshot,
    assume_yes: bool,
) {
    let request = dry_run_request(fs, snapshot, assume_yes);

    println!("bigzip-controller dry-run");
    match runner.resolve_executable() {
        Some(path) => println!("  executable: {}", path.display()),
        None => println!("  executable: {} (not found)", runner.executable_name()),
    }
    println!("  mode: {:?}", request.mode);
    println!("  output: {}", request.output_path.as_deref().unwrap_or("<derived by bigzip>"));
    println!("  args: {:?}", build_args(&request));

    debug!("dry-run complete (no execution)");
}

/// The request a real run would send, assuming `--yes` answers the
/// overwrite prompt. `-force` is only added when the output file exists.
fn dry_run_request(
    fs: &dyn FileSystem,
    snapshot: &ControllerSnapshot,
    assume_yes: bool,
) -> RunRequest {
    let output = snapshot.output_path.trim();
    let output_path = (!output.is_empty()).then(|| snapshot.output_path.clone());
    let force_overwrite = assume_yes
        && output_path
            .as_deref()
            .is_some_and(|path| fs.is_file(Path::new(path)));

    RunRequest {
        input_path: snapshot.input_path.clone(),
        output_path,
        mode: snapshot.mode,
        factor: snapshot.factor,
        fill_pattern: snapshot.fill_pattern,
        force_overwrite,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::mock::MockFileSystem;

    fn snapshot_with_output(output: &str) -> ControllerSnapshot {
        ControllerSnapshot {
            input_path: "/data/in.txt".to_string(),
            output_path: output.to_string(),
            ..ControllerSnapshot::default()
        }
    }

    #[test]
    fn interrupt_exits_only_when_idle() {
        assert_eq!(interrupt_action(Phase::Idle), InterruptAction::Exit);
        assert_eq!(interrupt_action(Phase::Validating), InterruptAction::Cancel);
        assert_eq!(interrupt_action(Phase::Running), InterruptAction::Cancel);
        assert_eq!(interrupt_action(Phase::Cancelling), InterruptAction::Ignore);
    }

    #[test]
    fn dry_run_forces_only_an_existing_output() {
        let fs = MockFileSystem::new();
        let snapshot = snapshot_with_output("/data/in.txt.bigzip");

        assert!(!dry_run_request(&fs, &snapshot, true).force_overwrite);

        fs.add_dir("/data/in.txt.bigzip");
        assert!(!dry_run_request(&fs, &snapshot, true).force_overwrite);

        fs.add_file("/data/in.txt.bigzip");
        assert!(dry_run_request(&fs, &snapshot, true).force_overwrite);
        assert!(!dry_run_request(&fs, &snapshot, false).force_overwrite);
        let args = build_args(&dry_run_request(&fs, &snapshot, false));
        assert!(!args.contains(&"-force".to_string()));
    }

    #[test]
    fn dry_run_blank_output_is_omitted() {
        let request = dry_run_request(&MockFileSystem::new(), &snapshot_with_output(" "), true);
        assert_eq!(request.output_path, None);
        assert!(!request.force_overwrite);
    }

    #[test]
    fn percent_hidden_when_not_running() {
        let mut snapshot = ControllerSnapshot::default();
        snapshot.progress = 0.5;
        assert_eq!(percent(&snapshot), 0);

        snapshot.progress_visible = true;
        assert_eq!(percent(&snapshot), 50);
    }
}
