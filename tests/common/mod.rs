#![allow(dead_code)]

use std::sync::Arc;

use tokio::task::JoinHandle;

use bigzip_controller::engine::{Controller, ControllerHandle, CoreController};
use bigzip_controller::errors::Result;
use bigzip_controller::exec::{ProcessRunner, ProgressSettings};
use bigzip_controller::fs::FileSystem;
use bigzip_controller::routing::PathRouter;
use bigzip_controller::ui::Collaborators;

pub use bigzip_controller_test_utils::{init_tracing, with_timeout};

pub type TestResult = std::result::Result<(), Box<dyn std::error::Error>>;

/// Spawn a controller with default routing and progress settings.
pub fn spawn_controller(
    runner: impl ProcessRunner + 'static,
    fs: impl FileSystem + 'static,
    collaborators: Collaborators,
) -> (ControllerHandle, JoinHandle<Result<()>>) {
    let core = CoreController::new(PathRouter::default(), ProgressSettings::default());
    Controller::spawn(core, Arc::new(runner), Arc::new(fs), collaborators)
}

/// Ask the controller to stop and wait until it has.
pub async fn shutdown(handle: ControllerHandle, task: JoinHandle<Result<()>>) -> TestResult {
    handle.shutdown()?;
    drop(handle);
    with_timeout(task).await??;
    Ok(())
}

/// Write an executable shell script called `name` into `dir`.
#[cfg(unix)]
pub fn write_script(dir: &std::path::Path, name: &str, body: &str) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;

    let path = dir.join(name);
    std::fs::write(&path, format!("#!/bin/sh\n{body}\n"))?;
    let mut perms = std::fs::metadata(&path)?.permissions();
    perms.set_mode(0o755);
    std::fs::set_permissions(&path, perms)
}
