// src/exec/runner.rs

//! Process runner: spawns the bigzip executable for one request.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::process::Stdio;
use std::sync::Arc;

use anyhow::Context;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::errors::{BigzipError, Result};
use crate::exec::args::build_args;
use crate::exec::progress::{spawn_ticker, ProgressSample, ProgressSettings, ProgressSink};
use crate::types::{RunRequest, RunResult};

/// Default executable file name.
pub const DEFAULT_EXECUTABLE_NAME: &str = if cfg!(windows) { "bz.exe" } else { "bz" };

/// Trait abstracting how a request is executed.
///
/// The controller only talks to this trait; tests substitute runners that
/// never spawn anything.
pub trait ProcessRunner: Send + Sync {
    /// File name used in "not found" messages.
    fn executable_name(&self) -> &str;

    /// Full path to the executable, if it exists.
    fn resolve_executable(&self) -> Option<PathBuf>;

    /// Run one request to completion.
    ///
    /// - A missing executable is `Err(ExecutableNotFound)`; nothing is spawned.
    /// - A spawn failure is `Ok` with [`RunResult::FAILED_TO_START`].
    /// - Cancellation is `Err(Cancelled)`, returned only once the child has
    ///   been killed and reaped.
    fn run(
        &self,
        request: RunRequest,
        cancel: CancellationToken,
        progress: Arc<dyn ProgressSink>,
    ) -> Pin<Box<dyn Future<Output = Result<RunResult>> + Send + '_>>;
}

/// Where to find the executable and how to pace progress.
#[derive(Debug, Clone, PartialEq)]
pub struct RunnerSettings {
    pub executable_name: String,
    /// Directory searched for the executable; `None` means the directory of
    /// the running application.
    pub executable_dir: Option<PathBuf>,
    pub progress: ProgressSettings,
}

impl Default for RunnerSettings {
    fn default() -> Self {
        Self {
            executable_name: DEFAULT_EXECUTABLE_NAME.to_string(),
            executable_dir: None,
            progress: ProgressSettings::default(),
        }
    }
}

/// Runner that launches the real executable with `tokio::process`.
#[derive(Debug, Clone)]
pub struct RealProcessRunner {
    settings: RunnerSettings,
}

impl RealProcessRunner {
    pub fn new(settings: RunnerSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &RunnerSettings {
        &self.settings
    }

    fn search_dir(&self) -> Option<PathBuf> {
        match &self.settings.executable_dir {
            Some(dir) => Some(dir.clone()),
            None => std::env::current_exe()
                .ok()
                .and_then(|exe| exe.parent().map(Path::to_path_buf)),
        }
    }

    async fn run_inner(
        &self,
        request: RunRequest,
        cancel: CancellationToken,
        progress: Arc<dyn ProgressSink>,
    ) -> Result<RunResult> {
        let settings = &self.settings.progress;

        let exe = self
            .resolve_executable()
            .ok_or_else(|| BigzipError::ExecutableNotFound(self.settings.executable_name.clone()))?;
        progress.report(ProgressSample::new(settings.init));

        let args = build_args(&request);
        progress.report(ProgressSample::new(settings.args_ready));

        info!(exe = %exe.display(), ?args, "starting bigzip process");

        let mut cmd = Command::new(&exe);
        cmd.args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = match cmd.spawn() {
            Ok(child) => child,
            Err(e) => {
                warn!(exe = %exe.display(), error = %e, "failed to start bigzip process");
                return Ok(RunResult::failed_to_start(e));
            }
        };
        progress.report(ProgressSample::new(settings.process_started));

        // Drain both pipes while waiting; reading after exit can deadlock
        // once a pipe buffer fills up.
        let mut stdout_task = spawn_drain(child.stdout.take());
        let mut stderr_task = spawn_drain(child.stderr.take());

        let ticker_stop = cancel.child_token();
        let ticker = spawn_ticker(*settings, ticker_stop.clone(), Arc::clone(&progress));

        let status = tokio::select! {
            biased;
            _ = cancel.cancelled() => None,
            status = child.wait() => Some(status),
        };

        ticker_stop.cancel();
        if let Err(e) = ticker.await {
            debug!(error = %e, "progress ticker ended abnormally");
        }

        let status = match status {
            Some(status) => status.context("waiting for bigzip process")?,
            None => {
                info!("cancellation requested; killing bigzip process");
                // `kill` also waits for the child, so nothing is left behind.
                if let Err(e) = child.kill().await {
                    warn!(error = %e, "failed to kill bigzip process on cancellation");
                }
                stdout_task.abort();
                stderr_task.abort();
                return Err(BigzipError::Cancelled);
            }
        };

        // Exited on its own, but the cancel landed first from the caller's
        // point of view.
        if cancel.is_cancelled() {
            stdout_task.abort();
            stderr_task.abort();
            return Err(BigzipError::Cancelled);
        }

        // A process left behind by the executable can keep the pipes open
        // after exit, so the drains must stay cancellable too.
        let drained = tokio::select! {
            biased;
            _ = cancel.cancelled() => None,
            output = async {
                let stdout = join_drain(&mut stdout_task).await?;
                let stderr = join_drain(&mut stderr_task).await?;
                Ok::<_, BigzipError>((stdout, stderr))
            } => Some(output),
        };
        let (stdout, stderr) = match drained {
            Some(output) => output?,
            None => {
                info!("cancellation requested while reading bigzip output");
                stdout_task.abort();
                stderr_task.abort();
                return Err(BigzipError::Cancelled);
            }
        };

        progress.report(ProgressSample::COMPLETE);
        let exit_code = status.code().unwrap_or(-1);

        info!(exit_code, success = status.success(), "bigzip process exited");

        Ok(RunResult {
            exit_code,
            stdout,
            stderr,
        })
    }
}

impl Default for RealProcessRunner {
    fn default() -> Self {
        Self::new(RunnerSettings::default())
    }
}

impl ProcessRunner for RealProcessRunner {
    fn executable_name(&self) -> &str {
        &self.settings.executable_name
    }

    fn resolve_executable(&self) -> Option<PathBuf> {
        let path = self.search_dir()?.join(&self.settings.executable_name);
        if path.is_file() {
            Some(path)
        } else {
            debug!(path = %path.display(), "bigzip executable not found");
            None
        }
    }

    fn run(
        &self,
        request: RunRequest,
        cancel: CancellationToken,
        progress: Arc<dyn ProgressSink>,
    ) -> Pin<Box<dyn Future<Output = Result<RunResult>> + Send + '_>> {
        Box::pin(self.run_inner(request, cancel, progress))
    }
}

fn spawn_drain<R>(pipe: Option<R>) -> JoinHandle<std::io::Result<String>>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut buf = Vec::new();
        if let Some(mut pipe) = pipe {
            pipe.read_to_end(&mut buf).await?;
        }
        Ok(String::from_utf8_lossy(&buf).into_owned())
    })
}

async fn join_drain(task: &mut JoinHandle<std::io::Result<String>>) -> Result<String> {
    let text = task
        .await
        .context("output reader task panicked")?
        .context("reading bigzip process output")?;
    Ok(text)
}
