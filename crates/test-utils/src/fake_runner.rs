use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;
use std::sync::{Arc, Mutex};

use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;

use bigzip_controller::errors::{BigzipError, Result};
use bigzip_controller::exec::{ProcessRunner, ProgressSample, ProgressSink};
use bigzip_controller::types::{RunRequest, RunResult};

/// What a [`FakeRunner`] does once invoked.
#[derive(Debug, Clone)]
pub enum FakeBehaviour {
    /// Report the usual checkpoints and return this result straight away.
    Complete(RunResult),
    /// Report the checkpoints, then block until cancelled.
    WaitForCancel,
    /// Block until `release` is notified, then return `result` even if the
    /// run was cancelled meanwhile.
    Gated {
        release: Arc<Notify>,
        result: RunResult,
    },
    /// Panic inside the run.
    Panic(String),
    /// Return an unexpected error.
    Error(String),
}

/// A fake process runner that:
/// - records every request it was asked to run
/// - behaves according to a [`FakeBehaviour`]
#[derive(Clone)]
pub struct FakeRunner {
    behaviour: FakeBehaviour,
    resolvable: bool,
    requests: Arc<Mutex<Vec<RunRequest>>>,
    started: Arc<Notify>,
}

impl FakeRunner {
    pub fn new(behaviour: FakeBehaviour) -> Self {
        Self {
            behaviour,
            resolvable: true,
            requests: Arc::new(Mutex::new(Vec::new())),
            started: Arc::new(Notify::new()),
        }
    }

    /// Exit code 0 with a bigzip-style summary line on stdout.
    pub fn succeeding(stdout: impl Into<String>) -> Self {
        Self::new(FakeBehaviour::Complete(RunResult {
            exit_code: 0,
            stdout: stdout.into(),
            stderr: String::new(),
        }))
    }

    pub fn failing(exit_code: i32, stderr: impl Into<String>) -> Self {
        Self::new(FakeBehaviour::Complete(RunResult {
            exit_code,
            stdout: String::new(),
            stderr: stderr.into(),
        }))
    }

    pub fn blocking() -> Self {
        Self::new(FakeBehaviour::WaitForCancel)
    }

    /// Pretend the executable cannot be found.
    pub fn unresolvable(mut self) -> Self {
        self.resolvable = false;
        self
    }

    /// Requests received so far.
    pub fn requests(&self) -> Vec<RunRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// Resolves once `run` has been entered (and the checkpoints reported).
    pub async fn wait_started(&self) {
        self.started.notified().await;
    }
}

impl ProcessRunner for FakeRunner {
    fn executable_name(&self) -> &str {
        "bz"
    }

    fn resolve_executable(&self) -> Option<PathBuf> {
        self.resolvable.then(|| PathBuf::from("/fake/bin/bz"))
    }

    fn run(
        &self,
        request: RunRequest,
        cancel: CancellationToken,
        progress: Arc<dyn ProgressSink>,
    ) -> Pin<Box<dyn Future<Output = Result<RunResult>> + Send + '_>> {
        Box::pin(async move {
            self.requests.lock().unwrap().push(request);

            progress.report(ProgressSample::new(0.1));
            progress.report(ProgressSample::new(0.2));
            progress.report(ProgressSample::new(0.3));
            self.started.notify_one();

            match &self.behaviour {
                FakeBehaviour::Complete(result) => {
                    if result.success() {
                        progress.report(ProgressSample::COMPLETE);
                    }
                    Ok(result.clone())
                }
                FakeBehaviour::WaitForCancel => {
                    cancel.cancelled().await;
                    Err(BigzipError::Cancelled)
                }
                FakeBehaviour::Gated { release, result } => {
                    release.notified().await;
                    Ok(result.clone())
                }
                FakeBehaviour::Panic(message) => panic!("{message}"),
                FakeBehaviour::Error(message) => {
                    Err(BigzipError::Other(anyhow::anyhow!(message.clone())))
                }
            }
        })
    }
}
