//! Collaborators that record what the controller asked of them.
//!
//! All of them are cheap to clone; clones share the same record, so a test
//! can keep one copy and hand the other to `Collaborators`.

use std::sync::{Arc, Mutex};

use bigzip_controller::errors::{BigzipError, Result};
use bigzip_controller::ui::{
    BoxFuture, ConfirmPresenter, FilePicker, MessagePresenter, ResultPresenter,
};

#[derive(Clone, Default)]
pub struct RecordingMessages {
    shown: Arc<Mutex<Vec<String>>>,
}

impl RecordingMessages {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shown(&self) -> Vec<String> {
        self.shown.lock().unwrap().clone()
    }
}

impl MessagePresenter for RecordingMessages {
    fn show(&self, message: String) -> BoxFuture<'_, Result<()>> {
        self.shown.lock().unwrap().push(message);
        Box::pin(async { Ok(()) })
    }
}

/// Answers every confirmation with a fixed answer.
#[derive(Clone)]
pub struct ScriptedConfirm {
    answer: bool,
    prompts: Arc<Mutex<Vec<String>>>,
}

impl ScriptedConfirm {
    pub fn answering(answer: bool) -> Self {
        Self {
            answer,
            prompts: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

impl ConfirmPresenter for ScriptedConfirm {
    fn confirm(&self, message: String) -> BoxFuture<'_, Result<bool>> {
        self.prompts.lock().unwrap().push(message);
        let answer = self.answer;
        Box::pin(async move { Ok(answer) })
    }
}

/// Asks, records the prompt, and never answers.
#[derive(Clone, Default)]
pub struct PendingConfirm {
    prompts: Arc<Mutex<Vec<String>>>,
}

impl PendingConfirm {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

impl ConfirmPresenter for PendingConfirm {
    fn confirm(&self, message: String) -> BoxFuture<'_, Result<bool>> {
        self.prompts.lock().unwrap().push(message);
        Box::pin(std::future::pending())
    }
}

#[derive(Clone, Default)]
pub struct RecordingResults {
    presented: Arc<Mutex<Vec<(bool, String)>>>,
}

impl RecordingResults {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn presented(&self) -> Vec<(bool, String)> {
        self.presented.lock().unwrap().clone()
    }
}

impl ResultPresenter for RecordingResults {
    fn present(&self, success: bool, message: String) -> BoxFuture<'_, Result<()>> {
        self.presented.lock().unwrap().push((success, message));
        Box::pin(async { Ok(()) })
    }
}

/// Picker with a canned answer.
#[derive(Clone)]
pub struct FixedPicker {
    answer: std::result::Result<Option<String>, String>,
    calls: Arc<Mutex<usize>>,
}

impl FixedPicker {
    pub fn returning(path: impl Into<String>) -> Self {
        Self::with_answer(Ok(Some(path.into())))
    }

    pub fn dismissed() -> Self {
        Self::with_answer(Ok(None))
    }

    pub fn failing(message: impl Into<String>) -> Self {
        Self::with_answer(Err(message.into()))
    }

    fn with_answer(answer: std::result::Result<Option<String>, String>) -> Self {
        Self {
            answer,
            calls: Arc::new(Mutex::new(0)),
        }
    }

    pub fn calls(&self) -> usize {
        *self.calls.lock().unwrap()
    }
}

impl FilePicker for FixedPicker {
    fn pick(&self) -> BoxFuture<'_, Result<Option<String>>> {
        *self.calls.lock().unwrap() += 1;
        let answer = self.answer.clone();
        Box::pin(async move { answer.map_err(|e| BigzipError::Other(anyhow::anyhow!(e))) })
    }
}
