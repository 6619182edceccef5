// src/ui/mod.rs

//! Collaborator contracts consumed by the controller.
//!
//! The controller never renders anything itself. It asks these narrow
//! collaborators for paths, confirmations and result presentation. Every
//! collaborator is optional; what happens when one is missing is decided by
//! the controller, not here.
//!
//! - [`console`] has terminal implementations used by the binary.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::errors::Result;

pub mod console;

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Open or save file picker. `None` means the user dismissed it.
pub trait FilePicker: Send + Sync {
    fn pick(&self) -> BoxFuture<'_, Result<Option<String>>>;
}

/// Shows a plain message and resolves once acknowledged.
pub trait MessagePresenter: Send + Sync {
    fn show(&self, message: String) -> BoxFuture<'_, Result<()>>;
}

/// Yes/no question.
pub trait ConfirmPresenter: Send + Sync {
    fn confirm(&self, message: String) -> BoxFuture<'_, Result<bool>>;
}

/// Final outcome of a run: the output path on success, the error text on
/// failure.
pub trait ResultPresenter: Send + Sync {
    fn present(&self, success: bool, message: String) -> BoxFuture<'_, Result<()>>;
}

/// The set of collaborators a controller was built with.
#[derive(Clone, Default)]
pub struct Collaborators {
    pub open_picker: Option<Arc<dyn FilePicker>>,
    pub save_picker: Option<Arc<dyn FilePicker>>,
    pub messages: Option<Arc<dyn MessagePresenter>>,
    pub confirm: Option<Arc<dyn ConfirmPresenter>>,
    pub results: Option<Arc<dyn ResultPresenter>>,
}

impl Collaborators {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_open_picker(mut self, picker: impl FilePicker + 'static) -> Self {
        self.open_picker = Some(Arc::new(picker));
        self
    }

    pub fn with_save_picker(mut self, picker: impl FilePicker + 'static) -> Self {
        self.save_picker = Some(Arc::new(picker));
        self
    }

    pub fn with_messages(mut self, presenter: impl MessagePresenter + 'static) -> Self {
        self.messages = Some(Arc::new(presenter));
        self
    }

    pub fn with_confirm(mut self, presenter: impl ConfirmPresenter + 'static) -> Self {
        self.confirm = Some(Arc::new(presenter));
        self
    }

    pub fn with_results(mut self, presenter: impl ResultPresenter + 'static) -> Self {
        self.results = Some(Arc::new(presenter));
        self
    }
}

impl fmt::Debug for Collaborators {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Collaborators")
            .field("open_picker", &self.open_picker.is_some())
            .field("save_picker", &self.save_picker.is_some())
            .field("messages", &self.messages.is_some())
            .field("confirm", &self.confirm.is_some())
            .field("results", &self.results.is_some())
            .finish()
    }
}
