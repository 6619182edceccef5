// src/errors.rs

//! Crate-wide error aliases and helpers.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum BigzipError {
    #[error("Input file is required")]
    InputRequired,

    #[error("Input file does not exist: {}", .0.display())]
    InputMissing(PathBuf),

    #[error("{0} not found")]
    ExecutableNotFound(String),

    #[error("Overwrite declined")]
    OverwriteDeclined,

    #[error("Output file already exists and no confirmation dialog available")]
    ConfirmationUnavailable,

    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// The run was cancelled. Never reported as a failure.
    #[error("Cancelled")]
    Cancelled,

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl BigzipError {
    /// Errors raised before any subprocess is launched.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            BigzipError::InputRequired
                | BigzipError::InputMissing(_)
                | BigzipError::ExecutableNotFound(_)
                | BigzipError::OverwriteDeclined
                | BigzipError::ConfirmationUnavailable
        )
    }
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, BigzipError>;
