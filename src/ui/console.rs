// src/ui/console.rs

//! Terminal collaborators for the command-line front end.

use std::io::{BufRead, Write};

use anyhow::Context;

use super::{BoxFuture, ConfirmPresenter, MessagePresenter, ResultPresenter};
use crate::errors::Result;

/// Messages go to stderr so stdout only carries results.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConsoleMessages;

impl MessagePresenter for ConsoleMessages {
    fn show(&self, message: String) -> BoxFuture<'_, Result<()>> {
        Box::pin(async move {
            eprintln!("{message}");
            Ok(())
        })
    }
}

/// Asks on stdin, or answers yes without asking when `assume_yes` is set.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConsoleConfirm {
    pub assume_yes: bool,
}

impl ConfirmPresenter for ConsoleConfirm {
    fn confirm(&self, message: String) -> BoxFuture<'_, Result<bool>> {
        let assume_yes = self.assume_yes;
        Box::pin(async move {
            if assume_yes {
                eprintln!("{message}; overwriting (--yes)");
                return Ok(true);
            }

            let answer = tokio::task::spawn_blocking(move || -> std::io::Result<String> {
                let mut stderr = std::io::stderr().lock();
                write!(stderr, "{message}. Overwrite? [y/N] ")?;
                stderr.flush()?;

                let mut line = String::new();
                std::io::stdin().lock().read_line(&mut line)?;
                Ok(line)
            })
            .await
            .context("confirmation prompt task panicked")?
            .context("reading confirmation from stdin")?;

            Ok(is_yes(&answer))
        })
    }
}

/// Successful output path to stdout; failures to stderr.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConsoleResults;

impl ResultPresenter for ConsoleResults {
    fn present(&self, success: bool, message: String) -> BoxFuture<'_, Result<()>> {
        Box::pin(async move {
            if success {
                println!("{message}");
            } else {
                eprintln!("bigzip failed: {message}");
            }
            Ok(())
        })
    }
}

fn is_yes(answer: &str) -> bool {
    matches!(answer.trim().to_lowercase().as_str(), "y" | "yes")
}
