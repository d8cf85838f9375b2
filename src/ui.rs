//! Terminal output and confirmation prompts.

use console::style;
use dialoguer::Confirm;

use crate::error::{DrakeError, Result};

/// Console front-end with a quiet mode.
///
/// Informational messages are suppressed when quiet; errors and prompts
/// always reach the user.
#[derive(Debug, Clone, Copy, Default)]
pub struct Ui {
    quiet: bool,
}

impl Ui {
    pub fn new(quiet: bool) -> Self {
        Self { quiet }
    }

    /// Informational message.
    pub fn message(&self, msg: &str) {
        if !self.quiet {
            println!("{}", msg);
        }
    }

    /// Success message.
    pub fn success(&self, msg: &str) {
        if !self.quiet {
            println!("{}", style(msg).green());
        }
    }

    /// Error message, always shown.
    pub fn error(&self, msg: &str) {
        eprintln!("{}", style(msg).red());
    }

    /// Ask a yes/no question, defaulting to yes.
    pub fn confirm(&self, question: &str) -> Result<bool> {
        Confirm::new()
            .with_prompt(question)
            .default(true)
            .interact()
            .map_err(|e| match e {
                dialoguer::Error::IO(io_err) => DrakeError::Io(io_err),
            })
    }
}
