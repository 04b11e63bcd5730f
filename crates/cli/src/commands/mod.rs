//! Command implementations.

pub mod customers;
pub mod session;

use std::path::PathBuf;

use customer_console::{ConfigError, ConsoleError, Route, Submission};
use customer_console_core::FieldErrors;
use thiserror::Error;

/// Errors that end a CLI command.
#[derive(Debug, Error)]
pub enum CliError {
    /// Configuration is missing or invalid.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The backend or the session refused the operation.
    #[error(transparent)]
    Console(#[from] ConsoleError),

    /// Input failed form validation; nothing was sent.
    #[error("Invalid {form}: {details}")]
    InvalidForm { form: &'static str, details: String },

    /// The route guard refused the screen.
    #[error("Cannot open {from}: redirected to {to}")]
    Redirected { from: Route, to: Route },

    /// A local file could not be read.
    #[error("Could not read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Another submission was still running.
    #[error("Submission skipped: another one is still running")]
    Skipped,
}

impl CliError {
    pub fn invalid_form(form: &'static str, errors: &FieldErrors) -> Self {
        let details = errors
            .iter()
            .map(|(field, message)| format!("{field}: {message}"))
            .collect::<Vec<_>>()
            .join("; ");
        Self::InvalidForm { form, details }
    }
}

/// Turn a finished submission into the command result.
///
/// The notification has already been sent by the coordinator.
pub fn finish(submission: Submission) -> Result<(), CliError> {
    match submission {
        Submission::Completed { .. } => Ok(()),
        Submission::Failed(err) => Err(err.into()),
        Submission::Skipped => Err(CliError::Skipped),
    }
}
