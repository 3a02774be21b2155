use thiserror::Error;

use romset_core::PolicyError;
use romset_lib::RunError;

/// Errors that can occur during CLI command execution.
#[derive(Debug, Error)]
pub(crate) enum CliError {
    /// I/O error
    #[error("{0}")]
    Io(#[from] std::io::Error),

    /// Invalid flags or policy
    #[error("Config error: {0}")]
    Config(String),

    /// Runtime creation or async error
    #[error("Runtime error: {0}")]
    Runtime(String),

    /// Failure inside the run itself
    #[error(transparent)]
    Run(#[from] RunError),
}

impl From<PolicyError> for CliError {
    fn from(e: PolicyError) -> Self {
        Self::Config(e.to_string())
    }
}

impl CliError {
    pub(crate) fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub(crate) fn runtime(msg: impl Into<String>) -> Self {
        Self::Runtime(msg.into())
    }
}
