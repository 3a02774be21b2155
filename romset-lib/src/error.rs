use thiserror::Error;

use romset_core::{CatalogError, PolicyError};
use romset_dat::DatError;

/// Fatal errors of a generate run.
#[derive(Debug, Error)]
pub enum RunError {
    #[error(transparent)]
    Policy(#[from] PolicyError),

    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error(transparent)]
    Dat(#[from] DatError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The catalog has no parent/clone relationships.
    #[error("{0} has no clone information and cannot drive a 1G1R selection (use --force to continue)")]
    NoCloneData(String),

    #[error("Header file not found: {0}")]
    HeaderNotFound(String),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl RunError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }
}

/// Per-file scan failure. Reported and counted, never fatal.
#[derive(Debug, Error)]
pub enum ScanIssue {
    #[error("file is {size} bytes, above the scan limit")]
    Oversized { size: u64 },

    #[error("read failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("scan aborted: {0}")]
    Aborted(String),
}
