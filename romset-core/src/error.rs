use thiserror::Error;

use crate::region::UnknownRegion;

/// Configuration errors. All are raised while the policy is built, before
/// any catalog or file work starts.
#[derive(Debug, Error)]
pub enum PolicyError {
    #[error("at least one region must be selected")]
    NoRegions,

    #[error(transparent)]
    UnknownRegion(#[from] UnknownRegion),

    #[error("invalid language code: {0:?}")]
    InvalidLanguage(String),

    #[error("language weight must be greater than zero")]
    InvalidWeight,

    #[error("{0} and {1} cannot be combined")]
    Conflict(&'static str, &'static str),

    #[error("{0} requires at least one word list")]
    NoWordList(&'static str),

    #[error("invalid pattern {pattern:?} in {list} list: {source}")]
    Pattern {
        list: &'static str,
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("cannot read {list} list from {path}: {source}")]
    ListFile {
        list: &'static str,
        path: String,
        #[source]
        source: std::io::Error,
    },
}

impl PolicyError {
    pub fn conflict(a: &'static str, b: &'static str) -> Self {
        Self::Conflict(a, b)
    }

    pub fn invalid_language(code: impl Into<String>) -> Self {
        Self::InvalidLanguage(code.into())
    }
}

/// Catalog errors. Missing identity fields abort the run.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("catalog entry #{0} has no name")]
    MissingName(usize),

    #[error("catalog entry name {0:?} appears more than once")]
    DuplicateName(String),

    #[error("catalog contains no entries")]
    Empty,
}
