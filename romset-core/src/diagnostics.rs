//! Non-fatal events collected during a run and summarized at the end.

use std::fmt;
use std::path::PathBuf;

/// A per-file or per-group event worth reporting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Diagnostic {
    /// The group's winner matched the exclude-after list.
    GroupSkipped { key: String, winner: String },
    /// Every candidate of the group was excluded or ineligible.
    NoEligibleCandidate { key: String },
    /// Eligible candidates exist but none has a file.
    NoFileFound { key: String },
    /// A preferred candidate had no file; the next one was tried.
    CandidateMissing { key: String, candidate: String },
    /// File matched no catalog payload.
    UnmatchedFile { path: PathBuf },
    /// File larger than the scan limit.
    OversizedFile { path: PathBuf, size: u64 },
    /// File could not be read.
    ScanFailed { path: PathBuf, reason: String },
    /// File payload matches several catalog entries; bound to the first.
    AmbiguousFile { path: PathBuf, entries: Vec<String> },
    /// Another file already supplied this payload.
    DuplicateFile { path: PathBuf, entry: String },
}

impl Diagnostic {
    /// Events only shown at verbose level.
    pub fn is_verbose(&self) -> bool {
        matches!(
            self,
            Self::AmbiguousFile { .. } | Self::DuplicateFile { .. } | Self::CandidateMissing { .. }
        )
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::GroupSkipped { key, winner } => {
                write!(f, "{key}: skipped, {winner} matches the exclude-after list")
            }
            Self::NoEligibleCandidate { key } => write!(f, "{key}: no eligible candidate"),
            Self::NoFileFound { key } => write!(f, "{key}: no file found for any candidate"),
            Self::CandidateMissing { key, candidate } => {
                write!(f, "{key}: {candidate} not found, trying next")
            }
            Self::UnmatchedFile { path } => write!(f, "{}: no catalog match", path.display()),
            Self::OversizedFile { path, size } => write!(
                f,
                "{}: {} exceeds the scan limit",
                path.display(),
                crate::util::format_bytes(*size)
            ),
            Self::ScanFailed { path, reason } => write!(f, "{}: {reason}", path.display()),
            Self::AmbiguousFile { path, entries } => write!(
                f,
                "{}: matches {} entries, using {}",
                path.display(),
                entries.len(),
                entries.first().map(String::as_str).unwrap_or("none")
            ),
            Self::DuplicateFile { path, entry } => {
                write!(f, "{}: duplicate of {entry}", path.display())
            }
        }
    }
}

/// Per-kind totals for the end-of-run summary.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Summary {
    pub groups_skipped: usize,
    pub groups_empty: usize,
    pub groups_missing: usize,
    pub files_unmatched: usize,
    pub files_oversized: usize,
    pub files_failed: usize,
    pub files_ambiguous: usize,
    pub files_duplicate: usize,
}

impl Summary {
    pub fn from_events<'a>(events: impl IntoIterator<Item = &'a Diagnostic>) -> Self {
        let mut s = Self::default();
        for event in events {
            match event {
                Diagnostic::GroupSkipped { .. } => s.groups_skipped += 1,
                Diagnostic::NoEligibleCandidate { .. } => s.groups_empty += 1,
                Diagnostic::NoFileFound { .. } => s.groups_missing += 1,
                Diagnostic::CandidateMissing { .. } => {}
                Diagnostic::UnmatchedFile { .. } => s.files_unmatched += 1,
                Diagnostic::OversizedFile { .. } => s.files_oversized += 1,
                Diagnostic::ScanFailed { .. } => s.files_failed += 1,
                Diagnostic::AmbiguousFile { .. } => s.files_ambiguous += 1,
                Diagnostic::DuplicateFile { .. } => s.files_duplicate += 1,
            }
        }
        s
    }
}
