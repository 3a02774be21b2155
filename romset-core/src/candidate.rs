//! Typed candidate model and the catalog record it is built from.

use std::path::PathBuf;

use crate::region::Region;
use crate::release::ReleaseNumber;

/// Dump quality as classified by the catalog or the dump name.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DumpQuality {
    #[default]
    Good,
    Bad,
}

/// Prerelease stages recognized in dump names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Beta,
    Proto,
    Demo,
    Sample,
}

impl Stage {
    pub fn label(self) -> &'static str {
        match self {
            Self::Beta => "beta",
            Self::Proto => "proto",
            Self::Demo => "demo",
            Self::Sample => "sample",
        }
    }
}

/// One prerelease tag found in a name, with its optional sequence number
/// (`(Beta 2)` carries `2`, `(Beta)` carries none).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prerelease {
    pub stage: Stage,
    pub number: Option<ReleaseNumber>,
}

/// Coarse release status derived from the prerelease tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReleaseStatus {
    Release,
    Beta,
    Proto,
    Demo,
    Sample,
}

/// Licensing and class flags.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClassFlags {
    pub bios: bool,
    pub program: bool,
    pub enhancement_chip: bool,
    pub pirate: bool,
    pub aftermarket: bool,
    pub homebrew: bool,
    pub kiosk: bool,
    pub promo: bool,
    pub debug: bool,
    pub unlicensed: bool,
}

/// A payload file declared by the catalog for one entry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RomEntry {
    pub name: String,
    pub size: u64,
    pub crc32: Option<String>,
    pub sha1: Option<String>,
}

/// Structured catalog input for one entry, as supplied by a catalog parser.
///
/// Only `name` is required. Everything else degrades to defaults.
#[derive(Debug, Clone, Default)]
pub struct CatalogRecord {
    pub name: String,
    /// Name of the parent entry when this entry is a clone.
    pub clone_of: Option<String>,
    /// Region codes declared by release metadata, in declaration order.
    pub regions: Vec<String>,
    /// Language codes declared by release metadata.
    pub languages: Vec<String>,
    /// Declared BIOS flag, overriding the name when present.
    pub is_bios: Option<bool>,
    /// Declared dump status, overriding the name when present.
    pub quality: Option<DumpQuality>,
    pub roms: Vec<RomEntry>,
}

/// One catalog entry, fully classified.
///
/// Everything except `files` is fixed at extraction time. `files` is filled
/// once when physical files are bound to the entry.
#[derive(Debug, Clone)]
pub struct Candidate {
    /// Unique within a run; the catalog entry name.
    pub id: String,
    /// Logical-game key shared by a parent and its clones.
    pub key: String,
    pub name: String,
    pub regions: Vec<Region>,
    pub languages: Vec<String>,
    /// True when `languages` came from metadata or the name, not from regions.
    pub explicit_languages: bool,
    pub revision: ReleaseNumber,
    pub version: ReleaseNumber,
    pub quality: DumpQuality,
    pub prerelease: Vec<Prerelease>,
    pub class: ClassFlags,
    pub is_parent: bool,
    /// Position in the catalog.
    pub input_index: usize,
    pub roms: Vec<RomEntry>,
    pub files: Vec<PathBuf>,
}

impl Candidate {
    pub fn is_bad(&self) -> bool {
        self.quality == DumpQuality::Bad
    }

    pub fn is_prerelease(&self) -> bool {
        !self.prerelease.is_empty()
    }

    pub fn has_stage(&self, stage: Stage) -> bool {
        self.prerelease.iter().any(|p| p.stage == stage)
    }

    /// Sequence number of the first tag of `stage`, if that tag is numbered.
    pub fn stage_number(&self, stage: Stage) -> Option<&ReleaseNumber> {
        self.prerelease
            .iter()
            .find(|p| p.stage == stage)
            .and_then(|p| p.number.as_ref())
    }

    pub fn release_status(&self) -> ReleaseStatus {
        match self.prerelease.first().map(|p| p.stage) {
            None => ReleaseStatus::Release,
            Some(Stage::Beta) => ReleaseStatus::Beta,
            Some(Stage::Proto) => ReleaseStatus::Proto,
            Some(Stage::Demo) => ReleaseStatus::Demo,
            Some(Stage::Sample) => ReleaseStatus::Sample,
        }
    }

    pub fn is_bound(&self) -> bool {
        !self.files.is_empty()
    }

    /// Total declared payload size in bytes.
    pub fn declared_size(&self) -> u64 {
        self.roms.iter().map(|r| r.size).sum()
    }
}
