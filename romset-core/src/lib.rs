//! Selection engine for one-game-one-ROM sets.
//!
//! Catalog records become typed [`Candidate`]s, candidates are scored
//! against a [`UserPolicy`], and the [`resolver`] picks one winner per
//! logical game.

pub mod candidate;
pub mod comparator;
pub mod diagnostics;
pub mod error;
pub mod extract;
pub mod matcher;
pub mod policy;
pub mod region;
pub mod release;
pub mod resolver;
pub mod util;
pub mod wordlist;

pub use candidate::{
    Candidate, CatalogRecord, ClassFlags, DumpQuality, Prerelease, ReleaseStatus, RomEntry, Stage,
};
pub use comparator::{Comparator, KeyValue, ScoreVector};
pub use diagnostics::{Diagnostic, Summary};
pub use error::{CatalogError, PolicyError};
pub use extract::{build_candidates, extract};
pub use matcher::{Ineligible, MatchScore, RegionRank, eligibility, match_score};
pub use policy::{Exclusions, PolicyOptions, UnlicensedFilter, UserPolicy};
pub use region::Region;
pub use release::ReleaseNumber;
pub use resolver::{Resolution, ResolveOptions, resolve};
pub use wordlist::{ListOptions, NameMatcher, WordList};
