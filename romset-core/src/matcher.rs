//! Region and language matching against the policy's preference lists.

use std::fmt;

use crate::candidate::Candidate;
use crate::policy::UserPolicy;

/// Where a candidate's best region sits in the policy's region list.
///
/// Ordering puts any listed region first, then the all-regions fallback,
/// then the unranked sentinel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum RegionRank {
    Ranked(usize),
    Fallback,
    Unranked,
}

impl fmt::Display for RegionRank {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ranked(i) => write!(f, "#{}", i + 1),
            Self::Fallback => f.write_str("fallback"),
            Self::Unranked => f.write_str("unranked"),
        }
    }
}

/// Region and language standing of one candidate under one policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatchScore {
    pub region_rank: RegionRank,
    /// Negated weighted language score; lower is better, zero means no match.
    pub language_rank: i64,
    pub matched_language_count: usize,
}

/// Weighted score of one matched language at position `index` of the
/// policy list. Every match counts once; the first `weight` positions count
/// extra, tapering toward the end of that window.
fn language_points(index: usize, weight: u32) -> i64 {
    1 + (weight as i64 - index as i64).max(0)
}

/// Score a candidate's regions and languages.
pub fn match_score(candidate: &Candidate, policy: &UserPolicy) -> MatchScore {
    let best_region = candidate
        .regions
        .iter()
        .filter_map(|r| policy.regions.iter().position(|p| p == r))
        .min();
    let region_rank = match best_region {
        Some(i) => RegionRank::Ranked(i),
        None if policy.all_regions || policy.all_regions_with_lang => RegionRank::Fallback,
        None => RegionRank::Unranked,
    };

    let mut score = 0i64;
    let mut matched = 0usize;
    for lang in &candidate.languages {
        if let Some(i) = policy.languages.iter().position(|p| p == lang) {
            score += language_points(i, policy.language_weight);
            matched += 1;
        }
    }

    MatchScore {
        region_rank,
        language_rank: -score,
        matched_language_count: matched,
    }
}

/// Why a candidate cannot be selected at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ineligible {
    /// Removed by a `--no-*` toggle.
    Excluded(&'static str),
    /// Matched the exclude word list.
    ExcludeList,
    /// None of its languages are selected (all-regions-with-lang).
    LanguageNotSelected,
    /// Zero matched languages under only-selected-lang.
    NoLanguageMatch,
    /// No selected region and no region fallback enabled.
    RegionNotSelected,
}

impl fmt::Display for Ineligible {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Excluded(toggle) => write!(f, "excluded by --no-{toggle}"),
            Self::ExcludeList => f.write_str("matches the exclude list"),
            Self::LanguageNotSelected => f.write_str("no selected language"),
            Self::NoLanguageMatch => f.write_str("no matching language (strict mode)"),
            Self::RegionNotSelected => f.write_str("no selected region"),
        }
    }
}

/// Decide whether a candidate may compete in its group at all.
pub fn eligibility(
    candidate: &Candidate,
    score: &MatchScore,
    policy: &UserPolicy,
) -> Result<(), Ineligible> {
    if let Some(toggle) = policy.exclusions.excluded_by(candidate) {
        return Err(Ineligible::Excluded(toggle));
    }
    if policy.exclude.matches(&candidate.name) {
        return Err(Ineligible::ExcludeList);
    }

    let has_language = score.matched_language_count > 0;
    if policy.all_regions_with_lang && !has_language {
        return Err(Ineligible::LanguageNotSelected);
    }
    if policy.only_selected_lang && !has_language {
        return Err(Ineligible::NoLanguageMatch);
    }
    if policy.all_regions_with_lang || policy.all_regions {
        return Ok(());
    }
    match score.region_rank {
        RegionRank::Ranked(_) => Ok(()),
        _ => Err(Ineligible::RegionNotSelected),
    }
}
