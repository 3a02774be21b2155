//! Group resolution: bucket candidates by logical game and pick one winner
//! per bucket.

use std::collections::BTreeMap;

use crate::candidate::Candidate;
use crate::comparator::{Comparator, ScoreVector};
use crate::diagnostics::Diagnostic;
use crate::matcher::{eligibility, match_score};
use crate::policy::UserPolicy;

/// Resolution options that depend on how files were located.
#[derive(Debug, Clone, Copy, Default)]
pub struct ResolveOptions {
    /// Skip candidates with no bound file and fall through to the next one.
    pub require_binding: bool,
}

/// Winners keyed by logical-game key, plus the events raised on the way.
#[derive(Debug, Default)]
pub struct Resolution {
    pub winners: BTreeMap<String, Candidate>,
    pub diagnostics: Vec<Diagnostic>,
}

impl Resolution {
    pub fn winner(&self, key: &str) -> Option<&Candidate> {
        self.winners.get(key)
    }
}

/// Partition `candidates` by key, rank each group and select its winner.
///
/// Runs single-threaded and depends only on the candidate set and policy,
/// so repeated runs give identical results.
pub fn resolve(
    candidates: Vec<Candidate>,
    policy: &UserPolicy,
    options: ResolveOptions,
) -> Resolution {
    let comparator = Comparator::new(policy);
    log::debug!("Ranking by: {}", comparator.describe().join(", "));

    let mut groups: BTreeMap<String, Vec<(ScoreVector, Candidate)>> = BTreeMap::new();
    for candidate in candidates {
        let matched = match_score(&candidate, policy);
        let group = groups.entry(candidate.key.clone()).or_default();
        match eligibility(&candidate, &matched, policy) {
            Ok(()) => group.push((comparator.score(&candidate, &matched), candidate)),
            Err(reason) => log::debug!("{}: {}", candidate.name, reason),
        }
    }

    let mut resolution = Resolution::default();
    for (key, mut ranked) in groups {
        if ranked.is_empty() {
            resolution
                .diagnostics
                .push(Diagnostic::NoEligibleCandidate { key });
            continue;
        }
        ranked.sort_by(|a, b| a.0.cmp(&b.0));
        if log::log_enabled!(log::Level::Debug) {
            let names: Vec<&str> = ranked.iter().map(|(_, c)| c.name.as_str()).collect();
            log::debug!("{key}: {}", names.join(" > "));
        }

        let mut winner = None;
        let mut skipped = false;
        for (_, candidate) in ranked {
            if policy.exclude_after.matches(&candidate.name) {
                resolution.diagnostics.push(Diagnostic::GroupSkipped {
                    key: key.clone(),
                    winner: candidate.name,
                });
                skipped = true;
                break;
            }
            if options.require_binding && !candidate.is_bound() {
                resolution.diagnostics.push(Diagnostic::CandidateMissing {
                    key: key.clone(),
                    candidate: candidate.name,
                });
                continue;
            }
            winner = Some(candidate);
            break;
        }

        match winner {
            Some(candidate) => {
                resolution.winners.insert(key, candidate);
            }
            None if !skipped => resolution.diagnostics.push(Diagnostic::NoFileFound { key }),
            None => {}
        }
    }
    resolution
}
