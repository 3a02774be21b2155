//! Candidate ranking.
//!
//! The comparator is an ordered list of key extractors assembled once from
//! the policy. Each candidate is reduced to a [`ScoreVector`] of key values
//! that compare lexicographically, with catalog position as the last key so
//! that no two candidates ever compare equal.

use std::cmp::{Ordering, Reverse};

use crate::candidate::{Candidate, Stage};
use crate::matcher::{MatchScore, RegionRank};
use crate::policy::UserPolicy;
use crate::release::ReleaseNumber;

/// One comparison key value. Lower is preferred.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum KeyValue {
    /// `false` sorts before `true`.
    Flag(bool),
    Int(i64),
    Region(RegionRank),
    Ascending(ReleaseNumber),
    Descending(Reverse<ReleaseNumber>),
    /// Prerelease recency: no sequence number first, then the highest.
    Stage(Option<Reverse<ReleaseNumber>>),
}

type Extractor<'p> = Box<dyn Fn(&Candidate, &MatchScore) -> KeyValue + Send + Sync + 'p>;

struct Key<'p> {
    name: &'static str,
    extract: Extractor<'p>,
}

fn key<'p>(
    name: &'static str,
    extract: impl Fn(&Candidate, &MatchScore) -> KeyValue + Send + Sync + 'p,
) -> Key<'p> {
    Key {
        name,
        extract: Box::new(extract),
    }
}

/// Key values computed for one candidate under one policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScoreVector {
    pub keys: Vec<KeyValue>,
    pub input_index: usize,
}

impl Ord for ScoreVector {
    fn cmp(&self, other: &Self) -> Ordering {
        self.keys
            .cmp(&other.keys)
            .then(self.input_index.cmp(&other.input_index))
    }
}

impl PartialOrd for ScoreVector {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

fn release_key(value: &ReleaseNumber, early: bool) -> KeyValue {
    if early {
        KeyValue::Ascending(value.clone())
    } else {
        KeyValue::Descending(Reverse(value.clone()))
    }
}

fn stage_key(stage: Stage) -> impl Fn(&Candidate, &MatchScore) -> KeyValue + Send + Sync {
    move |c, _| KeyValue::Stage(c.stage_number(stage).cloned().map(Reverse))
}

/// Total order over the candidates of one group, borrowing the policy it
/// was built from.
pub struct Comparator<'p> {
    keys: Vec<Key<'p>>,
}

impl<'p> Comparator<'p> {
    /// Assemble the active key chain for `policy`.
    pub fn new(policy: &'p UserPolicy) -> Self {
        let mut keys = vec![key("dump quality", |c, _| KeyValue::Flag(c.is_bad()))];

        keys.push(key("release status", move |c, _| {
            KeyValue::Flag(c.is_prerelease() != policy.prefer_prereleases)
        }));

        if !policy.avoid.is_empty() {
            keys.push(key("avoid list", move |c, _| {
                KeyValue::Flag(policy.avoid.matches(&c.name))
            }));
        }

        let region = key("region", |_, s| KeyValue::Region(s.region_rank));
        let language = key("language", |_, s| KeyValue::Int(s.language_rank));
        if policy.prioritize_languages {
            keys.extend([language, region]);
        } else {
            keys.extend([region, language]);
        }

        if policy.prefer_parents {
            keys.push(key("parent", |c, _| KeyValue::Flag(!c.is_parent)));
        }
        if policy.input_order {
            keys.push(key("input order", |c, _| {
                KeyValue::Int(c.input_index as i64)
            }));
        }
        if !policy.prefer.is_empty() {
            keys.push(key("prefer list", move |c, _| {
                KeyValue::Flag(!policy.prefer.matches(&c.name))
            }));
        }

        keys.push(key("revision", move |c, _| {
            release_key(&c.revision, policy.early_revisions)
        }));
        keys.push(key("version", move |c, _| {
            release_key(&c.version, policy.early_versions)
        }));

        keys.push(key("sample", stage_key(Stage::Sample)));
        keys.push(key("demo", stage_key(Stage::Demo)));
        keys.push(key("beta", stage_key(Stage::Beta)));
        keys.push(key("proto", stage_key(Stage::Proto)));

        keys.push(key("language count", |_, s| {
            KeyValue::Int(-(s.matched_language_count as i64))
        }));
        keys.push(key("parent", |c, _| KeyValue::Flag(!c.is_parent)));

        Self { keys }
    }

    /// Names of the active keys, in comparison order.
    pub fn describe(&self) -> Vec<&'static str> {
        self.keys.iter().map(|k| k.name).collect()
    }

    /// Compute the score vector of one candidate.
    pub fn score(&self, candidate: &Candidate, matched: &MatchScore) -> ScoreVector {
        ScoreVector {
            keys: self
                .keys
                .iter()
                .map(|k| (k.extract)(candidate, matched))
                .collect(),
            input_index: candidate.input_index,
        }
    }

    /// Compare two candidates directly.
    pub fn compare(
        &self,
        a: (&Candidate, &MatchScore),
        b: (&Candidate, &MatchScore),
    ) -> Ordering {
        self.score(a.0, a.1).cmp(&self.score(b.0, b.1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::candidate::CatalogRecord;
    use crate::extract::extract;
    use crate::matcher::match_score;
    use crate::policy::PolicyOptions;

    fn policy(f: impl FnOnce(&mut PolicyOptions)) -> UserPolicy {
        let mut opts = PolicyOptions {
            regions: vec!["USA".into(), "EUR".into()],
            languages: vec!["en".into()],
            ..Default::default()
        };
        f(&mut opts);
        UserPolicy::new(opts).unwrap()
    }

    fn candidate(name: &str, index: usize) -> Candidate {
        extract(
            &CatalogRecord {
                name: name.into(),
                ..Default::default()
            },
            index,
        )
    }

    fn order(policy: &UserPolicy, a: &Candidate, b: &Candidate) -> Ordering {
        let cmp = Comparator::new(policy);
        cmp.compare(
            (a, &match_score(a, policy)),
            (b, &match_score(b, policy)),
        )
    }

    #[test]
    fn default_key_chain() {
        let p = policy(|_| {});
        assert_eq!(
            Comparator::new(&p).describe(),
            vec![
                "dump quality",
                "release status",
                "region",
                "language",
                "revision",
                "version",
                "sample",
                "demo",
                "beta",
                "proto",
                "language count",
                "parent",
            ]
        );
    }

    #[test]
    fn optional_keys_are_inserted_in_place() {
        let p = policy(|o| {
            o.prioritize_languages = true;
            o.prefer_parents = true;
            o.avoid = Some("Demo".into());
            o.prefer = Some("Rev".into());
        });
        let keys = Comparator::new(&p).describe();
        assert_eq!(
            &keys[..7],
            &[
                "dump quality",
                "release status",
                "avoid list",
                "language",
                "region",
                "parent",
                "prefer list",
            ]
        );
    }

    #[test]
    fn good_dump_beats_better_region() {
        let p = policy(|_| {});
        let bad_usa = candidate("Game (USA) [b]", 0);
        let good_eur = candidate("Game (Europe)", 1);
        assert_eq!(order(&p, &good_eur, &bad_usa), Ordering::Less);
    }

    #[test]
    fn release_beats_prerelease_unless_inverted() {
        let release = candidate("Game (Europe)", 0);
        let beta = candidate("Game (USA) (Beta)", 1);
        assert_eq!(order(&policy(|_| {}), &release, &beta), Ordering::Less);

        let p = policy(|o| o.prefer_prereleases = true);
        assert_eq!(order(&p, &beta, &release), Ordering::Less);
    }

    #[test]
    fn revision_inversion_only_flips_revision() {
        let rev0 = candidate("Game (USA)", 0);
        let rev1 = candidate("Game (USA) (Rev 1)", 1);
        assert_eq!(order(&policy(|_| {}), &rev1, &rev0), Ordering::Less);

        let p = policy(|o| o.early_revisions = true);
        assert_eq!(order(&p, &rev0, &rev1), Ordering::Less);

        // Region still outranks revision either way.
        let rev0_eur = candidate("Game (Europe)", 2);
        assert_eq!(order(&p, &rev1, &rev0_eur), Ordering::Less);
    }

    #[test]
    fn version_inversion() {
        let v10 = candidate("Game (USA) (v1.0)", 0);
        let v11 = candidate("Game (USA) (v1.1)", 1);
        assert_eq!(order(&policy(|_| {}), &v11, &v10), Ordering::Less);
        let p = policy(|o| o.early_versions = true);
        assert_eq!(order(&p, &v10, &v11), Ordering::Less);
    }

    #[test]
    fn later_beta_preferred_among_betas() {
        let p = policy(|_| {});
        let beta1 = candidate("Game (USA) (Beta 1)", 0);
        let beta2 = candidate("Game (USA) (Beta 2)", 1);
        assert_eq!(order(&p, &beta2, &beta1), Ordering::Less);
    }

    #[test]
    fn avoid_deprioritizes_and_prefer_prioritizes() {
        let p = policy(|o| o.avoid = Some("Virtual Console".into()));
        let vc = candidate("Game (USA) (Virtual Console)", 0);
        let eur = candidate("Game (Europe)", 1);
        assert_eq!(order(&p, &eur, &vc), Ordering::Less);

        let p = policy(|o| o.prefer = Some("Virtual Console".into()));
        let plain = candidate("Game (USA)", 2);
        assert_eq!(order(&p, &vc, &plain), Ordering::Less);
        // Prefer never outranks region.
        let vc_eur = candidate("Game (Europe) (Virtual Console)", 3);
        assert_eq!(order(&p, &plain, &vc_eur), Ordering::Less);
    }

    #[test]
    fn identical_candidates_fall_back_to_input_order() {
        let p = policy(|_| {});
        let first = candidate("Game (USA) (Alt 1)", 4);
        let second = candidate("Game (USA) (Alt 2)", 7);
        assert_eq!(order(&p, &first, &second), Ordering::Less);
        assert_eq!(order(&p, &second, &first), Ordering::Greater);
    }

    #[test]
    fn parent_breaks_final_ties() {
        let p = policy(|_| {});
        let mut clone = candidate("Game (USA) (Alt)", 0);
        clone.is_parent = false;
        let parent = candidate("Game (USA)", 1);
        assert_eq!(order(&p, &parent, &clone), Ordering::Less);
    }

    #[test]
    fn prefer_parents_outranks_revision() {
        let parent = candidate("Game (USA)", 5);
        let mut clone = candidate("Game (USA) (Rev 1)", 0);
        clone.is_parent = false;
        assert_eq!(order(&policy(|_| {}), &clone, &parent), Ordering::Less);

        let p = policy(|o| o.prefer_parents = true);
        assert_eq!(order(&p, &parent, &clone), Ordering::Less);

        // Region is still decided first.
        let eur_parent = candidate("Game (Europe)", 6);
        assert_eq!(order(&p, &clone, &eur_parent), Ordering::Less);
    }

    #[test]
    fn input_order_outranks_revision() {
        let rev1 = candidate("Game (USA) (Rev 1)", 9);
        let rev0 = candidate("Game (USA)", 2);
        assert_eq!(order(&policy(|_| {}), &rev1, &rev0), Ordering::Less);

        let p = policy(|o| o.input_order = true);
        assert_eq!(order(&p, &rev0, &rev1), Ordering::Less);

        let early_eur = candidate("Game (Europe)", 0);
        assert_eq!(order(&p, &rev1, &early_eur), Ordering::Less);
    }
}
