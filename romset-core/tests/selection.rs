use romset_core::{
    Candidate, CatalogRecord, DumpQuality, PolicyOptions, ResolveOptions, UserPolicy,
    build_candidates, resolve,
};

fn record(name: &str, clone_of: Option<&str>, region: &str, langs: &[&str]) -> CatalogRecord {
    CatalogRecord {
        name: name.to_string(),
        clone_of: clone_of.map(str::to_string),
        regions: vec![region.to_string()],
        languages: langs.iter().map(|l| l.to_string()).collect(),
        ..Default::default()
    }
}

/// A: USA/en rev 0 good; B: EUR/en,fr rev 1 good; C: USA/en rev 0 bad.
fn example_group() -> Vec<Candidate> {
    let mut bad = record("Game (USA) [b]", Some("Game (USA)"), "USA", &["en"]);
    bad.quality = Some(DumpQuality::Bad);
    build_candidates(&[
        record("Game (USA)", None, "USA", &["en"]),
        record("Game (Europe) (Rev 1)", Some("Game (USA)"), "EUR", &["en", "fr"]),
        bad,
    ])
    .unwrap()
}

fn policy(f: impl FnOnce(&mut PolicyOptions)) -> UserPolicy {
    let mut opts = PolicyOptions {
        regions: vec!["USA".into(), "EUR".into()],
        languages: vec!["en".into()],
        ..Default::default()
    };
    f(&mut opts);
    UserPolicy::new(opts).unwrap()
}

fn winner_name(candidates: Vec<Candidate>, policy: &UserPolicy) -> Option<String> {
    resolve(candidates, policy, ResolveOptions::default())
        .winners
        .into_values()
        .next()
        .map(|c| c.name)
}

#[test]
fn region_rank_beats_extra_language_and_revision() {
    assert_eq!(
        winner_name(example_group(), &policy(|_| {})).as_deref(),
        Some("Game (USA)")
    );
}

#[test]
fn prioritized_languages_pick_the_multilingual_release() {
    let p = policy(|o| {
        o.prioritize_languages = true;
        o.languages = vec!["en".into(), "fr".into()];
        o.language_weight = 3;
    });
    assert_eq!(
        winner_name(example_group(), &p).as_deref(),
        Some("Game (Europe) (Rev 1)")
    );
}

#[test]
fn selection_is_reproducible_under_any_input_order() {
    let p = policy(|_| {});
    let mut group = example_group();
    group.push(
        build_candidates(&[record("Game (USA) (Alt 1)", Some("Game (USA)"), "USA", &["en"])])
            .unwrap()
            .remove(0),
    );
    // The Alt entry ties with the parent on every key except parent and
    // catalog position.
    group[3].input_index = 3;

    let expected = winner_name(group.clone(), &p);
    for rotation in 0..group.len() {
        let mut shuffled = group.clone();
        shuffled.rotate_left(rotation);
        shuffled.reverse();
        assert_eq!(winner_name(shuffled, &p), expected);
    }
    assert_eq!(expected.as_deref(), Some("Game (USA)"));
}

#[test]
fn unlisted_region_only_wins_with_fallback_as_last_resort() {
    let candidates = || {
        build_candidates(&[
            record("Game (Japan)", None, "JPN", &["en"]),
            record("Game (Europe)", Some("Game (Japan)"), "EUR", &["en"]),
        ])
        .unwrap()
    };
    assert_eq!(
        winner_name(candidates(), &policy(|_| {})).as_deref(),
        Some("Game (Europe)")
    );
    assert_eq!(
        winner_name(candidates(), &policy(|o| o.all_regions = true)).as_deref(),
        Some("Game (Europe)")
    );

    let only_japan = build_candidates(&[record("Game (Japan)", None, "JPN", &["en"])]).unwrap();
    assert_eq!(winner_name(only_japan.clone(), &policy(|_| {})), None);
    assert_eq!(
        winner_name(only_japan, &policy(|o| o.all_regions = true)).as_deref(),
        Some("Game (Japan)")
    );
}

#[test]
fn strict_language_mode_can_empty_a_group() {
    let only_ja = build_candidates(&[record("Game (USA)", None, "USA", &["ja"])]).unwrap();
    let p = policy(|o| o.only_selected_lang = true);
    let resolution = resolve(only_ja, &p, ResolveOptions::default());
    assert!(resolution.winners.is_empty());
    assert_eq!(resolution.diagnostics.len(), 1);
}

#[test]
fn exclude_dominates_and_avoid_only_deprioritizes() {
    let p = policy(|o| o.exclude = Some("Game (USA)".into()));
    assert_eq!(
        winner_name(example_group(), &p).as_deref(),
        Some("Game (Europe) (Rev 1)")
    );

    let p = policy(|o| o.avoid = Some("Game".into()));
    assert_eq!(winner_name(example_group(), &p).as_deref(), Some("Game (USA)"));
}

#[test]
fn exclude_after_skips_group_without_removing_candidates() {
    let p = policy(|o| o.exclude_after = Some("(Rev 1)".into()));
    // The winner does not match, so the group still produces output.
    assert_eq!(winner_name(example_group(), &p).as_deref(), Some("Game (USA)"));

    let p = policy(|o| {
        o.exclude_after = Some("(Rev 1)".into());
        o.regions = vec!["EUR".into(), "USA".into()];
    });
    assert_eq!(winner_name(example_group(), &p), None);
}

#[test]
fn early_revisions_flips_only_the_revision_key() {
    let candidates = || {
        build_candidates(&[
            record("Game (USA)", None, "USA", &["en"]),
            record("Game (USA) (Rev 1)", Some("Game (USA)"), "USA", &["en"]),
            record("Game (Europe) (Rev 2)", Some("Game (USA)"), "EUR", &["en"]),
        ])
        .unwrap()
    };
    assert_eq!(
        winner_name(candidates(), &policy(|_| {})).as_deref(),
        Some("Game (USA) (Rev 1)")
    );
    assert_eq!(
        winner_name(candidates(), &policy(|o| o.early_revisions = true)).as_deref(),
        Some("Game (USA)")
    );
}
