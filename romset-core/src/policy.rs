//! The immutable run policy and its validation.

use crate::candidate::{Candidate, Stage};
use crate::error::PolicyError;
use crate::region::Region;
use crate::wordlist::{ListOptions, WordList};

/// Default multiplier for language matches.
pub const DEFAULT_LANGUAGE_WEIGHT: u32 = 3;

/// How unlicensed entries are treated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum UnlicensedFilter {
    #[default]
    Keep,
    /// Drop unlicensed entries unless they are aftermarket or homebrew.
    Drop,
    /// Drop every unlicensed entry.
    DropStrict,
}

/// The `--no-*` toggles. Each one removes matching candidates before grouping.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Exclusions {
    pub bios: bool,
    pub program: bool,
    pub enhancement_chip: bool,
    pub proto: bool,
    pub beta: bool,
    pub demo: bool,
    pub sample: bool,
    pub pirate: bool,
    pub bad: bool,
    pub aftermarket: bool,
    pub homebrew: bool,
    pub kiosk: bool,
    pub promo: bool,
    pub debug: bool,
    pub unlicensed: UnlicensedFilter,
}

impl Exclusions {
    /// Every class toggle enabled. The unlicensed filter is left as is.
    pub fn all() -> Self {
        Self {
            bios: true,
            program: true,
            enhancement_chip: true,
            proto: true,
            beta: true,
            demo: true,
            sample: true,
            pirate: true,
            bad: true,
            aftermarket: true,
            homebrew: true,
            kiosk: true,
            promo: true,
            debug: true,
            unlicensed: UnlicensedFilter::Keep,
        }
    }

    /// Name of the first toggle that removes `candidate`, if any.
    pub fn excluded_by(&self, candidate: &Candidate) -> Option<&'static str> {
        let class = &candidate.class;
        let checks = [
            (self.bios && class.bios, "bios"),
            (self.program && class.program, "program"),
            (self.enhancement_chip && class.enhancement_chip, "enhancement-chip"),
            (self.proto && candidate.has_stage(Stage::Proto), "proto"),
            (self.beta && candidate.has_stage(Stage::Beta), "beta"),
            (self.demo && candidate.has_stage(Stage::Demo), "demo"),
            (self.sample && candidate.has_stage(Stage::Sample), "sample"),
            (self.pirate && class.pirate, "pirate"),
            (self.bad && candidate.is_bad(), "bad"),
            (self.aftermarket && class.aftermarket, "aftermarket"),
            (self.homebrew && class.homebrew, "homebrew"),
            (self.kiosk && class.kiosk, "kiosk"),
            (self.promo && class.promo, "promo"),
            (self.debug && class.debug, "debug"),
        ];
        if let Some((_, name)) = checks.iter().find(|(hit, _)| *hit) {
            return Some(*name);
        }
        match self.unlicensed {
            UnlicensedFilter::DropStrict if class.unlicensed => Some("unlicensed-strict"),
            UnlicensedFilter::Drop
                if class.unlicensed && !class.aftermarket && !class.homebrew =>
            {
                Some("unlicensed")
            }
            _ => None,
        }
    }
}

/// Raw policy inputs, as resolved from flags and settings.
#[derive(Debug, Clone)]
pub struct PolicyOptions {
    /// Region codes or names, most preferred first.
    pub regions: Vec<String>,
    /// Two-letter language codes, most preferred first.
    pub languages: Vec<String>,
    pub language_weight: u32,
    pub prioritize_languages: bool,
    pub exclusions: Exclusions,
    pub all_regions: bool,
    pub all_regions_with_lang: bool,
    pub only_selected_lang: bool,
    pub early_revisions: bool,
    pub early_versions: bool,
    pub input_order: bool,
    pub prefer_parents: bool,
    pub prefer_prereleases: bool,
    /// List sources: inline entries or `file:PATH`.
    pub prefer: Option<String>,
    pub avoid: Option<String>,
    pub exclude: Option<String>,
    pub exclude_after: Option<String>,
    pub list_options: ListOptions,
}

impl Default for PolicyOptions {
    fn default() -> Self {
        Self {
            regions: Vec::new(),
            languages: Vec::new(),
            language_weight: DEFAULT_LANGUAGE_WEIGHT,
            prioritize_languages: false,
            exclusions: Exclusions::default(),
            all_regions: false,
            all_regions_with_lang: false,
            only_selected_lang: false,
            early_revisions: false,
            early_versions: false,
            input_order: false,
            prefer_parents: false,
            prefer_prereleases: false,
            prefer: None,
            avoid: None,
            exclude: None,
            exclude_after: None,
            list_options: ListOptions::new(),
        }
    }
}

/// Validated, compiled run policy. Read-only once built.
#[derive(Debug)]
pub struct UserPolicy {
    pub regions: Vec<Region>,
    pub languages: Vec<String>,
    pub language_weight: u32,
    pub prioritize_languages: bool,
    pub exclusions: Exclusions,
    pub all_regions: bool,
    pub all_regions_with_lang: bool,
    pub only_selected_lang: bool,
    pub early_revisions: bool,
    pub early_versions: bool,
    pub input_order: bool,
    pub prefer_parents: bool,
    pub prefer_prereleases: bool,
    pub prefer: WordList,
    pub avoid: WordList,
    pub exclude: WordList,
    pub exclude_after: WordList,
}

fn compile_list(
    name: &'static str,
    source: Option<&str>,
    options: &ListOptions,
) -> Result<WordList, PolicyError> {
    match source {
        Some(source) => WordList::from_source(name, source, options),
        None => WordList::build(name, Vec::new(), options),
    }
}

impl UserPolicy {
    /// Validate `options` and compile its word lists.
    pub fn new(options: PolicyOptions) -> Result<Self, PolicyError> {
        let conflicts = [
            (options.early_revisions && options.input_order, "early-revisions", "input-order"),
            (options.early_versions && options.input_order, "early-versions", "input-order"),
            (options.early_revisions && options.prefer_parents, "early-revisions", "prefer-parents"),
            (options.early_versions && options.prefer_parents, "early-versions", "prefer-parents"),
            (options.prefer_parents && options.input_order, "prefer-parents", "input-order"),
            (
                options.all_regions && options.all_regions_with_lang,
                "all-regions",
                "all-regions-with-lang",
            ),
        ];
        if let Some((_, a, b)) = conflicts.iter().find(|(hit, _, _)| *hit) {
            return Err(PolicyError::conflict(*a, *b));
        }

        if options.language_weight == 0 {
            return Err(PolicyError::InvalidWeight);
        }

        let regions = options
            .regions
            .iter()
            .map(|r| r.parse::<Region>())
            .collect::<Result<Vec<_>, _>>()?;
        if regions.is_empty() {
            return Err(PolicyError::NoRegions);
        }

        let mut languages: Vec<String> = Vec::with_capacity(options.languages.len());
        for code in &options.languages {
            let code = code.trim().to_ascii_lowercase();
            if code.len() != 2 || !code.chars().all(|c| c.is_ascii_alphabetic()) {
                return Err(PolicyError::invalid_language(code));
            }
            if !languages.contains(&code) {
                languages.push(code);
            }
        }

        let sources = [
            &options.prefer,
            &options.avoid,
            &options.exclude,
            &options.exclude_after,
        ];
        let has_list = sources.iter().any(|s| s.is_some());
        if options.list_options.ignore_case && !has_list {
            return Err(PolicyError::NoWordList("ignore-case"));
        }
        if options.list_options.regex && !has_list {
            return Err(PolicyError::NoWordList("regex"));
        }

        let lists = &options.list_options;
        Ok(Self {
            prefer: compile_list("prefer", options.prefer.as_deref(), lists)?,
            avoid: compile_list("avoid", options.avoid.as_deref(), lists)?,
            exclude: compile_list("exclude", options.exclude.as_deref(), lists)?,
            exclude_after: compile_list("exclude-after", options.exclude_after.as_deref(), lists)?,
            regions,
            languages,
            language_weight: options.language_weight,
            prioritize_languages: options.prioritize_languages,
            exclusions: options.exclusions,
            all_regions: options.all_regions,
            all_regions_with_lang: options.all_regions_with_lang,
            only_selected_lang: options.only_selected_lang,
            early_revisions: options.early_revisions,
            early_versions: options.early_versions,
            input_order: options.input_order,
            prefer_parents: options.prefer_parents,
            prefer_prereleases: options.prefer_prereleases,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::candidate::CatalogRecord;
    use crate::extract::extract;

    fn base() -> PolicyOptions {
        PolicyOptions {
            regions: vec!["USA".into(), "Europe".into()],
            languages: vec!["En".into()],
            ..Default::default()
        }
    }

    fn candidate(name: &str) -> Candidate {
        extract(
            &CatalogRecord {
                name: name.into(),
                ..Default::default()
            },
            0,
        )
    }

    #[test]
    fn builds_with_normalized_inputs() {
        let policy = UserPolicy::new(base()).unwrap();
        assert_eq!(policy.regions, vec![Region::Usa, Region::Europe]);
        assert_eq!(policy.languages, vec!["en"]);
        assert_eq!(policy.language_weight, DEFAULT_LANGUAGE_WEIGHT);
        assert!(policy.prefer.is_empty());
    }

    #[test]
    fn rejects_empty_regions_and_unknown_codes() {
        let opts = PolicyOptions {
            regions: Vec::new(),
            ..base()
        };
        assert!(matches!(UserPolicy::new(opts), Err(PolicyError::NoRegions)));

        let opts = PolicyOptions {
            regions: vec!["Atlantis".into()],
            ..base()
        };
        assert!(matches!(UserPolicy::new(opts), Err(PolicyError::UnknownRegion(_))));
    }

    #[test]
    fn rejects_conflicting_toggles() {
        let opts = PolicyOptions {
            early_revisions: true,
            input_order: true,
            ..base()
        };
        assert!(matches!(
            UserPolicy::new(opts),
            Err(PolicyError::Conflict("early-revisions", "input-order"))
        ));

        let opts = PolicyOptions {
            all_regions: true,
            all_regions_with_lang: true,
            ..base()
        };
        assert!(matches!(UserPolicy::new(opts), Err(PolicyError::Conflict(..))));
    }

    #[test]
    fn rejects_zero_weight_and_bad_language() {
        let opts = PolicyOptions {
            language_weight: 0,
            ..base()
        };
        assert!(matches!(UserPolicy::new(opts), Err(PolicyError::InvalidWeight)));

        let opts = PolicyOptions {
            languages: vec!["english".into()],
            ..base()
        };
        assert!(matches!(UserPolicy::new(opts), Err(PolicyError::InvalidLanguage(_))));
    }

    #[test]
    fn list_flags_require_a_list() {
        let mut opts = base();
        opts.list_options.regex = true;
        assert!(matches!(UserPolicy::new(opts), Err(PolicyError::NoWordList("regex"))));
    }

    #[test]
    fn bad_exclude_after_pattern_fails_before_any_work() {
        let mut opts = base();
        opts.list_options.regex = true;
        opts.exclude_after = Some("[unterminated".into());
        assert!(matches!(
            UserPolicy::new(opts),
            Err(PolicyError::Pattern { list: "exclude-after", .. })
        ));
    }

    #[test]
    fn exclusion_toggles() {
        let all = Exclusions::all();
        assert_eq!(all.excluded_by(&candidate("Game (USA) (Beta)")), Some("beta"));
        assert_eq!(all.excluded_by(&candidate("Game (USA) [b]")), Some("bad"));
        assert_eq!(all.excluded_by(&candidate("Game (USA)")), None);
        assert_eq!(Exclusions::default().excluded_by(&candidate("Game (USA) (Beta)")), None);
    }

    #[test]
    fn unlicensed_filters() {
        let unl = candidate("Game (USA) (Unl)");
        let homebrew = candidate("Game (World) (Homebrew) (Unl)");

        let drop = Exclusions {
            unlicensed: UnlicensedFilter::Drop,
            ..Default::default()
        };
        assert_eq!(drop.excluded_by(&unl), Some("unlicensed"));
        assert_eq!(drop.excluded_by(&homebrew), None);

        let strict = Exclusions {
            unlicensed: UnlicensedFilter::DropStrict,
            ..Default::default()
        };
        assert_eq!(strict.excluded_by(&homebrew), Some("unlicensed-strict"));
    }
}
