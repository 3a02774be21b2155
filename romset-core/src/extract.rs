//! Attribute extraction from catalog records and conventional dump names.
//!
//! Dump names follow the No-Intro/Redump convention:
//! ```text
//! Game Name (Region1, Region2) (En,Fr) (Rev 1) (Beta 2) [b]
//! ```
//! Parenthesized tags carry regions, languages, revision/version numbers and
//! release or class markers. Bracketed tags carry `[b]` and `[BIOS]`.
//! Unrecognized tags are ignored.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::{Regex, RegexBuilder};

use crate::candidate::{Candidate, CatalogRecord, ClassFlags, DumpQuality, Prerelease, Stage};
use crate::error::CatalogError;
use crate::region::Region;
use crate::release::ReleaseNumber;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Token {
    Revision,
    Version,
    Stage(Stage),
    Program,
    EnhancementChip,
    Pirate,
    Aftermarket,
    Homebrew,
    Kiosk,
    Promo,
    Debug,
    Unlicensed,
}

/// Vocabulary for a single parenthesized tag (or one comma-separated part
/// of it). Capture group 1, when present, is the sequence number.
const PAREN_VOCABULARY: &[(Token, &str)] = &[
    (Token::Revision, r"Rev\s*([a-z0-9.]+)"),
    (Token::Version, r"v\s*([0-9][a-z0-9.]*)"),
    (Token::Stage(Stage::Beta), r"Beta(?:\s*([a-z0-9.]+))?"),
    (Token::Stage(Stage::Proto), r"(?:Prototype|Proto)(?:\s*([a-z0-9.]+))?"),
    (Token::Stage(Stage::Proto), r"Possible Proto"),
    (Token::Stage(Stage::Sample), r"Sample(?:\s*([a-z0-9.]+))?"),
    (Token::Stage(Stage::Demo), r"Demo(?:\s*([a-z0-9.]+))?"),
    (Token::Stage(Stage::Demo), r"Trial(?:\s*([a-z0-9.]+))?"),
    (Token::Stage(Stage::Demo), r"(?:Multiplayer|Singleplayer|Labeled) Demo"),
    (Token::Stage(Stage::Demo), r"Tech Demo.*"),
    (Token::Stage(Stage::Demo), r"(?:GameCube )?Preview"),
    (Token::Program, r"(?:Test )?Program"),
    (Token::Program, r"SDK Build.*"),
    (Token::Program, r"DS (?:Expansion|Cheat) Cartridge"),
    (Token::EnhancementChip, r"Enhancement\s*Chip"),
    (Token::Pirate, r"Pirate"),
    (Token::Aftermarket, r"Aftermarket"),
    (Token::Homebrew, r"Homebrew"),
    (Token::Kiosk, r"(?:Wi-Fi )?Kiosk(?:[ ,].*)?"),
    (Token::Promo, r"Promo"),
    (Token::Debug, r"Debug(?:\s*Version)?"),
    (Token::Unlicensed, r"Unl"),
];

fn anchored(pattern: &str) -> Regex {
    RegexBuilder::new(&format!("^(?:{pattern})$"))
        .case_insensitive(true)
        .build()
        .expect("static pattern")
}

static VOCABULARY: LazyLock<Vec<(Token, Regex)>> = LazyLock::new(|| {
    PAREN_VOCABULARY
        .iter()
        .map(|(token, pattern)| (*token, anchored(pattern)))
        .collect()
});

static LANGUAGES: LazyLock<Regex> = LazyLock::new(|| anchored(r"[a-z]{2}(?:[,+][a-z]{2})*"));

#[derive(Debug, PartialEq, Eq)]
enum Tag<'a> {
    Paren(&'a str),
    Bracket(&'a str),
}

/// Split a dump name into its base title and its (parenthesized) and
/// [bracketed] tags, in order.
fn split_tags<'a>(name: &'a str) -> (&'a str, Vec<Tag<'a>>) {
    let mut tags = Vec::new();
    let mut title_end = None;
    let mut chars = name.char_indices();

    while let Some((i, ch)) = chars.next() {
        let (open, close, make_tag): (char, char, fn(&'a str) -> Tag<'a>) = match ch {
            '(' => ('(', ')', Tag::Paren),
            '[' => ('[', ']', Tag::Bracket),
            _ => continue,
        };
        title_end.get_or_insert(i);

        let start = i + open.len_utf8();
        let mut end = name.len();
        let mut depth = 1u32;
        for (j, c) in chars.by_ref() {
            if c == open {
                depth += 1;
            } else if c == close {
                depth -= 1;
                if depth == 0 {
                    end = j;
                    break;
                }
            }
        }

        let content = name[start..end].trim();
        if !content.is_empty() {
            tags.push(make_tag(content));
        }
    }

    let title = match title_end {
        Some(pos) => name[..pos].trim_end(),
        None => name.trim(),
    };
    (title, tags)
}

/// Attributes recovered from a dump name alone.
#[derive(Debug, Default)]
struct NameAttributes {
    regions: Vec<Region>,
    languages: Vec<String>,
    revision: Option<ReleaseNumber>,
    version: Option<ReleaseNumber>,
    prerelease: Vec<Prerelease>,
    class: ClassFlags,
    bad: bool,
}

impl NameAttributes {
    fn parse(name: &str) -> Self {
        let mut attrs = Self::default();
        let (_title, tags) = split_tags(name);
        for tag in tags {
            match tag {
                Tag::Paren(content) => attrs.classify_paren(content),
                Tag::Bracket(content) => {
                    if content.eq_ignore_ascii_case("b") {
                        attrs.bad = true;
                    } else if content.eq_ignore_ascii_case("BIOS") {
                        attrs.class.bios = true;
                    }
                }
            }
        }
        attrs
    }

    fn classify_paren(&mut self, content: &str) {
        let parts: Vec<&str> = content.split(',').map(str::trim).collect();
        let regions: Option<Vec<Region>> = parts.iter().map(|p| Region::from_name(p)).collect();
        if let Some(regions) = regions {
            for region in regions {
                push_unique(&mut self.regions, region);
            }
            return;
        }

        if LANGUAGES.is_match(content) {
            for code in content.split([',', '+']) {
                push_unique(&mut self.languages, code.to_ascii_lowercase());
            }
            return;
        }

        for part in parts {
            self.classify_part(part);
        }
    }

    fn classify_part(&mut self, part: &str) {
        let Some((token, caps)) = VOCABULARY
            .iter()
            .find_map(|(token, re)| re.captures(part).map(|caps| (*token, caps)))
        else {
            return;
        };
        let number = caps.get(1).map(|m| ReleaseNumber::parse(m.as_str()));

        match token {
            Token::Revision => self.revision = number,
            Token::Version => self.version = number,
            Token::Stage(stage) => self.prerelease.push(Prerelease { stage, number }),
            Token::Program => self.class.program = true,
            Token::EnhancementChip => self.class.enhancement_chip = true,
            Token::Pirate => self.class.pirate = true,
            Token::Aftermarket => self.class.aftermarket = true,
            Token::Homebrew => self.class.homebrew = true,
            Token::Kiosk => self.class.kiosk = true,
            Token::Promo => self.class.promo = true,
            Token::Debug => self.class.debug = true,
            Token::Unlicensed => self.class.unlicensed = true,
        }
    }
}

fn push_unique<T: PartialEq>(items: &mut Vec<T>, item: T) {
    if !items.contains(&item) {
        items.push(item);
    }
}

/// Build a [`Candidate`] from one catalog record.
///
/// Declared metadata wins over name tokens: declared regions come first,
/// declared languages replace name languages, and declared BIOS or dump
/// status flags replace the name-derived ones.
pub fn extract(record: &CatalogRecord, input_index: usize) -> Candidate {
    let parsed = NameAttributes::parse(&record.name);

    let mut regions = Vec::new();
    for code in &record.regions {
        match code.parse::<Region>() {
            Ok(region) => push_unique(&mut regions, region),
            Err(e) => log::warn!("Ignoring {} on {}", e, record.name),
        }
    }
    for region in parsed.regions {
        push_unique(&mut regions, region);
    }
    if regions.is_empty() {
        log::debug!("No region found for {}", record.name);
    }

    let mut declared_languages = Vec::new();
    for code in record.languages.iter().flat_map(|l| l.split(',')) {
        let code = code.trim().to_ascii_lowercase();
        if !code.is_empty() {
            push_unique(&mut declared_languages, code);
        }
    }
    let (languages, explicit_languages) = if !declared_languages.is_empty() {
        (declared_languages, true)
    } else if !parsed.languages.is_empty() {
        (parsed.languages, true)
    } else {
        let mut implied = Vec::new();
        for lang in regions.iter().flat_map(|r| r.languages()) {
            push_unique(&mut implied, lang.to_string());
        }
        (implied, false)
    };

    let mut class = parsed.class;
    if let Some(bios) = record.is_bios {
        class.bios = bios;
    }
    let quality = record.quality.unwrap_or(if parsed.bad {
        DumpQuality::Bad
    } else {
        DumpQuality::Good
    });

    Candidate {
        id: record.name.clone(),
        key: record.clone_of.clone().unwrap_or_else(|| record.name.clone()),
        name: record.name.clone(),
        regions,
        languages,
        explicit_languages,
        revision: parsed.revision.unwrap_or_default(),
        version: parsed.version.unwrap_or_default(),
        quality,
        prerelease: parsed.prerelease,
        class,
        is_parent: record.clone_of.is_none(),
        input_index,
        roms: record.roms.clone(),
        files: Vec::new(),
    }
}

/// Build one candidate per catalog record, in catalog order.
///
/// Fails when a record has no name or when a name repeats, since names are
/// the identifiers the rest of the run relies on.
pub fn build_candidates(records: &[CatalogRecord]) -> Result<Vec<Candidate>, CatalogError> {
    if records.is_empty() {
        return Err(CatalogError::Empty);
    }
    let mut seen = HashSet::with_capacity(records.len());
    records
        .iter()
        .enumerate()
        .map(|(i, record)| {
            if record.name.trim().is_empty() {
                return Err(CatalogError::MissingName(i));
            }
            if !seen.insert(record.name.as_str()) {
                return Err(CatalogError::DuplicateName(record.name.clone()));
            }
            Ok(extract(record, i))
        })
        .collect()
}
