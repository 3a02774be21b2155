//! Word lists matched against candidate display names.
//!
//! A list is built once from its source text and then only ever asked
//! whether a name matches. Literal lists match by substring, pattern lists
//! by regular expression; both sit behind [`NameMatcher`].

use std::path::PathBuf;
use std::sync::LazyLock;

use regex::{Regex, RegexBuilder};

use crate::error::PolicyError;

/// Prefix that makes a list source refer to a file instead of inline text.
pub const FILE_PREFIX: &str = "file:";

/// Default separator for inline list sources.
pub const DEFAULT_SEPARATOR: &str = ",";

/// The single capability every word list provides.
pub trait NameMatcher: Send + Sync + std::fmt::Debug {
    fn matches(&self, name: &str) -> bool;
}

/// Substring matching, optionally ignoring ASCII case.
#[derive(Debug)]
pub struct LiteralMatcher {
    tokens: Vec<String>,
    ignore_case: bool,
}

impl LiteralMatcher {
    pub fn new(tokens: Vec<String>, ignore_case: bool) -> Self {
        let tokens = if ignore_case {
            tokens.into_iter().map(|t| t.to_lowercase()).collect()
        } else {
            tokens
        };
        Self {
            tokens,
            ignore_case,
        }
    }
}

impl NameMatcher for LiteralMatcher {
    fn matches(&self, name: &str) -> bool {
        if self.ignore_case {
            let name = name.to_lowercase();
            self.tokens.iter().any(|t| name.contains(t.as_str()))
        } else {
            self.tokens.iter().any(|t| name.contains(t.as_str()))
        }
    }
}

/// Regular-expression matching; a pattern matches anywhere in the name.
#[derive(Debug)]
pub struct PatternMatcher {
    patterns: Vec<Regex>,
}

impl PatternMatcher {
    pub fn new(
        list: &'static str,
        patterns: &[String],
        ignore_case: bool,
    ) -> Result<Self, PolicyError> {
        let patterns = patterns
            .iter()
            .map(|p| {
                RegexBuilder::new(p)
                    .case_insensitive(ignore_case)
                    .build()
                    .map_err(|source| PolicyError::Pattern {
                        list,
                        pattern: p.clone(),
                        source,
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { patterns })
    }
}

impl NameMatcher for PatternMatcher {
    fn matches(&self, name: &str) -> bool {
        self.patterns.iter().any(|re| re.is_match(name))
    }
}

/// How list entries are interpreted.
#[derive(Debug, Clone, Default)]
pub struct ListOptions {
    pub separator: String,
    pub ignore_case: bool,
    pub regex: bool,
}

impl ListOptions {
    pub fn new() -> Self {
        Self {
            separator: DEFAULT_SEPARATOR.to_string(),
            ..Default::default()
        }
    }
}

/// A named, compiled word list.
#[derive(Debug)]
pub struct WordList {
    name: &'static str,
    matcher: Box<dyn NameMatcher>,
    len: usize,
}

impl WordList {
    /// Compile a list from already-split entries.
    pub fn build(
        name: &'static str,
        entries: Vec<String>,
        options: &ListOptions,
    ) -> Result<Self, PolicyError> {
        let len = entries.len();
        let matcher: Box<dyn NameMatcher> = if options.regex {
            Box::new(PatternMatcher::new(name, &entries, options.ignore_case)?)
        } else {
            Box::new(LiteralMatcher::new(entries, options.ignore_case))
        };
        Ok(Self { name, matcher, len })
    }

    /// Read and compile a list from its source text: either inline entries
    /// split by the configured separator, or `file:PATH`.
    pub fn from_source(
        name: &'static str,
        source: &str,
        options: &ListOptions,
    ) -> Result<Self, PolicyError> {
        let entries = read_entries(name, source, &options.separator)?;
        Self::build(name, entries, options)
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn matches(&self, name: &str) -> bool {
        self.len > 0 && self.matcher.matches(name)
    }
}

/// Matches whole-line and trailing comments in list files: `// ...`,
/// `<!-- ... -->` and stray markup tags.
static LIST_FILE_NOISE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\s*(?:<!--.*?-->|<[^>]*>|//.*$)").expect("static pattern")
});

fn parse_list_file(text: &str) -> Vec<String> {
    text.lines()
        .map(|line| LIST_FILE_NOISE.replace_all(line, "").trim().to_string())
        .filter(|line| !line.is_empty())
        .collect()
}

/// Expand a leading `~` to the home directory.
fn expand_home(path: &str) -> PathBuf {
    match path.strip_prefix('~') {
        Some(rest) if rest.is_empty() || rest.starts_with(['/', '\\']) => {
            match dirs::home_dir() {
                Some(home) => home.join(rest.trim_start_matches(['/', '\\'])),
                None => PathBuf::from(path),
            }
        }
        _ => PathBuf::from(path),
    }
}

/// Resolve a list source into its entries.
pub fn read_entries(
    list: &'static str,
    source: &str,
    separator: &str,
) -> Result<Vec<String>, PolicyError> {
    if let Some(path) = source.strip_prefix(FILE_PREFIX) {
        let path = expand_home(path.trim());
        let text = std::fs::read_to_string(&path).map_err(|source| PolicyError::ListFile {
            list,
            path: path.display().to_string(),
            source,
        })?;
        return Ok(parse_list_file(&text));
    }
    let separator = if separator.is_empty() {
        DEFAULT_SEPARATOR
    } else {
        separator
    };
    Ok(source
        .split(separator)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect())
}
