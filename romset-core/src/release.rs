//! Dotted release numbers used by revision, version and prerelease tags.

use std::cmp::Ordering;
use std::fmt;

/// A dotted alphanumeric release number such as `1`, `A`, `1.02` or `2.0a`.
///
/// Ordering is segment by segment: leading zeros are ignored, a longer
/// segment is higher, and equal-length segments compare character by
/// character without regard to case. A missing segment counts as `0`, so
/// `1` and `1.0` are equal. The default value is `0`.
#[derive(Debug, Clone, Default)]
pub struct ReleaseNumber {
    segments: Vec<String>,
}

impl ReleaseNumber {
    pub fn parse(text: &str) -> Self {
        let segments = text
            .trim()
            .split('.')
            .map(|s| s.trim_start_matches('0').to_ascii_uppercase())
            .collect::<Vec<_>>();
        Self { segments }
    }

    pub fn is_zero(&self) -> bool {
        self.segments.iter().all(|s| s.is_empty())
    }

    fn segment(&self, i: usize) -> &str {
        self.segments.get(i).map(String::as_str).unwrap_or("")
    }
}

impl Ord for ReleaseNumber {
    fn cmp(&self, other: &Self) -> Ordering {
        let len = self.segments.len().max(other.segments.len());
        for i in 0..len {
            let (a, b) = (self.segment(i), other.segment(i));
            let ord = a.len().cmp(&b.len()).then_with(|| a.cmp(b));
            if ord != Ordering::Equal {
                return ord;
            }
        }
        Ordering::Equal
    }
}

impl PartialOrd for ReleaseNumber {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for ReleaseNumber {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for ReleaseNumber {}

impl fmt::Display for ReleaseNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_zero() {
            return f.write_str("0");
        }
        let parts: Vec<&str> = self
            .segments
            .iter()
            .map(|s| if s.is_empty() { "0" } else { s.as_str() })
            .collect();
        f.write_str(&parts.join("."))
    }
}
