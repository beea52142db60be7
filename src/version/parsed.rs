//! Structured form of a raw version token

use regex::Regex;
use semver::{Prerelease, Version};

/// Numeric components extracted from a version token
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct VersionParts {
    pub major: u64,
    pub minor: u64,
    pub patch: u64,
}

impl std::fmt::Display for VersionParts {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

/// A version token parsed under a particular versioning format
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedVersion {
    /// Input with surrounding whitespace removed
    pub raw: String,
    /// `major.minor.patch` when numbers were found, otherwise the loose form.
    /// Never contains shell metacharacters or control characters.
    pub normalized: String,
    /// Semantic version with build metadata removed, when the token is one
    pub canonical: Option<Version>,
    pub parts: Option<VersionParts>,
}

impl ParsedVersion {
    pub(crate) fn from_canonical(raw: &str, canonical: Version) -> Self {
        let parts = VersionParts {
            major: canonical.major,
            minor: canonical.minor,
            patch: canonical.patch,
        };
        Self {
            raw: raw.to_string(),
            normalized: parts.to_string(),
            canonical: Some(canonical),
            parts: Some(parts),
        }
    }

    pub(crate) fn from_parts(raw: &str, parts: VersionParts) -> Self {
        Self {
            raw: raw.to_string(),
            normalized: parts.to_string(),
            canonical: None,
            parts: Some(parts),
        }
    }

    pub(crate) fn from_loose(raw: &str) -> Self {
        Self {
            raw: raw.to_string(),
            normalized: normalize_loose(raw),
            canonical: None,
            parts: None,
        }
    }

    pub fn has_numbers(&self) -> bool {
        self.parts.is_some()
    }

    /// False only for a semantic pre-release
    pub fn is_release(&self) -> bool {
        self.prerelease().is_none()
    }

    pub fn prerelease(&self) -> Option<&Prerelease> {
        self.canonical
            .as_ref()
            .map(|v| &v.pre)
            .filter(|pre| !pre.is_empty())
    }

    /// Canonical `vX.Y.Z[-pre]` string, if the token is a semantic version
    pub fn canonical_string(&self) -> Option<String> {
        self.canonical.as_ref().map(|v| format!("v{v}"))
    }
}

/// Lowercased, trimmed token with a `v` prefix removed when a digit follows.
///
/// Shell metacharacters, control characters and bidirectional overrides are
/// dropped so the result is safe to hand to any later shell invocation.
pub fn normalize_loose(raw: &str) -> String {
    let trimmed = raw.trim();
    let without_prefix = match trimmed.strip_prefix(['v', 'V']) {
        Some(rest) if rest.starts_with(|c: char| c.is_ascii_digit()) => rest,
        _ => trimmed,
    };

    without_prefix
        .chars()
        .filter(|c| !is_unsafe_char(*c))
        .flat_map(char::to_lowercase)
        .collect()
}

fn is_unsafe_char(c: char) -> bool {
    matches!(c, ';' | '|' | '>' | '<' | '&' | '$' | '`')
        || c.is_control()
        || matches!(c, '\u{200E}' | '\u{200F}' | '\u{202A}'..='\u{202E}' | '\u{2066}'..='\u{2069}')
}

/// Extracts `major`/`minor`/`patch` from a token with a configurable regex
#[derive(Debug, Clone)]
pub struct PartsExtractor {
    regex: Regex,
}

impl PartsExtractor {
    pub fn new(regex: Regex) -> Self {
        Self { regex }
    }

    pub fn regex(&self) -> &Regex {
        &self.regex
    }

    /// Pick the match with the most participating groups (longest on ties)
    /// and read its numbers, by group name or, for unnamed patterns, by position.
    pub fn extract(&self, version: &str) -> Option<VersionParts> {
        let mut best: Option<(usize, usize, regex::Captures<'_>)> = None;
        for caps in self.regex.captures_iter(version) {
            let score = caps.iter().skip(1).flatten().filter(|m| !m.is_empty()).count();
            let len = caps.get(0).map_or(0, |m| m.len());
            if best
                .as_ref()
                .is_none_or(|(best_score, best_len, _)| (score, len) > (*best_score, *best_len))
            {
                best = Some((score, len, caps));
            }
        }
        let (_, _, best) = best?;

        // positional groups are only consulted for patterns without any named group
        let named = self.regex.capture_names().flatten().next().is_some();
        let group = |name: &str, index: usize| -> Option<u64> {
            let m = if named { best.name(name) } else { best.get(index) };
            m.map(|m| m.as_str().trim())
                .filter(|s| !s.is_empty())
                .and_then(|s| s.parse().ok())
        };

        let major = group("major", 1)?;
        Some(VersionParts {
            major,
            minor: group("minor", 2).unwrap_or(0),
            patch: group("patch", 3).unwrap_or(0),
        })
    }
}
