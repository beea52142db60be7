//! Versioning strategy abstraction selected once per configuration

use std::cmp::Ordering;
use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

use crate::config::VersioningCfg;
use crate::pattern::compile_pattern;
use crate::version::error::VersionError;
use crate::version::parsed::{ParsedVersion, PartsExtractor, normalize_loose};
use crate::version::strategies::{NumericStrategy, OrderedStrategy, RegexStrategy, SemverStrategy};

static DEFAULT_VERSION_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?P<major>\d+)(?:[._-]?(?P<minor>\d+))?(?:[._-]?(?P<patch>\d+))?").unwrap()
});

static NUMERIC_VERSION_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?P<major>\d+)").unwrap());

/// How version tokens are interpreted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum VersionFormat {
    /// Semantic versions, with a numeric fallback for non-semver tokens
    #[default]
    Semver,
    /// A single leading number
    Numeric,
    /// Numbers captured by a configured regex
    Regex,
    /// Candidate list position is the ranking
    Ordered,
}

impl VersionFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            VersionFormat::Semver => "semver",
            VersionFormat::Numeric => "numeric",
            VersionFormat::Regex => "regex",
            VersionFormat::Ordered => "ordered",
        }
    }
}

impl std::str::FromStr for VersionFormat {
    type Err = VersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "semver" => Ok(VersionFormat::Semver),
            "numeric" => Ok(VersionFormat::Numeric),
            "regex" => Ok(VersionFormat::Regex),
            "ordered" | "list" | "sorted" => Ok(VersionFormat::Ordered),
            _ => Err(VersionError::UnknownFormat(s.to_string())),
        }
    }
}

/// Result ordering
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SortOrder {
    /// Newest first
    #[default]
    Descending,
    Ascending,
}

impl std::str::FromStr for SortOrder {
    type Err = VersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "desc" | "descending" => Ok(SortOrder::Descending),
            "asc" | "ascending" => Ok(SortOrder::Ascending),
            _ => Err(VersionError::UnknownSortOrder(s.to_string())),
        }
    }
}

/// Parses, compares and filters version tokens under one format
pub trait VersioningStrategy: Send + Sync {
    fn format(&self) -> VersionFormat;

    fn sort_order(&self) -> SortOrder;

    /// Parse a raw token. Never panics; `None` means the token is not usable
    /// under this format.
    fn parse_version(&self, raw: &str) -> Option<ParsedVersion>;

    /// Total order over every parse this strategy produces.
    ///
    /// Tokens with numbers rank above tokens without. Numbers compare first,
    /// then a semantic pre-release ranks below any release of the same
    /// numbers, then the normalized text breaks the remaining ties. Two
    /// semantic versions therefore compare by semantic precedence.
    fn compare(&self, a: &ParsedVersion, b: &ParsedVersion) -> Ordering {
        a.parts
            .is_some()
            .cmp(&b.parts.is_some())
            .then_with(|| a.parts.cmp(&b.parts))
            .then_with(|| a.is_release().cmp(&b.is_release()))
            .then_with(|| a.prerelease().cmp(&b.prerelease()))
            .then_with(|| a.normalized.cmp(&b.normalized))
    }

    /// Identity used to deduplicate candidates
    fn key_for(&self, parsed: Option<&ParsedVersion>, raw: &str) -> String {
        parsed
            .and_then(ParsedVersion::canonical_string)
            .unwrap_or_else(|| normalize_loose(raw))
    }

    /// Sort in place per [`SortOrder`]; stable for equal versions
    fn sort_versions(&self, versions: &mut [ParsedVersion]) {
        match self.sort_order() {
            SortOrder::Descending => versions.sort_by(|a, b| self.compare(b, a)),
            SortOrder::Ascending => versions.sort_by(|a, b| self.compare(a, b)),
        }
    }

    /// Candidates strictly newer than `current`, deduplicated and sorted.
    ///
    /// When `current` itself cannot be parsed every parsable candidate is
    /// returned, followed by the unparsable ones in lexical order.
    fn filter_newer(&self, current: &str, candidates: &[String]) -> Vec<String> {
        let base = self.parse_version(current);
        let mut seen = HashSet::new();
        let mut comparable = Vec::new();
        let mut passthrough = Vec::new();

        for candidate in candidates {
            let cleaned = candidate.trim();
            if cleaned.is_empty() {
                continue;
            }

            let parsed = self.parse_version(cleaned);
            if !seen.insert(self.key_for(parsed.as_ref(), cleaned)) {
                continue;
            }

            match (parsed, &base) {
                (Some(parsed), Some(base)) => {
                    if self.compare(&parsed, base) == Ordering::Greater {
                        comparable.push(parsed);
                    }
                }
                (Some(parsed), None) => comparable.push(parsed),
                (None, None) => passthrough.push(cleaned.to_string()),
                (None, Some(_)) => debug!("Skipping unparsable version {:?}", cleaned),
            }
        }

        self.sort_versions(&mut comparable);
        passthrough.sort();

        comparable
            .into_iter()
            .map(|parsed| parsed.raw)
            .chain(passthrough)
            .collect()
    }
}

/// Build the strategy described by `cfg`; `None` selects semver, newest first.
///
/// Unknown formats or sort orders are rejected rather than defaulted. A
/// configured regex replaces the number extractor for every format.
pub fn new_versioning_strategy(
    cfg: Option<&VersioningCfg>,
) -> Result<Box<dyn VersioningStrategy>, VersionError> {
    let format: VersionFormat = cfg
        .and_then(|c| c.format.as_deref())
        .unwrap_or_default()
        .parse()?;
    let sort: SortOrder = cfg
        .and_then(|c| c.sort.as_deref())
        .unwrap_or_default()
        .parse()?;

    let custom_regex = cfg
        .and_then(|c| c.regex.as_deref())
        .filter(|r| !r.trim().is_empty());

    let regex = match (custom_regex, format) {
        (Some(pattern), _) => compile_pattern(pattern)?,
        (None, VersionFormat::Numeric) => NUMERIC_VERSION_REGEX.clone(),
        (None, _) => DEFAULT_VERSION_REGEX.clone(),
    };
    let parts = PartsExtractor::new(regex);

    debug!(
        "Versioning strategy: format={}, sort={:?}, regex={}",
        format.as_str(),
        sort,
        parts.regex().as_str()
    );

    Ok(match format {
        VersionFormat::Semver => Box::new(SemverStrategy::new(parts, sort)),
        VersionFormat::Numeric => Box::new(NumericStrategy::new(parts, sort)),
        VersionFormat::Regex => Box::new(RegexStrategy::new(parts, sort)),
        VersionFormat::Ordered => Box::new(OrderedStrategy::new(parts, sort)),
    })
}
