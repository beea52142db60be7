//! Semantic versions with a numeric fallback
//!
//! Tokens such as `v1.2`, `1.0.0-rc.1+build` are canonicalized and compared by
//! semantic-version precedence. Anything else (`release-2024.01`, `jdk8u392`)
//! falls back to the configured number extractor.

use crate::version::parsed::{ParsedVersion, PartsExtractor};
use crate::version::semver::parse_version;
use crate::version::strategies::clean_token;
use crate::version::strategy::{SortOrder, VersionFormat, VersioningStrategy};

pub struct SemverStrategy {
    parts: PartsExtractor,
    sort: SortOrder,
}

impl SemverStrategy {
    pub fn new(parts: PartsExtractor, sort: SortOrder) -> Self {
        Self { parts, sort }
    }
}

impl VersioningStrategy for SemverStrategy {
    fn format(&self) -> VersionFormat {
        VersionFormat::Semver
    }

    fn sort_order(&self) -> SortOrder {
        self.sort
    }

    fn parse_version(&self, raw: &str) -> Option<ParsedVersion> {
        let cleaned = clean_token(raw)?;

        if let Some(canonical) = parse_version(cleaned) {
            return Some(ParsedVersion::from_canonical(cleaned, canonical));
        }

        self.parts
            .extract(cleaned)
            .map(|parts| ParsedVersion::from_parts(cleaned, parts))
    }
}
