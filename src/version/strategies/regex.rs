//! Versions read through a configured regex with `major`/`minor`/`patch` groups

use crate::version::parsed::{ParsedVersion, PartsExtractor};
use crate::version::strategies::clean_token;
use crate::version::strategy::{SortOrder, VersionFormat, VersioningStrategy};

pub struct RegexStrategy {
    parts: PartsExtractor,
    sort: SortOrder,
}

impl RegexStrategy {
    pub fn new(parts: PartsExtractor, sort: SortOrder) -> Self {
        Self { parts, sort }
    }
}

impl VersioningStrategy for RegexStrategy {
    fn format(&self) -> VersionFormat {
        VersionFormat::Regex
    }

    fn sort_order(&self) -> SortOrder {
        self.sort
    }

    fn parse_version(&self, raw: &str) -> Option<ParsedVersion> {
        let cleaned = clean_token(raw)?;
        self.parts
            .extract(cleaned)
            .map(|parts| ParsedVersion::from_parts(cleaned, parts))
    }
}
