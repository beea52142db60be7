//! Single-number versions (`42`, `build-1187`)

use crate::version::parsed::{ParsedVersion, PartsExtractor};
use crate::version::strategies::clean_token;
use crate::version::strategy::{SortOrder, VersionFormat, VersioningStrategy};

pub struct NumericStrategy {
    parts: PartsExtractor,
    sort: SortOrder,
}

impl NumericStrategy {
    pub fn new(parts: PartsExtractor, sort: SortOrder) -> Self {
        Self { parts, sort }
    }
}

impl VersioningStrategy for NumericStrategy {
    fn format(&self) -> VersionFormat {
        VersionFormat::Numeric
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
