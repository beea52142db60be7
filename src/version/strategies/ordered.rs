//! Explicitly ranked versions
//!
//! The candidate list order is the ranking, so tokens like `latest`, `beta`
//! or `stable` are valid. With the default descending sort the list is
//! assumed to be newest first and everything before the current entry is
//! newer; with ascending sort everything after it is.

use std::collections::HashSet;

use crate::version::parsed::{ParsedVersion, PartsExtractor};
use crate::version::strategies::clean_token;
use crate::version::strategy::{SortOrder, VersionFormat, VersioningStrategy};

pub struct OrderedStrategy {
    parts: PartsExtractor,
    sort: SortOrder,
}

impl OrderedStrategy {
    pub fn new(parts: PartsExtractor, sort: SortOrder) -> Self {
        Self { parts, sort }
    }
}

impl VersioningStrategy for OrderedStrategy {
    fn format(&self) -> VersionFormat {
        VersionFormat::Ordered
    }

    fn sort_order(&self) -> SortOrder {
        self.sort
    }

    fn parse_version(&self, raw: &str) -> Option<ParsedVersion> {
        let cleaned = clean_token(raw)?;

        if let Some(parts) = self.parts.extract(cleaned) {
            return Some(ParsedVersion::from_parts(cleaned, parts));
        }

        let parsed = ParsedVersion::from_loose(cleaned);
        (!parsed.normalized.is_empty()).then_some(parsed)
    }

    /// Entries ranked above `current`, in list order. When `current` is not in
    /// the list every distinct entry is returned.
    fn filter_newer(&self, current: &str, candidates: &[String]) -> Vec<String> {
        let current = current.trim();
        let base_key = self.key_for(self.parse_version(current).as_ref(), current);

        let mut seen = HashSet::new();
        let entries: Vec<(&str, String)> = candidates
            .iter()
            .map(|candidate| candidate.trim())
            .filter(|candidate| !candidate.is_empty())
            .filter_map(|candidate| {
                let key = self.key_for(self.parse_version(candidate).as_ref(), candidate);
                seen.insert(key.clone()).then_some((candidate, key))
            })
            .collect();

        let base_index = if base_key.is_empty() {
            None
        } else {
            entries.iter().position(|(_, key)| *key == base_key)
        };

        let selected = match (base_index, self.sort) {
            (None, _) => &entries[..],
            (Some(index), SortOrder::Descending) => &entries[..index],
            (Some(index), SortOrder::Ascending) => &entries[index + 1..],
        };

        selected
            .iter()
            .map(|(candidate, _)| candidate.to_string())
            .collect()
    }
}
