//! Format-specific versioning strategies

pub mod numeric;
pub mod ordered;
pub mod regex;
pub mod semver;

pub use numeric::NumericStrategy;
pub use ordered::OrderedStrategy;
pub use regex::RegexStrategy;
pub use semver::SemverStrategy;

use crate::config::NOT_AVAILABLE;

/// Trimmed token, or `None` for blanks and the unknown-version sentinel
pub(crate) fn clean_token(raw: &str) -> Option<&str> {
    let cleaned = raw.trim();
    (!cleaned.is_empty() && cleaned != NOT_AVAILABLE).then_some(cleaned)
}
