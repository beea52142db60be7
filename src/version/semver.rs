use semver::{BuildMetadata, Version};

use crate::config::NOT_AVAILABLE;

/// Parse a version string into a semver::Version, normalizing partial versions.
///
/// Accepts an optional leading `v` and surrounding whitespace. Partial versions
/// like "1" or "1.2" are padded with zeros, but only when they carry no
/// pre-release or build suffix. Build metadata is dropped so that it never
/// takes part in ordering.
///
/// Examples:
/// - "1" -> Version(1, 0, 0)
/// - "v1.2" -> Version(1, 2, 0)
/// - "1.2.3-rc.1+build.5" -> Version(1, 2, 3, pre: rc.1)
pub fn parse_version(version: &str) -> Option<Version> {
    let cleaned = version.trim();
    if cleaned.is_empty() || cleaned == NOT_AVAILABLE {
        return None;
    }

    let without_prefix = cleaned.strip_prefix('v').unwrap_or(cleaned);
    let has_suffix = without_prefix.contains(['-', '+']);

    let parts: Vec<&str> = without_prefix.split('.').collect();
    let normalized = match parts.len() {
        1 if !has_suffix => format!("{}.0.0", parts[0]),
        2 if !has_suffix => format!("{}.{}.0", parts[0], parts[1]),
        _ => without_prefix.to_string(),
    };

    let mut parsed = Version::parse(&normalized).ok()?;
    parsed.build = BuildMetadata::EMPTY;
    Some(parsed)
}

/// Canonical `vMAJOR.MINOR.PATCH[-prerelease]` form, or `None` for non-version input
///
/// Examples:
/// - "1" -> "v1.0.0"
/// - "1.0.0+build" -> "v1.0.0"
/// - "-1.0.0" -> None
pub fn canonical_semver(version: &str) -> Option<String> {
    parse_version(version).map(|parsed| format!("v{parsed}"))
}
