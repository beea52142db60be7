use std::cmp::Ordering;

use tracing::debug;

use crate::config::{NOT_AVAILABLE, VersioningCfg};
use crate::version::error::VersionError;
use crate::version::parsed::ParsedVersion;
use crate::version::strategy::{VersioningStrategy, new_versioning_strategy};

/// Candidates strictly newer than `current` under the configured strategy.
///
/// Candidates are deduplicated by canonical identity (so `v1.2.0`, `1.2` and
/// ` 1.2.0 ` collapse into the first one seen) and sorted newest first unless
/// the configuration asks for ascending order. An empty candidate list is
/// never an error.
pub fn filter_newer_versions(
    current: &str,
    candidates: &[String],
    cfg: Option<&VersioningCfg>,
) -> Result<Vec<String>, VersionError> {
    if candidates.is_empty() {
        return Ok(Vec::new());
    }

    let strategy = new_versioning_strategy(cfg)?;
    let filtered = strategy.filter_newer(current, candidates);
    debug!(
        "Filtered {} candidates newer than {:?}: {}",
        candidates.len(),
        current,
        filtered.len()
    );
    Ok(filtered)
}

/// Best available update per bump kind, `#N/A` where there is none
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionSummary {
    pub major: String,
    pub minor: String,
    pub patch: String,
}

impl Default for VersionSummary {
    fn default() -> Self {
        Self {
            major: NOT_AVAILABLE.to_string(),
            minor: NOT_AVAILABLE.to_string(),
            patch: NOT_AVAILABLE.to_string(),
        }
    }
}

/// Pick the newest major, minor and patch update for `current`.
///
/// With `incremental` the nearest newer version of each kind is picked
/// instead of the newest. A same-numbered version that still compares
/// greater (e.g. a release after its pre-release) counts as a patch update.
pub fn summarize_available_versions(
    current: &str,
    candidates: &[String],
    cfg: Option<&VersioningCfg>,
    incremental: bool,
) -> Result<VersionSummary, VersionError> {
    let strategy = new_versioning_strategy(cfg)?;

    let Some(base) = strategy.parse_version(current) else {
        debug!("Could not parse current version {:?}", current);
        return Ok(VersionSummary::default());
    };
    let base_parts = base.parts.unwrap_or_default();

    let mut major: Option<ParsedVersion> = None;
    let mut minor: Option<ParsedVersion> = None;
    let mut patch: Option<ParsedVersion> = None;

    for parsed in candidates.iter().filter_map(|v| strategy.parse_version(v)) {
        let parts = parsed.parts.unwrap_or_default();

        let slot = if parts.major > base_parts.major {
            &mut major
        } else if parts.major < base_parts.major {
            continue;
        } else if parts.minor > base_parts.minor {
            &mut minor
        } else if parts.minor < base_parts.minor {
            continue;
        } else if parts.patch > base_parts.patch {
            &mut patch
        } else if parts.patch == base_parts.patch
            && strategy.compare(&parsed, &base) == Ordering::Greater
        {
            &mut patch
        } else {
            continue;
        };

        if is_better_candidate(strategy.as_ref(), slot.as_ref(), &parsed, incremental) {
            *slot = Some(parsed);
        }
    }

    let raw_or_na = |candidate: Option<ParsedVersion>| {
        candidate.map_or_else(|| NOT_AVAILABLE.to_string(), |parsed| parsed.raw)
    };
    let summary = VersionSummary {
        major: raw_or_na(major),
        minor: raw_or_na(minor),
        patch: raw_or_na(patch),
    };

    debug!(
        "Version candidates: major={}, minor={}, patch={} (incremental={})",
        summary.major, summary.minor, summary.patch, incremental
    );
    Ok(summary)
}

fn is_better_candidate(
    strategy: &dyn VersioningStrategy,
    current_best: Option<&ParsedVersion>,
    parsed: &ParsedVersion,
    incremental: bool,
) -> bool {
    let Some(best) = current_best else {
        return true;
    };

    let wanted = if incremental {
        Ordering::Less
    } else {
        Ordering::Greater
    };
    strategy.compare(parsed, best) == wanted
}
