//! Final install status pipeline and the recognizers it depends on
//!
//! After lock resolution every package goes through three passes, in order:
//! [`apply_version_missing`], [`apply_floating`], [`apply_ignored`]. A later
//! pass overrides an earlier one, so `Ignored` always wins.

use std::collections::HashMap;

use tracing::trace;

use crate::config::{NOT_AVAILABLE, PackageManagerCfg, WILDCARD};
use crate::lock::types::{InstallStatus, Package};

/// Decides whether a declared version means "whatever is latest"
pub trait LatestRecognizer: Send + Sync {
    fn is_latest_indicator(&self, version: &str, name: &str, rule: Option<&PackageManagerCfg>) -> bool;
}

/// Decides whether a declared constraint floats over a range of versions
pub trait ConstraintRecognizer: Send + Sync {
    fn is_floating(&self, version: &str) -> bool;
}

/// Latest indicators from built-in tokens plus the rule's `latest_mapping`.
///
/// `""`, `#n/a` and `latest` all resolve to the latest value, `*` unless a
/// mapping for the empty key changes it. Package mappings apply after the
/// rule defaults.
#[derive(Debug, Clone, Copy, Default)]
pub struct MappedLatestRecognizer;

impl MappedLatestRecognizer {
    pub fn new() -> Self {
        Self
    }

    /// Token to value mappings for `name` and the resolved latest value
    pub fn latest_mappings(&self, name: &str, rule: Option<&PackageManagerCfg>) -> (HashMap<String, String>, String) {
        let mut latest = WILDCARD.to_string();
        let mut mappings = HashMap::new();

        let mut apply = |source: &HashMap<String, String>| {
            for (key, value) in source {
                let key = key.trim().to_lowercase();
                if key.is_empty() {
                    latest = value.clone();
                }
                mappings.insert(key, value.clone());
            }
        };

        if let Some(mapping) = rule.and_then(|r| r.latest_mapping.as_ref()) {
            apply(&mapping.default);
            if let Some(package) = mapping.packages.get(name) {
                apply(package);
            }
        }

        for token in ["", "#n/a", "latest"] {
            mappings.insert(token.to_string(), latest.clone());
        }

        (mappings, latest)
    }
}

impl LatestRecognizer for MappedLatestRecognizer {
    fn is_latest_indicator(&self, version: &str, name: &str, rule: Option<&PackageManagerCfg>) -> bool {
        let (_, latest) = self.latest_mappings(name, rule);
        version.trim().to_lowercase() == latest.trim().to_lowercase()
    }
}

/// Embedded wildcards, intervals, comparison ranges and OR constraints
#[derive(Debug, Clone, Copy, Default)]
pub struct FloatingConstraintRecognizer;

impl FloatingConstraintRecognizer {
    pub fn new() -> Self {
        Self
    }
}

impl ConstraintRecognizer for FloatingConstraintRecognizer {
    fn is_floating(&self, version: &str) -> bool {
        let version = version.trim();
        // a bare wildcard means latest, not a range
        if version.is_empty() || version == WILDCARD {
            return false;
        }

        let reason = if version.contains(".*") || version.contains(".x") || version.ends_with('*') {
            "embedded wildcard"
        } else if version.starts_with('[') || version.starts_with('(') {
            "interval"
        } else if version.starts_with('>') || version.starts_with('<') {
            "comparison range"
        } else if version.contains('>') && version.contains('<') {
            "compound range"
        } else if version.contains('|') {
            "or constraint"
        } else {
            return false;
        };

        trace!("Constraint {:?} is floating: {}", version, reason);
        true
    }
}

/// Wildcard declared version with nothing installed becomes `VersionMissing`
pub fn apply_version_missing(status: InstallStatus, declared: &str, installed: &str) -> InstallStatus {
    if declared.trim() == WILDCARD && installed == NOT_AVAILABLE {
        InstallStatus::VersionMissing
    } else {
        status
    }
}

pub fn apply_floating(status: InstallStatus, floating: bool) -> InstallStatus {
    if floating { InstallStatus::Floating } else { status }
}

pub fn apply_ignored(status: InstallStatus, ignored: bool) -> InstallStatus {
    if ignored { InstallStatus::Ignored } else { status }
}

/// Run all three passes over a resolved package
pub fn final_status(package: &Package, constraints: &dyn ConstraintRecognizer) -> InstallStatus {
    let status = apply_version_missing(package.install_status, &package.version, &package.installed_version);
    let status = apply_floating(status, constraints.is_floating(&package.version));
    apply_ignored(status, package.is_ignored())
}
