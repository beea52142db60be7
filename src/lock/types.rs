//! Package and install status types

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::config::NOT_AVAILABLE;
use crate::lock::error::LockError;

/// How a package's installed version was (or was not) determined.
///
/// Variants are listed in precedence order: when several conditions apply,
/// the later variant wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum InstallStatus {
    /// No lock files and no self-pinning for the rule
    #[default]
    NotConfigured,
    /// Lock files configured, none found in the scope
    LockMissing,
    /// Lock file found and the package is in it
    LockFound,
    /// Lock file found without the package
    NotInLock,
    /// Manifest pins the exact version itself
    SelfPinned,
    /// Wildcard or empty declared version with nothing installed
    VersionMissing,
    /// Declared constraint floats over a range
    Floating,
    /// Explicitly ignored
    Ignored,
}

impl InstallStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            InstallStatus::NotConfigured => "NotConfigured",
            InstallStatus::LockMissing => "LockMissing",
            InstallStatus::LockFound => "LockFound",
            InstallStatus::NotInLock => "NotInLock",
            InstallStatus::SelfPinned => "SelfPinned",
            InstallStatus::VersionMissing => "VersionMissing",
            InstallStatus::Floating => "Floating",
            InstallStatus::Ignored => "Ignored",
        }
    }
}

impl std::fmt::Display for InstallStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for InstallStatus {
    type Err = LockError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "NotConfigured" => Ok(InstallStatus::NotConfigured),
            "LockMissing" => Ok(InstallStatus::LockMissing),
            "LockFound" => Ok(InstallStatus::LockFound),
            "NotInLock" => Ok(InstallStatus::NotInLock),
            "SelfPinned" => Ok(InstallStatus::SelfPinned),
            "VersionMissing" => Ok(InstallStatus::VersionMissing),
            "Floating" => Ok(InstallStatus::Floating),
            "Ignored" => Ok(InstallStatus::Ignored),
            _ => Err(LockError::UnknownStatus(s.to_string())),
        }
    }
}

fn not_available() -> String {
    NOT_AVAILABLE.to_string()
}

/// A declared dependency, enriched in place with its installed version
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Package {
    pub name: String,
    /// Package manager rule key, e.g. "npm"
    pub rule: String,
    /// Declared version or constraint from the manifest
    #[serde(default)]
    pub version: String,
    /// Manifest the package was declared in
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<PathBuf>,
    #[serde(default = "not_available")]
    pub installed_version: String,
    #[serde(default)]
    pub install_status: InstallStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ignore_reason: Option<String>,
}

impl Package {
    pub fn new(name: impl Into<String>, rule: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            rule: rule.into(),
            version: version.into(),
            source: None,
            installed_version: not_available(),
            install_status: InstallStatus::default(),
            ignore_reason: None,
        }
    }

    pub fn with_source(mut self, source: impl Into<PathBuf>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn with_ignore_reason(mut self, reason: impl Into<String>) -> Self {
        self.ignore_reason = Some(reason.into());
        self
    }

    pub fn is_ignored(&self) -> bool {
        self.ignore_reason.as_deref().is_some_and(|r| !r.is_empty())
    }

    pub(crate) fn set_installed(&mut self, version: impl Into<String>, status: InstallStatus) {
        self.installed_version = version.into();
        self.install_status = status;
    }

    pub(crate) fn set_unresolved(&mut self, status: InstallStatus) {
        self.set_installed(NOT_AVAILABLE, status);
    }
}
