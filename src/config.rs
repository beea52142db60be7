use regex::Regex;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use crate::pattern::{PatternError, compile_pattern};

// =============================================================================
// Sentinels
// =============================================================================

/// Installed version reported when nothing could be resolved
pub const NOT_AVAILABLE: &str = "#N/A";

/// Declared version meaning "whatever is newest"
pub const WILDCARD: &str = "*";

// =============================================================================
// Limits
// =============================================================================

/// Default timeout for lock file commands in seconds
pub const DEFAULT_LOCK_COMMAND_TIMEOUT_SECS: u64 = 60;

/// Maximum accepted length of a configured regex pattern
pub const MAX_REGEX_PATTERN_LEN: usize = 1000;

/// Maximum number of quantifiers accepted in a configured regex pattern
pub const MAX_REGEX_QUANTIFIERS: usize = 15;

/// Compiled program size limit for configured regex patterns (1 MiB)
pub const REGEX_SIZE_LIMIT: usize = 1 << 20;

/// Lazy DFA cache limit for configured regex patterns (2 MiB)
pub const REGEX_DFA_SIZE_LIMIT: usize = 2 << 20;

/// Number of (rule, scope) pairs resolved concurrently
pub const MAX_CONCURRENT_SCOPES: usize = 8;

/// Directory names never descended into while searching for lock files
pub const SKIPPED_DIRECTORIES: &[&str] = &[
    "node_modules",
    "vendor",
    ".git",
    "venv",
    "testdata",
    "testdata_errors",
];

/// Top-level engine configuration
#[derive(Debug, Clone, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Fallback scope directory when neither the manifest nor the caller gives one
    pub working_dir: Option<PathBuf>,
    /// Package manager rules keyed by rule name (e.g. "npm", "mod")
    pub rules: HashMap<String, PackageManagerCfg>,
    /// Global incremental package patterns
    pub incremental: Vec<String>,
}

/// Configuration of a single package manager rule
#[derive(Debug, Clone, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct PackageManagerCfg {
    pub lock_files: Vec<LockFileCfg>,
    /// The manifest records exact versions itself (e.g. requirements.txt)
    pub self_pinning: bool,
    pub incremental: Vec<String>,
    pub latest_mapping: Option<LatestMappingCfg>,
}

/// How installed versions are read for one family of lock files
#[derive(Debug, Clone, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct LockFileCfg {
    /// Glob patterns matched against paths relative to the scope directory
    pub files: Vec<String>,
    pub format: Option<String>,
    pub extraction: Option<ExtractionCfg>,
    /// Shell commands whose output replaces reading the file
    pub commands: Option<String>,
    pub env: HashMap<String, String>,
    pub timeout_seconds: Option<u64>,
    pub command_extraction: Option<LockCommandExtractionCfg>,
}

impl LockFileCfg {
    /// Returns the configured commands, ignoring blank strings
    pub fn commands(&self) -> Option<&str> {
        self.commands
            .as_deref()
            .map(str::trim)
            .filter(|commands| !commands.is_empty())
    }

    /// Returns the command timeout, falling back to the default when unset or zero
    pub fn timeout(&self) -> Duration {
        let secs = self
            .timeout_seconds
            .filter(|secs| *secs > 0)
            .unwrap_or(DEFAULT_LOCK_COMMAND_TIMEOUT_SECS);
        Duration::from_secs(secs)
    }
}

/// Regex extraction applied to lock file content
#[derive(Debug, Clone, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct ExtractionCfg {
    /// Single pattern, also the fallback when no conditional pattern applies
    pub pattern: Option<String>,
    pub patterns: Vec<PatternCfg>,
}

impl ExtractionCfg {
    pub fn has_patterns(&self) -> bool {
        self.pattern.as_deref().is_some_and(|p| !p.is_empty())
            || self.patterns.iter().any(|p| !p.pattern.is_empty())
    }
}

/// Conditional pattern applied when `detect` matches (or always, without `detect`)
#[derive(Debug, Clone, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct PatternCfg {
    pub name: Option<String>,
    pub detect: Option<String>,
    pub pattern: String,
}

/// How lock command output is decoded
#[derive(Debug, Clone, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct LockCommandExtractionCfg {
    /// "json" (default) or "raw"
    pub format: Option<String>,
    /// Named-group regex used by the raw format
    pub pattern: Option<String>,
    pub json_name_key: Option<String>,
    pub json_version_key: Option<String>,
}

/// Version parsing and ordering policy
#[derive(Debug, Clone, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct VersioningCfg {
    /// "semver" (default), "numeric", "regex" or "ordered"
    pub format: Option<String>,
    pub regex: Option<String>,
    /// "desc" (default) or "asc"
    pub sort: Option<String>,
}

/// Declared-version tokens that mean "latest" for a rule
#[derive(Debug, Clone, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct LatestMappingCfg {
    pub default: HashMap<String, String>,
    /// Per-package overrides keyed by package name
    pub packages: HashMap<String, HashMap<String, String>>,
}

impl Config {
    /// Whether `name` under `rule` should move to the nearest newer version
    /// instead of the newest one.
    ///
    /// Rule-level patterns are checked before global ones. A pattern without
    /// regex metacharacters must match the whole name literally.
    pub fn should_update_incrementally(&self, rule: &str, name: &str) -> Result<bool, PatternError> {
        let rule_patterns = self
            .rules
            .get(rule)
            .map(|cfg| cfg.incremental.as_slice())
            .unwrap_or_default();

        for pattern in rule_patterns.iter().chain(self.incremental.iter()) {
            let pattern = pattern.trim();
            if pattern.is_empty() {
                continue;
            }
            if incremental_matcher(pattern)?.is_match(name) {
                return Ok(true);
            }
        }

        Ok(false)
    }
}

fn incremental_matcher(pattern: &str) -> Result<Regex, PatternError> {
    const REGEX_META: &[char] = &[
        '.', '*', '+', '?', '{', '}', '(', ')', '|', '[', ']', '^', '$', '\\',
    ];

    if pattern.contains(REGEX_META) {
        compile_pattern(pattern)
    } else {
        compile_pattern(&format!("^{}$", regex::escape(pattern)))
    }
}
