//! Pattern extraction of name/version pairs from lock file text
//!
//! An [`ExtractionCfg`] carries either a single `pattern` or a list of
//! conditional `patterns`. A conditional pattern applies when it has no
//! `detect` regex or when `detect` matches the content; every applicable
//! pattern runs and the results are concatenated in list order. When no
//! conditional pattern applies, the single `pattern` is used as a fallback.
//!
//! Patterns name their captures `name` (or `n`) and `version`.

use indexmap::IndexMap;
use tracing::{debug, trace};

use crate::config::ExtractionCfg;
use crate::lock::error::LockError;
use crate::pattern::{PatternCache, capture_all};

/// One name/version pair found in a lock file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockEntry {
    pub name: String,
    pub version: String,
}

/// A pattern chosen for a piece of content, with a label for error messages
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SelectedPattern<'a> {
    pub label: &'a str,
    pub pattern: &'a str,
}

/// Applies extraction patterns, compiling each distinct pattern once
#[derive(Debug, Default)]
pub struct PatternExtractor {
    cache: PatternCache,
}

impl PatternExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Patterns from `extraction` that apply to `content`
    pub fn select_patterns<'a>(
        &self,
        content: &str,
        extraction: &'a ExtractionCfg,
    ) -> Result<Vec<SelectedPattern<'a>>, LockError> {
        let mut selected = Vec::new();

        for cfg in extraction.patterns.iter().filter(|p| !p.pattern.is_empty()) {
            let label = cfg.name.as_deref().unwrap_or(cfg.pattern.as_str());
            let applies = match cfg.detect.as_deref().filter(|d| !d.is_empty()) {
                None => true,
                Some(detect) => self.compile(label, detect)?.is_match(content),
            };

            if applies {
                selected.push(SelectedPattern {
                    label,
                    pattern: &cfg.pattern,
                });
            } else {
                trace!("Pattern {} skipped: detect did not match", label);
            }
        }

        if selected.is_empty()
            && let Some(pattern) = extraction.pattern.as_deref().filter(|p| !p.is_empty())
        {
            selected.push(SelectedPattern {
                label: "pattern",
                pattern,
            });
        }

        Ok(selected)
    }

    /// Every `{name, version}` pair the applicable patterns find in `content`.
    ///
    /// Entries whose name or version is blank after normalization are dropped.
    pub fn extract_patterns(
        &self,
        content: &str,
        extraction: &ExtractionCfg,
    ) -> Result<Vec<LockEntry>, LockError> {
        let patterns = self.select_patterns(content, extraction)?;
        debug!("Applying {} extraction pattern(s)", patterns.len());

        let mut entries = Vec::new();
        for selected in patterns {
            let regex = self.compile(selected.label, selected.pattern)?;
            let before = entries.len();
            entries.extend(capture_all(&regex, content).iter().filter_map(|groups| {
                lock_entry(
                    groups.get("name").map(String::as_str),
                    groups.get("n").map(String::as_str),
                    groups.get("version").map(String::as_str),
                )
            }));
            trace!("Pattern {} matched {} entries", selected.label, entries.len() - before);
        }

        Ok(entries)
    }

    /// Name to version map; later entries overwrite earlier ones
    pub fn extract_versions(
        &self,
        content: &str,
        extraction: &ExtractionCfg,
    ) -> Result<IndexMap<String, String>, LockError> {
        Ok(self
            .extract_patterns(content, extraction)?
            .into_iter()
            .map(|entry| (entry.name, entry.version))
            .collect())
    }

    /// Name to version map from free-form command output using one pattern
    pub fn extract_raw(&self, output: &str, pattern: &str) -> Result<IndexMap<String, String>, LockError> {
        let extraction = ExtractionCfg {
            pattern: Some(pattern.to_string()),
            patterns: Vec::new(),
        };
        self.extract_versions(output, &extraction)
    }

    fn compile(&self, label: &str, pattern: &str) -> Result<regex::Regex, LockError> {
        self.cache
            .get_or_compile(pattern)
            .map_err(|source| LockError::Pattern {
                name: label.to_string(),
                source,
            })
    }
}

/// Build an entry from raw captures, normalizing the package name and version
pub fn lock_entry(name: Option<&str>, alt_name: Option<&str>, version: Option<&str>) -> Option<LockEntry> {
    let name = normalize_lock_package_name(name.unwrap_or_default(), alt_name.unwrap_or_default());
    let version = normalize_lock_version(version.unwrap_or_default());

    (!name.is_empty() && !version.is_empty()).then_some(LockEntry { name, version })
}

/// Trim and strip the `node_modules/` prefix and `/go.mod` suffix lock files add to names
pub fn normalize_lock_package_name(name: &str, alt: &str) -> String {
    let resolved = match name.trim() {
        "" => alt.trim(),
        trimmed => trimmed,
    };

    let resolved = resolved.strip_prefix("node_modules/").unwrap_or(resolved);
    let resolved = resolved.strip_suffix("/go.mod").unwrap_or(resolved);
    resolved.to_string()
}

fn normalize_lock_version(version: &str) -> String {
    let version = version.trim();
    version.strip_suffix("/go.mod").unwrap_or(version).to_string()
}
