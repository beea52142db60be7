use std::path::{Path, PathBuf};

use globset::{GlobBuilder, GlobSet, GlobSetBuilder};
#[cfg(test)]
use mockall::automock;
use tracing::{debug, trace};
use walkdir::WalkDir;

use crate::config::SKIPPED_DIRECTORIES;
use crate::lock::error::LockError;

/// Locates lock files below a scope directory
#[cfg_attr(test, automock)]
pub trait LockFileFinder: Send + Sync {
    /// Files under `base_dir` matching any of `patterns`
    fn find(&self, base_dir: &Path, patterns: &[String]) -> Result<Vec<PathBuf>, LockError>;
}

/// Walks the directory tree and matches files with glob patterns.
///
/// A file matches when its path relative to `base_dir` or its file name
/// matches a pattern. `**` crosses directories; `*` and `?` stay within one
/// path segment. Dependency and VCS directories below the root are skipped.
#[derive(Debug, Clone, Copy, Default)]
pub struct GlobFileFinder;

impl GlobFileFinder {
    pub fn new() -> Self {
        Self
    }

    fn build_glob_set(patterns: &[String]) -> Result<GlobSet, LockError> {
        let mut builder = GlobSetBuilder::new();
        for pattern in patterns.iter().filter(|p| !p.trim().is_empty()) {
            let glob = GlobBuilder::new(pattern.trim())
                .literal_separator(true)
                .build()
                .map_err(|source| LockError::Glob {
                    pattern: pattern.clone(),
                    source,
                })?;
            builder.add(glob);
        }
        builder.build().map_err(|source| LockError::Glob {
            pattern: patterns.join(","),
            source,
        })
    }
}

impl LockFileFinder for GlobFileFinder {
    fn find(&self, base_dir: &Path, patterns: &[String]) -> Result<Vec<PathBuf>, LockError> {
        let glob_set = Self::build_glob_set(patterns)?;
        if glob_set.is_empty() {
            return Ok(Vec::new());
        }

        if !base_dir.is_dir() {
            debug!("Lock file search root {} does not exist", base_dir.display());
            return Ok(Vec::new());
        }

        let walker = WalkDir::new(base_dir)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| {
                entry.depth() == 0
                    || !entry.file_type().is_dir()
                    || !entry
                        .file_name()
                        .to_str()
                        .is_some_and(|name| SKIPPED_DIRECTORIES.contains(&name))
            });

        let mut matches = Vec::new();
        for entry in walker {
            let entry = entry.map_err(|source| LockError::Walk {
                dir: base_dir.to_path_buf(),
                source,
            })?;
            if !entry.file_type().is_file() {
                continue;
            }

            let path = entry.path();
            let relative = path.strip_prefix(base_dir).unwrap_or(path);
            let relative = relative.to_string_lossy().replace('\\', "/");

            if glob_set.is_match(&relative) || glob_set.is_match(entry.file_name()) {
                trace!("Lock file candidate: {}", path.display());
                matches.push(path.to_path_buf());
            }
        }

        matches.dedup();
        debug!(
            "Found {} lock file(s) in {} for {:?}",
            matches.len(),
            base_dir.display(),
            patterns
        );
        Ok(matches)
    }
}
