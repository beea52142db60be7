//! Temporary project trees with lock files

use std::fs;
use std::path::{Path, PathBuf};

use serde_json::json;
use tempfile::TempDir;

use version_engine::config::Config;
use version_engine::lock::Package;

/// A throwaway project directory
pub struct Workspace {
    dir: TempDir,
}

impl Workspace {
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().unwrap(),
        }
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub fn path(&self, relative: &str) -> PathBuf {
        self.dir.path().join(relative)
    }

    /// Write `content` to `relative`, creating parent directories
    pub fn write(&self, relative: &str, content: &str) -> PathBuf {
        let path = self.path(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(&path, content).unwrap();
        path
    }
}

/// Package declared in the manifest at `source` (relative to the workspace)
pub fn package(workspace: &Workspace, name: &str, version: &str, source: &str) -> Package {
    Package::new(name, "npm", version).with_source(workspace.path(source))
}

/// npm rule reading package-lock.json v1 and v3 with conditional patterns
pub fn npm_config() -> Config {
    serde_json::from_value(json!({
        "rules": {
            "npm": {
                "lock_files": [{
                    "files": ["package-lock.json"],
                    "format": "json",
                    "extraction": {
                        "patterns": [
                            {
                                "name": "lockfile-v3",
                                "detect": r#""lockfileVersion":\s*3"#,
                                "pattern": r#""node_modules/(?P<name>[^"]+)":\s*\{\s*"version":\s*"(?P<version>[^"]+)""#
                            },
                            {
                                "name": "lockfile-v1",
                                "detect": r#""lockfileVersion":\s*1"#,
                                "pattern": r#""(?P<n>[^"/]+)":\s*\{\s*"version":\s*"(?P<version>[^"]+)""#
                            }
                        ]
                    }
                }]
            }
        }
    }))
    .unwrap()
}
