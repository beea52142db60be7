//! Installed version resolution
//!
//! Packages are grouped by rule and then by scope directory (the manifest's
//! directory, else the caller's base directory, else the configured working
//! directory, else `.`). Each scope searches its lock files independently and
//! scopes are resolved concurrently. Directory walks run on the blocking pool
//! and lock files are read through `tokio::fs`. Results are written back only after every scope has resolved,
//! so a failing call leaves the packages untouched.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use futures::stream::{self, StreamExt, TryStreamExt};
use indexmap::IndexMap;
use tokio::task;
use tracing::{debug, info, trace, warn};

use crate::config::{
    Config, LockFileCfg, MAX_CONCURRENT_SCOPES, NOT_AVAILABLE, PackageManagerCfg, WILDCARD,
};
use crate::lock::command::{CommandRequest, CommandRunner, ShellCommandRunner};
use crate::lock::decode::decode_with;
use crate::lock::error::LockError;
use crate::lock::extract::PatternExtractor;
use crate::lock::finder::{GlobFileFinder, LockFileFinder};
use crate::lock::status::{
    ConstraintRecognizer, FloatingConstraintRecognizer, LatestRecognizer, MappedLatestRecognizer,
    final_status,
};
use crate::lock::types::{InstallStatus, Package};

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
struct ScopeKey {
    rule: String,
    dir: PathBuf,
}

/// Installed versions found for one scope
#[derive(Debug, Default)]
struct ScopeResolution {
    installed: IndexMap<String, String>,
    found_lock: bool,
}

pub struct LockResolver {
    finder: Arc<dyn LockFileFinder>,
    runner: Arc<dyn CommandRunner>,
    latest: Arc<dyn LatestRecognizer>,
    constraints: Arc<dyn ConstraintRecognizer>,
    extractor: PatternExtractor,
    latest_warnings: Mutex<HashSet<String>>,
}

impl Default for LockResolver {
    fn default() -> Self {
        Self::new(Arc::new(GlobFileFinder::new()), Arc::new(ShellCommandRunner::new()))
    }
}

impl LockResolver {
    pub fn new(finder: Arc<dyn LockFileFinder>, runner: Arc<dyn CommandRunner>) -> Self {
        Self {
            finder,
            runner,
            latest: Arc::new(MappedLatestRecognizer::new()),
            constraints: Arc::new(FloatingConstraintRecognizer::new()),
            extractor: PatternExtractor::new(),
            latest_warnings: Mutex::new(HashSet::new()),
        }
    }

    pub fn with_latest_recognizer(mut self, latest: Arc<dyn LatestRecognizer>) -> Self {
        self.latest = latest;
        self
    }

    pub fn with_constraint_recognizer(mut self, constraints: Arc<dyn ConstraintRecognizer>) -> Self {
        self.constraints = constraints;
        self
    }

    /// `rule:name` keys of packages that declared a latest indicator without
    /// a resolvable lock entry during the most recent successful call, sorted
    pub fn latest_warnings(&self) -> Vec<String> {
        let mut keys: Vec<String> = self
            .latest_warnings
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .cloned()
            .collect();
        keys.sort();
        keys
    }

    /// Fill in installed version and install status for every package.
    ///
    /// Without a config the packages are left as they are. Packages whose
    /// rule is not configured keep their current values but still go through
    /// the final status passes.
    pub async fn apply_installed_versions(
        &self,
        packages: &mut [Package],
        cfg: Option<&Config>,
        base_dir: Option<&Path>,
    ) -> Result<(), LockError> {
        let Some(cfg) = cfg.filter(|_| !packages.is_empty()) else {
            debug!("Lock resolution skipped: {} packages, config present: {}", packages.len(), cfg.is_some());
            return Ok(());
        };
        info!("Applying installed versions for {} packages", packages.len());

        let mut warned = HashSet::new();

        let mut by_rule: BTreeMap<&str, Vec<usize>> = BTreeMap::new();
        for (idx, package) in packages.iter().enumerate() {
            by_rule.entry(package.rule.as_str()).or_default().push(idx);
        }

        let mut updates: Vec<(usize, String, InstallStatus)> = Vec::new();
        let mut scopes: BTreeMap<ScopeKey, Vec<usize>> = BTreeMap::new();

        for (rule, indexes) in by_rule {
            let Some(rule_cfg) = cfg.rules.get(rule) else {
                debug!("Rule {:?} is not configured", rule);
                continue;
            };

            if rule_cfg.lock_files.is_empty() {
                updates.extend(indexes.into_iter().map(|idx| {
                    let (version, status) = self.unlocked_status(&packages[idx], rule_cfg, &mut warned);
                    (idx, version, status)
                }));
                continue;
            }

            for idx in indexes {
                let key = ScopeKey {
                    rule: rule.to_string(),
                    dir: scope_dir(&packages[idx], base_dir, cfg),
                };
                scopes.entry(key).or_default().push(idx);
            }
        }

        let resolutions: Vec<(&ScopeKey, ScopeResolution)> = stream::iter(scopes.keys())
            .map(|key| async move {
                let lock_files = cfg
                    .rules
                    .get(&key.rule)
                    .map(|rule_cfg| rule_cfg.lock_files.as_slice())
                    .unwrap_or_default();
                debug!("Resolving rule {:?} in scope {}", key.rule, key.dir.display());
                self.resolve_scope(&key.dir, lock_files)
                    .await
                    .map(|resolution| (key, resolution))
                    .map_err(|source| LockError::Resolve {
                        rule: key.rule.clone(),
                        source: Box::new(source),
                    })
            })
            .buffer_unordered(MAX_CONCURRENT_SCOPES)
            .try_collect()
            .await
            .inspect_err(|e| warn!("Lock resolution failed: {}", e))?;

        for (key, resolution) in resolutions {
            let rule_cfg = cfg.rules.get(&key.rule);
            for &idx in scopes.get(key).map(Vec::as_slice).unwrap_or_default() {
                let package = &packages[idx];
                let (version, status) = if !resolution.found_lock {
                    (NOT_AVAILABLE.to_string(), InstallStatus::LockMissing)
                } else if let Some(version) = resolution.installed.get(&package.name).filter(|v| !v.is_empty()) {
                    trace!("{} installed version is {}", package.name, version);
                    (version.clone(), InstallStatus::LockFound)
                } else {
                    trace!("{} not found in lock files", package.name);
                    (NOT_AVAILABLE.to_string(), InstallStatus::NotInLock)
                };

                if status != InstallStatus::LockFound {
                    self.note_latest_indicator(package, rule_cfg, &mut warned);
                }
                updates.push((idx, version, status));
            }
        }

        for (idx, version, status) in updates {
            packages[idx].set_installed(version, status);
        }

        for package in packages.iter_mut() {
            let status = final_status(package, self.constraints.as_ref());
            if status != package.install_status {
                debug!(
                    "{}: {} -> {} (declared {:?})",
                    package.name, package.install_status, status, package.version
                );
                package.install_status = status;
            }
        }

        *self
            .latest_warnings
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = warned;
        Ok(())
    }

    fn unlocked_status(
        &self,
        package: &Package,
        rule_cfg: &PackageManagerCfg,
        warned: &mut HashSet<String>,
    ) -> (String, InstallStatus) {
        let declared = package.version.trim();

        if !rule_cfg.self_pinning {
            self.note_latest_indicator(package, Some(rule_cfg), warned);
            return (NOT_AVAILABLE.to_string(), InstallStatus::NotConfigured);
        }

        if declared.is_empty() || declared == WILDCARD {
            trace!("{} has no pinned version", package.name);
            (NOT_AVAILABLE.to_string(), InstallStatus::VersionMissing)
        } else {
            trace!("{} self-pinned to {}", package.name, declared);
            (declared.to_string(), InstallStatus::SelfPinned)
        }
    }

    /// Warn once per `rule:name` within a call
    fn note_latest_indicator(
        &self,
        package: &Package,
        rule_cfg: Option<&PackageManagerCfg>,
        warned: &mut HashSet<String>,
    ) {
        if !self
            .latest
            .is_latest_indicator(&package.version, &package.name, rule_cfg)
        {
            return;
        }

        if warned.insert(format!("{}:{}", package.rule, package.name)) {
            warn!(
                "{} ({}) declares a latest version but no installed version could be resolved",
                package.name, package.rule
            );
        }
    }

    async fn resolve_scope(&self, dir: &Path, lock_files: &[LockFileCfg]) -> Result<ScopeResolution, LockError> {
        let mut resolution = ScopeResolution::default();

        for lock_cfg in lock_files.iter().filter(|c| !c.files.is_empty()) {
            let files = self
                .find_lock_files(dir, &lock_cfg.files)
                .await
                .map_err(|source| LockError::Find {
                    dir: dir.to_path_buf(),
                    source: Box::new(source),
                })?;
            if files.is_empty() {
                trace!("No files matched {:?} in {}", lock_cfg.files, dir.display());
                continue;
            }
            resolution.found_lock = true;

            for file in files {
                let versions = self
                    .extract_versions_from_lock(&file, Some(lock_cfg))
                    .await
                    .map_err(|source| LockError::Extract {
                        path: file.clone(),
                        source: Box::new(source),
                    })?;
                debug!("{}: {} packages", file.display(), versions.len());

                resolution
                    .installed
                    .extend(versions.into_iter().filter(|(_, version)| !version.is_empty()));
            }
        }

        debug!(
            "Scope {} resolved {} installed versions (lock found: {})",
            dir.display(),
            resolution.installed.len(),
            resolution.found_lock
        );
        Ok(resolution)
    }

    async fn find_lock_files(&self, dir: &Path, patterns: &[String]) -> Result<Vec<PathBuf>, LockError> {
        let finder = Arc::clone(&self.finder);
        let (search_dir, patterns) = (dir.to_path_buf(), patterns.to_vec());
        task::spawn_blocking(move || finder.find(&search_dir, &patterns))
            .await
            .map_err(|source| LockError::Task {
                dir: dir.to_path_buf(),
                source,
            })?
    }

    /// Name to version map for one lock file, read directly or through its command
    pub async fn extract_versions_from_lock(
        &self,
        path: &Path,
        cfg: Option<&LockFileCfg>,
    ) -> Result<IndexMap<String, String>, LockError> {
        let cfg = cfg.ok_or_else(|| LockError::MissingConfig {
            path: path.to_path_buf(),
        })?;

        if let Some(commands) = cfg.commands() {
            return self.extract_versions_from_command(path, commands, cfg).await;
        }

        let bytes = tokio::fs::read(path).await.map_err(|source| LockError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let content = String::from_utf8_lossy(&bytes);

        let Some(extraction) = cfg.extraction.as_ref().filter(|e| e.has_patterns()) else {
            return Err(LockError::MissingPattern {
                path: path.to_path_buf(),
            });
        };

        self.extractor
            .extract_versions(&content, extraction)
            .map_err(|source| LockError::Parse {
                file: file_name(path),
                source: Box::new(source),
            })
    }

    async fn extract_versions_from_command(
        &self,
        path: &Path,
        commands: &str,
        cfg: &LockFileCfg,
    ) -> Result<IndexMap<String, String>, LockError> {
        let base_dir = path.parent().unwrap_or(Path::new(".")).to_path_buf();
        let request = CommandRequest {
            commands: commands.to_string(),
            env: cfg.env.clone(),
            placeholders: HashMap::from([
                ("lock_file".to_string(), path.to_string_lossy().into_owned()),
                ("base_dir".to_string(), base_dir.to_string_lossy().into_owned()),
            ]),
            work_dir: base_dir,
            timeout: cfg.timeout(),
        };
        debug!("Running lock command for {}: {}", path.display(), commands);

        let decode = |output: &[u8]| {
            decode_with(&self.extractor, output, cfg.command_extraction.as_ref()).map_err(|source| {
                LockError::Parse {
                    file: file_name(path),
                    source: Box::new(source),
                }
            })
        };

        match self.runner.run(request).await {
            Ok(output) => decode(&output),
            Err(err) => {
                // some tools exit non-zero while still printing usable output
                if !err.output().is_empty()
                    && let Ok(versions) = decode(err.output())
                    && !versions.is_empty()
                {
                    warn!(
                        "Lock command for {} failed but its output had {} packages: {}",
                        path.display(),
                        versions.len(),
                        err
                    );
                    return Ok(versions);
                }
                Err(LockError::Command(err))
            }
        }
    }
}

fn scope_dir(package: &Package, base_dir: Option<&Path>, cfg: &Config) -> PathBuf {
    let from_source = package.source.as_deref().map(|source| match source.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    });

    from_source
        .or(base_dir.filter(|d| !d.as_os_str().is_empty()))
        .or(cfg.working_dir.as_deref().filter(|d| !d.as_os_str().is_empty()))
        .unwrap_or(Path::new("."))
        .to_path_buf()
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ExtractionCfg, LockCommandExtractionCfg};
    use crate::lock::command::{CommandError, MockCommandRunner};
    use crate::lock::finder::MockLockFileFinder;
    use std::fs;
    use tempfile::TempDir;

    const NPM_LOCK: &str = r#"{
  "lockfileVersion": 3,
  "packages": {
    "node_modules/lodash": { "version": "4.17.21" },
    "node_modules/express": { "version": "4.18.2" }
  }
}"#;

    fn npm_lock_cfg() -> LockFileCfg {
        LockFileCfg {
            files: vec!["package-lock.json".to_string()],
            format: Some("json".to_string()),
            extraction: Some(ExtractionCfg {
                pattern: Some(
                    r#""node_modules/(?P<name>[^"]+)":\s*\{\s*"version":\s*"(?P<version>[^"]+)""#.to_string(),
                ),
                patterns: Vec::new(),
            }),
            ..Default::default()
        }
    }

    fn config(rules: Vec<(&str, PackageManagerCfg)>) -> Config {
        Config {
            rules: rules
                .into_iter()
                .map(|(name, rule)| (name.to_string(), rule))
                .collect(),
            ..Default::default()
        }
    }

    fn npm_config() -> Config {
        config(vec![(
            "npm",
            PackageManagerCfg {
                lock_files: vec![npm_lock_cfg()],
                ..Default::default()
            },
        )])
    }

    fn command_config(commands: &str) -> Config {
        config(vec![(
            "npm",
            PackageManagerCfg {
                lock_files: vec![LockFileCfg {
                    files: vec!["package-lock.json".to_string()],
                    commands: Some(commands.to_string()),
                    ..Default::default()
                }],
                ..Default::default()
            },
        )])
    }

    fn finder_returning(files: Vec<PathBuf>) -> MockLockFileFinder {
        let mut finder = MockLockFileFinder::new();
        finder.expect_find().returning(move |_, _| Ok(files.clone()));
        finder
    }

    fn resolver(finder: MockLockFileFinder, runner: MockCommandRunner) -> LockResolver {
        LockResolver::new(Arc::new(finder), Arc::new(runner))
    }

    fn status_of(packages: &[Package], name: &str) -> (String, InstallStatus) {
        let package = packages.iter().find(|p| p.name == name).unwrap();
        (package.installed_version.clone(), package.install_status)
    }

    #[tokio::test]
    async fn lock_found_and_not_in_lock() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("package-lock.json"), NPM_LOCK).unwrap();

        let mut packages = vec![
            Package::new("lodash", "npm", "^4.17.0"),
            Package::new("left-pad", "npm", "1.0.0"),
        ];
        LockResolver::default()
            .apply_installed_versions(&mut packages, Some(&npm_config()), Some(dir.path()))
            .await
            .unwrap();

        assert_eq!(status_of(&packages, "lodash"), ("4.17.21".to_string(), InstallStatus::LockFound));
        assert_eq!(
            status_of(&packages, "left-pad"),
            (NOT_AVAILABLE.to_string(), InstallStatus::NotInLock)
        );
    }

    #[tokio::test]
    async fn lock_missing_when_no_files_found() {
        let mut packages = vec![Package::new("lodash", "npm", "4.17.21")];
        resolver(finder_returning(Vec::new()), MockCommandRunner::new())
            .apply_installed_versions(&mut packages, Some(&npm_config()), Some(Path::new("/project")))
            .await
            .unwrap();

        assert_eq!(
            status_of(&packages, "lodash"),
            (NOT_AVAILABLE.to_string(), InstallStatus::LockMissing)
        );
    }

    #[tokio::test]
    async fn not_configured_rule_without_lock_files() {
        let cfg = config(vec![("pip", PackageManagerCfg::default())]);
        let mut packages = vec![Package::new("requests", "pip", "2.31.0")];
        resolver(MockLockFileFinder::new(), MockCommandRunner::new())
            .apply_installed_versions(&mut packages, Some(&cfg), None)
            .await
            .unwrap();

        assert_eq!(
            status_of(&packages, "requests"),
            (NOT_AVAILABLE.to_string(), InstallStatus::NotConfigured)
        );
    }

    #[tokio::test]
    async fn self_pinning_rule() {
        let cfg = config(vec![(
            "pip",
            PackageManagerCfg {
                self_pinning: true,
                ..Default::default()
            },
        )]);
        let mut packages = vec![
            Package::new("requests", "pip", " 2.31.0 "),
            Package::new("flask", "pip", "*"),
            Package::new("django", "pip", ""),
        ];
        resolver(MockLockFileFinder::new(), MockCommandRunner::new())
            .apply_installed_versions(&mut packages, Some(&cfg), None)
            .await
            .unwrap();

        assert_eq!(status_of(&packages, "requests"), ("2.31.0".to_string(), InstallStatus::SelfPinned));
        assert_eq!(
            status_of(&packages, "flask"),
            (NOT_AVAILABLE.to_string(), InstallStatus::VersionMissing)
        );
        assert_eq!(
            status_of(&packages, "django"),
            (NOT_AVAILABLE.to_string(), InstallStatus::VersionMissing)
        );
    }

    #[tokio::test]
    async fn unknown_rule_is_left_alone() {
        let mut packages = vec![Package::new("serde", "cargo", "1.0")];
        resolver(MockLockFileFinder::new(), MockCommandRunner::new())
            .apply_installed_versions(&mut packages, Some(&npm_config()), None)
            .await
            .unwrap();

        assert_eq!(
            status_of(&packages, "serde"),
            (NOT_AVAILABLE.to_string(), InstallStatus::NotConfigured)
        );
    }

    #[tokio::test]
    async fn final_passes_override_lock_status() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("package-lock.json"), NPM_LOCK).unwrap();

        let mut packages = vec![
            Package::new("lodash", "npm", "4.*"),
            Package::new("express", "npm", "4.18.2").with_ignore_reason("held back"),
            Package::new("chalk", "npm", "*"),
            Package::new("left-pad", "npm", "*").with_ignore_reason("unused"),
        ];
        LockResolver::default()
            .apply_installed_versions(&mut packages, Some(&npm_config()), Some(dir.path()))
            .await
            .unwrap();

        assert_eq!(status_of(&packages, "lodash"), ("4.17.21".to_string(), InstallStatus::Floating));
        assert_eq!(status_of(&packages, "express"), ("4.18.2".to_string(), InstallStatus::Ignored));
        assert_eq!(
            status_of(&packages, "chalk"),
            (NOT_AVAILABLE.to_string(), InstallStatus::VersionMissing)
        );
        assert_eq!(status_of(&packages, "left-pad").1, InstallStatus::Ignored);
    }

    #[tokio::test]
    async fn scopes_follow_manifest_directories() {
        let dir = TempDir::new().unwrap();
        for (sub, version) in [("a", "1.0.0"), ("b", "2.0.0")] {
            let scope = dir.path().join(sub);
            fs::create_dir_all(&scope).unwrap();
            fs::write(
                scope.join("package-lock.json"),
                format!(r#"{{"packages": {{"node_modules/lodash": {{ "version": "{version}" }}}}}}"#),
            )
            .unwrap();
        }

        let mut packages = vec![
            Package::new("lodash", "npm", "^1.0.0").with_source(dir.path().join("a/package.json")),
            Package::new("lodash", "npm", "^2.0.0").with_source(dir.path().join("b/package.json")),
        ];
        LockResolver::default()
            .apply_installed_versions(&mut packages, Some(&npm_config()), None)
            .await
            .unwrap();

        assert_eq!(packages[0].installed_version, "1.0.0");
        assert_eq!(packages[1].installed_version, "2.0.0");
    }

    #[tokio::test]
    async fn later_lock_files_overwrite_earlier() {
        let dir = TempDir::new().unwrap();
        let first = dir.path().join("first.lock");
        let second = dir.path().join("second.lock");
        fs::write(&first, r#""node_modules/lodash": { "version": "1.0.0" }"#).unwrap();
        fs::write(&second, r#""node_modules/lodash": { "version": "2.0.0" }"#).unwrap();

        let mut packages = vec![Package::new("lodash", "npm", "^1.0.0")];
        resolver(finder_returning(vec![first, second]), MockCommandRunner::new())
            .apply_installed_versions(&mut packages, Some(&npm_config()), Some(dir.path()))
            .await
            .unwrap();

        assert_eq!(packages[0].installed_version, "2.0.0");
    }

    #[tokio::test]
    async fn command_output_is_decoded() {
        let mut runner = MockCommandRunner::new();
        runner
            .expect_run()
            .withf(|request| {
                request.placeholders.get("lock_file").map(String::as_str) == Some("/project/package-lock.json")
                    && request.work_dir == Path::new("/project")
            })
            .times(1)
            .returning(|_| Ok(br#"{"lodash": "4.17.21"}"#.to_vec()));

        let mut packages = vec![Package::new("lodash", "npm", "^4.0.0")];
        resolver(finder_returning(vec![PathBuf::from("/project/package-lock.json")]), runner)
            .apply_installed_versions(&mut packages, Some(&command_config("npm ls --json")), None)
            .await
            .unwrap();

        assert_eq!(status_of(&packages, "lodash"), ("4.17.21".to_string(), InstallStatus::LockFound));
    }

    #[tokio::test]
    async fn failed_command_with_usable_output_is_soft_failure() {
        let mut runner = MockCommandRunner::new();
        runner.expect_run().returning(|_| {
            Err(CommandError::Failed {
                status: "exit status: 1".to_string(),
                stderr: "missing peer".to_string(),
                stdout: br#"{"dependencies": {"lodash": {"version": "4.17.21"}}}"#.to_vec(),
            })
        });

        let mut packages = vec![Package::new("lodash", "npm", "^4.0.0")];
        resolver(finder_returning(vec![PathBuf::from("/p/package-lock.json")]), runner)
            .apply_installed_versions(&mut packages, Some(&command_config("npm ls --json")), None)
            .await
            .unwrap();

        assert_eq!(packages[0].installed_version, "4.17.21");
    }

    #[tokio::test]
    async fn failed_command_without_output_aborts_and_leaves_packages() {
        let mut runner = MockCommandRunner::new();
        runner.expect_run().returning(|_| Err(CommandError::TimedOut(60)));

        let mut packages = vec![Package::new("lodash", "npm", "4.*")];
        let err = resolver(finder_returning(vec![PathBuf::from("/p/package-lock.json")]), runner)
            .apply_installed_versions(&mut packages, Some(&command_config("npm ls --json")), None)
            .await
            .unwrap_err();

        let message = err.to_string();
        assert!(message.contains("npm"), "{message}");
        assert!(matches!(err, LockError::Resolve { .. }));
        assert_eq!(packages[0].install_status, InstallStatus::NotConfigured);
    }

    #[tokio::test]
    async fn finder_errors_are_wrapped_with_rule() {
        let mut finder = MockLockFileFinder::new();
        finder.expect_find().returning(|dir, _| {
            Err(LockError::Io {
                path: dir.to_path_buf(),
                source: std::io::Error::from(std::io::ErrorKind::PermissionDenied),
            })
        });

        let mut packages = vec![Package::new("lodash", "npm", "1.0.0")];
        let err = resolver(finder, MockCommandRunner::new())
            .apply_installed_versions(&mut packages, Some(&npm_config()), Some(Path::new("/p")))
            .await
            .unwrap_err();

        let LockError::Resolve { rule, source } = err else {
            panic!("expected Resolve error");
        };
        assert_eq!(rule, "npm");
        assert!(matches!(*source, LockError::Find { .. }));
    }

    #[tokio::test]
    async fn latest_indicator_is_reported_once_per_package() {
        let mut packages = vec![
            Package::new("lodash", "npm", "*"),
            Package::new("lodash", "npm", "*").with_source("/other/package.json"),
            Package::new("express", "npm", "4.18.2"),
        ];
        let resolver = resolver(finder_returning(Vec::new()), MockCommandRunner::new());
        resolver
            .apply_installed_versions(&mut packages, Some(&npm_config()), Some(Path::new("/p")))
            .await
            .unwrap();

        assert_eq!(resolver.latest_warnings(), vec!["npm:lodash".to_string()]);
    }

    #[tokio::test]
    async fn latest_warnings_reflect_the_latest_call() {
        let resolver = resolver(finder_returning(Vec::new()), MockCommandRunner::new());

        let mut first = vec![Package::new("lodash", "npm", "*")];
        resolver
            .apply_installed_versions(&mut first, Some(&npm_config()), Some(Path::new("/p")))
            .await
            .unwrap();
        assert_eq!(resolver.latest_warnings(), vec!["npm:lodash".to_string()]);

        let mut second = vec![
            Package::new("lodash", "npm", "*"),
            Package::new("express", "npm", "*"),
        ];
        resolver
            .apply_installed_versions(&mut second, Some(&npm_config()), Some(Path::new("/p")))
            .await
            .unwrap();
        assert_eq!(
            resolver.latest_warnings(),
            vec!["npm:express".to_string(), "npm:lodash".to_string()]
        );

        let mut pinned = vec![Package::new("lodash", "npm", "4.17.21")];
        resolver
            .apply_installed_versions(&mut pinned, Some(&npm_config()), Some(Path::new("/p")))
            .await
            .unwrap();
        assert!(resolver.latest_warnings().is_empty());
    }

    #[tokio::test]
    async fn lock_file_with_invalid_utf8_is_still_extracted() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("deps.lock"), b"# comment caf\xe9\nlodash 4.17.21\n").unwrap();

        let cfg = config(vec![(
            "raw",
            PackageManagerCfg {
                lock_files: vec![LockFileCfg {
                    files: vec!["deps.lock".to_string()],
                    extraction: Some(ExtractionCfg {
                        pattern: Some(r"(?m)^(?P<name>[a-z]+) (?P<version>[\d.]+)$".to_string()),
                        patterns: Vec::new(),
                    }),
                    ..Default::default()
                }],
                ..Default::default()
            },
        )]);
        let mut packages = vec![Package::new("lodash", "raw", "4.17.21")];
        LockResolver::default()
            .apply_installed_versions(&mut packages, Some(&cfg), Some(dir.path()))
            .await
            .unwrap();

        assert_eq!(status_of(&packages, "lodash"), ("4.17.21".to_string(), InstallStatus::LockFound));
    }

    #[tokio::test]
    async fn extract_versions_from_lock_requires_config_and_pattern() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("package-lock.json");
        fs::write(&path, NPM_LOCK).unwrap();
        let resolver = LockResolver::default();

        assert!(matches!(
            resolver.extract_versions_from_lock(&path, None).await,
            Err(LockError::MissingConfig { .. })
        ));

        let no_pattern = LockFileCfg {
            files: vec!["package-lock.json".to_string()],
            ..Default::default()
        };
        assert!(matches!(
            resolver.extract_versions_from_lock(&path, Some(&no_pattern)).await,
            Err(LockError::MissingPattern { .. })
        ));

        let missing = dir.path().join("missing.json");
        assert!(matches!(
            resolver.extract_versions_from_lock(&missing, Some(&npm_lock_cfg())).await,
            Err(LockError::Io { .. })
        ));
    }

    #[tokio::test]
    async fn extract_versions_from_lock_names_file_on_bad_pattern() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("go.sum");
        fs::write(&path, "golang.org/x/mod v0.14.0 h1:abc=").unwrap();

        let cfg = LockFileCfg {
            files: vec!["go.sum".to_string()],
            extraction: Some(ExtractionCfg {
                pattern: Some("(?P<name>".to_string()),
                patterns: Vec::new(),
            }),
            ..Default::default()
        };
        let err = LockResolver::default()
            .extract_versions_from_lock(&path, Some(&cfg))
            .await
            .unwrap_err();
        assert!(matches!(&err, LockError::Parse { file, .. } if file == "go.sum"));
    }

    #[tokio::test]
    async fn extract_versions_from_command_uses_raw_format() {
        let mut runner = MockCommandRunner::new();
        runner
            .expect_run()
            .returning(|_| Ok(b"lodash 4.17.21\nexpress 4.18.2\n".to_vec()));

        let cfg = LockFileCfg {
            files: vec!["package-lock.json".to_string()],
            commands: Some("npm ls --parseable".to_string()),
            command_extraction: Some(LockCommandExtractionCfg {
                format: Some("raw".to_string()),
                pattern: Some(r"(?m)^(?P<name>\S+)\s+(?P<version>\S+)$".to_string()),
                ..Default::default()
            }),
            ..Default::default()
        };
        let versions = resolver(MockLockFileFinder::new(), runner)
            .extract_versions_from_lock(Path::new("/p/package-lock.json"), Some(&cfg))
            .await
            .unwrap();
        assert_eq!(versions.get("express").map(String::as_str), Some("4.18.2"));
        assert_eq!(versions.len(), 2);
    }

    #[test]
    fn scope_dir_precedence() {
        let cfg = Config {
            working_dir: Some(PathBuf::from("/work")),
            ..Default::default()
        };
        let with_source = Package::new("a", "npm", "1").with_source("/repo/app/package.json");
        let bare_source = Package::new("a", "npm", "1").with_source("package.json");
        let without_source = Package::new("a", "npm", "1");

        assert_eq!(scope_dir(&with_source, Some(Path::new("/base")), &cfg), PathBuf::from("/repo/app"));
        assert_eq!(scope_dir(&bare_source, Some(Path::new("/base")), &cfg), PathBuf::from("."));
        assert_eq!(scope_dir(&without_source, Some(Path::new("/base")), &cfg), PathBuf::from("/base"));
        assert_eq!(scope_dir(&without_source, None, &cfg), PathBuf::from("/work"));
        assert_eq!(scope_dir(&without_source, None, &Config::default()), PathBuf::from("."));
    }
}
