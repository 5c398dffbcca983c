use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use futures::future::BoxFuture;
use serde::Deserialize;
use tracing::warn;

use crate::error::Result;
use crate::filter::FileFilter;
use crate::manifest::ManifestInfo;
use crate::packager::PackagingResult;
use crate::watcher::{OnChange, WatchOptions, WatchSession, watch_source};

/// Project config file looked up in the source directory.
pub const PROJECT_CONFIG_FILE: &str = "webext-pack.toml";

/// Artifacts directory name used when none is configured.
pub const DEFAULT_ARTIFACTS_DIR: &str = "web-ext-artifacts";

/// Runs one packaging pass. Replaces the default [`crate::packager::Packager`].
pub type CreatePackage = Arc<dyn Fn() -> BoxFuture<'static, Result<PackagingResult>> + Send + Sync>;

/// Starts watching for source changes. Replaces the default [`watch_source`].
pub type SourceWatcher = Arc<dyn Fn(WatchOptions, OnChange) -> Result<WatchSession> + Send + Sync>;

/// Everything a build needs. Defaults are filled in by [`BuildConfig::new`]:
///
/// - `artifacts_dir`: `<source_dir>/web-ext-artifacts`
/// - `watch`: `false`
/// - `manifest_data`: `None` (read `manifest.json` on every pass)
/// - `file_filter`: [`FileFilter::default`]
/// - `on_source_change`: [`watch_source`]
/// - `create_package`: `None` (a `Packager` built from the fields above)
#[derive(Clone)]
pub struct BuildConfig {
    pub source_dir: PathBuf,
    pub artifacts_dir: PathBuf,
    /// Keep rebuilding whenever a source file changes.
    pub watch: bool,
    pub manifest_data: Option<ManifestInfo>,
    pub file_filter: FileFilter,
    pub on_source_change: SourceWatcher,
    pub create_package: Option<CreatePackage>,
}

impl BuildConfig {
    pub fn new(source_dir: impl Into<PathBuf>) -> Self {
        let source_dir = source_dir.into();
        Self {
            artifacts_dir: source_dir.join(DEFAULT_ARTIFACTS_DIR),
            source_dir,
            watch: false,
            manifest_data: None,
            file_filter: FileFilter::default(),
            on_source_change: Arc::new(watch_source),
            create_package: None,
        }
    }

    pub fn with_artifacts_dir(mut self, artifacts_dir: impl Into<PathBuf>) -> Self {
        self.artifacts_dir = artifacts_dir.into();
        self
    }

    pub fn watch(mut self, watch: bool) -> Self {
        self.watch = watch;
        self
    }

    pub fn with_manifest_data(mut self, manifest: ManifestInfo) -> Self {
        self.manifest_data = Some(manifest);
        self
    }

    pub fn with_file_filter(mut self, filter: FileFilter) -> Self {
        self.file_filter = filter;
        self
    }

    pub fn with_source_watcher(mut self, watcher: SourceWatcher) -> Self {
        self.on_source_change = watcher;
        self
    }

    pub fn with_create_package(mut self, create_package: CreatePackage) -> Self {
        self.create_package = Some(create_package);
        self
    }
}

impl fmt::Debug for BuildConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BuildConfig")
            .field("source_dir", &self.source_dir)
            .field("artifacts_dir", &self.artifacts_dir)
            .field("watch", &self.watch)
            .field("manifest_data", &self.manifest_data)
            .field("file_filter", &self.file_filter)
            .field("create_package", &self.create_package.is_some())
            .finish_non_exhaustive()
    }
}

/// Configuration loaded from `webext-pack.toml` in the source directory.
#[derive(Debug, Deserialize, Default, PartialEq, Eq)]
pub struct ProjectConfig {
    /// Artifacts directory, relative to the source directory unless absolute.
    pub artifacts_dir: Option<PathBuf>,
    /// Ignore patterns replacing the default list.
    pub ignore_files: Option<Vec<String>>,
}

impl ProjectConfig {
    /// Load `webext-pack.toml` from `source_dir`.
    ///
    /// Returns a default (empty) configuration if the file does not exist or cannot be parsed.
    pub fn load(source_dir: &Path) -> Self {
        let config_path = source_dir.join(PROJECT_CONFIG_FILE);

        if !config_path.exists() {
            return Self::default();
        }

        match std::fs::read_to_string(&config_path) {
            Ok(contents) => match toml::from_str::<Self>(&contents) {
                Ok(config) => config,
                Err(err) => {
                    warn!("failed to parse {PROJECT_CONFIG_FILE}: {err}. Using defaults.");
                    Self::default()
                }
            },
            Err(err) => {
                warn!("failed to read {PROJECT_CONFIG_FILE}: {err}. Using defaults.");
                Self::default()
            }
        }
    }

    /// Artifacts directory resolved against `source_dir`.
    pub fn artifacts_dir_in(&self, source_dir: &Path) -> Option<PathBuf> {
        self.artifacts_dir.as_ref().map(|dir| source_dir.join(dir))
    }
}
