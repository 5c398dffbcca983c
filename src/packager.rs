use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};

use regex::Regex;
use serde::Serialize;
use tracing::{debug, info};

use crate::archive::archive_directory;
use crate::error::{BuildError, Result};
use crate::filter::FileFilter;
use crate::manifest::{ManifestInfo, resolve_manifest};

/// Extension given to every artifact.
pub const ARTIFACT_EXTENSION: &str = "xpi";

/// Outcome of one packaging pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PackagingResult {
    pub artifact_path: PathBuf,
}

/// Produces `.xpi` artifacts from a source directory.
///
/// Every call to [`Packager::produce_artifact`] is an independent pass: the
/// manifest is re-read (unless injected), the tree is re-archived and the
/// artifact is rewritten. Nothing is cached between passes.
#[derive(Debug, Clone)]
pub struct Packager {
    source_dir: PathBuf,
    artifacts_dir: PathBuf,
    manifest_data: Option<ManifestInfo>,
    file_filter: Arc<FileFilter>,
}

impl Packager {
    pub fn new(source_dir: impl Into<PathBuf>, artifacts_dir: impl Into<PathBuf>) -> Self {
        Self {
            source_dir: source_dir.into(),
            artifacts_dir: artifacts_dir.into(),
            manifest_data: None,
            file_filter: Arc::new(FileFilter::default()),
        }
    }

    /// Use this manifest instead of reading `manifest.json`.
    pub fn with_manifest_data(mut self, manifest: ManifestInfo) -> Self {
        self.manifest_data = Some(manifest);
        self
    }

    pub fn with_file_filter(mut self, filter: FileFilter) -> Self {
        self.file_filter = Arc::new(filter);
        self
    }

    pub fn source_dir(&self) -> &Path {
        &self.source_dir
    }

    pub fn artifacts_dir(&self) -> &Path {
        &self.artifacts_dir
    }

    /// Run one packaging pass.
    ///
    /// Steps: resolve the manifest, ensure the artifacts directory, archive
    /// the wanted files, then write `<name>-<version>.xpi` over any previous
    /// artifact. The first failing step aborts the pass.
    pub async fn produce_artifact(&self) -> Result<PackagingResult> {
        let manifest = self.resolve_manifest().await?;

        prepare_artifacts_dir(&self.artifacts_dir).await?;

        let source_dir = self.source_dir.clone();
        let filter = Arc::clone(&self.file_filter);
        let buffer = tokio::task::spawn_blocking(move || {
            archive_directory(&source_dir, move |rel| filter.want_file(rel))
        })
        .await??;

        let package_name = safe_file_name(&format!(
            "{}-{}.{ARTIFACT_EXTENSION}",
            manifest.name, manifest.version
        ));
        let artifact_path = write_artifact(&self.artifacts_dir, &package_name, buffer).await?;

        info!("Your web extension is ready: {}", artifact_path.display());
        Ok(PackagingResult { artifact_path })
    }

    async fn resolve_manifest(&self) -> Result<ManifestInfo> {
        match &self.manifest_data {
            Some(manifest) => {
                debug!("Using manifest id={}", manifest.application_id);
                Ok(manifest.clone())
            }
            None => Ok(resolve_manifest(&self.source_dir).await?),
        }
    }
}

/// Create the artifacts directory (and parents) if it does not exist yet.
pub async fn prepare_artifacts_dir(artifacts_dir: &Path) -> Result<()> {
    tokio::fs::create_dir_all(artifacts_dir)
        .await
        .map_err(|e| BuildError::io("failed to create artifacts directory", artifacts_dir, e))
}

/// Lower-case `name` and collapse every run of characters outside
/// `[a-z0-9.-]` into a single `_`.
pub fn safe_file_name(name: &str) -> String {
    static UNSAFE_RUN: OnceLock<Regex> = OnceLock::new();
    let re = UNSAFE_RUN.get_or_init(|| Regex::new(r"[^a-z0-9.\-]+").expect("valid regex"));
    re.replace_all(&name.to_lowercase(), "_").into_owned()
}

/// Write `bytes` to `dir/file_name`, replacing any existing file.
///
/// The bytes go to a temp file in the same directory which is flushed,
/// synced and closed before being renamed over the target.
async fn write_artifact(dir: &Path, file_name: &str, bytes: Vec<u8>) -> Result<PathBuf> {
    let dir = dir.to_path_buf();
    let target = dir.join(file_name);

    tokio::task::spawn_blocking(move || {
        let mut tmp = tempfile::NamedTempFile::new_in(&dir)
            .map_err(|e| BuildError::io("failed to create temp file in", &dir, e))?;
        tmp.write_all(&bytes)
            .and_then(|()| tmp.flush())
            .and_then(|()| tmp.as_file().sync_all())
            .map_err(|e| BuildError::io("failed to write artifact", &target, e))?;
        tmp.persist(&target)
            .map_err(|e| BuildError::io("failed to write artifact", &target, e.error))?;
        Ok(target)
    })
    .await?
}
