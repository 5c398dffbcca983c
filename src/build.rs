use std::sync::Arc;

use futures::FutureExt;
use tracing::info;

use crate::config::{BuildConfig, CreatePackage};
use crate::error::Result;
use crate::packager::{Packager, PackagingResult, prepare_artifacts_dir};
use crate::watcher::{OnChange, WatchOptions, WatchSession};

/// Result of [`build`]: the first artifact, plus the watch session in watch mode.
pub struct BuildOutcome {
    pub result: PackagingResult,
    /// `Some` when `config.watch` is set. Dropping it stops the watch.
    pub session: Option<WatchSession>,
}

/// Package the extension once and, in watch mode, keep rebuilding on change.
///
/// A failure in the first pass is returned to the caller. In watch mode this
/// returns as soon as the first pass succeeds; later rebuilds run on the
/// returned session and their failures are only logged.
pub async fn build(config: BuildConfig) -> Result<BuildOutcome> {
    info!("Building web extension from {}", config.source_dir.display());

    let create_package = match &config.create_package {
        Some(create_package) => Arc::clone(create_package),
        None => default_create_package(&config),
    };

    prepare_artifacts_dir(&config.artifacts_dir).await?;
    let result = create_package().await?;

    if !config.watch {
        return Ok(BuildOutcome {
            result,
            session: None,
        });
    }

    info!("Rebuilding when files change...");
    let on_change: OnChange = Arc::new(move || {
        let create_package = Arc::clone(&create_package);
        async move { create_package().await.map(|_| ()) }.boxed()
    });
    let options = WatchOptions::new(&config.source_dir, &config.artifacts_dir);
    let session = (config.on_source_change)(options, on_change)?;

    Ok(BuildOutcome {
        result,
        session: Some(session),
    })
}

fn default_create_package(config: &BuildConfig) -> CreatePackage {
    let mut packager = Packager::new(&config.source_dir, &config.artifacts_dir)
        .with_file_filter(config.file_filter.clone());
    if let Some(manifest) = &config.manifest_data {
        packager = packager.with_manifest_data(manifest.clone());
    }

    let packager = Arc::new(packager);
    Arc::new(move || {
        let packager = Arc::clone(&packager);
        async move { packager.produce_artifact().await }.boxed()
    })
}
