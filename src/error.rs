//! Error types for packaging and watching.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while resolving `manifest.json`.
#[derive(Error, Debug)]
pub enum ManifestError {
    /// No manifest file in the source directory.
    #[error("could not find {}", path.display())]
    NotFound { path: PathBuf },

    /// The manifest exists but could not be read.
    #[error("could not read manifest at {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The manifest is not valid JSON.
    #[error("error parsing manifest.json at {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// One or more required properties are absent.
    #[error(
        "manifest at {} is missing required properties: {}",
        path.display(),
        missing.join(", ")
    )]
    MissingProperties { path: PathBuf, missing: Vec<String> },
}

/// Errors that abort a packaging pass or prevent a watch from starting.
#[derive(Error, Debug)]
pub enum BuildError {
    #[error(transparent)]
    Manifest(#[from] ManifestError),

    /// Filesystem failure while preparing directories, reading sources or
    /// writing the artifact.
    #[error("{context} {}: {source}", path.display())]
    Io {
        context: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("archive error: {0}")]
    Archive(#[from] zip::result::ZipError),

    #[error("watch error: {0}")]
    Watch(#[from] notify::Error),

    /// A blocking packaging step panicked or was cancelled.
    #[error("packaging task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl BuildError {
    pub(crate) fn io(
        context: &'static str,
        path: impl Into<PathBuf>,
        source: std::io::Error,
    ) -> Self {
        Self::Io {
            context,
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, BuildError>;
