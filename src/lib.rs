//! Package a web extension source directory into an `.xpi` archive and,
//! optionally, rebuild it whenever a source file changes.
//!
//! The pieces, leaf first:
//!
//! - [`glob`] / [`filter`]: which files belong in the archive
//! - [`manifest`]: name, version and add-on id from `manifest.json`
//! - [`archive`]: directory to zip bytes
//! - [`packager`]: one packaging pass, written to `<name>-<version>.xpi`
//! - [`watcher`]: debounced change notifications that ignore our own output
//! - [`build`]: one pass, then an optional watch session that repeats it

pub mod archive;
pub mod build;
pub mod config;
pub mod error;
pub mod filter;
pub mod glob;
pub mod manifest;
pub mod packager;
pub mod watcher;

pub use build::{BuildOutcome, build};
pub use config::BuildConfig;
pub use error::{BuildError, ManifestError, Result};
pub use filter::FileFilter;
pub use manifest::ManifestInfo;
pub use packager::{Packager, PackagingResult};
pub use watcher::{WatchOptions, WatchSession, watch_source};
