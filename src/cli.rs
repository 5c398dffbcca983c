use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Package a web extension into an installable .xpi archive.
///
/// webext-pack zips your extension's source directory, skipping archives and
/// hidden files, and names the result after the manifest's name and version.
#[derive(Parser, Debug)]
#[command(
    name = "webext-pack",
    version,
    about,
    long_about = None,
    propagate_version = true,
)]
pub struct Cli {
    /// Log debug output (overridden by RUST_LOG).
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create an extension package from source.
    ///
    /// The package is written to `<artifacts-dir>/<name>-<version>.xpi`, where
    /// name and version come from manifest.json.
    Build {
        /// Web extension source directory.
        #[arg(short, long, default_value = ".")]
        source_dir: PathBuf,

        /// Directory where artifacts are saved.
        /// Defaults to `artifacts_dir` from webext-pack.toml, then `<source-dir>/web-ext-artifacts`.
        #[arg(short, long)]
        artifacts_dir: Option<PathBuf>,

        /// Watch for file changes and rebuild as needed.
        #[arg(long)]
        as_needed: bool,

        /// Glob patterns of files to leave out of the package (repeatable).
        /// Replaces the default list (`**/*.xpi`, `**/*.zip`, `**/.*`).
        #[arg(short, long = "ignore-files", value_name = "PATTERN", num_args = 1..)]
        ignore_files: Vec<String>,
    },
}
