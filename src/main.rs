mod cli;

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use cli::{Cli, Commands};
use webext_pack::config::{BuildConfig, ProjectConfig};
use webext_pack::filter::FileFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose)?;

    match cli.command {
        Commands::Build {
            source_dir,
            artifacts_dir,
            as_needed,
            ignore_files,
        } => run_build(source_dir, artifacts_dir, as_needed, ignore_files).await,
    }
}

/// Log to stderr. `RUST_LOG` wins over `--verbose` when set.
fn init_logging(verbose: bool) -> Result<()> {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(format!("webext_pack={default_level}")))?;

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false),
        )
        .with(filter)
        .init();
    Ok(())
}

async fn run_build(
    source_dir: PathBuf,
    artifacts_dir: Option<PathBuf>,
    as_needed: bool,
    ignore_files: Vec<String>,
) -> Result<()> {
    let project = ProjectConfig::load(&source_dir);

    let mut config = BuildConfig::new(&source_dir).watch(as_needed);
    if let Some(dir) = artifacts_dir.or_else(|| project.artifacts_dir_in(&source_dir)) {
        config = config.with_artifacts_dir(dir);
    }
    if !ignore_files.is_empty() {
        config = config.with_file_filter(FileFilter::new(&ignore_files));
    } else if let Some(patterns) = &project.ignore_files {
        config = config.with_file_filter(FileFilter::new(patterns));
    }

    let outcome = webext_pack::build::build(config).await?;
    println!("{}", outcome.result.artifact_path.display());

    if let Some(session) = outcome.session {
        session.close_on_interrupt();
        session.wait().await;
    }
    Ok(())
}
