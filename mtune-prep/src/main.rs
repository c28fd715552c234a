//! mtune-prep - Offline catalog pipeline
//!
//! Cleans the raw catalog, builds the mood-tagged tables and fits the
//! neighbor index consumed by mtune-rec. Stages run one at a time; `all`
//! (the default) runs them in order.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use mtune_common::config::{LoggingConfig, RootFolderResolver, TomlConfig};
use mtune_common::ArtifactPaths;
use mtune_prep::Pipeline;
use std::fs::OpenOptions;
use std::path::PathBuf;
use std::sync::Mutex;
use tracing::info;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Command-line arguments for mtune-prep
#[derive(Parser, Debug)]
#[command(name = "mtune-prep")]
#[command(about = "Offline catalog cleaning, mood tagging and index building")]
#[command(version)]
struct Args {
    /// Root folder holding data/ and models/
    #[arg(long, global = true)]
    root: Option<PathBuf>,

    /// Config file (overrides MTUNE_CONFIG and the default locations)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Track rows per chunk in the clean stage
    #[arg(long, global = true)]
    chunk_size: Option<usize>,

    /// Neighbor cap of the fitted index
    #[arg(long, global = true)]
    neighbor_cap: Option<usize>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    /// Join raw tracks with artists into data/music_clean.csv
    Clean,
    /// Deduplicate, tag moods and write the full and small tables
    Build,
    /// Fit scaler and neighbor index, write models/
    Train,
    /// Run clean, build and train in order
    All,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = TomlConfig::load(args.config.as_deref()).context("Failed to load configuration")?;
    if let Some(chunk_size) = args.chunk_size {
        if chunk_size == 0 {
            bail!("--chunk-size must be at least 1");
        }
        config.pipeline.chunk_size = chunk_size;
    }
    if let Some(neighbor_cap) = args.neighbor_cap {
        if neighbor_cap < 2 {
            bail!("--neighbor-cap must be at least 2");
        }
        config.pipeline.neighbor_cap = neighbor_cap;
    }

    init_tracing(&config.logging)?;

    info!(
        "Starting mtune-prep v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    let root_folder = RootFolderResolver::new()
        .with_cli_arg(args.root)
        .with_toml(&config)
        .resolve();
    info!("Root folder: {}", root_folder.display());

    let pipeline = Pipeline::new(ArtifactPaths::new(root_folder), &config.pipeline);

    match args.command.unwrap_or(Command::All) {
        Command::Clean => {
            pipeline.clean().context("Clean stage failed")?;
        }
        Command::Build => {
            pipeline.build().context("Build stage failed")?;
        }
        Command::Train => {
            let (manifest, _) = pipeline.train().context("Train stage failed")?;
            info!(build_id = %manifest.build_id, rows = manifest.row_count, "Index ready");
        }
        Command::All => {
            let report = pipeline.run_all().context("Pipeline failed")?;
            info!(
                tracks_read = report.clean.rows_read,
                tracks_tagged = report.build.rows_out,
                tracks_indexed = report.index.rows_indexed,
                build_id = %report.manifest.build_id,
                "Pipeline complete"
            );
        }
    }

    Ok(())
}

/// Stderr logging, plus the configured log file when set
///
/// `RUST_LOG` overrides the configured level.
fn init_tracing(logging: &LoggingConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));

    let file_layer = match &logging.file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file {}", path.display()))?;
            Some(fmt::layer().with_writer(Mutex::new(file)).with_ansi(false))
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(file_layer)
        .init();
    Ok(())
}
