//! Pipeline orchestration
//!
//! Runs the stages in order over the files of one root folder:
//!
//! ```text
//! artists.csv + tracks.csv --clean--> music_clean.csv
//! music_clean.csv --build--> spotify_mood_dataset.csv + music_clean.csv (small)
//! music_clean.csv --train--> scaler, index, indexed tracks, manifest
//! ```

use mtune_common::config::PipelineConfig;
use mtune_common::{ArtifactManifest, ArtifactPaths, Result};
use std::time::Instant;
use tracing::info;

use crate::services::{BuildSummary, CleanSummary, DatasetBuilder, DatasetCleaner, IndexBuilder, IndexSummary};

/// Stage outputs of a full run
#[derive(Debug, Clone)]
pub struct PipelineReport {
    pub clean: CleanSummary,
    pub build: BuildSummary,
    pub index: IndexSummary,
    pub manifest: ArtifactManifest,
}

/// The three stages bound to one root folder
#[derive(Debug, Clone)]
pub struct Pipeline {
    paths: ArtifactPaths,
    cleaner: DatasetCleaner,
    builder: DatasetBuilder,
    indexer: IndexBuilder,
}

impl Pipeline {
    pub fn new(paths: ArtifactPaths, config: &PipelineConfig) -> Self {
        Self {
            paths,
            cleaner: DatasetCleaner::new(config.chunk_size),
            builder: DatasetBuilder::new(),
            indexer: IndexBuilder::new(config.neighbor_cap),
        }
    }

    pub fn paths(&self) -> &ArtifactPaths {
        &self.paths
    }

    pub fn clean(&self) -> Result<CleanSummary> {
        let started = Instant::now();
        info!(chunk_size = self.cleaner.chunk_size(), "Cleaning raw catalog");
        let summary = self.cleaner.clean(
            &self.paths.raw_artists(),
            &self.paths.raw_tracks(),
            &self.paths.clean_table(),
        )?;
        info!(elapsed_ms = started.elapsed().as_millis() as u64, "Clean stage finished");
        Ok(summary)
    }

    /// The small projection replaces the cleaned table in place
    pub fn build(&self) -> Result<BuildSummary> {
        let started = Instant::now();
        let summary = self.builder.build(
            &self.paths.clean_table(),
            &self.paths.mood_table(),
            &self.paths.clean_table(),
        )?;
        info!(elapsed_ms = started.elapsed().as_millis() as u64, "Build stage finished");
        Ok(summary)
    }

    pub fn train(&self) -> Result<(ArtifactManifest, IndexSummary)> {
        let started = Instant::now();
        let result = self.indexer.train(&self.paths)?;
        info!(elapsed_ms = started.elapsed().as_millis() as u64, "Train stage finished");
        Ok(result)
    }

    pub fn run_all(&self) -> Result<PipelineReport> {
        let clean = self.clean()?;
        let build = self.build()?;
        let (manifest, index) = self.train()?;
        Ok(PipelineReport {
            clean,
            build,
            index,
            manifest,
        })
    }
}
