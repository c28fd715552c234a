//! Persisted index artifact set
//!
//! The scaler, the neighbor index and the indexed tracks table are only valid
//! together. Each save stamps all of them with one build id, and the manifest
//! is written last as the commit marker:
//!
//! 1. Remove the previous manifest (an interrupted save leaves no manifest)
//! 2. Write scaler, index and indexed tracks (temp file + rename each)
//! 3. Write the manifest with build id, row count and tracks table digest
//!
//! Loading verifies every stamp and refuses a mixed or incomplete set.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use uuid::Uuid;

use crate::features::{Feature, FeatureScaler};
use crate::models::{IndexedTrack, INDEXED_META_COLUMNS};
use crate::neighbors::NeighborIndex;
use crate::table::{self, Schema};
use crate::{Error, Result};

/// File locations under the root folder
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactPaths {
    root: PathBuf,
}

impl ArtifactPaths {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn data_dir(&self) -> PathBuf {
        self.root.join("data")
    }

    pub fn models_dir(&self) -> PathBuf {
        self.root.join("models")
    }

    pub fn raw_artists(&self) -> PathBuf {
        self.data_dir().join("artists.csv")
    }

    pub fn raw_tracks(&self) -> PathBuf {
        self.data_dir().join("tracks.csv")
    }

    /// Cleaner output, later overwritten by the builder's small projection
    pub fn clean_table(&self) -> PathBuf {
        self.data_dir().join("music_clean.csv")
    }

    /// Builder's full mood-tagged table
    pub fn mood_table(&self) -> PathBuf {
        self.data_dir().join("spotify_mood_dataset.csv")
    }

    pub fn scaler(&self) -> PathBuf {
        self.models_dir().join("scaler.json")
    }

    pub fn index(&self) -> PathBuf {
        self.models_dir().join("knn_model.json")
    }

    pub fn indexed_tracks(&self) -> PathBuf {
        self.models_dir().join("indexed_tracks.csv")
    }

    pub fn manifest(&self) -> PathBuf {
        self.models_dir().join("manifest.json")
    }
}

/// Commit record of one index build
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtifactManifest {
    pub build_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub features: Vec<Feature>,
    pub neighbor_cap: usize,
    pub row_count: usize,
    /// SHA-256 of the indexed tracks CSV, hex encoded
    pub indexed_tracks_sha256: String,
}

/// Scaler, index and row-aligned tracks of one build
#[derive(Debug, Clone)]
pub struct ArtifactSet {
    pub scaler: FeatureScaler,
    pub index: NeighborIndex,
    pub tracks: Vec<IndexedTrack>,
}

impl ArtifactSet {
    /// Bundle freshly fitted artifacts, checking they belong together
    pub fn new(scaler: FeatureScaler, index: NeighborIndex, tracks: Vec<IndexedTrack>) -> Result<Self> {
        let set = Self { scaler, index, tracks };
        set.check_consistency()?;
        Ok(set)
    }

    pub fn build_id(&self) -> Uuid {
        self.scaler.build_id
    }

    /// Columns of the indexed tracks table for this build
    pub fn tracks_schema(&self) -> Schema {
        let mut columns = INDEXED_META_COLUMNS.to_vec();
        columns.extend(self.scaler.features.iter().map(Feature::column));
        Schema::new(columns)
    }

    fn check_consistency(&self) -> Result<()> {
        if self.scaler.build_id != self.index.build_id {
            return Err(Error::ArtifactMismatch(format!(
                "scaler build {} does not match index build {}",
                self.scaler.build_id, self.index.build_id
            )));
        }
        if self.scaler.dims() != self.index.dims() {
            return Err(Error::ArtifactMismatch(format!(
                "scaler has {} features, index has {} dimensions",
                self.scaler.dims(),
                self.index.dims()
            )));
        }
        if self.tracks.len() != self.index.len() {
            return Err(Error::ArtifactMismatch(format!(
                "{} indexed tracks for {} index rows",
                self.tracks.len(),
                self.index.len()
            )));
        }
        Ok(())
    }

    /// Persist the set; the manifest is written last
    pub fn save(&self, paths: &ArtifactPaths) -> Result<ArtifactManifest> {
        fs::create_dir_all(paths.models_dir())?;

        let manifest_path = paths.manifest();
        if manifest_path.exists() {
            fs::remove_file(&manifest_path)?;
            debug!("Removed previous manifest");
        }

        write_json(&paths.scaler(), &self.scaler)?;
        write_json(&paths.index(), &self.index)?;
        let rows = table::write_table(&paths.indexed_tracks(), &self.tracks_schema(), &self.tracks)?;

        let manifest = ArtifactManifest {
            build_id: self.build_id(),
            created_at: Utc::now(),
            features: self.scaler.features.clone(),
            neighbor_cap: self.index.n_neighbors,
            row_count: rows,
            indexed_tracks_sha256: file_sha256(&paths.indexed_tracks())?,
        };
        write_json(&manifest_path, &manifest)?;

        info!(
            build_id = %manifest.build_id,
            rows = manifest.row_count,
            "Saved artifact set to {}",
            paths.models_dir().display()
        );
        Ok(manifest)
    }

    /// Load and verify a saved set
    pub fn load(paths: &ArtifactPaths) -> Result<(ArtifactManifest, Self)> {
        let manifest: ArtifactManifest = read_json(&paths.manifest())?;
        let scaler: FeatureScaler = read_json(&paths.scaler())?;
        let index: NeighborIndex = read_json(&paths.index())?;

        for (what, id) in [("scaler", scaler.build_id), ("index", index.build_id)] {
            if id != manifest.build_id {
                return Err(Error::ArtifactMismatch(format!(
                    "{} belongs to build {}, manifest to build {}",
                    what, id, manifest.build_id
                )));
            }
        }
        if scaler.features != manifest.features {
            return Err(Error::ArtifactMismatch("scaler features differ from manifest".to_string()));
        }

        let tracks_path = paths.indexed_tracks();
        let digest = file_sha256(&tracks_path)?;
        if digest != manifest.indexed_tracks_sha256 {
            return Err(Error::ArtifactMismatch(format!(
                "{} was modified after build {}",
                tracks_path.display(),
                manifest.build_id
            )));
        }

        let (_, tracks) = table::read_rows(&tracks_path, IndexedTrack::from_row)?;
        if tracks.len() != manifest.row_count {
            return Err(Error::ArtifactMismatch(format!(
                "manifest lists {} rows, table has {}",
                manifest.row_count,
                tracks.len()
            )));
        }

        let set = Self::new(scaler, index, tracks)?;
        info!(
            build_id = %manifest.build_id,
            rows = set.tracks.len(),
            "Loaded artifact set from {}",
            paths.models_dir().display()
        );
        Ok((manifest, set))
    }
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let tmp = table::temp_sibling(path);
    let mut writer = BufWriter::new(fs::File::create(&tmp)?);
    serde_json::to_writer(&mut writer, value)?;
    writer.flush()?;
    drop(writer);
    fs::rename(&tmp, path)?;
    Ok(())
}

fn read_json<T: for<'de> Deserialize<'de>>(path: &Path) -> Result<T> {
    if !path.exists() {
        return Err(Error::MissingInput(path.to_path_buf()));
    }
    let file = fs::File::open(path)?;
    Ok(serde_json::from_reader(BufReader::new(file))?)
}

/// Hex-encoded SHA-256 of a file's content
pub fn file_sha256(path: &Path) -> Result<String> {
    if !path.exists() {
        return Err(Error::MissingInput(path.to_path_buf()));
    }
    let bytes = fs::read(path)?;
    Ok(format!("{:x}", Sha256::digest(&bytes)))
}
