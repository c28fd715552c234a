//! Index builder
//!
//! Fits the feature scaler and the neighbor index over the mood-tagged table
//! and produces the indexed tracks table row-aligned with the index. Rows are
//! filtered first and indexed second, so row `i` of the table is always row
//! `i` of the index.

use mtune_common::neighbors::DEFAULT_NEIGHBOR_CAP;
use mtune_common::table::{self, Schema};
use mtune_common::{
    ArtifactManifest, ArtifactPaths, ArtifactSet, Error, Feature, FeatureScaler, IndexedTrack, MoodTrack,
    NeighborIndex, Result,
};
use std::path::Path;
use tracing::{info, warn};
use uuid::Uuid;

/// Totals of one index build
#[derive(Debug, Clone, PartialEq)]
pub struct IndexSummary {
    pub build_id: Uuid,
    pub features: Vec<Feature>,
    pub rows_in: usize,
    pub rows_dropped: usize,
    pub rows_indexed: usize,
}

/// Features of [`Feature::ALL`] whose column is present, in that order
pub fn select_features(schema: &Schema) -> Vec<Feature> {
    Feature::ALL
        .iter()
        .copied()
        .filter(|f| schema.contains(f.column()))
        .collect()
}

/// Fits scaler and index over mood-tagged tracks
#[derive(Debug, Clone)]
pub struct IndexBuilder {
    neighbor_cap: usize,
}

impl Default for IndexBuilder {
    fn default() -> Self {
        Self::new(DEFAULT_NEIGHBOR_CAP)
    }
}

impl IndexBuilder {
    pub fn new(neighbor_cap: usize) -> Self {
        Self { neighbor_cap }
    }

    pub fn neighbor_cap(&self) -> usize {
        self.neighbor_cap
    }

    /// Build an artifact set from in-memory rows over `features`
    ///
    /// Features with no value in any row are left out. Rows missing any
    /// remaining feature are dropped, without imputation. Fails with
    /// [`Error::EmptyTrainingSet`] when no row survives.
    pub fn build(&self, mut features: Vec<Feature>, rows: &[MoodTrack]) -> Result<(ArtifactSet, IndexSummary)> {
        let candidates: Vec<IndexedTrack> = rows.iter().map(IndexedTrack::from_mood_track).collect();

        let (kept, empty): (Vec<Feature>, Vec<Feature>) = features
            .drain(..)
            .partition(|f| candidates.iter().any(|t| t.feature_vector(&[*f]).is_some()));
        if !empty.is_empty() {
            warn!(?empty, "Feature columns hold no values, leaving them out");
        }
        let features = kept;
        if features.is_empty() {
            return Err(Error::EmptyTrainingSet("no feature columns with values".to_string()));
        }

        let mut matrix = Vec::with_capacity(rows.len());
        let mut tracks = Vec::with_capacity(rows.len());
        for indexed in candidates {
            if let Some(vector) = indexed.feature_vector(&features) {
                matrix.push(vector);
                tracks.push(indexed);
            }
        }
        if tracks.is_empty() {
            return Err(Error::EmptyTrainingSet(format!(
                "all {} rows lack at least one of {:?}",
                rows.len(),
                features
            )));
        }

        let build_id = Uuid::new_v4();
        let scaler = FeatureScaler::fit(build_id, features.clone(), &matrix)?;
        let scaled = scaler.transform_all(&matrix)?;
        let index = NeighborIndex::fit(build_id, self.neighbor_cap, scaled)?;
        let set = ArtifactSet::new(scaler, index, tracks)?;

        let summary = IndexSummary {
            build_id,
            features,
            rows_in: rows.len(),
            rows_dropped: rows.len() - set.tracks.len(),
            rows_indexed: set.tracks.len(),
        };
        Ok((set, summary))
    }

    /// Build from the mood-tagged table at `path`
    pub fn build_from_file(&self, path: &Path) -> Result<(ArtifactSet, IndexSummary)> {
        let (header, rows) = table::read_rows(path, MoodTrack::from_row)?;
        let schema = header.schema();
        let features = select_features(&schema);

        let absent: Vec<&str> = Feature::ALL
            .iter()
            .filter(|f| !features.contains(f))
            .map(|f| f.column().name())
            .collect();
        if !absent.is_empty() {
            warn!(?absent, "Feature columns missing from {}", path.display());
        }

        self.build(features, &rows)
    }

    /// Build from `paths.clean_table()` and persist the artifact set
    ///
    /// Nothing is written when the build fails.
    pub fn train(&self, paths: &ArtifactPaths) -> Result<(ArtifactManifest, IndexSummary)> {
        let (set, summary) = self.build_from_file(&paths.clean_table())?;
        info!(
            build_id = %summary.build_id,
            features = ?summary.features,
            rows_indexed = summary.rows_indexed,
            rows_dropped = summary.rows_dropped,
            neighbor_cap = self.neighbor_cap,
            kd_tree = set.index.is_tree_backed(),
            "Fitted scaler and neighbor index"
        );
        let manifest = set.save(paths)?;
        Ok((manifest, summary))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mtune_common::models::TrackColumn;
    use mtune_common::CleanTrack;

    fn row(name: &str, valence: Option<f64>, energy: Option<f64>) -> MoodTrack {
        MoodTrack::classify(CleanTrack {
            track_id: Some(format!("id-{}", name)),
            track_name: name.to_string(),
            valence,
            energy,
            ..Default::default()
        })
    }

    #[test]
    fn test_select_features_keeps_canonical_order() {
        let schema = Schema::new(vec![TrackColumn::Popularity, TrackColumn::TrackName, TrackColumn::Valence]);
        assert_eq!(select_features(&schema), vec![Feature::Valence, Feature::Popularity]);
    }

    #[test]
    fn test_rows_with_missing_features_are_dropped_in_order() {
        let rows = vec![
            row("a", Some(0.1), Some(0.2)),
            row("b", None, Some(0.5)),
            row("c", Some(0.9), Some(0.8)),
        ];
        let (set, summary) = IndexBuilder::default()
            .build(vec![Feature::Valence, Feature::Energy], &rows)
            .unwrap();

        assert_eq!(summary.rows_dropped, 1);
        let names: Vec<&str> = set.tracks.iter().map(|t| t.track_name.as_str()).collect();
        assert_eq!(names, vec!["a", "c"]);
        assert_eq!(set.index.len(), set.tracks.len());

        // Row i of the index is the scaled vector of row i of the table
        for (i, track) in set.tracks.iter().enumerate() {
            let raw = track.feature_vector(&set.scaler.features).unwrap();
            let scaled = set.scaler.transform(&raw).unwrap();
            assert_eq!(set.index.vector(i).unwrap(), scaled.as_slice());
        }
    }

    #[test]
    fn test_all_empty_feature_column_is_left_out() {
        let rows = vec![row("a", Some(0.1), None), row("b", Some(0.9), None)];
        let (set, summary) = IndexBuilder::default()
            .build(vec![Feature::Valence, Feature::Energy], &rows)
            .unwrap();
        assert_eq!(summary.features, vec![Feature::Valence]);
        assert_eq!(summary.rows_indexed, 2);
        assert_eq!(set.index.dims(), 1);
    }

    #[test]
    fn test_empty_training_set_is_an_error() {
        let rows = vec![row("a", None, None)];
        let err = IndexBuilder::default().build(vec![Feature::Valence], &rows).unwrap_err();
        assert!(matches!(err, Error::EmptyTrainingSet(_)));

        let err = IndexBuilder::default().build(vec![], &rows).unwrap_err();
        assert!(matches!(err, Error::EmptyTrainingSet(_)));
    }

    #[test]
    fn test_failed_train_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let paths = ArtifactPaths::new(dir.path());
        std::fs::create_dir_all(paths.data_dir()).unwrap();
        std::fs::write(paths.clean_table(), "track_name,valence\nSong,\n").unwrap();

        assert!(IndexBuilder::default().train(&paths).is_err());
        assert!(!paths.manifest().exists());
        assert!(!paths.scaler().exists());
    }

    #[test]
    fn test_infinite_cell_is_dropped_not_indexed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("music_clean.csv");
        std::fs::write(
            &path,
            "track_id,track_name,valence,energy,popularity,mood\n\
             A,A,0.10,0.10,100,Sad\n\
             B,B,0.9,0.9,180,Happy\n\
             C,C,0.11,0.11,101,Sad\n\
             D,D,0.5,0.5,inf,Neutral\n",
        )
        .unwrap();

        let (set, summary) = IndexBuilder::default().build_from_file(&path).unwrap();
        assert_eq!(summary.rows_indexed, 3);
        assert_eq!(summary.rows_dropped, 1);
        assert!(set.scaler.mean.iter().chain(&set.scaler.scale).all(|v| v.is_finite()));

        let point = set.index.vector(0).unwrap().to_vec();
        let hits = set.index.query(&point, 2).unwrap();
        assert!(hits.iter().all(|h| h.distance.is_finite()));
        assert_eq!(set.tracks[hits[1].row].track_id.as_deref(), Some("C"));
    }
}
