//! Content-based "more like this" recommendations

use mtune_common::{FeatureScaler, IndexedTrack, NeighborIndex};
use std::sync::Arc;
use tracing::{debug, warn};

/// Nearest tracks to a given track in the scaled feature space
#[derive(Debug, Clone)]
pub struct SimilarityRecommender {
    tracks: Arc<[IndexedTrack]>,
    scaler: FeatureScaler,
    index: NeighborIndex,
}

impl SimilarityRecommender {
    /// `tracks` must be row-aligned with `index`
    pub fn new(tracks: Arc<[IndexedTrack]>, scaler: FeatureScaler, index: NeighborIndex) -> Self {
        Self { tracks, scaler, index }
    }

    /// Most results a query can return: one neighbor slot holds the track itself
    pub fn max_results(&self) -> usize {
        self.index.n_neighbors.saturating_sub(1)
    }

    /// Up to `top_n` tracks nearest to `track_id`, nearest first
    ///
    /// An unknown id yields nothing. The track itself, and any other row
    /// carrying the same id, is never part of the result.
    pub fn recommend_similar(&self, track_id: &str, top_n: usize) -> Vec<IndexedTrack> {
        let Some(row) = self.tracks.iter().position(|t| t.track_id.as_deref() == Some(track_id)) else {
            debug!(track_id, "Unknown track id");
            return Vec::new();
        };

        let Some(values) = self.tracks[row].feature_vector(&self.scaler.features) else {
            warn!(track_id, row, "Indexed track lacks feature values");
            return Vec::new();
        };

        let hits = match self
            .scaler
            .transform(&values)
            .and_then(|point| self.index.query(&point, top_n.saturating_add(1)))
        {
            Ok(hits) => hits,
            Err(e) => {
                warn!(track_id, error = %e, "Neighbor query failed");
                return Vec::new();
            }
        };

        hits.into_iter()
            .filter(|hit| hit.row != row)
            .filter_map(|hit| self.tracks.get(hit.row))
            .filter(|t| t.track_id.as_deref() != Some(track_id))
            .take(top_n)
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mtune_common::{Feature, Mood};
    use uuid::Uuid;

    fn track(id: &str, valence: f64, energy: f64) -> IndexedTrack {
        IndexedTrack {
            track_id: Some(id.to_string()),
            track_name: format!("Song {}", id),
            artist_name: None,
            genres: None,
            mood: Some(Mood::Neutral),
            valence: Some(valence),
            energy: Some(energy),
            danceability: None,
            tempo: None,
            popularity: None,
        }
    }

    fn recommender(tracks: Vec<IndexedTrack>, cap: usize) -> SimilarityRecommender {
        let features = vec![Feature::Valence, Feature::Energy];
        let matrix: Vec<Vec<f64>> = tracks.iter().map(|t| t.feature_vector(&features).unwrap()).collect();
        let build_id = Uuid::new_v4();
        let scaler = FeatureScaler::fit(build_id, features, &matrix).unwrap();
        let index = NeighborIndex::fit(build_id, cap, scaler.transform_all(&matrix).unwrap()).unwrap();
        SimilarityRecommender::new(Arc::from(tracks), scaler, index)
    }

    fn ids(tracks: &[IndexedTrack]) -> Vec<&str> {
        tracks.iter().filter_map(|t| t.track_id.as_deref()).collect()
    }

    #[test]
    fn test_nearest_first_without_self() {
        let rec = recommender(
            vec![track("a", 0.1, 0.1), track("b", 0.2, 0.2), track("c", 0.9, 0.9), track("d", 0.15, 0.15)],
            10,
        );
        assert_eq!(ids(&rec.recommend_similar("a", 2)), vec!["d", "b"]);
        assert_eq!(ids(&rec.recommend_similar("a", 10)), vec!["d", "b", "c"]);
    }

    #[test]
    fn test_duplicate_ids_excluded() {
        let rec = recommender(vec![track("a", 0.1, 0.1), track("a", 0.1, 0.1), track("b", 0.5, 0.5)], 10);
        assert_eq!(ids(&rec.recommend_similar("a", 5)), vec!["b"]);
    }

    #[test]
    fn test_unknown_id_is_empty() {
        let rec = recommender(vec![track("a", 0.1, 0.1), track("b", 0.5, 0.5)], 10);
        assert!(rec.recommend_similar("zzz", 5).is_empty());
    }

    #[test]
    fn test_results_clamped_by_neighbor_cap() {
        let tracks: Vec<IndexedTrack> = (0..8).map(|i| track(&format!("t{}", i), i as f64 / 10.0, 0.5)).collect();
        let rec = recommender(tracks, 4);
        assert_eq!(rec.max_results(), 3);
        assert_eq!(rec.recommend_similar("t0", 50).len(), 3);
    }
}
