//! Shared read-only recommendation state
//!
//! Built once at startup from the persisted artifact set and shared by every
//! request. When the set cannot be loaded the core may start unavailable, in
//! which case every query answers with an empty result.

use mtune_common::{ArtifactManifest, ArtifactPaths, ArtifactSet, IndexedTrack, Result};
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::ranker::MoodRanker;
use crate::search::CatalogSearch;
use crate::similar::SimilarityRecommender;

/// Whether the core serves a loaded artifact set
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CoreStatus {
    Ready,
    /// Artifacts failed to load; the reason is kept for the health endpoint
    Unavailable(String),
}

#[derive(Debug, Clone)]
pub struct RecommenderCore {
    status: CoreStatus,
    manifest: Option<ArtifactManifest>,
    ranker: MoodRanker,
    search: CatalogSearch,
    similar: Option<SimilarityRecommender>,
}

impl RecommenderCore {
    /// Load and verify the artifact set under `paths`
    pub fn load(paths: &ArtifactPaths) -> Result<Self> {
        let (manifest, set) = ArtifactSet::load(paths)?;
        Ok(Self::from_artifacts(manifest, set))
    }

    /// Like [`load`](Self::load), but an unusable artifact set yields an
    /// unavailable core when `allow_degraded` is set
    pub fn load_or_degraded(paths: &ArtifactPaths, allow_degraded: bool) -> Result<Self> {
        match Self::load(paths) {
            Ok(core) => Ok(core),
            Err(e) if allow_degraded => {
                if e.is_unavailable() {
                    warn!(error = %e, "No usable artifact set, serving empty results");
                } else {
                    error!(error = %e, "Failed to read artifact set, serving empty results");
                }
                Ok(Self::unavailable(e.to_string()))
            }
            Err(e) => Err(e),
        }
    }

    pub fn from_artifacts(manifest: ArtifactManifest, set: ArtifactSet) -> Self {
        let ArtifactSet { scaler, index, tracks } = set;
        let tracks: Arc<[IndexedTrack]> = Arc::from(tracks);
        info!(
            build_id = %manifest.build_id,
            tracks = tracks.len(),
            features = ?scaler.features,
            "Recommender ready"
        );
        Self {
            status: CoreStatus::Ready,
            ranker: MoodRanker::new(Arc::clone(&tracks), &scaler.features),
            search: CatalogSearch::new(Arc::clone(&tracks)),
            similar: Some(SimilarityRecommender::new(tracks, scaler, index)),
            manifest: Some(manifest),
        }
    }

    /// A core with no catalog
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self {
            status: CoreStatus::Unavailable(reason.into()),
            manifest: None,
            ranker: MoodRanker::empty(),
            search: CatalogSearch::new(Arc::from(Vec::new())),
            similar: None,
        }
    }

    pub fn status(&self) -> &CoreStatus {
        &self.status
    }

    pub fn manifest(&self) -> Option<&ArtifactManifest> {
        self.manifest.as_ref()
    }

    pub fn track_count(&self) -> usize {
        self.ranker.len()
    }

    pub fn ranker(&self) -> &MoodRanker {
        &self.ranker
    }

    pub fn search(&self) -> &CatalogSearch {
        &self.search
    }

    /// Similar tracks; empty when the core is unavailable
    pub fn recommend_similar(&self, track_id: &str, top_n: usize) -> Vec<IndexedTrack> {
        match &self.similar {
            Some(similar) => similar.recommend_similar(track_id, top_n),
            None => Vec::new(),
        }
    }

    /// Upper bound on similar results per query
    pub fn max_similar(&self) -> usize {
        self.similar.as_ref().map_or(0, SimilarityRecommender::max_results)
    }
}
