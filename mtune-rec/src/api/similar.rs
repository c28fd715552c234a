//! Similar-track endpoint

use axum::{
    extract::{rejection::QueryRejection, Path, Query, State},
    Json,
};
use mtune_common::IndexedTrack;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

use super::{clamp_top_n, DEFAULT_TOP_N};
use crate::error::{ApiError, ApiResult};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct SimilarQuery {
    pub top_n: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct SimilarResponse {
    pub track_id: String,
    pub tracks: Vec<IndexedTrack>,
}

/// GET /api/similar/:track_id?top_n=10
///
/// Unknown ids return an empty list. Results are additionally bounded by the
/// index's neighbor cap.
pub async fn get_similar(
    State(state): State<AppState>,
    Path(track_id): Path<String>,
    query: Result<Query<SimilarQuery>, QueryRejection>,
) -> ApiResult<Json<SimilarResponse>> {
    let Query(query) = query?;
    let top_n = clamp_top_n(query.top_n, DEFAULT_TOP_N);
    if top_n > state.core.max_similar() {
        debug!(top_n, max = state.core.max_similar(), "Similar request exceeds neighbor cap");
    }

    // Neighbor query is CPU-bound; keep it off the async workers
    let core = Arc::clone(&state.core);
    let id = track_id.clone();
    let tracks = tokio::task::spawn_blocking(move || core.recommend_similar(&id, top_n))
        .await
        .map_err(|e| ApiError::Internal(format!("Similarity task failed: {}", e)))?;

    Ok(Json(SimilarResponse { track_id, tracks }))
}
