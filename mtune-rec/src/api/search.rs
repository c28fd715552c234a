//! Catalog search endpoint

use axum::{
    extract::{rejection::QueryRejection, Query, State},
    Json,
};
use mtune_common::IndexedTrack;
use serde::{Deserialize, Serialize};

use super::MAX_TOP_N;
use crate::error::ApiResult;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub q: String,
    pub limit: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct SearchResponse {
    pub query: String,
    pub tracks: Vec<IndexedTrack>,
}

/// GET /api/search?q=adele&limit=50
pub async fn search_tracks(
    State(state): State<AppState>,
    query: Result<Query<SearchQuery>, QueryRejection>,
) -> ApiResult<Json<SearchResponse>> {
    let Query(query) = query?;
    let limit = query.limit.unwrap_or(MAX_TOP_N).clamp(1, MAX_TOP_N);
    let tracks = state.core.search().search(&query.q, limit);
    Ok(Json(SearchResponse { query: query.q, tracks }))
}
