//! Mood browsing endpoints

use axum::{
    extract::{rejection::QueryRejection, Query, State},
    Json,
};
use mtune_common::Mood;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{clamp_top_n, TracksResponse, DEFAULT_TOP_N};
use crate::error::ApiResult;
use crate::ranker::RankMethod;
use crate::AppState;

/// Tracks shown on the landing view
const DEFAULT_SAMPLE_SIZE: usize = 6;

#[derive(Debug, Serialize)]
pub struct MoodsResponse {
    pub moods: Vec<Mood>,
}

/// Query parameters for mood recommendations
#[derive(Debug, Deserialize)]
pub struct RecommendQuery {
    /// Mood label, any case; unknown or absent selects the whole catalog
    #[serde(default)]
    pub mood: String,
    pub top_n: Option<usize>,
    /// popularity, valence_energy (or "valence & energy"), random
    #[serde(default = "default_method")]
    pub method: String,
}

fn default_method() -> String {
    "popularity".to_string()
}

/// Query parameters for random picks
#[derive(Debug, Deserialize)]
pub struct SampleQuery {
    pub mood: Option<String>,
    pub n: Option<usize>,
}

/// GET /api/moods
pub async fn get_moods(State(state): State<AppState>) -> Json<MoodsResponse> {
    Json(MoodsResponse {
        moods: state.core.ranker().moods(),
    })
}

/// GET /api/recommend?mood=happy&top_n=10&method=popularity
pub async fn get_recommendations(
    State(state): State<AppState>,
    query: Result<Query<RecommendQuery>, QueryRejection>,
) -> ApiResult<Json<TracksResponse>> {
    let Query(query) = query?;
    let top_n = clamp_top_n(query.top_n, DEFAULT_TOP_N);
    let method = RankMethod::parse(&query.method);
    debug!(mood = %query.mood, top_n, ?method, "Mood recommendation");

    let tracks = state.core.ranker().recommend(&query.mood, top_n, method);
    Ok(Json(TracksResponse { tracks }))
}

/// GET /api/sample?mood=calm&n=6
///
/// Without a mood, samples the whole catalog.
pub async fn get_sample(
    State(state): State<AppState>,
    query: Result<Query<SampleQuery>, QueryRejection>,
) -> ApiResult<Json<TracksResponse>> {
    let Query(query) = query?;
    let n = clamp_top_n(query.n, DEFAULT_SAMPLE_SIZE);
    let ranker = state.core.ranker();
    let tracks = match query.mood.as_deref().filter(|m| !m.trim().is_empty()) {
        Some(mood) => ranker.sample_by_mood(mood, n),
        None => ranker.sample(n),
    };
    Ok(Json(TracksResponse { tracks }))
}
