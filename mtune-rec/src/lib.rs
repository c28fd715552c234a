//! mtune-rec library - Recommendation query service
//!
//! Serves mood browsing, similar-track lookup and catalog search over the
//! artifact set built by mtune-prep. All state is read-only after startup.

use axum::Router;
use std::sync::Arc;
use std::time::Instant;
use tower_http::trace::TraceLayer;

pub mod api;
pub mod recommender;
pub mod error;
pub mod ranker;
pub mod search;
pub mod similar;

pub use crate::recommender::{CoreStatus, RecommenderCore};
pub use crate::error::{ApiError, ApiResult};
pub use crate::ranker::{MoodRanker, RankMethod};

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    pub core: Arc<RecommenderCore>,
    /// Service start, for uptime reporting
    pub started: Instant,
}

impl AppState {
    pub fn new(core: RecommenderCore) -> Self {
        Self {
            core: Arc::new(core),
            started: Instant::now(),
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    use axum::routing::get;

    let api = Router::new()
        .route("/api/moods", get(api::get_moods))
        .route("/api/recommend", get(api::get_recommendations))
        .route("/api/sample", get(api::get_sample))
        .route("/api/similar/:track_id", get(api::get_similar))
        .route("/api/search", get(api::search_tracks));

    Router::new()
        .merge(api)
        .merge(api::health_routes())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
