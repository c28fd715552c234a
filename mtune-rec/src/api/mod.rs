//! HTTP API handlers for mtune-rec

pub mod health;
pub mod recommend;
pub mod search;
pub mod similar;

pub use health::health_routes;
pub use recommend::{get_moods, get_recommendations, get_sample};
pub use search::search_tracks;
pub use similar::get_similar;

use mtune_common::IndexedTrack;
use serde::Serialize;

/// Largest accepted `top_n`; larger values are clamped
pub const MAX_TOP_N: usize = 50;

/// Default number of recommendations
pub const DEFAULT_TOP_N: usize = 10;

/// Clamp a requested result count to `1..=MAX_TOP_N`
pub fn clamp_top_n(requested: Option<usize>, default: usize) -> usize {
    requested.unwrap_or(default).clamp(1, MAX_TOP_N)
}

/// Response body carrying a list of tracks
#[derive(Debug, Serialize)]
pub struct TracksResponse {
    pub tracks: Vec<IndexedTrack>,
}
