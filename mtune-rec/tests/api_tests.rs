//! Integration tests for mtune-rec API endpoints
//!
//! Fixture artifacts are written to a temporary root folder and loaded through
//! the same path the service uses at startup.

use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use mtune_common::{ArtifactPaths, ArtifactSet, Feature, FeatureScaler, IndexedTrack, Mood, NeighborIndex};
use mtune_rec::{build_router, AppState, RecommenderCore};
use serde_json::Value;
use tempfile::TempDir;
use tower::util::ServiceExt; // for `oneshot` method
use uuid::Uuid;

fn track(id: &str, mood: Mood, popularity: f64, valence: f64, energy: f64) -> IndexedTrack {
    IndexedTrack {
        track_id: Some(id.to_string()),
        track_name: format!("Track {}", id),
        artist_name: Some(format!("Artist {}", &id[..1])),
        genres: None,
        mood: Some(mood),
        valence: Some(valence),
        energy: Some(energy),
        danceability: None,
        tempo: None,
        popularity: Some(popularity),
    }
}

/// 7 Happy, 3 Sad and 2 Calm tracks saved as an artifact set
fn write_fixture() -> (TempDir, ArtifactPaths) {
    let mut tracks = Vec::new();
    for i in 0..7 {
        tracks.push(track(&format!("h{}", i), Mood::Happy, 10.0 * i as f64, 0.7 + 0.04 * i as f64, 0.8));
    }
    for i in 0..3 {
        tracks.push(track(&format!("s{}", i), Mood::Sad, 5.0 + i as f64, 0.1 + 0.05 * i as f64, 0.3));
    }
    for i in 0..2 {
        tracks.push(track(&format!("c{}", i), Mood::Calm, 1.0, 0.5, 0.2 + 0.1 * i as f64));
    }

    let features = vec![Feature::Valence, Feature::Energy, Feature::Popularity];
    let matrix: Vec<Vec<f64>> = tracks.iter().map(|t| t.feature_vector(&features).unwrap()).collect();
    let build_id = Uuid::new_v4();
    let scaler = FeatureScaler::fit(build_id, features, &matrix).unwrap();
    let index = NeighborIndex::fit(build_id, 10, scaler.transform_all(&matrix).unwrap()).unwrap();
    let set = ArtifactSet::new(scaler, index, tracks).unwrap();

    let dir = tempfile::tempdir().unwrap();
    let paths = ArtifactPaths::new(dir.path());
    set.save(&paths).unwrap();
    (dir, paths)
}

fn setup_app() -> (TempDir, axum::Router) {
    let (dir, paths) = write_fixture();
    let core = RecommenderCore::load(&paths).expect("Fixture artifacts should load");
    (dir, build_router(AppState::new(core)))
}

fn test_request(uri: &str) -> Request<Body> {
    Request::builder().method("GET").uri(uri).body(Body::empty()).unwrap()
}

async fn get_json(app: axum::Router, uri: &str) -> (StatusCode, Value) {
    let response = app.oneshot(test_request(uri)).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("Should read body");
    (status, serde_json::from_slice(&bytes).expect("Should parse JSON"))
}

fn track_ids(body: &Value) -> Vec<String> {
    body["tracks"]
        .as_array()
        .expect("tracks should be an array")
        .iter()
        .map(|t| t["track_id"].as_str().unwrap().to_string())
        .collect()
}

// =============================================================================
// Health and moods
// =============================================================================

#[tokio::test]
async fn test_health_reports_loaded_catalog() {
    let (_dir, app) = setup_app();
    let (status, body) = get_json(app, "/health").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["module"], "mtune-rec");
    assert_eq!(body["tracks"], 12);
    assert!(body["version"].is_string());
    assert!(body["build_id"].is_string());
}

#[tokio::test]
async fn test_moods_sorted() {
    let (_dir, app) = setup_app();
    let (status, body) = get_json(app, "/api/moods").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["moods"], serde_json::json!(["Calm", "Happy", "Sad"]));
}

// =============================================================================
// Mood recommendations
// =============================================================================

#[tokio::test]
async fn test_recommend_by_popularity() {
    let (_dir, app) = setup_app();
    let (status, body) = get_json(app, "/api/recommend?mood=happy&top_n=3&method=popularity").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(track_ids(&body), vec!["h6", "h5", "h4"]);
}

#[tokio::test]
async fn test_recommend_clamps_to_group_size() {
    let (_dir, app) = setup_app();
    let (_, body) = get_json(app, "/api/recommend?mood=Happy&top_n=50&method=random").await;

    let ids = track_ids(&body);
    assert_eq!(ids.len(), 7);
    assert!(ids.iter().all(|id| id.starts_with('h')));
}

#[tokio::test]
async fn test_recommend_valence_energy_label() {
    let (_dir, app) = setup_app();
    let (_, body) = get_json(app, "/api/recommend?mood=sad&top_n=2&method=valence%20%26%20energy").await;
    assert_eq!(track_ids(&body), vec!["s2", "s1"]);
}

#[tokio::test]
async fn test_unknown_mood_falls_back_to_catalog() {
    let (_dir, app) = setup_app();
    let (_, body) = get_json(app, "/api/recommend?mood=ecstatic&top_n=50").await;
    assert_eq!(track_ids(&body).len(), 12);
}

#[tokio::test]
async fn test_invalid_top_n_is_json_error() {
    let (_dir, app) = setup_app();
    let (status, body) = get_json(app, "/api/recommend?mood=happy&top_n=lots").await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "BAD_REQUEST");
    assert!(body["error"]["message"].is_string());
}

#[tokio::test]
async fn test_sample_by_mood() {
    let (_dir, app) = setup_app();
    let (_, body) = get_json(app, "/api/sample?mood=calm&n=6").await;

    let mut ids = track_ids(&body);
    ids.sort();
    assert_eq!(ids, vec!["c0", "c1"]);
}

// =============================================================================
// Similar tracks and search
// =============================================================================

#[tokio::test]
async fn test_similar_excludes_query_track() {
    let (_dir, app) = setup_app();
    let (status, body) = get_json(app, "/api/similar/h3?top_n=5").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["track_id"], "h3");
    let ids = track_ids(&body);
    assert_eq!(ids.len(), 5);
    assert!(!ids.contains(&"h3".to_string()));
}

#[tokio::test]
async fn test_similar_bounded_by_neighbor_cap() {
    let (_dir, app) = setup_app();
    let (_, body) = get_json(app, "/api/similar/h0?top_n=50").await;
    assert_eq!(track_ids(&body).len(), 9);
}

#[tokio::test]
async fn test_similar_unknown_track_is_empty() {
    let (_dir, app) = setup_app();
    let (status, body) = get_json(app, "/api/similar/nope").await;

    assert_eq!(status, StatusCode::OK);
    assert!(track_ids(&body).is_empty());
}

#[tokio::test]
async fn test_search_by_artist() {
    let (_dir, app) = setup_app();
    let (_, body) = get_json(app, "/api/search?q=artist%20c&limit=10").await;

    assert_eq!(body["query"], "artist c");
    assert_eq!(track_ids(&body), vec!["c0", "c1"]);
}

// =============================================================================
// Degraded mode
// =============================================================================

#[tokio::test]
async fn test_missing_artifacts_fail_strict_load() {
    let dir = tempfile::tempdir().unwrap();
    let paths = ArtifactPaths::new(dir.path());
    assert!(RecommenderCore::load_or_degraded(&paths, false).is_err());
}

#[tokio::test]
async fn test_degraded_core_serves_empty_results() {
    let dir = tempfile::tempdir().unwrap();
    let core = RecommenderCore::load_or_degraded(&ArtifactPaths::new(dir.path()), true).unwrap();
    let app = build_router(AppState::new(core));

    let (_, health) = get_json(app.clone(), "/health").await;
    assert_eq!(health["status"], "degraded");
    assert_eq!(health["tracks"], 0);

    let (status, body) = get_json(app.clone(), "/api/recommend?mood=happy").await;
    assert_eq!(status, StatusCode::OK);
    assert!(track_ids(&body).is_empty());

    let (_, body) = get_json(app.clone(), "/api/similar/h0").await;
    assert!(track_ids(&body).is_empty());

    let (_, body) = get_json(app, "/api/moods").await;
    assert_eq!(body["moods"], serde_json::json!([]));
}
