//! Runs the offline build and train stages, then queries the loaded core

use mtune_common::config::PipelineConfig;
use mtune_common::{ArtifactPaths, Mood};
use mtune_prep::Pipeline;
use mtune_rec::{RankMethod, RecommenderCore};
use std::fs;

#[test]
fn test_two_row_catalog_recommends_happy_track() {
    let dir = tempfile::tempdir().unwrap();
    let paths = ArtifactPaths::new(dir.path());
    fs::create_dir_all(paths.data_dir()).unwrap();
    fs::write(
        paths.clean_table(),
        "track_id,track_name,genres,valence,energy\nA,Song A,pop,0.8,0.8\nB,Song B,sad,0.2,0.3\n",
    )
    .unwrap();

    let pipeline = Pipeline::new(paths.clone(), &PipelineConfig::default());
    let build = pipeline.build().unwrap();
    assert_eq!(build.rows_out, 2);
    pipeline.train().unwrap();

    let core = RecommenderCore::load(&paths).unwrap();
    assert_eq!(core.ranker().moods(), vec![Mood::Happy, Mood::Sad]);

    let out = core.ranker().recommend("Happy", 5, RankMethod::Popularity);
    let ids: Vec<&str> = out.iter().filter_map(|t| t.track_id.as_deref()).collect();
    assert_eq!(ids, vec!["A"]);
    assert_eq!(out[0].mood, Some(Mood::Happy));

    let sad = core.ranker().recommend("Sad", 5, RankMethod::Popularity);
    assert_eq!(sad.len(), 1);
    assert_eq!(sad[0].track_id.as_deref(), Some("B"));
}
