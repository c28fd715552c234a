//! # MoodTune Common Library
//!
//! Shared code for the MoodTune pipeline and query service:
//! - Error type and configuration loading
//! - Typed track records and CSV table I/O
//! - Rule-based mood classifier
//! - Feature scaler and Euclidean neighbor index
//! - Versioned persistence of the index artifact set

pub mod artifacts;
pub mod config;
pub mod error;
pub mod features;
pub mod models;
pub mod mood;
pub mod neighbors;
pub mod table;

pub use artifacts::{ArtifactManifest, ArtifactPaths, ArtifactSet};
pub use error::{Error, Result};
pub use features::{Feature, FeatureScaler};
pub use models::{CleanTrack, IndexedTrack, MoodTrack, RawArtist, RawTrack, TrackColumn};
pub use mood::{classify, Mood, MoodFeatures};
pub use neighbors::{Neighbor, NeighborIndex};
pub use table::Schema;
