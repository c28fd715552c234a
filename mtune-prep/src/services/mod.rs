//! Offline pipeline stages
//!
//! Each stage reads the previous stage's output from disk and overwrites its
//! own outputs completely.

pub mod artist_key;
pub mod builder;
pub mod cleaner;
pub mod indexer;

pub use artist_key::{extract_artist_key, ArtistKey};
pub use builder::{BuildSummary, DatasetBuilder};
pub use cleaner::{CleanSummary, DatasetCleaner, JoinMode};
pub use indexer::{IndexBuilder, IndexSummary};
