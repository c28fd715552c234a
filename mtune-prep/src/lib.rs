//! mtune-prep library interface
//!
//! Offline pipeline turning the raw catalog into the mood-tagged tables and
//! the neighbor index artifact set served by mtune-rec.

pub mod pipeline;
pub mod services;

pub use pipeline::{Pipeline, PipelineReport};
