//! Beatmap synthesis
//!
//! Turns the beats found by the feature extractor into a sparse, density-adaptive
//! list of [`BeatEvent`]s for the visualization renderer.

mod builder;
mod event;
mod normalize;
pub mod stats;

pub use builder::{Beatmap, BeatmapBuilder, BeatmapConfig, EnergyPolicy, EventOrder, Thresholds};
pub use event::{BeatEvent, BeatType};
pub use normalize::min_max_normalize;
