//! Beatscene Core - Beatmap Synthesis and Scene Streaming
//!
//! This crate contains the engine behind Beatscene:
//! - Beatmap synthesis from pre-extracted audio features
//! - A fixed-period stream clock running on its own thread
//! - A scene engine that advances 3D objects on every clock tick
//! - An application context tying clock and scene together
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use beatscene_core::{AppContext, EngineConfig};
//!
//! let context = AppContext::new(EngineConfig::default());
//! context.start_stream(None).unwrap();
//! let snapshot = context.scene_state();
//! context.stop_stream().unwrap();
//! # let _ = snapshot;
//! ```

#![warn(missing_docs)]

pub mod beatmap;
pub mod clock;
pub mod config;
pub mod context;
pub mod error;
pub mod features;
pub mod logging;
pub mod scene;

// --- Re-exports grouped by category ---

// Beatmap
pub use beatmap::{
    BeatEvent, BeatType, Beatmap, BeatmapBuilder, BeatmapConfig, EnergyPolicy, EventOrder,
    Thresholds,
};
pub use features::FeatureFrames;

// Streaming
pub use clock::{ChannelListener, ClockConfig, ClockListener, ClockSignal, SignalKind, StreamClock};
pub use scene::{ObjectId, SceneEngine, SceneObject, SceneSnapshot, SceneVariant};

// Application
pub use config::{EngineConfig, SceneConfig};
pub use context::AppContext;
pub use logging::LogConfig;

pub use error::{Axis, CoreError, Result};
