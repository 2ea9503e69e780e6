//! Application context
//!
//! One explicit object owning the stream clock, the scene it drives and the
//! beatmap builder. Construct it once at startup and hand references to every
//! code path that needs the engine.

use crate::beatmap::{Beatmap, BeatmapBuilder};
use crate::clock::{ClockState, StreamClock};
use crate::config::EngineConfig;
use crate::features::FeatureFrames;
use crate::scene::{SceneEngine, SceneSnapshot, SceneVariant};
use crate::Result;
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{info, warn};

/// Owner of the engine's long-lived state
pub struct AppContext {
    config: EngineConfig,
    builder: BeatmapBuilder,
    scene: Arc<SceneEngine>,
    clock: Mutex<StreamClock>,
}

impl AppContext {
    /// Build the context; the clock starts idle with the scene as its listener
    pub fn new(config: EngineConfig) -> Self {
        let scene = Arc::new(match config.scene.seed {
            Some(seed) => SceneEngine::with_seed(seed),
            None => SceneEngine::new(),
        });
        let clock = StreamClock::new(config.clock.clone());
        clock.set_listener(scene.clone());

        info!("App context created");
        Self {
            builder: BeatmapBuilder::with_config(config.beatmap.clone()),
            config,
            scene,
            clock: Mutex::new(clock),
        }
    }

    /// Configuration the context was built with
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Shared scene handle
    pub fn scene(&self) -> Arc<SceneEngine> {
        self.scene.clone()
    }

    /// Build a beatmap with the configured builder
    pub fn build_beatmap(&self, features: &FeatureFrames) -> Result<Beatmap> {
        self.builder.build(features)
    }

    /// (Re)start streaming into a freshly initialized scene.
    ///
    /// A running clock is stopped and joined before the scene is reset, so no
    /// late tick can touch the new scene. The scene is (re)attached as the clock
    /// listener, also after [`shutdown`](Self::shutdown). `None` uses the
    /// configured default variant.
    pub fn start_stream(&self, variant_id: Option<u32>) -> Result<SceneVariant> {
        let variant_id = variant_id.unwrap_or(self.config.scene.default_variant);
        let mut clock = self.clock.lock();

        clock.stop()?;
        let variant = self.scene.initialize_scene(variant_id)?;
        clock.set_listener(self.scene.clone());
        clock.start()?;

        info!("Streaming scene {:?}", variant);
        Ok(variant)
    }

    /// Stop streaming; the scene keeps its last state
    pub fn stop_stream(&self) -> Result<()> {
        self.clock.lock().stop()
    }

    /// Whether the clock is ticking
    pub fn is_streaming(&self) -> bool {
        self.clock.lock().is_running()
    }

    /// Clock state snapshot
    pub fn clock_state(&self) -> ClockState {
        self.clock.lock().state()
    }

    /// Scene state snapshot
    pub fn scene_state(&self) -> SceneSnapshot {
        self.scene.get_state()
    }

    /// Stop streaming and empty the scene
    pub fn clear_scene(&self) -> Result<()> {
        self.stop_stream()?;
        self.scene.clear_scene();
        Ok(())
    }

    /// Stop the clock and detach the scene; a later `start_stream` reattaches it
    pub fn shutdown(&self) -> Result<()> {
        let mut clock = self.clock.lock();
        clock.stop()?;
        clock.clear_listener();
        info!("App context shut down");
        Ok(())
    }
}

impl Drop for AppContext {
    fn drop(&mut self) {
        if let Err(e) = self.shutdown() {
            warn!("App context shutdown failed: {}", e);
        }
    }
}
