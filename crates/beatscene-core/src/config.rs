//! Engine configuration, loadable from TOML

use crate::beatmap::BeatmapConfig;
use crate::clock::ClockConfig;
use crate::logging::LogConfig;
use crate::scene::SceneVariant;
use crate::{CoreError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Scene settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SceneConfig {
    /// Variant id used when a caller does not name one
    pub default_variant: u32,
    /// Fixed seed for spawn positions; OS entropy when unset
    pub seed: Option<u64>,
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            default_variant: SceneVariant::Approach.id(),
            seed: None,
        }
    }
}

/// Top-level configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Beatmap synthesis
    pub beatmap: BeatmapConfig,
    /// Stream clock
    pub clock: ClockConfig,
    /// Scene engine
    pub scene: SceneConfig,
    /// Logging
    pub logging: LogConfig,
}

impl EngineConfig {
    /// Parse a TOML document; missing sections keep their defaults
    pub fn from_toml_str(s: &str) -> Result<Self> {
        toml::from_str(s).map_err(|e| CoreError::Config(e.to_string()))
    }

    /// Load a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    /// Render as TOML
    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string(self).map_err(|e| CoreError::Config(e.to_string()))
    }
}
