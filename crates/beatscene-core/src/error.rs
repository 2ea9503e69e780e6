//! Error types for beatmap synthesis and the streaming scene
use std::time::Duration;
use thiserror::Error;

/// Normalization axis of a beat event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    /// Energy-derived horizontal axis
    X,
    /// Spectral-peak-derived vertical axis
    Y,
}

impl std::fmt::Display for Axis {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Axis::X => f.write_str("x"),
            Axis::Y => f.write_str("y"),
        }
    }
}

/// Core errors
#[derive(Error, Debug)]
pub enum CoreError {
    /// No beats were detected, so there is nothing to build a map from
    #[error("Insufficient data: no beat frames detected")]
    InsufficientData,

    /// One normalization axis has zero spread (flat audio)
    #[error("Degenerate range on {axis} axis: all values are equal")]
    DegenerateRange {
        /// Axis that could not be normalized
        axis: Axis,
    },

    /// A beat frame points past the end of a per-frame signal
    #[error("Frame {frame} out of range (signal has {len} frames)")]
    FrameOutOfRange {
        /// Offending frame index
        frame: usize,
        /// Length of the signal it was checked against
        len: usize,
    },

    /// Feature sequences are misaligned or malformed
    #[error("Invalid features: {0}")]
    InvalidFeatures(String),

    /// Scene initialization requested a variant with no spawn rule
    #[error("Unrecognized scene variant: {0}")]
    UnrecognizedSceneVariant(u32),

    /// `start()` was called on a clock that is already ticking
    #[error("Stream clock is already running")]
    ClockAlreadyRunning,

    /// The clock thread did not exit before the stop deadline
    #[error("Stream clock did not stop within {0:?}")]
    ShutdownTimeout(Duration),

    /// The clock thread panicked
    #[error("Clock thread error: {0}")]
    ClockThread(String),

    /// Configuration could not be parsed
    #[error("Config error: {0}")]
    Config(String),

    /// I/O error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for core operations
pub type Result<T> = std::result::Result<T, CoreError>;
