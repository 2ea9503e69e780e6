//! Feature Frames - boundary to the external feature extractor
//!
//! The extractor (onset detection, RMS, STFT) lives outside this crate. It hands
//! over plain per-frame sequences aligned by frame index, plus the list of frames
//! it flagged as beats.

use crate::{CoreError, Result};
use serde::{Deserialize, Serialize};
use std::io::Read;

/// Sample rate the extractor resamples clips to
pub const DEFAULT_SAMPLE_RATE: u32 = 22050;

/// Samples between consecutive analysis frames
pub const DEFAULT_HOP_LENGTH: u32 = 512;

/// Seconds per analysis frame for a given sample rate and hop length
pub fn hop_duration_for(sample_rate: u32, hop_length: u32) -> f64 {
    if sample_rate == 0 {
        return 0.0;
    }
    hop_length as f64 / sample_rate as f64
}

/// Per-frame analysis output for one clip
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureFrames {
    /// Onset strength, one value per frame
    pub onset_strength: Vec<f64>,
    /// Short-time RMS energy, one value per frame
    pub rms: Vec<f64>,
    /// Magnitude in dB, time-major: `spectrogram_db[frame][bin]`
    pub spectrogram_db: Vec<Vec<f64>>,
    /// Frames detected as beats, chronologically ordered
    pub beat_frames: Vec<usize>,
    /// Seconds per frame
    pub hop_duration: f64,
}

impl FeatureFrames {
    /// Create a feature set using the default hop duration
    pub fn new(
        onset_strength: Vec<f64>,
        rms: Vec<f64>,
        spectrogram_db: Vec<Vec<f64>>,
        beat_frames: Vec<usize>,
    ) -> Self {
        Self {
            onset_strength,
            rms,
            spectrogram_db,
            beat_frames,
            hop_duration: hop_duration_for(DEFAULT_SAMPLE_RATE, DEFAULT_HOP_LENGTH),
        }
    }

    /// Override the hop duration
    pub fn with_hop_duration(mut self, hop_duration: f64) -> Self {
        self.hop_duration = hop_duration;
        self
    }

    /// Load an extractor dump from JSON
    pub fn from_json_reader<R: Read>(reader: R) -> Result<Self> {
        let frames: FeatureFrames = serde_json::from_reader(reader)?;
        Ok(frames)
    }

    /// Number of analysis frames
    pub fn frame_count(&self) -> usize {
        self.onset_strength.len()
    }

    /// Timestamp in seconds of a frame index
    pub fn frame_time(&self, frame: usize) -> f64 {
        frame as f64 * self.hop_duration
    }

    /// Check that the sequences line up and every beat frame is addressable.
    ///
    /// An empty beat list is accepted here; the beatmap builder reports it as
    /// [`CoreError::InsufficientData`].
    pub fn validate(&self) -> Result<()> {
        let frames = self.onset_strength.len();

        if self.rms.len() != frames {
            return Err(CoreError::InvalidFeatures(format!(
                "rms has {} frames, onset strength has {}",
                self.rms.len(),
                frames
            )));
        }
        if self.spectrogram_db.len() != frames {
            return Err(CoreError::InvalidFeatures(format!(
                "spectrogram has {} frames, onset strength has {}",
                self.spectrogram_db.len(),
                frames
            )));
        }
        if !self.hop_duration.is_finite() || self.hop_duration <= 0.0 {
            return Err(CoreError::InvalidFeatures(format!(
                "hop duration must be positive, got {}",
                self.hop_duration
            )));
        }

        let mut previous: Option<usize> = None;
        for &frame in &self.beat_frames {
            if frame >= frames {
                return Err(CoreError::FrameOutOfRange { frame, len: frames });
            }
            check_beat_values(
                frame,
                self.onset_strength[frame],
                self.rms[frame],
                &self.spectrogram_db[frame],
            )?;
            if previous.is_some_and(|p| p >= frame) {
                return Err(CoreError::InvalidFeatures(format!(
                    "beat frames must be strictly increasing ({} follows {})",
                    frame,
                    previous.unwrap_or_default()
                )));
            }
            previous = Some(frame);
        }

        Ok(())
    }
}

/// Reject a beat whose sampled values cannot be classified or normalized
pub(crate) fn check_beat_values(frame: usize, onset: f64, rms: f64, column: &[f64]) -> Result<()> {
    if column.is_empty() {
        return Err(CoreError::InvalidFeatures(format!(
            "spectrogram column at frame {} is empty",
            frame
        )));
    }
    if !onset.is_finite() || !rms.is_finite() {
        return Err(CoreError::InvalidFeatures(format!(
            "non-finite onset strength or rms at frame {}",
            frame
        )));
    }
    if column.iter().any(|v| !v.is_finite()) {
        return Err(CoreError::InvalidFeatures(format!(
            "non-finite spectrogram value at frame {}",
            frame
        )));
    }
    Ok(())
}
