//! Beat events emitted by the beatmap builder

use serde::{Deserialize, Serialize};

/// Visual density class of a beat event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum BeatType {
    /// Low-energy beat, kept at most every other occurrence in a run
    Low = 0,
    /// Beat above the low-energy threshold
    Regular = 1,
    /// Extra event injected above the high-energy threshold
    Climax = 2,
}

impl BeatType {
    /// Points awarded for hitting an event of this type
    pub fn points(self) -> u32 {
        match self {
            BeatType::Low => 50,
            BeatType::Regular => 100,
            BeatType::Climax => 150,
        }
    }
}

impl From<BeatType> for u8 {
    fn from(beat_type: BeatType) -> Self {
        beat_type as u8
    }
}

impl TryFrom<u8> for BeatType {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(BeatType::Low),
            1 => Ok(BeatType::Regular),
            2 => Ok(BeatType::Climax),
            other => Err(format!("unknown beat type {}", other)),
        }
    }
}

/// One visual event on the beatmap
///
/// `x` and `y` hold raw feature values until the builder normalizes them into
/// `[0, 1]`; after that the event is never modified again.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BeatEvent {
    /// Seconds from the start of the clip
    pub time: f64,
    /// RMS energy at the beat (normalized)
    pub x: f64,
    /// Spectral peak bin at the beat (normalized)
    pub y: f64,
    /// Depth, always 0
    pub z: i32,
    /// Onset strength at the beat frame
    pub energy: f64,
    /// Energy the classification was made on
    pub avg_energy: f64,
    /// Density class
    #[serde(rename = "type")]
    pub beat_type: BeatType,
    /// Points, one-to-one with `beat_type`
    pub points: u32,
}

impl BeatEvent {
    /// Create an event with raw (unnormalized) axes
    pub fn new(beat_type: BeatType, time: f64, x: f64, y: f64, energy: f64, avg_energy: f64) -> Self {
        Self {
            time,
            x,
            y,
            z: 0,
            energy,
            avg_energy,
            beat_type,
            points: beat_type.points(),
        }
    }
}
