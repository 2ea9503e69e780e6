//! Beatmap Builder - turns detected beats into visual events
//!
//! Every detected beat is classified against two percentile thresholds computed
//! once per clip over the beats themselves:
//! - above the high threshold (and not the last beat): an extra climax event
//! - above the low threshold: a regular event
//! - otherwise a low event, but never for two low beats in a row

use super::event::{BeatEvent, BeatType};
use super::normalize::min_max_normalize;
use super::stats::{argmax, percentile, round_to, windowed_mean};
use crate::features::{check_beat_values, FeatureFrames};
use crate::{CoreError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

/// Which energy a beat is classified on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum EnergyPolicy {
    /// Onset strength at the beat frame
    #[default]
    Instantaneous,
    /// Mean RMS over the surrounding `±window` beats; climax events land
    /// halfway to the next beat
    MovingAverage {
        /// Beats on each side of the current one
        #[serde(default = "default_window")]
        window: usize,
    },
}

fn default_window() -> usize {
    2
}

/// Ordering of the returned events
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventOrder {
    /// Order in which the classification loop produced them
    #[default]
    Generation,
    /// Stable sort by time
    Chronological,
}

/// Beatmap synthesis settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BeatmapConfig {
    /// Percentile (0-100) above which a beat also gets a climax event
    pub high_percentile: f64,
    /// Percentile (0-100) above which a beat is regular rather than low
    pub low_percentile: f64,
    /// Classification energy
    pub energy_policy: EnergyPolicy,
    /// Output ordering
    pub order: EventOrder,
    /// Decimals kept on event times
    pub time_decimals: u32,
    /// Decimals kept on normalized axes
    pub axis_decimals: u32,
}

impl Default for BeatmapConfig {
    fn default() -> Self {
        Self {
            high_percentile: 80.0,
            low_percentile: 50.0,
            energy_policy: EnergyPolicy::Instantaneous,
            order: EventOrder::Generation,
            time_decimals: 2,
            axis_decimals: 2,
        }
    }
}

/// Classification thresholds of one clip
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Thresholds {
    /// Climax threshold
    pub high: f64,
    /// Regular/low threshold
    pub low: f64,
}

/// Normalized beatmap of one clip
#[derive(Debug, Clone, PartialEq)]
pub struct Beatmap {
    events: Vec<BeatEvent>,
    thresholds: Thresholds,
}

impl Beatmap {
    /// Events in output order
    pub fn events(&self) -> &[BeatEvent] {
        &self.events
    }

    /// Consume the map, keeping only the events
    pub fn into_events(self) -> Vec<BeatEvent> {
        self.events
    }

    /// Thresholds the events were classified with
    pub fn thresholds(&self) -> Thresholds {
        self.thresholds
    }

    /// Number of events
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// True when no event was emitted
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Number of events of one type
    pub fn count(&self, beat_type: BeatType) -> usize {
        self.events
            .iter()
            .filter(|e| e.beat_type == beat_type)
            .count()
    }

    /// Number of events of every type
    pub fn counts_by_type(&self) -> BTreeMap<BeatType, usize> {
        let mut counts = BTreeMap::new();
        for event in &self.events {
            *counts.entry(event.beat_type).or_insert(0) += 1;
        }
        counts
    }

    /// Serialize the event list
    pub fn to_json_string(&self, pretty: bool) -> Result<String> {
        let json = if pretty {
            serde_json::to_string_pretty(&self.events)?
        } else {
            serde_json::to_string(&self.events)?
        };
        Ok(json)
    }
}

/// Builds beatmaps from feature frames
#[derive(Debug, Clone, Default)]
pub struct BeatmapBuilder {
    config: BeatmapConfig,
}

impl BeatmapBuilder {
    /// Create a builder with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a builder with custom settings
    pub fn with_config(config: BeatmapConfig) -> Self {
        Self { config }
    }

    /// Current settings
    pub fn config(&self) -> &BeatmapConfig {
        &self.config
    }

    /// Build from a complete feature set
    pub fn build(&self, features: &FeatureFrames) -> Result<Beatmap> {
        if features.beat_frames.is_empty() {
            return Err(CoreError::InsufficientData);
        }
        features.validate()?;
        self.build_from_signals(
            &features.onset_strength,
            &features.rms,
            &features.spectrogram_db,
            &features.beat_frames,
            features.hop_duration,
        )
    }

    /// Build from raw per-frame signals.
    ///
    /// `spectrogram_db` is time-major. Pure: identical inputs give identical output.
    pub fn build_from_signals(
        &self,
        onset_strength: &[f64],
        rms: &[f64],
        spectrogram_db: &[Vec<f64>],
        beat_frames: &[usize],
        hop_duration: f64,
    ) -> Result<Beatmap> {
        if beat_frames.is_empty() {
            return Err(CoreError::InsufficientData);
        }
        if !hop_duration.is_finite() || hop_duration <= 0.0 {
            return Err(CoreError::InvalidFeatures(format!(
                "hop duration must be positive, got {}",
                hop_duration
            )));
        }
        for &frame in beat_frames {
            check_frame(frame, onset_strength.len())?;
            check_frame(frame, rms.len())?;
            check_frame(frame, spectrogram_db.len())?;
            check_beat_values(
                frame,
                onset_strength[frame],
                rms[frame],
                &spectrogram_db[frame],
            )?;
        }

        let times: Vec<f64> = beat_frames
            .iter()
            .map(|&frame| frame as f64 * hop_duration)
            .collect();

        let energies: Vec<f64> = match self.config.energy_policy {
            EnergyPolicy::Instantaneous => beat_frames
                .iter()
                .map(|&frame| onset_strength[frame])
                .collect(),
            EnergyPolicy::MovingAverage { window } => {
                let beat_rms: Vec<f64> = beat_frames.iter().map(|&frame| rms[frame]).collect();
                (0..beat_rms.len())
                    .map(|i| windowed_mean(&beat_rms, i, window))
                    .collect()
            }
        };

        let thresholds = Thresholds {
            high: percentile(&energies, self.config.high_percentile)
                .ok_or(CoreError::InsufficientData)?,
            low: percentile(&energies, self.config.low_percentile)
                .ok_or(CoreError::InsufficientData)?,
        };
        debug!(
            "Beatmap thresholds: high={:.4}, low={:.4} over {} beats",
            thresholds.high,
            thresholds.low,
            beat_frames.len()
        );

        let mut events = Vec::with_capacity(beat_frames.len() * 2);
        let last = beat_frames.len() - 1;
        let mut no_skip = true;

        for (i, &frame) in beat_frames.iter().enumerate() {
            let e = energies[i];
            let time = times[i];
            let x = rms[frame];
            let y = argmax(&spectrogram_db[frame])
                .ok_or_else(|| {
                    CoreError::InvalidFeatures(format!(
                        "spectrogram column at frame {} is empty",
                        frame
                    ))
                })? as f64;
            let energy = onset_strength[frame];
            let event = |beat_type, at: f64| {
                BeatEvent::new(
                    beat_type,
                    round_to(at, self.config.time_decimals),
                    x,
                    y,
                    energy,
                    e,
                )
            };

            if e > thresholds.high && i < last {
                let at = match self.config.energy_policy {
                    EnergyPolicy::Instantaneous => time,
                    EnergyPolicy::MovingAverage { .. } => (time + times[i + 1]) / 2.0,
                };
                events.push(event(BeatType::Climax, at));
            }

            if e > thresholds.low {
                events.push(event(BeatType::Regular, time));
                no_skip = true;
            } else if no_skip {
                events.push(event(BeatType::Low, time));
                no_skip = false;
            } else {
                no_skip = true;
            }
        }

        min_max_normalize(&mut events, self.config.axis_decimals)?;

        if self.config.order == EventOrder::Chronological {
            events.sort_by(|a, b| a.time.total_cmp(&b.time));
        }

        debug!(
            "Beatmap built: {} events from {} beats",
            events.len(),
            beat_frames.len()
        );

        Ok(Beatmap { events, thresholds })
    }
}

fn check_frame(frame: usize, len: usize) -> Result<()> {
    if frame >= len {
        return Err(CoreError::FrameOutOfRange { frame, len });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Signals with one-hot spectrogram columns so `y` equals `peaks[frame]`
    fn signals(onset: &[f64], rms: &[f64], peaks: &[usize]) -> (Vec<f64>, Vec<f64>, Vec<Vec<f64>>) {
        let spectrogram = peaks
            .iter()
            .map(|&peak| {
                let mut column = vec![-80.0; 8];
                column[peak] = 0.0;
                column
            })
            .collect();
        (onset.to_vec(), rms.to_vec(), spectrogram)
    }

    #[test]
    fn test_empty_beats_is_insufficient() {
        let (onset, rms, spectrogram) = signals(&[1.0, 2.0], &[0.1, 0.2], &[0, 1]);
        let err = BeatmapBuilder::new()
            .build_from_signals(&onset, &rms, &spectrogram, &[], 0.1)
            .unwrap_err();
        assert!(matches!(err, CoreError::InsufficientData));
    }

    #[test]
    fn test_out_of_range_frame() {
        let (onset, rms, spectrogram) = signals(&[1.0, 2.0], &[0.1, 0.2], &[0, 1]);
        let err = BeatmapBuilder::new()
            .build_from_signals(&onset, &rms, &spectrogram, &[0, 2], 0.1)
            .unwrap_err();
        assert!(matches!(err, CoreError::FrameOutOfRange { frame: 2, len: 2 }));
    }

    #[test]
    fn test_nan_rms_at_beat_is_rejected() {
        let (onset, rms, spectrogram) =
            signals(&[1.0, 5.0, 3.0], &[f64::NAN, 0.6, 0.4], &[1, 7, 3]);
        let err = BeatmapBuilder::new()
            .build_from_signals(&onset, &rms, &spectrogram, &[0, 1, 2], 1.0)
            .unwrap_err();
        assert!(matches!(err, CoreError::InvalidFeatures(_)));
    }

    #[test]
    fn test_nan_onset_in_long_clip_is_rejected() {
        let onset: Vec<f64> = (0..400)
            .map(|i| if i % 3 == 0 { f64::NAN } else { (i % 7) as f64 })
            .collect();
        let rms: Vec<f64> = (0..400).map(|i| (i % 11) as f64 / 10.0).collect();
        let peaks: Vec<usize> = (0..400).map(|i| i % 8).collect();
        let (onset, rms, spectrogram) = signals(&onset, &rms, &peaks);
        let beats: Vec<usize> = (0..400).collect();

        let err = BeatmapBuilder::new()
            .build_from_signals(&onset, &rms, &spectrogram, &beats, 0.1)
            .unwrap_err();
        assert!(matches!(err, CoreError::InvalidFeatures(_)));
    }

    #[test]
    fn test_invalid_hop_duration() {
        let (onset, rms, spectrogram) = signals(&[1.0, 5.0, 3.0], &[0.2, 0.6, 0.4], &[1, 7, 3]);
        let err = BeatmapBuilder::new()
            .build_from_signals(&onset, &rms, &spectrogram, &[0, 1, 2], f64::NAN)
            .unwrap_err();
        assert!(matches!(err, CoreError::InvalidFeatures(_)));
    }

    #[test]
    fn test_oversized_decimals_stay_finite() {
        let config = BeatmapConfig {
            axis_decimals: 400,
            time_decimals: 400,
            ..Default::default()
        };
        let (onset, rms, spectrogram) = signals(&[1.0, 5.0, 3.0], &[0.2, 0.6, 0.4], &[1, 7, 3]);
        let map = BeatmapBuilder::with_config(config)
            .build_from_signals(&onset, &rms, &spectrogram, &[0, 1, 2], 1.0)
            .unwrap();

        for event in map.events() {
            assert!((0.0..=1.0).contains(&event.x));
            assert!((0.0..=1.0).contains(&event.y));
            assert!(event.time.is_finite());
        }
    }

    #[test]
    fn test_climax_is_additive() {
        // thresholds over [1, 1, 10, 1, 1]: high = 2.8, low = 1.0
        let (onset, rms, spectrogram) = signals(
            &[1.0, 1.0, 10.0, 1.0, 1.0],
            &[0.1, 0.2, 0.9, 0.3, 0.4],
            &[0, 1, 5, 2, 3],
        );
        let map = BeatmapBuilder::new()
            .build_from_signals(&onset, &rms, &spectrogram, &[0, 1, 2, 3, 4], 0.5)
            .unwrap();

        let types: Vec<BeatType> = map.events().iter().map(|e| e.beat_type).collect();
        assert_eq!(
            types,
            vec![
                BeatType::Low,
                BeatType::Climax,
                BeatType::Regular,
                BeatType::Low,
            ]
        );
        assert_eq!(map.events()[1].time, 1.0);
        assert_eq!(map.events()[2].time, 1.0);
        assert_eq!(map.count(BeatType::Climax), 1);
    }

    #[test]
    fn test_last_beat_never_climaxes() {
        let (onset, rms, spectrogram) = signals(&[1.0, 1.0, 1.0, 10.0], &[0.1, 0.2, 0.3, 0.9], &[0, 1, 2, 3]);
        let map = BeatmapBuilder::new()
            .build_from_signals(&onset, &rms, &spectrogram, &[0, 1, 2, 3], 0.5)
            .unwrap();

        assert_eq!(map.count(BeatType::Climax), 0);
        let last = map.events().last().unwrap();
        assert_eq!(last.beat_type, BeatType::Regular);
        assert_eq!(last.time, 1.5);
    }

    #[test]
    fn test_axes_follow_rms_and_spectral_peak() {
        let (onset, rms, spectrogram) = signals(&[1.0, 5.0, 3.0], &[0.2, 0.6, 0.4], &[1, 7, 3]);
        let map = BeatmapBuilder::new()
            .build_from_signals(&onset, &rms, &spectrogram, &[0, 1, 2], 1.0)
            .unwrap();

        // low@0 (rms .2, bin 1), climax@1 + regular@1 (rms .6, bin 7), low@2 (rms .4, bin 3)
        let xs: Vec<f64> = map.events().iter().map(|e| e.x).collect();
        let ys: Vec<f64> = map.events().iter().map(|e| e.y).collect();
        assert_eq!(xs, vec![0.0, 1.0, 1.0, 0.5]);
        assert_eq!(ys, vec![0.0, 1.0, 1.0, 0.33]);
        assert_eq!(map.events()[1].energy, 5.0);
        assert_eq!(map.events()[1].avg_energy, 5.0);
    }

    #[test]
    fn test_moving_average_places_climax_between_beats() {
        let config = BeatmapConfig {
            energy_policy: EnergyPolicy::MovingAverage { window: 0 },
            ..Default::default()
        };
        let (onset, rms, spectrogram) = signals(
            &[0.0, 0.0, 0.0, 0.0, 0.0],
            &[0.1, 0.1, 0.9, 0.1, 0.2],
            &[0, 1, 2, 3, 4],
        );
        let map = BeatmapBuilder::with_config(config)
            .build_from_signals(&onset, &rms, &spectrogram, &[0, 1, 2, 3, 4], 1.0)
            .unwrap();

        let climax = map
            .events()
            .iter()
            .find(|e| e.beat_type == BeatType::Climax)
            .unwrap();
        assert_eq!(climax.time, 2.5);
        assert_eq!(climax.avg_energy, 0.9);
        assert_eq!(climax.energy, 0.0);
    }

    #[test]
    fn test_moving_average_smooths_energy() {
        let config = BeatmapConfig {
            energy_policy: EnergyPolicy::MovingAverage { window: 2 },
            ..Default::default()
        };
        let (onset, rms, spectrogram) = signals(
            &[1.0, 1.0, 1.0, 1.0, 1.0],
            &[0.1, 0.2, 0.3, 0.4, 0.5],
            &[0, 1, 2, 3, 4],
        );
        let map = BeatmapBuilder::with_config(config)
            .build_from_signals(&onset, &rms, &spectrogram, &[0, 1, 2, 3, 4], 1.0)
            .unwrap();

        let first = &map.events()[0];
        assert!((first.avg_energy - 0.2).abs() < 1e-12);
    }

    #[test]
    fn test_chronological_order_sorts_interpolated_climax() {
        let config = BeatmapConfig {
            energy_policy: EnergyPolicy::MovingAverage { window: 0 },
            order: EventOrder::Chronological,
            ..Default::default()
        };
        let (onset, rms, spectrogram) = signals(
            &[0.0, 0.0, 0.0, 0.0, 0.0],
            &[0.1, 0.1, 0.9, 0.1, 0.2],
            &[0, 1, 2, 3, 4],
        );
        let map = BeatmapBuilder::with_config(config)
            .build_from_signals(&onset, &rms, &spectrogram, &[0, 1, 2, 3, 4], 1.0)
            .unwrap();

        let times: Vec<f64> = map.events().iter().map(|e| e.time).collect();
        let mut sorted = times.clone();
        sorted.sort_by(|a, b| a.partial_cmp(b).unwrap());
        assert_eq!(times, sorted);
    }

    #[test]
    fn test_json_output() {
        let (onset, rms, spectrogram) = signals(&[1.0, 5.0, 3.0], &[0.2, 0.6, 0.4], &[1, 7, 3]);
        let map = BeatmapBuilder::new()
            .build_from_signals(&onset, &rms, &spectrogram, &[0, 1, 2], 1.0)
            .unwrap();
        let json: serde_json::Value =
            serde_json::from_str(&map.to_json_string(false).unwrap()).unwrap();
        assert_eq!(json.as_array().unwrap().len(), map.len());
        assert_eq!(json[1]["type"], 2);
    }
}
