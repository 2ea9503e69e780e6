//! Min-max normalization of beat event axes

use super::event::BeatEvent;
use super::stats::round_to;
use crate::error::Axis;
use crate::{CoreError, Result};

fn bounds(values: impl Iterator<Item = f64>) -> (f64, f64) {
    values.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
        (lo.min(v), hi.max(v))
    })
}

/// Scale `x` and `y` of every event independently into `[0, 1]`.
///
/// Fails with [`CoreError::DegenerateRange`] when an axis has no spread; events
/// are left untouched in that case.
pub fn min_max_normalize(events: &mut [BeatEvent], decimals: u32) -> Result<()> {
    if events.is_empty() {
        return Ok(());
    }

    let (x_min, x_max) = bounds(events.iter().map(|e| e.x));
    let (y_min, y_max) = bounds(events.iter().map(|e| e.y));

    let x_span = x_max - x_min;
    let y_span = y_max - y_min;
    if x_span.is_nan() || x_span <= 0.0 {
        return Err(CoreError::DegenerateRange { axis: Axis::X });
    }
    if y_span.is_nan() || y_span <= 0.0 {
        return Err(CoreError::DegenerateRange { axis: Axis::Y });
    }

    for event in events.iter_mut() {
        event.x = round_to((event.x - x_min) / x_span, decimals);
        event.y = round_to((event.y - y_min) / y_span, decimals);
    }

    Ok(())
}
