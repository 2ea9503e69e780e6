//! Small numeric helpers for beat classification

/// Percentile with linear interpolation between closest ranks.
///
/// `p` is in percent. Returns `None` for an empty slice.
pub fn percentile(values: &[f64], p: f64) -> Option<f64> {
    if values.is_empty() {
        return None;
    }

    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);

    let rank = (p.clamp(0.0, 100.0) / 100.0) * (sorted.len() - 1) as f64;
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;
    let frac = rank - lower as f64;

    Some(sorted[lower] + (sorted[upper] - sorted[lower]) * frac)
}

/// Index of the largest value; the first one wins on ties
pub fn argmax(values: &[f64]) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (i, &v) in values.iter().enumerate() {
        match best {
            Some((_, max)) if v <= max => {}
            Some(_) if v.is_nan() => {}
            _ => best = Some((i, v)),
        }
    }
    best.map(|(i, _)| i)
}

/// Mean of `values[i - window ..= i + window]`, clipped to the slice
pub fn windowed_mean(values: &[f64], i: usize, window: usize) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let start = i.saturating_sub(window);
    let end = (i + window + 1).min(values.len());
    let slice = &values[start..end];
    slice.iter().sum::<f64>() / slice.len() as f64
}

/// Most decimals an `f64` carries meaningfully; larger requests are capped
pub const MAX_DECIMALS: u32 = 15;

/// Round to a fixed number of decimals, at most [`MAX_DECIMALS`]
pub fn round_to(value: f64, decimals: u32) -> f64 {
    let scale = 10f64.powi(decimals.min(MAX_DECIMALS) as i32);
    (value * scale).round() / scale
}
