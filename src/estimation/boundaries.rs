//! Onset-driven duration strategy: pick spectral-flux peaks as phoneme
//! boundaries, then force the boundary count to match the phoneme count.

use crate::error::DurationError;

/// Keep the strongest peaks only once there are this many per phoneme.
const PEAK_EXCESS_RATIO: f64 = 1.5;
/// How many peaks per phoneme survive the strongest-first cut.
const PEAK_KEEP_RATIO: f64 = 1.2;
/// Neighbors on each side a peak must strictly exceed.
const PEAK_HALF_WIDTH: usize = 2;

/// Adaptive peak picking over a flux sequence.
///
/// A frame is a peak when it is strictly above its two nearest neighbors on
/// each side and above `mean + threshold_std * std_dev`. Returned indices
/// lie in `[2, len - 3]` and are strictly ascending.
pub fn detect_phone_boundaries(flux: &[f32], target_count: usize, threshold_std: f64) -> Vec<usize> {
    if flux.len() < 2 * PEAK_HALF_WIDTH + 1 {
        return Vec::new();
    }

    let n = flux.len() as f64;
    let mean = flux.iter().map(|&f| f as f64).sum::<f64>() / n;
    let variance = flux
        .iter()
        .map(|&f| {
            let d = f as f64 - mean;
            d * d
        })
        .sum::<f64>()
        / n;
    let threshold = mean + threshold_std * variance.sqrt();

    let mut peaks: Vec<usize> = (PEAK_HALF_WIDTH..flux.len() - PEAK_HALF_WIDTH)
        .filter(|&i| {
            let v = flux[i];
            (1..=PEAK_HALF_WIDTH).all(|d| v > flux[i - d] && v > flux[i + d])
                && v as f64 > threshold
        })
        .collect();

    if peaks.len() as f64 > target_count as f64 * PEAK_EXCESS_RATIO {
        let keep = (target_count as f64 * PEAK_KEEP_RATIO).ceil() as usize;
        // stable: equal flux keeps the earlier frame first
        peaks.sort_by(|&a, &b| flux[b].total_cmp(&flux[a]));
        peaks.truncate(keep);
        peaks.sort_unstable();
    }

    tracing::debug!(
        frames = flux.len(),
        target_count,
        peaks = peaks.len(),
        threshold = format!("{threshold:.3}"),
        "boundaries: picked flux peaks"
    );
    peaks
}

/// Drops interior boundaries until `times` spans exactly `segment_count`
/// segments.
///
/// Each pass finds the adjacent pair with the smallest gap (first one on
/// ties) and removes its earlier endpoint; the leading 0 is never removed.
pub fn merge_closest_boundaries(mut times: Vec<f64>, segment_count: usize) -> Vec<f64> {
    while times.len() > segment_count + 1 && times.len() > 2 {
        let mut min_gap = f64::INFINITY;
        let mut min_idx = 1usize;
        for i in 1..times.len() - 1 {
            let gap = times[i + 1] - times[i];
            if gap < min_gap {
                min_gap = gap;
                min_idx = i;
            }
        }
        times.remove(min_idx);
    }
    times
}

/// Converts boundary frames into one duration per phoneme.
///
/// Too few boundaries fall back to a uniform grid; too many are merged.
/// Segments are floored at `min_duration_s`, then rescaled to sum to
/// `total_duration_s`.
pub fn boundaries_to_durations(
    peaks: &[usize],
    hop_length: usize,
    sample_rate_hz: u32,
    phone_count: usize,
    total_duration_s: f64,
    min_duration_s: f64,
) -> Result<Vec<f64>, DurationError> {
    if phone_count == 0 {
        return Err(DurationError::degenerate(
            "boundary mapping needs at least one phoneme",
        ));
    }
    if sample_rate_hz == 0 || !(total_duration_s > 0.0) {
        return Err(DurationError::degenerate(format!(
            "boundary mapping needs positive audio duration, got {total_duration_s}s at {sample_rate_hz} Hz"
        )));
    }

    let frame_s = hop_length as f64 / sample_rate_hz as f64;
    let mut times = Vec::with_capacity(peaks.len() + 2);
    times.push(0.0);
    times.extend(peaks.iter().map(|&p| p as f64 * frame_s));
    times.push(total_duration_s);

    let segments = times.len() - 1;
    if segments < phone_count {
        let step = total_duration_s / phone_count as f64;
        times = (0..=phone_count).map(|i| i as f64 * step).collect();
    } else if segments > phone_count {
        times = merge_closest_boundaries(times, phone_count);
    }

    let mut durations: Vec<f64> = times
        .windows(2)
        .map(|pair| (pair[1] - pair[0]).max(min_duration_s))
        .collect();
    super::normalize::rescale_to_total(&mut durations, total_duration_s)?;
    Ok(durations)
}
