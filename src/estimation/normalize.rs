use crate::error::DurationError;

/// Every phoneme gets `total / count`.
pub fn uniform_split(count: usize, total_duration_s: f64) -> Result<Vec<f64>, DurationError> {
    if count == 0 {
        return Err(DurationError::degenerate("cannot split across zero phonemes"));
    }
    Ok(vec![total_duration_s / count as f64; count])
}

/// Scales `durations` so they sum to `total_duration_s`. Returns the factor.
pub fn rescale_to_total(
    durations: &mut [f64],
    total_duration_s: f64,
) -> Result<f64, DurationError> {
    let sum: f64 = durations.iter().sum();
    if !(sum.is_finite() && sum > 0.0) {
        return Err(DurationError::degenerate(format!(
            "cannot rescale durations with sum {sum}"
        )));
    }
    let scale = total_duration_s / sum;
    for d in durations.iter_mut() {
        *d *= scale;
    }
    Ok(scale)
}

/// Rescales only when the sum misses the total by more than `tolerance_s`.
pub fn enforce_total(
    durations: &mut [f64],
    total_duration_s: f64,
    tolerance_s: f64,
) -> Result<bool, DurationError> {
    let sum: f64 = durations.iter().sum();
    if (sum - total_duration_s).abs() <= tolerance_s {
        return Ok(false);
    }
    let scale = rescale_to_total(durations, total_duration_s)?;
    tracing::debug!(
        sum_s = sum,
        target_s = total_duration_s,
        scale,
        "rescaled durations to audio length"
    );
    Ok(true)
}
