//! Prior-plus-energy duration strategy.
//!
//! The linguistic prior sets the proportions; spectral flux per phoneme
//! segment nudges each phoneme within `[factor_min, factor_max]`; a final
//! rescale restores the exact audio length. When every segment carries the
//! same energy the factors are uniform and the output equals the prior.

use crate::config::EstimatorConfig;
use crate::error::DurationError;
use crate::features::{compute_mel_spectrogram, compute_spectral_flux, SpectralCache};
use crate::phonemes::base_durations;
use crate::types::Waveform;

/// Mean flux over `phone_count` equal-width, contiguous frame segments.
///
/// Segment `i` covers `floor(i·w)..floor((i+1)·w)` with `w = frames / phones`.
/// Every segment must hold at least one frame, so fewer frames than phonemes
/// is degenerate.
pub fn segment_energies(flux: &[f32], phone_count: usize) -> Result<Vec<f64>, DurationError> {
    if phone_count == 0 {
        return Err(DurationError::degenerate(
            "energy segmentation needs at least one phoneme",
        ));
    }
    if flux.is_empty() {
        return Err(DurationError::degenerate(
            "audio too short for a single analysis frame",
        ));
    }
    if flux.len() < phone_count {
        return Err(DurationError::degenerate(format!(
            "{} analysis frames cannot cover {phone_count} phonemes",
            flux.len()
        )));
    }

    let frames_per_phone = flux.len() as f64 / phone_count as f64;
    Ok((0..phone_count)
        .map(|i| {
            let start = (i as f64 * frames_per_phone).floor() as usize;
            let end = (((i + 1) as f64 * frames_per_phone).floor() as usize).min(flux.len());
            let sum: f64 = flux[start..end].iter().map(|&f| f as f64).sum();
            sum / (end - start).max(1) as f64
        })
        .collect())
}

/// Applies clamped energy factors to `base` and rescales to the total.
pub fn refine_durations(
    base: &[f64],
    energies: &[f64],
    factor_min: f64,
    factor_max: f64,
    total_duration_s: f64,
) -> Result<Vec<f64>, DurationError> {
    if base.len() != energies.len() {
        return Err(DurationError::invalid_input(format!(
            "energy count {} does not match phoneme count {}",
            energies.len(),
            base.len()
        )));
    }
    if base.is_empty() {
        return Err(DurationError::degenerate("no durations to refine"));
    }
    if !(factor_min > 0.0 && factor_min <= factor_max) {
        return Err(DurationError::invalid_input(format!(
            "energy factor bounds must satisfy 0 < min <= max, got [{factor_min}, {factor_max}]"
        )));
    }

    let mean_energy = energies.iter().sum::<f64>() / energies.len() as f64;
    let avg_energy = if mean_energy == 0.0 { 1.0 } else { mean_energy };
    let span = factor_max - factor_min;

    let mut adjusted: Vec<f64> = base
        .iter()
        .zip(energies)
        .map(|(&duration, &energy)| {
            let factor = (factor_min + span * (energy / avg_energy)).clamp(factor_min, factor_max);
            duration * factor
        })
        .collect();

    super::normalize::rescale_to_total(&mut adjusted, total_duration_s)?;
    Ok(adjusted)
}

/// Full energy-refined estimate for one decoded utterance.
pub fn estimate_energy_refined(
    waveform: &Waveform,
    phonemes: &[String],
    config: &EstimatorConfig,
    cache: &SpectralCache,
) -> Result<Vec<f64>, DurationError> {
    if phonemes.is_empty() {
        return Err(DurationError::degenerate("no phonemes to time"));
    }
    let total_duration_s = waveform.duration_s();
    if !(total_duration_s > 0.0) {
        return Err(DurationError::degenerate("audio has zero length"));
    }

    let base = base_durations(phonemes, total_duration_s)?;
    let mel_frames = compute_mel_spectrogram(
        &waveform.samples,
        waveform.sample_rate_hz,
        &config.spectral,
        cache,
    )?;
    let flux = compute_spectral_flux(&mel_frames);
    let energies = segment_energies(&flux, phonemes.len())?;

    tracing::debug!(
        phonemes = phonemes.len(),
        frames = mel_frames.len(),
        total_duration_s,
        "energy: refining prior durations"
    );

    refine_durations(
        &base,
        &energies,
        config.energy_factor_min,
        config.energy_factor_max,
        total_duration_s,
    )
}
