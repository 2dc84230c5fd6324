//! Linguistic duration prior.
//!
//! Vowels and diphthongs run long, stops short, everything else in between.
//! The weights are relative; only their ratios matter.

use crate::error::DurationError;

/// Weight for a symbol missing from the table.
pub const DEFAULT_WEIGHT: f64 = 1.0;

pub fn phoneme_weight(phoneme: &str) -> f64 {
    match phoneme {
        "AA" | "AO" | "EY" | "UW" => 1.2,
        "AE" | "ER" | "IY" => 1.1,
        "AW" | "AY" | "OW" | "OY" => 1.3,
        "AH" | "IH" => 0.9,
        "EH" | "UH" => 1.0,

        "B" | "P" | "T" | "D" | "K" | "G" => 0.6,

        "F" | "V" | "TH" | "DH" => 0.9,
        "S" | "Z" | "SH" | "ZH" => 1.0,
        "HH" => 0.8,
        "CH" | "JH" => 1.0,

        "M" | "N" => 0.9,
        "NG" => 1.0,
        "L" => 0.9,
        "R" => 1.0,

        "W" | "Y" => 0.8,
        _ => DEFAULT_WEIGHT,
    }
}

/// Splits `total_duration_s` across phonemes in proportion to their weights.
pub fn base_durations(
    phonemes: &[String],
    total_duration_s: f64,
) -> Result<Vec<f64>, DurationError> {
    if phonemes.is_empty() {
        return Err(DurationError::degenerate(
            "duration prior needs at least one phoneme",
        ));
    }
    let weights: Vec<f64> = phonemes.iter().map(|p| phoneme_weight(p)).collect();
    let total_weight: f64 = weights.iter().sum();
    if total_weight <= 0.0 {
        return Err(DurationError::degenerate("phoneme weights sum to zero"));
    }
    Ok(weights
        .into_iter()
        .map(|w| w / total_weight * total_duration_s)
        .collect())
}
