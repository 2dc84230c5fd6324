use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::DurationError;

/// STFT and mel-filterbank parameters shared by every spectral feature.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpectralConfig {
    pub n_fft: usize,
    pub hop_length: usize,
    pub n_mels: usize,
    pub f_min_hz: f64,
}

impl SpectralConfig {
    pub const DEFAULT_N_FFT: usize = 1024;
    pub const DEFAULT_HOP_LENGTH: usize = 128;
    pub const DEFAULT_N_MELS: usize = 40;
    pub const DEFAULT_F_MIN_HZ: f64 = 20.0;

    /// Seconds between the starts of two consecutive frames.
    pub fn frame_stride_s(&self, sample_rate_hz: u32) -> f64 {
        self.hop_length as f64 / sample_rate_hz as f64
    }

    pub(crate) fn validate(&self) -> Result<(), DurationError> {
        if self.n_fft < 4 || self.n_fft % 2 != 0 {
            return Err(DurationError::invalid_input(format!(
                "n_fft must be an even number >= 4, got {}",
                self.n_fft
            )));
        }
        if self.hop_length == 0 {
            return Err(DurationError::invalid_input("hop_length must be >= 1"));
        }
        if self.n_mels == 0 {
            return Err(DurationError::invalid_input("n_mels must be >= 1"));
        }
        if !self.f_min_hz.is_finite() || self.f_min_hz < 0.0 {
            return Err(DurationError::invalid_input(format!(
                "f_min_hz must be a finite non-negative frequency, got {}",
                self.f_min_hz
            )));
        }
        Ok(())
    }
}

impl Default for SpectralConfig {
    fn default() -> Self {
        Self {
            n_fft: Self::DEFAULT_N_FFT,
            hop_length: Self::DEFAULT_HOP_LENGTH,
            n_mels: Self::DEFAULT_N_MELS,
            f_min_hz: Self::DEFAULT_F_MIN_HZ,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EstimatorConfig {
    pub spectral: SpectralConfig,
    /// Floor applied to boundary-mapped segments before renormalization.
    pub min_phone_duration_s: f64,
    /// Peak threshold is `mean + peak_threshold_std * std_dev` of the flux.
    pub peak_threshold_std: f64,
    pub energy_factor_min: f64,
    pub energy_factor_max: f64,
    /// Sum error above which the integration layer rescales once.
    pub coarse_tolerance_s: f64,
    /// Sum error above which the final guard rescales again.
    pub fine_tolerance_s: f64,
}

impl EstimatorConfig {
    pub const DEFAULT_MIN_PHONE_DURATION_S: f64 = 0.02;
    pub const DEFAULT_PEAK_THRESHOLD_STD: f64 = 0.5;
    pub const DEFAULT_ENERGY_FACTOR_MIN: f64 = 0.8;
    pub const DEFAULT_ENERGY_FACTOR_MAX: f64 = 1.2;
    pub const DEFAULT_COARSE_TOLERANCE_S: f64 = 0.01;
    pub const DEFAULT_FINE_TOLERANCE_S: f64 = 0.001;

    pub fn load(path: &Path) -> Result<Self, DurationError> {
        let data = std::fs::read_to_string(path)
            .map_err(|e| DurationError::io("read estimator config", e))?;
        let config: Self = serde_json::from_str(&data)
            .map_err(|e| DurationError::json("parse estimator config", e))?;
        config.validate()?;
        Ok(config)
    }

    pub(crate) fn validate(&self) -> Result<(), DurationError> {
        self.spectral.validate()?;
        if !(self.min_phone_duration_s >= 0.0) {
            return Err(DurationError::invalid_input(
                "min_phone_duration_s must be >= 0",
            ));
        }
        if !(self.energy_factor_min > 0.0 && self.energy_factor_min <= self.energy_factor_max) {
            return Err(DurationError::invalid_input(format!(
                "energy factor bounds must satisfy 0 < min <= max, got [{}, {}]",
                self.energy_factor_min, self.energy_factor_max
            )));
        }
        if !(self.coarse_tolerance_s >= 0.0 && self.fine_tolerance_s >= 0.0) {
            return Err(DurationError::invalid_input(
                "rescale tolerances must be >= 0",
            ));
        }
        Ok(())
    }
}

impl Default for EstimatorConfig {
    fn default() -> Self {
        Self {
            spectral: SpectralConfig::default(),
            min_phone_duration_s: Self::DEFAULT_MIN_PHONE_DURATION_S,
            peak_threshold_std: Self::DEFAULT_PEAK_THRESHOLD_STD,
            energy_factor_min: Self::DEFAULT_ENERGY_FACTOR_MIN,
            energy_factor_max: Self::DEFAULT_ENERGY_FACTOR_MAX,
            coarse_tolerance_s: Self::DEFAULT_COARSE_TOLERANCE_S,
            fine_tolerance_s: Self::DEFAULT_FINE_TOLERANCE_S,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct PipelineConfig {
    /// Pronunciation dictionary JSON. `None` uses the bundled resource.
    pub dictionary_path: Option<String>,
    pub estimator: EstimatorConfig,
}
