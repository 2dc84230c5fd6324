use std::sync::Arc;

use crate::config::EstimatorConfig;
use crate::error::DurationError;
use crate::estimation::boundaries::{boundaries_to_durations, detect_phone_boundaries};
use crate::estimation::energy::estimate_energy_refined;
use crate::features::{compute_mel_spectrogram, compute_spectral_flux, SpectralCache};
use crate::phonemes::{phonemize_text, PronunciationDictionary};
use crate::pipeline::traits::{DurationEstimator, EstimatorKind, Phonemizer};
use crate::types::Waveform;

pub struct DictionaryPhonemizer;

impl Phonemizer for DictionaryPhonemizer {
    fn phonemize(&self, text: &str, dictionary: &PronunciationDictionary) -> Vec<String> {
        phonemize_text(text, dictionary)
    }
}

pub struct EnergyRefinedEstimator {
    config: EstimatorConfig,
    cache: Arc<SpectralCache>,
}

impl EnergyRefinedEstimator {
    pub fn new(config: EstimatorConfig, cache: Arc<SpectralCache>) -> Result<Self, DurationError> {
        config.validate()?;
        Ok(Self { config, cache })
    }
}

impl DurationEstimator for EnergyRefinedEstimator {
    fn estimate(
        &self,
        waveform: &Waveform,
        phonemes: &[String],
    ) -> Result<Vec<f64>, DurationError> {
        estimate_energy_refined(waveform, phonemes, &self.config, &self.cache)
    }

    fn kind(&self) -> EstimatorKind {
        EstimatorKind::EnergyRefined
    }
}

pub struct BoundaryMappedEstimator {
    config: EstimatorConfig,
    cache: Arc<SpectralCache>,
}

impl BoundaryMappedEstimator {
    pub fn new(config: EstimatorConfig, cache: Arc<SpectralCache>) -> Result<Self, DurationError> {
        config.validate()?;
        Ok(Self { config, cache })
    }
}

impl DurationEstimator for BoundaryMappedEstimator {
    fn estimate(
        &self,
        waveform: &Waveform,
        phonemes: &[String],
    ) -> Result<Vec<f64>, DurationError> {
        if phonemes.is_empty() {
            return Err(DurationError::degenerate("no phonemes to time"));
        }
        let spectral = &self.config.spectral;
        let mel_frames = compute_mel_spectrogram(
            &waveform.samples,
            waveform.sample_rate_hz,
            spectral,
            &self.cache,
        )?;
        let flux = compute_spectral_flux(&mel_frames);
        let peaks = detect_phone_boundaries(&flux, phonemes.len(), self.config.peak_threshold_std);
        boundaries_to_durations(
            &peaks,
            spectral.hop_length,
            waveform.sample_rate_hz,
            phonemes.len(),
            waveform.duration_s(),
            self.config.min_phone_duration_s,
        )
    }

    fn kind(&self) -> EstimatorKind {
        EstimatorKind::BoundaryMapped
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn phones(symbols: &[&str]) -> Vec<String> {
        symbols.iter().map(|s| s.to_string()).collect()
    }

    /// Clicks every `spacing` samples over `len` samples of silence.
    fn click_train(len: usize, spacing: usize) -> Vec<f32> {
        let mut samples = vec![0.0f32; len];
        for pos in (spacing..len).step_by(spacing) {
            samples[pos] = 0.8;
        }
        samples
    }

    #[test]
    fn dictionary_phonemizer_phonemize() {
        let dict = PronunciationDictionary::from_entries([("HI", vec!["HH", "AY1"])]);
        let phonemes = DictionaryPhonemizer.phonemize("hi", &dict);
        assert_eq!(phonemes, ["HH", "AY"]);
    }

    #[test]
    fn energy_refined_estimator_matches_free_function() {
        let cache = Arc::new(SpectralCache::new());
        let config = EstimatorConfig::default();
        let estimator =
            EnergyRefinedEstimator::new(config.clone(), Arc::clone(&cache)).expect("valid config");
        let waveform = Waveform::new(16_000, click_train(16_000, 2_000));
        let phonemes = phones(&["HH", "AH", "L", "OW"]);
        let durations = estimator.estimate(&waveform, &phonemes).unwrap();
        let expected = estimate_energy_refined(&waveform, &phonemes, &config, &cache).unwrap();
        assert_eq!(durations, expected);
        assert_eq!(estimator.kind(), EstimatorKind::EnergyRefined);
    }

    #[test]
    fn boundary_mapped_estimator_sums_to_audio_length() {
        let estimator = BoundaryMappedEstimator::new(
            EstimatorConfig::default(),
            Arc::new(SpectralCache::new()),
        )
        .expect("valid config");
        let waveform = Waveform::new(16_000, click_train(32_000, 4_000));
        let phonemes = phones(&["K", "AE", "T"]);
        let durations = estimator.estimate(&waveform, &phonemes).unwrap();
        assert_eq!(durations.len(), 3);
        assert!((durations.iter().sum::<f64>() - 2.0).abs() < 1e-9);
        assert!(durations.iter().all(|&d| d > 0.0));
        assert_eq!(estimator.kind(), EstimatorKind::BoundaryMapped);
    }

    #[test]
    fn boundary_mapped_estimator_on_silence_is_uniform() {
        let estimator = BoundaryMappedEstimator::new(
            EstimatorConfig::default(),
            Arc::new(SpectralCache::new()),
        )
        .expect("valid config");
        let waveform = Waveform::new(16_000, vec![0.0; 16_000]);
        let durations = estimator
            .estimate(&waveform, &phones(&["AH", "AH", "AH", "AH"]))
            .unwrap();
        for d in durations {
            assert!((d - 0.25).abs() < 1e-12);
        }
    }

    #[test]
    fn constructors_reject_invalid_configs() {
        let zero_hop = EstimatorConfig {
            spectral: crate::config::SpectralConfig {
                hop_length: 0,
                ..Default::default()
            },
            ..EstimatorConfig::default()
        };
        let inverted = EstimatorConfig {
            energy_factor_min: 1.2,
            energy_factor_max: 0.8,
            ..EstimatorConfig::default()
        };
        for config in [zero_hop, inverted] {
            assert!(matches!(
                BoundaryMappedEstimator::new(config.clone(), Arc::new(SpectralCache::new())),
                Err(DurationError::InvalidInput { .. })
            ));
            assert!(matches!(
                EnergyRefinedEstimator::new(config, Arc::new(SpectralCache::new())),
                Err(DurationError::InvalidInput { .. })
            ));
        }
    }

    #[test]
    fn estimator_kind_labels() {
        assert_eq!(EstimatorKind::EnergyRefined.as_str(), "energy_refined");
        assert_eq!(EstimatorKind::BoundaryMapped.as_str(), "boundary_mapped");
    }
}
