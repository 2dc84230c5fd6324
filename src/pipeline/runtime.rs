use crate::audio::decode_audio_bytes;
use crate::config::EstimatorConfig;
use crate::error::DurationError;
use crate::estimation::normalize::{enforce_total, uniform_split};
use crate::phonemes::DictionaryCache;
use crate::pipeline::traits::{DurationEstimator, EstimatorKind, Phonemizer};
use crate::types::{build_timeline, DurationOutcome, PhonemeTiming, Waveform};

/// Phonemizer plus duration estimator with the uniform-split safety net.
///
/// Every successful result has one positive duration per phoneme and sums
/// to the requested audio length within `fine_tolerance_s`.
pub struct DurationPipeline {
    dictionary: DictionaryCache,
    phonemizer: Box<dyn Phonemizer>,
    estimator: Box<dyn DurationEstimator>,
    config: EstimatorConfig,
}

pub(crate) struct DurationPipelineParts {
    pub dictionary: DictionaryCache,
    pub phonemizer: Box<dyn Phonemizer>,
    pub estimator: Box<dyn DurationEstimator>,
    pub config: EstimatorConfig,
}

impl DurationPipeline {
    pub(crate) fn from_parts(parts: DurationPipelineParts) -> Self {
        Self {
            dictionary: parts.dictionary,
            phonemizer: parts.phonemizer,
            estimator: parts.estimator,
            config: parts.config,
        }
    }

    pub fn estimator_kind(&self) -> EstimatorKind {
        self.estimator.kind()
    }

    pub fn config(&self) -> &EstimatorConfig {
        &self.config
    }

    pub fn dictionary_loaded(&self) -> bool {
        self.dictionary.is_loaded()
    }

    pub fn phonemize(&self, text: &str) -> Result<Vec<String>, DurationError> {
        let dictionary = self.dictionary.get()?;
        Ok(self.phonemizer.phonemize(text, &dictionary))
    }

    pub fn estimate_durations(
        &self,
        audio_bytes: &[u8],
        phonemes: &[String],
        audio_duration_s: f64,
    ) -> Result<Vec<f64>, DurationError> {
        self.estimate_outcome(audio_bytes, phonemes, audio_duration_s)
            .map(|outcome| outcome.durations)
    }

    /// Decodes `audio_bytes` and estimates durations that sum to
    /// `audio_duration_s`. Decode and estimator failures are absorbed into
    /// the uniform split; only unusable requests are returned as errors.
    pub fn estimate_outcome(
        &self,
        audio_bytes: &[u8],
        phonemes: &[String],
        audio_duration_s: f64,
    ) -> Result<DurationOutcome, DurationError> {
        if let Some(outcome) = self.check_request(phonemes, audio_duration_s)? {
            return Ok(outcome);
        }
        let estimate = decode_audio_bytes(audio_bytes)
            .and_then(|waveform| self.estimator.estimate(&waveform, phonemes));
        self.integrate(estimate, phonemes.len(), audio_duration_s)
    }

    /// Same as [`Self::estimate_durations`] on an already decoded waveform,
    /// targeting the waveform's own length.
    pub fn estimate_waveform(
        &self,
        waveform: &Waveform,
        phonemes: &[String],
    ) -> Result<Vec<f64>, DurationError> {
        let audio_duration_s = waveform.duration_s();
        if let Some(outcome) = self.check_request(phonemes, audio_duration_s)? {
            return Ok(outcome.durations);
        }
        let estimate = self.estimator.estimate(waveform, phonemes);
        self.integrate(estimate, phonemes.len(), audio_duration_s)
            .map(|outcome| outcome.durations)
    }

    /// Phonemizes `text` and lays the durations out as a running timeline.
    pub fn timeline(
        &self,
        text: &str,
        audio_bytes: &[u8],
        audio_duration_s: f64,
    ) -> Result<Vec<PhonemeTiming>, DurationError> {
        let phonemes = self.phonemize(text)?;
        let durations = self.estimate_durations(audio_bytes, &phonemes, audio_duration_s)?;
        Ok(build_timeline(&phonemes, &durations))
    }

    /// `Ok(Some(empty))` for the empty request, `Ok(None)` to proceed.
    fn check_request(
        &self,
        phonemes: &[String],
        audio_duration_s: f64,
    ) -> Result<Option<DurationOutcome>, DurationError> {
        if phonemes.is_empty() {
            if audio_duration_s.is_finite() && audio_duration_s.abs() < self.config.fine_tolerance_s
            {
                return Ok(Some(DurationOutcome {
                    durations: Vec::new(),
                    fallback: None,
                }));
            }
            return Err(DurationError::degenerate(format!(
                "no phonemes to cover {audio_duration_s} s of audio"
            )));
        }
        if !(audio_duration_s.is_finite() && audio_duration_s > 0.0) {
            return Err(DurationError::degenerate(format!(
                "audio duration {audio_duration_s} s cannot hold {} phonemes",
                phonemes.len()
            )));
        }
        Ok(None)
    }

    fn integrate(
        &self,
        estimate: Result<Vec<f64>, DurationError>,
        phone_count: usize,
        audio_duration_s: f64,
    ) -> Result<DurationOutcome, DurationError> {
        let checked = estimate.and_then(|durations| {
            validate_estimate(&durations, phone_count)?;
            Ok(durations)
        });

        let (mut durations, fallback) = match checked {
            Ok(durations) => (durations, None),
            Err(err) => {
                tracing::warn!(
                    estimator = self.estimator.kind().as_str(),
                    phonemes = phone_count,
                    audio_duration_s,
                    recoverable = err.is_recoverable(),
                    error = %err,
                    "duration estimate failed; using uniform split"
                );
                (
                    uniform_split(phone_count, audio_duration_s)?,
                    Some(err.to_string()),
                )
            }
        };

        enforce_total(
            &mut durations,
            audio_duration_s,
            self.config.coarse_tolerance_s,
        )?;
        enforce_total(&mut durations, audio_duration_s, self.config.fine_tolerance_s)?;

        Ok(DurationOutcome {
            durations,
            fallback,
        })
    }
}

fn validate_estimate(durations: &[f64], phone_count: usize) -> Result<(), DurationError> {
    if durations.len() != phone_count {
        return Err(DurationError::invalid_input(format!(
            "estimator returned {} durations for {phone_count} phonemes",
            durations.len()
        )));
    }
    if let Some(bad) = durations.iter().find(|d| !(d.is_finite() && **d > 0.0)) {
        return Err(DurationError::invalid_input(format!(
            "estimator returned non-positive duration {bad}"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::audio::tests::encode_wav_f32;
    use crate::config::PipelineConfig;
    use crate::phonemes::PronunciationDictionary;
    use crate::pipeline::builder::DurationPipelineBuilder;

    struct BrokenEstimator(Vec<f64>);

    impl DurationEstimator for BrokenEstimator {
        fn estimate(
            &self,
            _waveform: &Waveform,
            _phonemes: &[String],
        ) -> Result<Vec<f64>, DurationError> {
            Ok(self.0.clone())
        }

        fn kind(&self) -> EstimatorKind {
            EstimatorKind::BoundaryMapped
        }
    }

    fn phones(symbols: &[&str]) -> Vec<String> {
        symbols.iter().map(|s| s.to_string()).collect()
    }

    fn pipeline() -> DurationPipeline {
        DurationPipelineBuilder::new(PipelineConfig::default())
            .build()
            .expect("build")
    }

    fn assert_sums_to(durations: &[f64], total: f64) {
        let sum: f64 = durations.iter().sum();
        assert!((sum - total).abs() <= 1e-3, "sum {sum} vs {total}");
        assert!(durations.iter().all(|&d| d > 0.0));
    }

    #[test]
    fn decode_failure_falls_back_to_uniform_split() {
        let outcome = pipeline()
            .estimate_outcome(b"not audio at all", &phones(&["K", "AE", "T", "S"]), 2.0)
            .expect("fallback");
        assert!(outcome.used_fallback());
        assert_eq!(outcome.durations, vec![0.5; 4]);
    }

    #[test]
    fn energy_path_sums_to_reported_duration() {
        let samples: Vec<f32> = (0..16_000)
            .map(|i| ((i as f32) * 0.05).sin() * if i % 4_000 < 2_000 { 0.8 } else { 0.1 })
            .collect();
        let bytes = encode_wav_f32(16_000, 1, &samples);
        // reported length differs from decoded length by more than 10 ms
        let outcome = pipeline()
            .estimate_outcome(&bytes, &phones(&["HH", "AH", "L", "OW"]), 1.25)
            .expect("estimate");
        assert!(!outcome.used_fallback());
        assert_eq!(outcome.durations.len(), 4);
        assert_sums_to(&outcome.durations, 1.25);
    }

    #[test]
    fn audio_too_short_for_a_frame_falls_back() {
        let bytes = encode_wav_f32(16_000, 1, &vec![0.2; 400]);
        let outcome = pipeline()
            .estimate_outcome(&bytes, &phones(&["AH", "B"]), 0.025)
            .expect("fallback");
        assert!(outcome.used_fallback());
        assert_sums_to(&outcome.durations, 0.025);
    }

    #[test]
    fn more_phonemes_than_frames_falls_back_to_uniform() {
        // 1024 + 3 * 128 samples give exactly three analysis frames
        let samples: Vec<f32> = (0..1_408).map(|i| ((i as f32) * 0.3).sin() * 0.5).collect();
        let bytes = encode_wav_f32(16_000, 1, &samples);
        let phonemes = phones(&["HH", "AH", "L", "OW", "W", "ER"]);
        let outcome = pipeline()
            .estimate_outcome(&bytes, &phonemes, 0.088)
            .expect("fallback");
        assert!(outcome.used_fallback());
        for d in &outcome.durations {
            assert!((d - 0.088 / 6.0).abs() < 1e-12);
        }
    }

    #[test]
    fn zero_phonemes_and_zero_duration_is_empty() {
        let durations = pipeline()
            .estimate_durations(b"", &[], 0.0)
            .expect("empty request");
        assert!(durations.is_empty());
    }

    #[test]
    fn zero_phonemes_with_audio_is_rejected() {
        assert!(matches!(
            pipeline().estimate_durations(b"", &[], 1.0),
            Err(DurationError::DegenerateInput { .. })
        ));
    }

    #[test]
    fn non_positive_duration_is_rejected() {
        for duration in [0.0, -1.0, f64::NAN, f64::INFINITY] {
            assert!(matches!(
                pipeline().estimate_durations(b"", &phones(&["AH"]), duration),
                Err(DurationError::DegenerateInput { .. })
            ));
        }
    }

    #[test]
    fn invalid_estimator_output_is_replaced() {
        let wav = encode_wav_f32(16_000, 1, &vec![0.0; 16_000]);
        for broken in [vec![0.5], vec![0.5, 0.0], vec![f64::NAN, 0.5]] {
            let pipeline = DurationPipelineBuilder::new(PipelineConfig::default())
                .with_estimator(Box::new(BrokenEstimator(broken)))
                .build()
                .expect("build");
            let outcome = pipeline
                .estimate_outcome(&wav, &phones(&["AH", "B"]), 1.0)
                .expect("fallback");
            assert!(outcome.used_fallback());
            assert_eq!(outcome.durations, vec![0.5, 0.5]);
        }
    }

    #[test]
    fn close_sums_are_rescaled_by_the_fine_guard() {
        let wav = encode_wav_f32(16_000, 1, &vec![0.0; 16_000]);
        let pipeline = DurationPipelineBuilder::new(PipelineConfig::default())
            .with_estimator(Box::new(BrokenEstimator(vec![0.5, 0.505])))
            .build()
            .expect("build");
        let outcome = pipeline
            .estimate_outcome(&wav, &phones(&["AH", "B"]), 1.0)
            .expect("estimate");
        assert!(!outcome.used_fallback());
        assert!((outcome.durations.iter().sum::<f64>() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn timeline_starts_at_zero_and_accumulates() {
        let dictionary = Arc::new(PronunciationDictionary::from_entries([(
            "HI",
            vec!["HH", "AY1"],
        )]));
        let pipeline = DurationPipelineBuilder::new(PipelineConfig::default())
            .with_dictionary(dictionary)
            .build()
            .expect("build");
        let timeline = pipeline.timeline("hi", b"garbage", 0.8).expect("timeline");
        assert_eq!(timeline.len(), 2);
        assert_eq!(timeline[0].phoneme, "HH");
        assert_eq!(timeline[0].start_s, 0.0);
        assert!((timeline[1].start_s - 0.4).abs() < 1e-12);
        assert!((timeline[1].start_s + timeline[1].duration_s - 0.8).abs() < 1e-9);
    }

    #[test]
    fn estimate_waveform_targets_waveform_length() {
        let waveform = Waveform::new(8_000, vec![0.0; 12_000]);
        let durations = pipeline()
            .estimate_waveform(&waveform, &phones(&["S", "IY"]))
            .expect("estimate");
        assert_sums_to(&durations, 1.5);
    }
}
