use serde::Serialize;

/// Decoded mono PCM. Read-only once constructed.
#[derive(Debug, Clone)]
pub struct Waveform {
    pub sample_rate_hz: u32,
    pub samples: Vec<f32>,
}

impl Waveform {
    pub fn new(sample_rate_hz: u32, samples: Vec<f32>) -> Self {
        Self {
            sample_rate_hz,
            samples,
        }
    }

    pub fn duration_s(&self) -> f64 {
        if self.sample_rate_hz == 0 {
            return 0.0;
        }
        self.samples.len() as f64 / self.sample_rate_hz as f64
    }
}

/// One phoneme on the utterance timeline, in seconds.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PhonemeTiming {
    pub phoneme: String,
    /// Running sum of every earlier duration.
    pub start_s: f64,
    pub duration_s: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DurationOutcome {
    pub durations: Vec<f64>,
    /// Why the uniform split replaced the estimator output, if it did.
    pub fallback: Option<String>,
}

impl DurationOutcome {
    pub fn used_fallback(&self) -> bool {
        self.fallback.is_some()
    }
}

/// Pairs phonemes with durations and accumulates start times.
pub fn build_timeline(phonemes: &[String], durations: &[f64]) -> Vec<PhonemeTiming> {
    let mut start_s = 0.0;
    phonemes
        .iter()
        .zip(durations)
        .map(|(phoneme, &duration_s)| {
            let timing = PhonemeTiming {
                phoneme: phoneme.clone(),
                start_s,
                duration_s,
            };
            start_s += duration_s;
            timing
        })
        .collect()
}
