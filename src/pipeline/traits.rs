use crate::error::DurationError;
use crate::phonemes::PronunciationDictionary;
use crate::types::Waveform;

pub trait Phonemizer: Send + Sync {
    fn phonemize(&self, text: &str, dictionary: &PronunciationDictionary) -> Vec<String>;
}

/// One strategy for splitting an utterance's duration across its phonemes.
///
/// Implementations return one duration per phoneme; the runtime enforces
/// the sum and positivity invariants and falls back on any error.
pub trait DurationEstimator: Send + Sync {
    fn estimate(
        &self,
        waveform: &Waveform,
        phonemes: &[String],
    ) -> Result<Vec<f64>, DurationError>;

    fn kind(&self) -> EstimatorKind;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EstimatorKind {
    /// Linguistic prior reshaped by per-segment spectral-flux energy.
    EnergyRefined,
    /// Flux peaks taken as boundaries, merged or padded to the phoneme count.
    BoundaryMapped,
}

impl EstimatorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::EnergyRefined => "energy_refined",
            Self::BoundaryMapped => "boundary_mapped",
        }
    }
}
