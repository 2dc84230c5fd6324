pub mod audio;
pub mod config;
pub mod error;
pub mod estimation;
pub mod features;
pub mod phonemes;
pub mod pipeline;
pub mod report;
pub mod types;

pub use config::{EstimatorConfig, PipelineConfig, SpectralConfig};
pub use error::DurationError;
pub use phonemes::PronunciationDictionary;
pub use pipeline::builder::DurationPipelineBuilder;
pub use pipeline::runtime::DurationPipeline;
pub use pipeline::traits::{DurationEstimator, EstimatorKind, Phonemizer};
pub use types::{DurationOutcome, PhonemeTiming, Waveform};
