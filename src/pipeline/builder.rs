use std::path::PathBuf;
use std::sync::Arc;

use crate::config::PipelineConfig;
use crate::error::DurationError;
use crate::features::SpectralCache;
use crate::phonemes::{DictionaryCache, DictionarySource, PronunciationDictionary};
use crate::pipeline::defaults::{
    BoundaryMappedEstimator, DictionaryPhonemizer, EnergyRefinedEstimator,
};
use crate::pipeline::runtime::{DurationPipeline, DurationPipelineParts};
use crate::pipeline::traits::{DurationEstimator, EstimatorKind, Phonemizer};

/// Construction root for [`DurationPipeline`]; owns the dictionary and
/// spectral caches handed to every component.
pub struct DurationPipelineBuilder {
    config: PipelineConfig,
    estimator_kind: EstimatorKind,
    estimator: Option<Box<dyn DurationEstimator>>,
    phonemizer: Option<Box<dyn Phonemizer>>,
    dictionary: Option<Arc<PronunciationDictionary>>,
    spectral_cache: Option<Arc<SpectralCache>>,
}

impl DurationPipelineBuilder {
    pub fn new(config: PipelineConfig) -> Self {
        Self {
            config,
            estimator_kind: EstimatorKind::EnergyRefined,
            estimator: None,
            phonemizer: None,
            dictionary: None,
            spectral_cache: None,
        }
    }

    pub fn with_estimator_kind(mut self, estimator_kind: EstimatorKind) -> Self {
        self.estimator_kind = estimator_kind;
        self
    }

    pub fn with_estimator(mut self, estimator: Box<dyn DurationEstimator>) -> Self {
        self.estimator = Some(estimator);
        self
    }

    pub fn with_phonemizer(mut self, phonemizer: Box<dyn Phonemizer>) -> Self {
        self.phonemizer = Some(phonemizer);
        self
    }

    /// Skips lazy loading and uses this dictionary as-is.
    pub fn with_dictionary(mut self, dictionary: Arc<PronunciationDictionary>) -> Self {
        self.dictionary = Some(dictionary);
        self
    }

    /// Shares window/filterbank/FFT memo tables with other pipelines.
    pub fn with_spectral_cache(mut self, cache: Arc<SpectralCache>) -> Self {
        self.spectral_cache = Some(cache);
        self
    }

    pub fn build(self) -> Result<DurationPipeline, DurationError> {
        let estimator_config = self.config.estimator;
        estimator_config.validate()?;

        let source = match (self.dictionary, self.config.dictionary_path) {
            (Some(dictionary), _) => DictionarySource::Preloaded(dictionary),
            (None, Some(path)) if !path.trim().is_empty() => {
                DictionarySource::File(PathBuf::from(path))
            }
            (None, _) => DictionarySource::Bundled,
        };

        let spectral_cache = self
            .spectral_cache
            .unwrap_or_else(|| Arc::new(SpectralCache::new()));

        let estimator = match self.estimator {
            Some(estimator) => estimator,
            None => match self.estimator_kind {
                EstimatorKind::EnergyRefined => Box::new(EnergyRefinedEstimator::new(
                    estimator_config.clone(),
                    Arc::clone(&spectral_cache),
                )?) as Box<dyn DurationEstimator>,
                EstimatorKind::BoundaryMapped => Box::new(BoundaryMappedEstimator::new(
                    estimator_config.clone(),
                    Arc::clone(&spectral_cache),
                )?) as Box<dyn DurationEstimator>,
            },
        };

        Ok(DurationPipeline::from_parts(DurationPipelineParts {
            dictionary: DictionaryCache::new(source),
            phonemizer: self
                .phonemizer
                .unwrap_or_else(|| Box::new(DictionaryPhonemizer)),
            estimator,
            config: estimator_config,
        }))
    }
}
