//! The category-conditioned classification cascade
//!
//! ```text
//! image -> preprocess -> decider -> match category -> brand[category]
//!                                                   -> subtype[category] (optional)
//!                                                   -> compose label
//! ```
//!
//! Every stage is a pure function of the tensor; a failing stage aborts the
//! remaining stages and no partial prediction is returned.

use crate::classifier::ClassificationResult;
use crate::config::CascadeConfig;
use crate::preprocess::{ImagePreprocessor, ImageTensor};
use crate::registry::ModelRegistry;
use fashionlens_core::{Category, Prediction, Result};
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

/// Cascade stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Category,
    Brand,
    Subtype,
}

/// Outcome of one stage
#[derive(Debug, Clone, Serialize)]
pub struct StageResult {
    pub stage: Stage,

    /// Name of the classifier that ran
    pub classifier: String,

    pub label: String,
    pub index: usize,
    pub score: f32,
    pub latency_us: u64,
}

impl StageResult {
    fn from_result<L: ToString>(stage: Stage, classifier: &str, result: &ClassificationResult<L>) -> Self {
        Self {
            stage,
            classifier: classifier.to_string(),
            label: result.label.to_string(),
            index: result.index,
            score: result.score,
            latency_us: result.latency_us,
        }
    }
}

/// Complete cascade execution result
#[derive(Debug, Clone, Serialize)]
pub struct CascadeResult {
    pub prediction: Prediction,

    /// Stages in execution order
    pub stages: Vec<StageResult>,

    /// Total execution time, preprocessing excluded
    pub total_latency_us: u64,
}

impl CascadeResult {
    /// Composed display label
    pub fn label(&self) -> String {
        self.prediction.label()
    }
}

/// Preprocessor plus the shared, read-only model registry
#[derive(Debug, Clone)]
pub struct ClassificationCascade {
    registry: Arc<ModelRegistry>,
    preprocessor: ImagePreprocessor,
}

impl ClassificationCascade {
    pub fn new(registry: impl Into<Arc<ModelRegistry>>, preprocessor: ImagePreprocessor) -> Self {
        Self {
            registry: registry.into(),
            preprocessor,
        }
    }

    /// Load every classifier in `config` and size the preprocessor to match
    pub fn from_config(config: &CascadeConfig) -> Result<Self> {
        let registry = ModelRegistry::from_config(config)?;
        Ok(Self::new(registry, ImagePreprocessor::new(config.input)))
    }

    /// Load from a YAML configuration file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let config = CascadeConfig::from_file(path)?;
        Self::from_config(&config)
    }

    pub fn registry(&self) -> &Arc<ModelRegistry> {
        &self.registry
    }

    pub fn preprocessor(&self) -> &ImagePreprocessor {
        &self.preprocessor
    }

    /// Predict the top-level category
    pub fn decide(&self, tensor: &ImageTensor) -> Result<Category> {
        Ok(self.registry.decider().classify(tensor)?.label)
    }

    /// Predict the brand within `category`
    pub fn classify_brand(&self, tensor: &ImageTensor, category: Category) -> Result<String> {
        Ok(self.registry.brand(category).classify(tensor)?.label)
    }

    /// Predict the sub-type within `category`; `None` when it has no sub-type classifier
    pub fn classify_subtype(&self, tensor: &ImageTensor, category: Category) -> Result<Option<String>> {
        match self.registry.subtype(category) {
            Some(classifier) => Ok(Some(classifier.classify(tensor)?.label)),
            None => Ok(None),
        }
    }

    /// Run all stages on a preprocessed tensor
    pub fn classify_tensor(&self, tensor: &ImageTensor) -> Result<CascadeResult> {
        let start = Instant::now();
        let mut stages = Vec::with_capacity(3);

        let decider = self.registry.decider();
        let decided = decider.classify(tensor)?;
        let category = decided.label;
        debug!(%category, score = decided.score, "decided category");
        stages.push(StageResult::from_result(Stage::Category, decider.name(), &decided));

        let brand_classifier = self.registry.brand(category);
        let brand = brand_classifier.classify(tensor)?;
        stages.push(StageResult::from_result(Stage::Brand, brand_classifier.name(), &brand));

        let subtype = match self.registry.subtype(category) {
            Some(subtype_classifier) => {
                let subtype = subtype_classifier.classify(tensor)?;
                stages.push(StageResult::from_result(
                    Stage::Subtype,
                    subtype_classifier.name(),
                    &subtype,
                ));
                Some(subtype.label)
            }
            None => None,
        };

        let prediction = Prediction {
            category,
            subtype,
            brand: brand.label,
        };

        Ok(CascadeResult {
            prediction,
            stages,
            total_latency_us: start.elapsed().as_micros() as u64,
        })
    }

    /// Load, preprocess and classify a stored image
    pub fn classify_path(&self, path: impl AsRef<Path>) -> Result<CascadeResult> {
        let path = path.as_ref();
        let tensor = self.preprocessor.load_and_preprocess(path)?;
        let result = self.classify_tensor(&tensor)?;
        info!(
            path = %path.display(),
            latency_us = result.total_latency_us,
            "classified as '{}'",
            result.label()
        );
        Ok(result)
    }

    /// Decode, preprocess and classify an in-memory image
    pub fn classify_bytes(&self, bytes: &[u8]) -> Result<CascadeResult> {
        let tensor = self.preprocessor.preprocess_bytes(bytes)?;
        self.classify_tensor(&tensor)
    }
}
