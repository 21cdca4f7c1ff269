//! Classifier trait and common types

use crate::preprocess::ImageTensor;
use fashionlens_core::{ClassLabels, Error, Result};
use std::fmt;
use std::sync::Arc;
use std::time::Instant;

/// Trait for all image classifiers
///
/// Implementations are loaded once and shared read-only; `predict` must not
/// mutate state.
pub trait Classifier: Send + Sync {
    /// Probability vector of length [`Classifier::num_classes`]
    fn predict(&self, input: &ImageTensor) -> Result<Vec<f32>>;

    /// Number of output classes
    fn num_classes(&self) -> usize;

    /// Get the classifier name
    fn name(&self) -> &str;
}

/// Index of the largest score; the first index wins ties
///
/// NaN never beats a number. Returns `None` for an empty slice.
pub fn argmax(scores: &[f32]) -> Option<usize> {
    let mut best: Option<(usize, f32)> = None;
    for (i, &score) in scores.iter().enumerate() {
        match best {
            None => best = Some((i, score)),
            Some((_, current)) if score > current || (current.is_nan() && !score.is_nan()) => {
                best = Some((i, score))
            }
            _ => {}
        }
    }
    best.map(|(i, _)| i)
}

/// Result of classification
#[derive(Debug, Clone, PartialEq)]
pub struct ClassificationResult<L = String> {
    /// Predicted label
    pub label: L,

    /// Output index the label was taken from
    pub index: usize,

    /// Probability of the predicted class
    pub score: f32,

    /// Latency in microseconds
    pub latency_us: u64,
}

/// A classifier paired with the label sequence it was trained against
pub struct LabeledClassifier<L = String> {
    classifier: Arc<dyn Classifier>,
    labels: ClassLabels<L>,
}

impl<L: Clone> LabeledClassifier<L> {
    /// Pair a classifier with its labels; counts must agree
    pub fn new(classifier: Arc<dyn Classifier>, labels: ClassLabels<L>) -> Result<Self> {
        if classifier.num_classes() != labels.len() {
            return Err(Error::config(format!(
                "classifier '{}' has {} classes but {} labels are configured",
                classifier.name(),
                classifier.num_classes(),
                labels.len()
            )));
        }
        Ok(Self { classifier, labels })
    }

    /// Run inference and map the argmax through the labels
    pub fn classify(&self, input: &ImageTensor) -> Result<ClassificationResult<L>> {
        let start = Instant::now();
        let scores = self.classifier.predict(input)?;

        if scores.len() != self.labels.len() {
            return Err(Error::shape_mismatch([self.labels.len()], [scores.len()]));
        }

        let index = argmax(&scores)
            .ok_or_else(|| Error::shape_mismatch([self.labels.len()], [0]))?;
        let label = self
            .labels
            .get(index)
            .cloned()
            .ok_or_else(|| Error::internal(format!("label index {} out of bounds", index)))?;

        Ok(ClassificationResult {
            label,
            index,
            score: scores[index],
            latency_us: start.elapsed().as_micros() as u64,
        })
    }

    pub fn labels(&self) -> &ClassLabels<L> {
        &self.labels
    }

    pub fn name(&self) -> &str {
        self.classifier.name()
    }
}

impl<L: fmt::Debug> fmt::Debug for LabeledClassifier<L> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LabeledClassifier")
            .field("classifier", &self.classifier.name())
            .field("labels", &self.labels)
            .finish()
    }
}
