//! fashionlens Classifiers
//!
//! Image preprocessing and the three-stage classifier cascade.
//!
//! A request flows through:
//! - [`ImagePreprocessor`]: decode, scale to [0, 1], resize to the input size
//! - the category decider
//! - the brand classifier of the decided category
//! - the sub-type classifier of the decided category, when deployed
//!
//! All classifiers are loaded eagerly into a [`ModelRegistry`] and shared
//! read-only for the lifetime of the process.

pub mod cascade;
pub mod classifier;
pub mod cnn;
pub mod config;
pub mod model_loader;
pub mod preprocess;
pub mod registry;

pub use cascade::{CascadeResult, ClassificationCascade, Stage, StageResult};
pub use classifier::{argmax, ClassificationResult, Classifier, LabeledClassifier};
pub use cnn::{CnnArchitecture, CnnClassifier};
pub use config::{CascadeConfig, DeviceSpec, LabelSpec, ModelFormatSpec, ModelSourceSpec, ModelSpec};
pub use model_loader::{DeviceType, LoadedWeights, ModelFormat, ModelSource, WeightsConfig};
pub use preprocess::{ImagePreprocessor, ImageTensor, InputSize};
pub use registry::ModelRegistry;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::cascade::{CascadeResult, ClassificationCascade};
    pub use crate::classifier::{Classifier, LabeledClassifier};
    pub use crate::config::CascadeConfig;
    pub use crate::preprocess::{ImagePreprocessor, ImageTensor, InputSize};
    pub use crate::registry::ModelRegistry;
}
