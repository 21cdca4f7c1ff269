//! Model registry: every classifier of the cascade, loaded once at startup

use crate::classifier::{Classifier, LabeledClassifier};
use crate::cnn::CnnClassifier;
use crate::config::{CascadeConfig, ModelSpec};
use crate::model_loader::LoadedWeights;
use fashionlens_core::{Category, CategoryMap, ClassLabels, Result};
use std::path::Path;
use std::sync::Arc;
use tracing::info;

/// Immutable set of classifiers used by the cascade
///
/// Brand and sub-type classifiers are held in a [`CategoryMap`], so every
/// category the decider can emit has its brand classifier. Sub-type
/// classifiers are optional per category; a category without one runs two
/// stages.
#[derive(Debug)]
pub struct ModelRegistry {
    decider: LabeledClassifier<Category>,
    brands: CategoryMap<LabeledClassifier>,
    subtypes: CategoryMap<Option<LabeledClassifier>>,
}

impl ModelRegistry {
    /// Create a registry from already constructed classifiers
    pub fn new(
        decider: LabeledClassifier<Category>,
        brands: CategoryMap<LabeledClassifier>,
        subtypes: CategoryMap<Option<LabeledClassifier>>,
    ) -> Self {
        Self {
            decider,
            brands,
            subtypes,
        }
    }

    /// Load every classifier named in `config`
    ///
    /// Order: decider, then brand classifiers, then sub-type classifiers, each
    /// family in [`Category::ALL`] order. The first failure aborts loading.
    pub fn from_config(config: &CascadeConfig) -> Result<Self> {
        let subtype_total = config.subtypes.iter().filter(|(_, spec)| spec.is_some()).count();
        let total = 4 + subtype_total;
        info!("Initializing model registry with {} models", total);

        let decider_labels = config.labels_for(&config.decider)?.parse::<Category>()?;
        let decider = LabeledClassifier::new(
            load_cnn(config, &config.decider, "decider", decider_labels.len())?,
            decider_labels,
        )?;
        info!("✓ Loaded category decider");

        let brands = CategoryMap::try_from_fn(|category| -> Result<LabeledClassifier> {
            let classifier = load_labeled(config, config.brands.get(category), "brand", category)?;
            info!("✓ Loaded brand classifier for {}", category);
            Ok(classifier)
        })?;

        let subtypes = CategoryMap::try_from_fn(|category| -> Result<Option<LabeledClassifier>> {
            match config.subtypes.get(category) {
                Some(spec) => {
                    let classifier = load_labeled(config, spec, "subtype", category)?;
                    info!("✓ Loaded sub-type classifier for {}", category);
                    Ok(Some(classifier))
                }
                None => {
                    info!("No sub-type classifier for {}; labels omit the sub-type", category);
                    Ok(None)
                }
            }
        })?;

        info!("Model registry initialized with {} models", total);

        Ok(Self::new(decider, brands, subtypes))
    }

    /// Load the registry from a YAML configuration file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let config = CascadeConfig::from_file(path)?;
        Self::from_config(&config)
    }

    pub fn decider(&self) -> &LabeledClassifier<Category> {
        &self.decider
    }

    /// Brand classifier for a category
    pub fn brand(&self, category: Category) -> &LabeledClassifier {
        self.brands.get(category)
    }

    /// Sub-type classifier for a category, if one is deployed
    pub fn subtype(&self, category: Category) -> Option<&LabeledClassifier> {
        self.subtypes.get(category).as_ref()
    }

    /// Whether any category has a sub-type classifier
    pub fn has_subtypes(&self) -> bool {
        self.subtype_count() > 0
    }

    /// Number of categories with a sub-type classifier
    pub fn subtype_count(&self) -> usize {
        self.subtypes.iter().filter(|(_, c)| c.is_some()).count()
    }

    /// Number of loaded classifiers
    pub fn count(&self) -> usize {
        1 + 3 + self.subtype_count()
    }
}

fn load_labeled(
    config: &CascadeConfig,
    spec: &ModelSpec,
    family: &str,
    category: Category,
) -> Result<LabeledClassifier> {
    let labels: ClassLabels = config.labels_for(spec)?;
    let name = format!("{}/{}", family, category.as_str().to_lowercase());
    let classifier = load_cnn(config, spec, &name, labels.len())?;
    LabeledClassifier::new(classifier, labels)
}

fn load_cnn(
    config: &CascadeConfig,
    spec: &ModelSpec,
    name: &str,
    num_classes: usize,
) -> Result<Arc<dyn Classifier>> {
    info!("Loading model: {}", name);
    let weights = LoadedWeights::load(&config.weights_config(spec))?;
    let model = CnnClassifier::load(
        name,
        config.architecture_for(spec),
        config.input,
        num_classes,
        &weights,
    )?;
    Ok(Arc::new(model))
}
