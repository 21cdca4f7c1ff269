//! Configuration for the classifier cascade and weight loading

use crate::cnn::CnnArchitecture;
use crate::model_loader::{DeviceType, ModelFormat, ModelSource, WeightsConfig};
use crate::preprocess::InputSize;
use fashionlens_core::{CategoryMap, ClassLabels, Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Configuration for every classifier in the cascade
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CascadeConfig {
    /// Classifier input size
    #[serde(default)]
    pub input: InputSize,

    /// Default device to use
    #[serde(default)]
    pub default_device: DeviceSpec,

    /// Default network layout, overridable per model
    #[serde(default)]
    pub architecture: CnnArchitecture,

    /// Category decider
    pub decider: ModelSpec,

    /// Brand classifier per category
    pub brands: CategoryMap<ModelSpec>,

    /// Sub-type classifier per category; a category without one runs two stages
    #[serde(default)]
    pub subtypes: CategoryMap<Option<ModelSpec>>,

    /// Directory relative paths are resolved against
    #[serde(skip)]
    pub base_dir: Option<PathBuf>,
}

/// One classifier: where its weights live and which labels it predicts
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelSpec {
    /// Weights source
    #[serde(flatten)]
    pub source: ModelSourceSpec,

    /// Class labels in training order
    pub labels: LabelSpec,

    /// Device override
    pub device: Option<DeviceSpec>,

    /// Weights format
    #[serde(default)]
    pub format: ModelFormatSpec,

    /// Architecture override
    pub architecture: Option<CnnArchitecture>,
}

/// Model source specification (for config files)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ModelSourceSpec {
    /// Local file path
    Local { path: PathBuf },

    /// Hugging Face Hub
    HuggingFace {
        repo_id: String,
        filename: String,
        revision: Option<String>,
    },
}

/// Class labels, inline or one per line in a text file
///
/// Inline entries may be any YAML scalar, so an unquoted brand such as `555`
/// or `true` is read as the label text `"555"` or `"true"`. Numbers are
/// re-rendered by YAML, so `1.50` becomes `"1.5"`; quote such labels.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LabelSpec {
    Inline(Vec<serde_yaml::Value>),
    File { file: PathBuf },
}

/// Device specification (for config files)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceSpec {
    #[default]
    Cpu,
    Cuda { index: Option<usize> },
    Metal { index: Option<usize> },
}

/// Weights format specification
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelFormatSpec {
    #[default]
    SafeTensors,
    PyTorch,
}

impl CascadeConfig {
    /// Load from YAML string
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml)
            .map_err(|e| Error::config(format!("invalid classifier config: {}", e)))
    }

    /// Load from file; relative paths resolve against the file's directory
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::config(format!(
                "failed to read classifier config {}: {}",
                path.display(),
                e
            ))
        })?;

        let mut config = Self::from_yaml(&content)?;
        config.base_dir = path.parent().map(Path::to_path_buf);
        Ok(config)
    }

    /// Whether any category has a sub-type classifier
    pub fn has_subtypes(&self) -> bool {
        self.subtypes.iter().any(|(_, spec)| spec.is_some())
    }

    /// Resolve a possibly relative path from the config
    pub fn resolve_path(&self, path: &Path) -> PathBuf {
        match &self.base_dir {
            Some(base) if path.is_relative() => base.join(path),
            _ => path.to_path_buf(),
        }
    }

    /// Convert to a WeightsConfig for loading
    pub fn weights_config(&self, spec: &ModelSpec) -> WeightsConfig {
        let source = match &spec.source {
            ModelSourceSpec::Local { path } => ModelSource::LocalPath(self.resolve_path(path)),
            ModelSourceSpec::HuggingFace {
                repo_id,
                filename,
                revision,
            } => ModelSource::HuggingFace {
                repo_id: repo_id.clone(),
                revision: revision.clone(),
                filename: filename.clone(),
            },
        };

        let device = spec
            .device
            .as_ref()
            .unwrap_or(&self.default_device)
            .to_device_type();

        let format = match spec.format {
            ModelFormatSpec::SafeTensors => ModelFormat::SafeTensors,
            ModelFormatSpec::PyTorch => ModelFormat::PyTorch,
        };

        WeightsConfig {
            source,
            device,
            format,
        }
    }

    /// Effective architecture for a model
    pub fn architecture_for<'a>(&'a self, spec: &'a ModelSpec) -> &'a CnnArchitecture {
        spec.architecture.as_ref().unwrap_or(&self.architecture)
    }

    /// Read the class labels of a model
    pub fn labels_for(&self, spec: &ModelSpec) -> Result<ClassLabels> {
        let labels = match &spec.labels {
            LabelSpec::Inline(values) => values
                .iter()
                .enumerate()
                .map(|(i, value)| scalar_label(value, i))
                .collect::<Result<Vec<_>>>()?,
            LabelSpec::File { file } => {
                let path = self.resolve_path(file);
                let content = std::fs::read_to_string(&path).map_err(|e| {
                    Error::config(format!("failed to read labels {}: {}", path.display(), e))
                })?;
                parse_label_lines(&content)
            }
        };
        ClassLabels::new(labels)
    }
}

/// Text of an inline YAML label
fn scalar_label(value: &serde_yaml::Value, index: usize) -> Result<String> {
    match value {
        serde_yaml::Value::String(s) => Ok(s.clone()),
        serde_yaml::Value::Number(n) => Ok(n.to_string()),
        serde_yaml::Value::Bool(b) => Ok(b.to_string()),
        other => Err(Error::config(format!(
            "label at index {} must be a string, got {:?}",
            index, other
        ))),
    }
}

/// One label per non-empty line, surrounding whitespace trimmed
pub fn parse_label_lines(content: &str) -> Vec<String> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

impl DeviceSpec {
    /// Convert to DeviceType
    pub fn to_device_type(&self) -> DeviceType {
        match self {
            DeviceSpec::Cpu => DeviceType::Cpu,
            DeviceSpec::Cuda { index } => DeviceType::Cuda(index.unwrap_or(0)),
            DeviceSpec::Metal { index } => DeviceType::Metal(index.unwrap_or(0)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fashionlens_core::Category;

    const THREE_STAGE: &str = r#"
input:
  height: 60
  width: 60
default_device: cpu
architecture:
  conv_channels: [16, 32, 64]
  hidden_units: 128
decider:
  path: ./models/decider.safetensors
  labels: [Accessories, Apparel, Footwear]
brands:
  accessories:
    path: ./models/brand_accessories.safetensors
    labels: [fossil, titan]
  apparel:
    repo_id: fashionlens/brands
    filename: apparel.safetensors
    revision: v1
    labels: [adidas, alayna, allen solly, alma]
  footwear:
    path: ./models/brand_footwear.pth
    format: pytorch
    labels: { file: ./labels/footwear.txt }
subtypes:
  accessories:
    path: ./models/sub_accessories.safetensors
    labels: [Watches_Watches, Bags_Handbags]
  apparel:
    path: ./models/sub_apparel.safetensors
    labels: [Topwear_Tshirts, Bottomwear_Jeans]
    architecture:
      conv_channels: [32, 64]
  footwear:
    path: ./models/sub_footwear.safetensors
    labels: [Shoes_Casual Shoes, Sandal_Sandals]
"#;

    #[test]
    fn test_three_stage_config() {
        let config = CascadeConfig::from_yaml(THREE_STAGE).unwrap();

        assert_eq!(config.input, InputSize::new(60, 60));
        assert!(config.has_subtypes());
        assert!(matches!(
            config.brands.get(Category::Apparel).source,
            ModelSourceSpec::HuggingFace { .. }
        ));
        assert!(matches!(
            config.brands.get(Category::Footwear).format,
            ModelFormatSpec::PyTorch
        ));

        let labels = config.labels_for(config.brands.get(Category::Apparel)).unwrap();
        assert_eq!(labels.get(3).map(String::as_str), Some("alma"));
    }

    #[test]
    fn test_two_stage_config() {
        let yaml = r#"
decider:
  path: decider.safetensors
  labels: [Accessories, Apparel, Footwear]
brands:
  accessories: { path: a.safetensors, labels: [fossil] }
  apparel: { path: b.safetensors, labels: [alma] }
  footwear: { path: c.safetensors, labels: [nike] }
"#;
        let config = CascadeConfig::from_yaml(yaml).unwrap();
        assert!(!config.has_subtypes());
        assert_eq!(config.input, InputSize::default());
        assert_eq!(config.architecture, CnnArchitecture::default());
    }

    #[test]
    fn test_missing_brand_category_rejected() {
        let yaml = r#"
decider:
  path: decider.safetensors
  labels: [Accessories, Apparel, Footwear]
brands:
  accessories: { path: a.safetensors, labels: [fossil] }
  apparel: { path: b.safetensors, labels: [alma] }
"#;
        let err = CascadeConfig::from_yaml(yaml).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
        assert!(err.to_string().contains("footwear"));
    }

    #[test]
    fn test_architecture_override() {
        let config = CascadeConfig::from_yaml(THREE_STAGE).unwrap();
        let subtypes = &config.subtypes;

        let apparel_spec = subtypes.get(Category::Apparel).as_ref().unwrap();
        let apparel = config.architecture_for(apparel_spec);
        assert_eq!(apparel.conv_channels, vec![32, 64]);
        assert_eq!(apparel.hidden_units, 128);

        let footwear_spec = subtypes.get(Category::Footwear).as_ref().unwrap();
        let footwear = config.architecture_for(footwear_spec);
        assert_eq!(footwear, &config.architecture);
    }

    #[test]
    fn test_partial_subtypes() {
        let yaml = r#"
decider:
  path: decider.safetensors
  labels: [Accessories, Apparel, Footwear]
brands:
  accessories: { path: a.safetensors, labels: [fossil] }
  apparel: { path: b.safetensors, labels: [alma] }
  footwear: { path: c.safetensors, labels: [nike] }
subtypes:
  apparel: { path: sub_apparel.safetensors, labels: [Topwear_Tshirts] }
"#;
        let config = CascadeConfig::from_yaml(yaml).unwrap();

        assert!(config.has_subtypes());
        assert!(config.subtypes.get(Category::Apparel).is_some());
        assert!(config.subtypes.get(Category::Accessories).is_none());
        assert!(config.subtypes.get(Category::Footwear).is_none());
    }

    #[test]
    fn test_unknown_subtype_category_rejected() {
        let yaml = r#"
decider:
  path: decider.safetensors
  labels: [Accessories, Apparel, Footwear]
brands:
  accessories: { path: a.safetensors, labels: [fossil] }
  apparel: { path: b.safetensors, labels: [alma] }
  footwear: { path: c.safetensors, labels: [nike] }
subtypes:
  outerwear: { path: sub.safetensors, labels: [Jackets] }
"#;
        let err = CascadeConfig::from_yaml(yaml).unwrap_err();
        assert!(err.to_string().contains("outerwear"));
    }

    #[test]
    fn test_unquoted_scalar_labels() {
        let yaml = r#"
decider:
  path: decider.safetensors
  labels: [Accessories, Apparel, Footwear]
brands:
  accessories: { path: a.safetensors, labels: [fossil, 555, true] }
  apparel: { path: b.safetensors, labels: [alma] }
  footwear: { path: c.safetensors, labels: [nike] }
"#;
        let config = CascadeConfig::from_yaml(yaml).unwrap();
        let labels = config.labels_for(config.brands.get(Category::Accessories)).unwrap();
        assert_eq!(labels.as_slice(), &["fossil", "555", "true"]);
    }

    #[test]
    fn test_nested_label_rejected() {
        let yaml = r#"
decider:
  path: decider.safetensors
  labels: [Accessories, Apparel, Footwear]
brands:
  accessories: { path: a.safetensors, labels: [fossil, [titan]] }
  apparel: { path: b.safetensors, labels: [alma] }
  footwear: { path: c.safetensors, labels: [nike] }
"#;
        let config = CascadeConfig::from_yaml(yaml).unwrap();
        let err = config.labels_for(config.brands.get(Category::Accessories)).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
        assert!(err.to_string().contains("index 1"));
    }

    #[test]
    fn test_relative_paths_resolve_against_config_dir() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("labels")).unwrap();
        std::fs::write(
            dir.path().join("labels/footwear.txt"),
            "nike\n  puma \n\nwoodland\n",
        )
        .unwrap();
        let config_path = dir.path().join("classifiers.yaml");
        std::fs::write(&config_path, THREE_STAGE).unwrap();

        let config = CascadeConfig::from_file(&config_path).unwrap();

        let weights = config.weights_config(&config.decider);
        assert_eq!(
            weights.source,
            ModelSource::LocalPath(dir.path().join("./models/decider.safetensors"))
        );

        let labels = config.labels_for(config.brands.get(Category::Footwear)).unwrap();
        assert_eq!(labels.as_slice(), &["nike", "puma", "woodland"]);
    }

    #[test]
    fn test_device_spec() {
        let spec: DeviceSpec = serde_yaml::from_str("cpu").unwrap();
        assert!(matches!(spec, DeviceSpec::Cpu));

        assert_eq!(DeviceSpec::Cuda { index: Some(1) }.to_device_type(), DeviceType::Cuda(1));
        assert_eq!(DeviceSpec::Metal { index: None }.to_device_type(), DeviceType::Metal(0));
    }

    #[test]
    fn test_parse_label_lines() {
        assert_eq!(
            parse_label_lines("Topwear_Tshirts\r\nBottomwear_Jeans\n\n"),
            vec!["Topwear_Tshirts", "Bottomwear_Jeans"]
        );
    }
}
