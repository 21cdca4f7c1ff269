//! Weight loading for Candle-based image classifiers

use candle_core::{DType, Device};
use candle_nn::VarBuilder;
use fashionlens_core::{Error, Result};
use hf_hub::{api::sync::Api, Repo, RepoType};
use std::path::{Path, PathBuf};

/// Where and how to load one classifier's weights
#[derive(Debug, Clone)]
pub struct WeightsConfig {
    /// Source of the weights file
    pub source: ModelSource,

    /// Device to run inference on
    pub device: DeviceType,

    /// File format of the weights
    pub format: ModelFormat,
}

/// Source location for model weights
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelSource {
    /// Load from local file system
    LocalPath(PathBuf),

    /// Download from Hugging Face Hub
    HuggingFace {
        repo_id: String,
        revision: Option<String>,
        filename: String,
    },
}

/// Device type for inference
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceType {
    /// CPU inference (always available)
    Cpu,
    /// CUDA GPU inference (if available)
    Cuda(usize), // GPU index
    /// Metal (Apple Silicon)
    Metal(usize),
}

/// Weights file format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelFormat {
    /// SafeTensors format (recommended)
    SafeTensors,
    /// PyTorch format
    PyTorch,
}

impl WeightsConfig {
    /// Weights from a local SafeTensors file on CPU
    pub fn from_local(path: impl Into<PathBuf>) -> Self {
        Self {
            source: ModelSource::LocalPath(path.into()),
            device: DeviceType::Cpu,
            format: ModelFormat::SafeTensors,
        }
    }

    /// Weights from a file in a Hugging Face repository
    pub fn from_hf(repo_id: impl Into<String>, filename: impl Into<String>) -> Self {
        Self {
            source: ModelSource::HuggingFace {
                repo_id: repo_id.into(),
                revision: None,
                filename: filename.into(),
            },
            device: DeviceType::Cpu,
            format: ModelFormat::SafeTensors,
        }
    }

    /// Set device
    pub fn with_device(mut self, device: DeviceType) -> Self {
        self.device = device;
        self
    }

    /// Set weights format
    pub fn with_format(mut self, format: ModelFormat) -> Self {
        self.format = format;
        self
    }

    /// Set Hugging Face revision
    pub fn with_revision(mut self, revision: impl Into<String>) -> Self {
        if let ModelSource::HuggingFace { revision: slot, .. } = &mut self.source {
            *slot = Some(revision.into());
        }
        self
    }
}

/// Weights resolved to a file and mapped onto a device
pub struct LoadedWeights {
    var_builder: VarBuilder<'static>,
    weights_path: PathBuf,
}

impl LoadedWeights {
    /// Resolve, open and map the weights described by `config`
    pub fn load(config: &WeightsConfig) -> Result<Self> {
        let weights_path = resolve_model_path(&config.source)?;
        let device = create_device(config.device)?;

        let var_builder = match config.format {
            ModelFormat::SafeTensors => {
                // SAFETY: the file is mapped read-only and is not expected to
                // change while the process is running.
                let mapped = unsafe {
                    VarBuilder::from_mmaped_safetensors(&[&weights_path], DType::F32, &device)
                };
                mapped.map_err(|e| {
                    Error::config(format!(
                        "failed to load SafeTensors {}: {}",
                        weights_path.display(),
                        e
                    ))
                })?
            }
            ModelFormat::PyTorch => VarBuilder::from_pth(&weights_path, DType::F32, &device)
                .map_err(|e| {
                    Error::config(format!(
                        "failed to load PyTorch weights {}: {}",
                        weights_path.display(),
                        e
                    ))
                })?,
        };

        tracing::debug!(path = %weights_path.display(), "mapped weights");

        Ok(Self {
            var_builder,
            weights_path,
        })
    }

    /// Get reference to VarBuilder for building model layers
    pub fn var_builder(&self) -> &VarBuilder<'static> {
        &self.var_builder
    }

    /// Get weights path
    pub fn weights_path(&self) -> &Path {
        &self.weights_path
    }
}

/// Resolve a weights file from its source, downloading from the Hub if needed
pub fn resolve_model_path(source: &ModelSource) -> Result<PathBuf> {
    match source {
        ModelSource::LocalPath(path) => {
            if !path.exists() {
                return Err(Error::config(format!(
                    "weights file not found: {}",
                    path.display()
                )));
            }
            Ok(path.clone())
        }
        ModelSource::HuggingFace {
            repo_id,
            revision,
            filename,
        } => {
            tracing::info!("Fetching {} from Hugging Face repo {}", filename, repo_id);

            let api = Api::new()
                .map_err(|e| Error::config(format!("failed to initialize HF API: {}", e)))?;

            let repo = api.repo(Repo::with_revision(
                repo_id.clone(),
                RepoType::Model,
                revision.clone().unwrap_or_else(|| "main".to_string()),
            ));

            repo.get(filename).map_err(|e| {
                Error::config(format!(
                    "failed to download {} from {}: {}",
                    filename, repo_id, e
                ))
            })
        }
    }
}

/// Create Candle device from device type
pub fn create_device(device_type: DeviceType) -> Result<Device> {
    match device_type {
        DeviceType::Cpu => Ok(Device::Cpu),
        DeviceType::Cuda(idx) => Device::new_cuda(idx)
            .map_err(|e| Error::config(format!("failed to create CUDA device: {}", e))),
        DeviceType::Metal(idx) => Device::new_metal(idx)
            .map_err(|e| Error::config(format!("failed to create Metal device: {}", e))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_weights_config_local() {
        let config = WeightsConfig::from_local("/models/decider.safetensors")
            .with_device(DeviceType::Cpu)
            .with_format(ModelFormat::PyTorch);

        assert_eq!(
            config.source,
            ModelSource::LocalPath(PathBuf::from("/models/decider.safetensors"))
        );
        assert_eq!(config.format, ModelFormat::PyTorch);
    }

    #[test]
    fn test_weights_config_hf() {
        let config = WeightsConfig::from_hf("fashionlens/brands", "apparel.safetensors")
            .with_revision("v2");

        if let ModelSource::HuggingFace {
            repo_id,
            revision,
            filename,
        } = &config.source
        {
            assert_eq!(repo_id, "fashionlens/brands");
            assert_eq!(revision.as_deref(), Some("v2"));
            assert_eq!(filename, "apparel.safetensors");
        } else {
            panic!("Expected HuggingFace source");
        }
    }

    #[test]
    fn test_revision_ignored_for_local() {
        let config = WeightsConfig::from_local("a.safetensors").with_revision("v2");
        assert!(matches!(config.source, ModelSource::LocalPath(_)));
    }

    #[test]
    fn test_missing_local_weights_is_config_error() {
        let err = resolve_model_path(&ModelSource::LocalPath(PathBuf::from(
            "/definitely/not/here.safetensors",
        )))
        .unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_cpu_device() {
        assert!(matches!(create_device(DeviceType::Cpu).unwrap(), Device::Cpu));
    }
}
