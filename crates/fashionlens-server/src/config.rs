//! Server configuration

use crate::cli::ServeArgs;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Web server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    /// Directory uploaded images are stored in and served from
    #[serde(default = "default_upload_dir")]
    pub upload_dir: PathBuf,

    /// Accepted file extensions, lowercase and without the dot
    #[serde(default = "default_allowed_extensions")]
    pub allowed_extensions: Vec<String>,

    /// Largest accepted request body
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,

    /// Classifier cascade configuration file
    #[serde(default = "default_classifiers_config")]
    pub classifiers_config: PathBuf,
}

impl ServerConfig {
    /// Load configuration from file and CLI overrides
    pub fn load(config_path: &Path, args: &ServeArgs) -> anyhow::Result<Self> {
        // Try to load from file, or use defaults
        let mut config = if config_path.exists() {
            let content = std::fs::read_to_string(config_path)?;
            Self::from_yaml(&content)?
        } else {
            Self::default()
        };

        // Apply CLI overrides
        if let Some(classifiers) = &args.classifiers {
            config.classifiers_config = classifiers.clone();
        }

        if let Some(upload_dir) = &args.upload_dir {
            config.upload_dir = upload_dir.clone();
        }

        Ok(config)
    }

    pub fn from_yaml(yaml: &str) -> anyhow::Result<Self> {
        let mut config: Self = serde_yaml::from_str(yaml)?;
        for ext in &mut config.allowed_extensions {
            *ext = ext.trim_start_matches('.').to_ascii_lowercase();
        }
        Ok(config)
    }

    /// Whether `filename` carries an accepted extension
    pub fn allows(&self, filename: &str) -> bool {
        crate::upload::allowed_file(filename, &self.allowed_extensions)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            upload_dir: default_upload_dir(),
            allowed_extensions: default_allowed_extensions(),
            max_upload_bytes: default_max_upload_bytes(),
            classifiers_config: default_classifiers_config(),
        }
    }
}

fn default_upload_dir() -> PathBuf {
    PathBuf::from("images")
}

fn default_allowed_extensions() -> Vec<String> {
    ["png", "jpg", "jpeg", "gif"].iter().map(|s| s.to_string()).collect()
}

fn default_max_upload_bytes() -> usize {
    16 * 1024 * 1024
}

fn default_classifiers_config() -> PathBuf {
    PathBuf::from("./classifiers.yaml")
}
