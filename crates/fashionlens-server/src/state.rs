use crate::config::ServerConfig;
use fashionlens_classifiers::{CascadeResult, ClassificationCascade};
use fashionlens_core::Result;
use std::path::PathBuf;
use std::sync::Arc;

/// Shared application state
///
/// Everything here is read-only after startup.
#[derive(Clone, Debug)]
pub struct AppState {
    /// Loaded classifier cascade
    pub cascade: Arc<ClassificationCascade>,

    /// Server configuration
    pub config: Arc<ServerConfig>,
}

impl AppState {
    pub fn new(cascade: ClassificationCascade, config: ServerConfig) -> Self {
        Self {
            cascade: Arc::new(cascade),
            config: Arc::new(config),
        }
    }

    /// Load the cascade named by `config.classifiers_config`
    pub fn load(config: ServerConfig) -> Result<Self> {
        let cascade = ClassificationCascade::from_file(&config.classifiers_config)?;
        Ok(Self::new(cascade, config))
    }

    pub fn upload_path(&self, name: &str) -> PathBuf {
        self.config.upload_dir.join(name)
    }

    /// Classify a stored file off the async runtime
    pub async fn classify_file(&self, path: PathBuf) -> std::result::Result<Result<CascadeResult>, tokio::task::JoinError> {
        let cascade = Arc::clone(&self.cascade);
        tokio::task::spawn_blocking(move || cascade.classify_path(path)).await
    }

    /// Classify an in-memory upload off the async runtime
    pub async fn classify_bytes(&self, data: Vec<u8>) -> std::result::Result<Result<CascadeResult>, tokio::task::JoinError> {
        let cascade = Arc::clone(&self.cascade);
        tokio::task::spawn_blocking(move || cascade.classify_bytes(&data)).await
    }
}
