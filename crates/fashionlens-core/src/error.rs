//! Error types for fashionlens

use std::path::PathBuf;

/// Result type alias using fashionlens' Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for fashionlens operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The image file does not exist
    #[error("image not found: {}", .0.display())]
    NotFound(PathBuf),

    /// The image bytes could not be decoded
    #[error("failed to decode image: {0}")]
    Decode(String),

    /// The upload has a format the deployment does not accept
    #[error("unsupported image format: {0}")]
    UnsupportedFormat(String),

    /// Deployment or configuration mismatch
    #[error("configuration error: {0}")]
    Config(String),

    /// Tensor shape incompatible with what a classifier expects
    #[error("shape mismatch: expected {expected:?}, got {actual:?}")]
    ShapeMismatch {
        expected: Vec<usize>,
        actual: Vec<usize>,
    },

    /// Inference backend errors
    #[error("classifier error: {0}")]
    Classifier(String),

    /// IO errors
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic internal errors
    #[error("internal error: {0}")]
    Internal(String),
}

/// Coarse error classes used to decide how a failure is surfaced
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Bad upload; reject the request and ask for another file
    Input,
    /// Deployment mismatch
    Configuration,
    /// Preprocessing and classifier disagree on tensor shape
    ShapeMismatch,
    /// Anything else
    Internal,
}

impl Error {
    /// Create a new decode error
    pub fn decode(msg: impl Into<String>) -> Self {
        Self::Decode(msg.into())
    }

    /// Create a new unsupported format error
    pub fn unsupported_format(msg: impl Into<String>) -> Self {
        Self::UnsupportedFormat(msg.into())
    }

    /// Create a new configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a new shape mismatch error
    pub fn shape_mismatch(expected: impl Into<Vec<usize>>, actual: impl Into<Vec<usize>>) -> Self {
        Self::ShapeMismatch {
            expected: expected.into(),
            actual: actual.into(),
        }
    }

    /// Create a new classifier error
    pub fn classifier(msg: impl Into<String>) -> Self {
        Self::Classifier(msg.into())
    }

    /// Create a new internal error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Classify this error for propagation decisions
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound(_) | Self::Decode(_) | Self::UnsupportedFormat(_) => ErrorKind::Input,
            Self::Config(_) => ErrorKind::Configuration,
            Self::ShapeMismatch { .. } => ErrorKind::ShapeMismatch,
            Self::Classifier(_) | Self::Io(_) | Self::Internal(_) => ErrorKind::Internal,
        }
    }

    /// Whether the caller can recover by supplying a different file
    pub fn is_input_error(&self) -> bool {
        self.kind() == ErrorKind::Input
    }
}
