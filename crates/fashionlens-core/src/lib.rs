//! fashionlens Core
//!
//! Types, label composition, and errors shared across fashionlens components.
//!
//! This crate provides:
//! - The closed [`Category`] enumeration and [`CategoryMap`] for per-category data
//! - [`ClassLabels`], the ordered index-to-label mapping of a classifier
//! - [`Prediction`] and the display label composer
//! - Error types and result handling

pub mod error;
pub mod label;
pub mod types;

pub use error::{Error, ErrorKind, Result};
pub use label::compose;
pub use types::{Category, CategoryMap, ClassLabels, Prediction};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::error::{Error, ErrorKind, Result};
    pub use crate::label::compose;
    pub use crate::types::{Category, CategoryMap, ClassLabels, Prediction};
}
