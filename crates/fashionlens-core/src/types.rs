//! Core types for fashionlens

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Top-level classification of an uploaded item
///
/// The set is closed: every downstream classifier family is keyed by this
/// enum through [`CategoryMap`], so a decided category always has a brand
/// classifier (and a sub-type classifier when one is deployed for it).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Category {
    Accessories,
    Apparel,
    Footwear,
}

impl Category {
    /// All categories in declaration order
    pub const ALL: [Category; 3] = [Category::Accessories, Category::Apparel, Category::Footwear];

    /// Display name, as used in class label files and composed labels
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Accessories => "Accessories",
            Self::Apparel => "Apparel",
            Self::Footwear => "Footwear",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        Self::ALL
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| Error::config(format!("unknown category '{}'", s)))
    }
}

impl TryFrom<String> for Category {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<Category> for String {
    fn from(value: Category) -> Self {
        value.as_str().to_string()
    }
}

/// One value per [`Category`]
///
/// Lookup is an exhaustive match, so there is no "unregistered category"
/// failure once a map has been built. Deserializing from config requires all
/// three keys, except that entries of a `CategoryMap<Option<T>>` may be
/// omitted and read as `None`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CategoryMap<T> {
    pub accessories: T,
    pub apparel: T,
    pub footwear: T,
}

impl<T> CategoryMap<T> {
    /// Build a map by evaluating `f` for every category in [`Category::ALL`] order
    pub fn from_fn(mut f: impl FnMut(Category) -> T) -> Self {
        Self {
            accessories: f(Category::Accessories),
            apparel: f(Category::Apparel),
            footwear: f(Category::Footwear),
        }
    }

    /// Fallible version of [`CategoryMap::from_fn`]; stops at the first error
    pub fn try_from_fn<E>(mut f: impl FnMut(Category) -> std::result::Result<T, E>) -> std::result::Result<Self, E> {
        Ok(Self {
            accessories: f(Category::Accessories)?,
            apparel: f(Category::Apparel)?,
            footwear: f(Category::Footwear)?,
        })
    }

    pub fn get(&self, category: Category) -> &T {
        match category {
            Category::Accessories => &self.accessories,
            Category::Apparel => &self.apparel,
            Category::Footwear => &self.footwear,
        }
    }

    /// Iterate in [`Category::ALL`] order
    pub fn iter(&self) -> impl Iterator<Item = (Category, &T)> {
        Category::ALL.into_iter().map(move |c| (c, self.get(c)))
    }

    /// Transform every value, keeping the category association
    pub fn map<U>(self, mut f: impl FnMut(Category, T) -> U) -> CategoryMap<U> {
        CategoryMap {
            accessories: f(Category::Accessories, self.accessories),
            apparel: f(Category::Apparel, self.apparel),
            footwear: f(Category::Footwear, self.footwear),
        }
    }
}

impl<T: Default> Default for CategoryMap<T> {
    fn default() -> Self {
        Self::from_fn(|_| T::default())
    }
}

/// Ordered mapping from a classifier output index to a label
///
/// Order must match the order used when the classifier was trained.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassLabels<T = String> {
    labels: Vec<T>,
}

impl<T> ClassLabels<T> {
    /// Create a label sequence; an empty sequence is a configuration error
    pub fn new(labels: Vec<T>) -> Result<Self> {
        if labels.is_empty() {
            return Err(Error::config("class label sequence is empty"));
        }
        Ok(Self { labels })
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Label for an output index
    pub fn get(&self, index: usize) -> Option<&T> {
        self.labels.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.labels.iter()
    }

    pub fn as_slice(&self) -> &[T] {
        &self.labels
    }
}

impl ClassLabels<String> {
    /// Parse every label into `U`, preserving order
    pub fn parse<U>(&self) -> Result<ClassLabels<U>>
    where
        U: FromStr,
        U::Err: fmt::Display,
    {
        let parsed = self
            .labels
            .iter()
            .enumerate()
            .map(|(i, label)| {
                label.parse::<U>().map_err(|e| {
                    Error::config(format!("invalid label '{}' at index {}: {}", label, i, e))
                })
            })
            .collect::<Result<Vec<_>>>()?;

        ClassLabels::new(parsed)
    }
}

impl<T> TryFrom<Vec<T>> for ClassLabels<T> {
    type Error = Error;

    fn try_from(labels: Vec<T>) -> Result<Self> {
        Self::new(labels)
    }
}

/// Outcome of one pass through the cascade
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Prediction {
    pub category: Category,

    /// Absent when the category has no sub-type classifier
    pub subtype: Option<String>,

    pub brand: String,
}

impl Prediction {
    /// Human-readable display label
    pub fn label(&self) -> String {
        crate::label::compose(self.category, self.subtype.as_deref(), &self.brand)
    }
}
