#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Amenity category and feature types.
//!
//! A [`Category`] pairs a display name with exactly one [`TagFilter`].
//! Fetching a filter yields a [`FeatureCollection`] of raw upstream
//! features; aggregation labels and reduces those to an
//! [`AmenityCollection`] of representative points.

use std::collections::{BTreeMap, BTreeSet};

use geo::Geometry;
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// Column names of an [`AmenityCollection`], present even when it is empty.
pub const AMENITY_COLUMNS: [&str; 4] = ["category", "x", "y", "geometry"];

/// Predicate over feature tags selecting one amenity category.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TagFilter {
    /// `key` must be present with exactly `value`.
    Equals {
        /// Tag key (e.g., `"amenity"`).
        key: String,
        /// Required value (e.g., `"library"`).
        value: String,
    },
    /// `key` must be present with one of `values`.
    AnyOf {
        /// Tag key.
        key: String,
        /// Accepted values. Ordered so equal filters compare and hash equal.
        values: BTreeSet<String>,
    },
    /// `key` must be present with any value.
    Present {
        /// Tag key (e.g., `"historic"`).
        key: String,
    },
}

impl TagFilter {
    /// Creates an [`TagFilter::Equals`] filter.
    #[must_use]
    pub fn equals(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self::Equals {
            key: key.into(),
            value: value.into(),
        }
    }

    /// Creates an [`TagFilter::AnyOf`] filter.
    #[must_use]
    pub fn any_of<I, S>(key: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::AnyOf {
            key: key.into(),
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    /// Creates a [`TagFilter::Present`] filter.
    #[must_use]
    pub fn present(key: impl Into<String>) -> Self {
        Self::Present { key: key.into() }
    }

    /// The tag key this filter inspects.
    #[must_use]
    pub fn key(&self) -> &str {
        match self {
            Self::Equals { key, .. } | Self::AnyOf { key, .. } | Self::Present { key } => key,
        }
    }

    /// Whether `tags` satisfy this filter.
    #[must_use]
    pub fn matches(&self, tags: &BTreeMap<String, String>) -> bool {
        match self {
            Self::Equals { key, value } => tags.get(key).is_some_and(|v| v == value),
            Self::AnyOf { key, values } => tags.get(key).is_some_and(|v| values.contains(v)),
            Self::Present { key } => tags.contains_key(key),
        }
    }
}

impl std::fmt::Display for TagFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Equals { key, value } => write!(f, "{key}={value}"),
            Self::AnyOf { key, values } => {
                let joined: Vec<&str> = values.iter().map(String::as_str).collect();
                write!(f, "{key}=[{}]", joined.join("|"))
            }
            Self::Present { key } => write!(f, "{key}=*"),
        }
    }
}

/// A named amenity category with its filter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    /// Display name, also used as the label of fetched features.
    pub name: String,
    /// Filter selecting the category's features.
    pub filter: TagFilter,
}

impl Category {
    /// Creates a category.
    #[must_use]
    pub fn new(name: impl Into<String>, filter: TagFilter) -> Self {
        Self {
            name: name.into(),
            filter,
        }
    }
}

/// OSM element kind of a fetched feature.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ElementKind {
    /// A single point.
    Node,
    /// An open or closed way.
    Way,
    /// A multi-member relation.
    Relation,
}

/// One feature as returned by the upstream source.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceFeature {
    /// Element kind.
    pub kind: ElementKind,
    /// Element id (unique per kind).
    pub id: i64,
    /// Original geometry: point, line string, polygon, or multi-polygon.
    pub geometry: Geometry<f64>,
    /// Raw tags.
    pub tags: BTreeMap<String, String>,
}

/// The features returned by one fetch, in upstream order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeatureCollection {
    features: Vec<SourceFeature>,
}

impl FeatureCollection {
    /// Creates a collection from features.
    #[must_use]
    pub const fn new(features: Vec<SourceFeature>) -> Self {
        Self { features }
    }

    /// Creates an empty collection.
    #[must_use]
    pub const fn empty() -> Self {
        Self::new(Vec::new())
    }

    /// Number of features.
    #[must_use]
    pub fn len(&self) -> usize {
        self.features.len()
    }

    /// Whether there are no features.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    /// Iterates the features.
    pub fn iter(&self) -> std::slice::Iter<'_, SourceFeature> {
        self.features.iter()
    }
}

impl FromIterator<SourceFeature> for FeatureCollection {
    fn from_iter<I: IntoIterator<Item = SourceFeature>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a FeatureCollection {
    type Item = &'a SourceFeature;
    type IntoIter = std::slice::Iter<'a, SourceFeature>;

    fn into_iter(self) -> Self::IntoIter {
        self.features.iter()
    }
}

/// A labeled feature reduced to a representative point.
#[derive(Debug, Clone, PartialEq)]
pub struct AmenityFeature {
    /// Category name assigned by the fetch that produced this feature.
    pub category: String,
    /// Representative longitude.
    pub x: f64,
    /// Representative latitude.
    pub y: f64,
    /// Element kind.
    pub kind: ElementKind,
    /// Element id.
    pub id: i64,
    /// Original geometry.
    pub geometry: Geometry<f64>,
    /// Raw tags.
    pub tags: BTreeMap<String, String>,
}

impl AmenityFeature {
    /// The feature's `name` tag, if any.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.tags.get("name").map(String::as_str)
    }
}

/// Ordered, possibly empty set of amenities ready for visualization.
///
/// Order is category selection order with the specific amenity last.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AmenityCollection {
    features: Vec<AmenityFeature>,
}

impl AmenityCollection {
    /// Creates an empty collection.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            features: Vec::new(),
        }
    }

    /// Appends one feature.
    pub fn push(&mut self, feature: AmenityFeature) {
        self.features.push(feature);
    }

    /// Number of features.
    #[must_use]
    pub fn len(&self) -> usize {
        self.features.len()
    }

    /// Whether there are no features.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    /// Iterates the features in order.
    pub fn iter(&self) -> std::slice::Iter<'_, AmenityFeature> {
        self.features.iter()
    }

    /// Column names; identical for empty and non-empty collections.
    #[must_use]
    pub const fn columns(&self) -> &'static [&'static str] {
        &AMENITY_COLUMNS
    }

    /// `[y, x]` (latitude, longitude) pairs for a heatmap layer.
    #[must_use]
    pub fn heat_points(&self) -> Vec<[f64; 2]> {
        self.features.iter().map(|f| [f.y, f.x]).collect()
    }

    /// Number of features per category label.
    #[must_use]
    pub fn category_counts(&self) -> BTreeMap<&str, usize> {
        let mut counts = BTreeMap::new();
        for feature in &self.features {
            *counts.entry(feature.category.as_str()).or_insert(0) += 1;
        }
        counts
    }
}

impl Extend<AmenityFeature> for AmenityCollection {
    fn extend<I: IntoIterator<Item = AmenityFeature>>(&mut self, iter: I) {
        self.features.extend(iter);
    }
}

impl<'a> IntoIterator for &'a AmenityCollection {
    type Item = &'a AmenityFeature;
    type IntoIter = std::slice::Iter<'a, AmenityFeature>;

    fn into_iter(self) -> Self::IntoIter {
        self.features.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tags(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    #[test]
    fn equals_filter() {
        let filter = TagFilter::equals("amenity", "library");
        assert!(filter.matches(&tags(&[("amenity", "library")])));
        assert!(!filter.matches(&tags(&[("amenity", "cafe")])));
        assert!(!filter.matches(&tags(&[("shop", "library")])));
    }

    #[test]
    fn any_of_filter() {
        let filter = TagFilter::any_of("amenity", ["cafe", "restaurant", "pub"]);
        assert!(filter.matches(&tags(&[("amenity", "pub")])));
        assert!(!filter.matches(&tags(&[("amenity", "bar")])));
        assert!(!filter.matches(&tags(&[])));
    }

    #[test]
    fn present_filter() {
        let filter = TagFilter::present("historic");
        assert!(filter.matches(&tags(&[("historic", "memorial")])));
        assert!(filter.matches(&tags(&[("historic", "yes"), ("name", "Fort Point")])));
        assert!(!filter.matches(&tags(&[("tourism", "museum")])));
    }

    #[test]
    fn any_of_ignores_value_order() {
        let a = TagFilter::any_of("amenity", ["pub", "cafe"]);
        let b = TagFilter::any_of("amenity", ["cafe", "pub", "cafe"]);
        assert_eq!(a, b);
        assert_eq!(a.to_string(), "amenity=[cafe|pub]");
    }

    #[test]
    fn filter_from_toml() {
        #[derive(Deserialize)]
        struct Wrapper {
            filter: TagFilter,
        }

        let parsed: Wrapper = toml::from_str(
            r#"filter = { type = "any_of", key = "amenity", values = ["cinema", "theatre"] }"#,
        )
        .unwrap();
        assert_eq!(
            parsed.filter,
            TagFilter::any_of("amenity", ["theatre", "cinema"])
        );

        let parsed: Wrapper =
            toml::from_str(r#"filter = { type = "present", key = "tourism" }"#).unwrap();
        assert_eq!(parsed.filter, TagFilter::present("tourism"));
    }

    #[test]
    fn empty_collection_keeps_columns() {
        let collection = AmenityCollection::new();
        assert!(collection.is_empty());
        assert_eq!(collection.columns(), &["category", "x", "y", "geometry"]);
        assert!(collection.heat_points().is_empty());
    }

    #[test]
    fn heat_points_are_lat_lon() {
        let mut collection = AmenityCollection::new();
        collection.push(AmenityFeature {
            category: "Libraries".to_string(),
            x: -122.41,
            y: 37.77,
            kind: ElementKind::Node,
            id: 1,
            geometry: Geometry::Point(geo::Point::new(-122.41, 37.77)),
            tags: tags(&[("amenity", "library")]),
        });
        assert_eq!(collection.heat_points(), vec![[37.77, -122.41]]);
        assert_eq!(collection.category_counts().get("Libraries"), Some(&1));
    }
}
