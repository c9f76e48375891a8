//! Export of aggregated amenities for presentation layers.
//!
//! Three shapes are supported: a GeoJSON `FeatureCollection` of the
//! representative points, newline-delimited JSON (one feature per line),
//! and bare `[lat, lon]` heat points for a heatmap layer.

use std::io::Write;

use amenity_map_amenity_models::{AmenityCollection, AmenityFeature};
use geojson::{Feature, FeatureCollection, Geometry, JsonObject, Value};
use serde::Serialize;
use thiserror::Error;

/// Errors from writing exported amenities.
#[derive(Debug, Error)]
pub enum OutputError {
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// One line of the JSON lines export.
#[derive(Debug, Serialize)]
struct AmenityLine<'a> {
    category: &'a str,
    x: f64,
    y: f64,
    kind: &'a str,
    id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<&'a str>,
}

impl<'a> From<&'a AmenityFeature> for AmenityLine<'a> {
    fn from(feature: &'a AmenityFeature) -> Self {
        Self {
            category: &feature.category,
            x: feature.x,
            y: feature.y,
            kind: feature.kind.as_ref(),
            id: feature.id,
            name: feature.name(),
        }
    }
}

fn properties(feature: &AmenityFeature) -> JsonObject {
    let mut props = JsonObject::new();
    props.insert("category".to_string(), feature.category.clone().into());
    props.insert("x".to_string(), feature.x.into());
    props.insert("y".to_string(), feature.y.into());
    props.insert("kind".to_string(), feature.kind.to_string().into());
    props.insert("id".to_string(), feature.id.into());
    if let Some(name) = feature.name() {
        props.insert("name".to_string(), name.into());
    }
    props
}

/// Converts the collection into a GeoJSON `FeatureCollection` of points.
#[must_use]
pub fn to_geojson(collection: &AmenityCollection) -> FeatureCollection {
    let features = collection
        .iter()
        .map(|feature| {
            let point = geo::Point::new(feature.x, feature.y);
            Feature {
                bbox: None,
                geometry: Some(Geometry::new(Value::from(&point))),
                id: None,
                properties: Some(properties(feature)),
                foreign_members: None,
            }
        })
        .collect();

    FeatureCollection {
        bbox: None,
        features,
        foreign_members: None,
    }
}

/// Writes the collection as one GeoJSON document.
///
/// # Errors
///
/// * If serialization or the write fails
pub fn write_geojson<W: Write>(collection: &AmenityCollection, mut out: W) -> Result<(), OutputError> {
    serde_json::to_writer_pretty(&mut out, &to_geojson(collection))?;
    writeln!(out)?;
    Ok(())
}

/// Writes one JSON object per line.
///
/// # Errors
///
/// * If serialization or the write fails
pub fn write_json_lines<W: Write>(
    collection: &AmenityCollection,
    mut out: W,
) -> Result<(), OutputError> {
    for feature in collection {
        serde_json::to_writer(&mut out, &AmenityLine::from(feature))?;
        writeln!(out)?;
    }
    Ok(())
}

/// Writes the `[lat, lon]` heat points as a JSON array.
///
/// # Errors
///
/// * If serialization or the write fails
pub fn write_heat_points<W: Write>(
    collection: &AmenityCollection,
    mut out: W,
) -> Result<(), OutputError> {
    serde_json::to_writer(&mut out, &collection.heat_points())?;
    writeln!(out)?;
    Ok(())
}
