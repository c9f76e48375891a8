//! Canonical text encoding of boundaries.
//!
//! Boundaries are written as compact `GeoJSON` geometry objects. Floats
//! are emitted in shortest round-trip form and parsed back exactly, so
//! [`deserialize`] of [`serialize`] reproduces every vertex bit for bit
//! with ring order and orientation untouched. Negative zero is written as
//! zero so that `==`-equal boundaries always share one encoding.

use amenity_map_boundary_models::{BoundaryGeometry, SerializedBoundary};
use geo::{Coord, MapCoords};
use geojson::GeoJson;

use crate::BoundaryError;

/// Encodes a boundary into its canonical text form.
///
/// # Errors
///
/// Returns [`BoundaryError::Serialization`] if JSON encoding fails.
pub fn serialize(boundary: &BoundaryGeometry) -> Result<SerializedBoundary, BoundaryError> {
    let value = match boundary {
        BoundaryGeometry::Polygon(p) => geojson::Value::from(&p.map_coords(unsigned_zero)),
        BoundaryGeometry::MultiPolygon(mp) => {
            geojson::Value::from(&mp.map_coords(unsigned_zero))
        }
    };
    let text = serde_json::to_string(&geojson::Geometry::new(value))?;
    Ok(SerializedBoundary::new(text))
}

/// `-0.0 + 0.0` is `0.0`; every other value is unchanged.
fn unsigned_zero(c: Coord<f64>) -> Coord<f64> {
    Coord {
        x: c.x + 0.0,
        y: c.y + 0.0,
    }
}

/// Decodes a boundary previously produced by [`serialize`].
///
/// # Errors
///
/// Returns [`BoundaryError`] if the text is not `GeoJSON`, is not a
/// polygon or multi-polygon geometry, or is empty.
pub fn deserialize(serialized: &SerializedBoundary) -> Result<BoundaryGeometry, BoundaryError> {
    let geojson: GeoJson = serialized.as_str().parse()?;

    let GeoJson::Geometry(geometry) = geojson else {
        return Err(BoundaryError::UnsupportedGeometry {
            kind: "Feature or FeatureCollection".to_string(),
        });
    };

    let geometry: geo::Geometry<f64> = geometry.try_into()?;

    match geometry {
        geo::Geometry::Polygon(p) => BoundaryGeometry::polygon(p).ok_or(BoundaryError::Empty),
        geo::Geometry::MultiPolygon(mp) => {
            BoundaryGeometry::multi_polygon(mp).ok_or(BoundaryError::Empty)
        }
        other => Err(BoundaryError::UnsupportedGeometry {
            kind: geometry_kind(&other).to_string(),
        }),
    }
}

const fn geometry_kind(geometry: &geo::Geometry<f64>) -> &'static str {
    match geometry {
        geo::Geometry::Point(_) => "Point",
        geo::Geometry::Line(_) => "Line",
        geo::Geometry::LineString(_) => "LineString",
        geo::Geometry::Polygon(_) => "Polygon",
        geo::Geometry::MultiPoint(_) => "MultiPoint",
        geo::Geometry::MultiLineString(_) => "MultiLineString",
        geo::Geometry::MultiPolygon(_) => "MultiPolygon",
        geo::Geometry::GeometryCollection(_) => "GeometryCollection",
        geo::Geometry::Rect(_) => "Rect",
        geo::Geometry::Triangle(_) => "Triangle",
    }
}
