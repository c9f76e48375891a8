//! Synthetic circular regions used when no authoritative boundary exists.

use amenity_map_boundary_models::{BoundaryGeometry, DEFAULT_FALLBACK_RADIUS_DEGREES};
use geo::{Coord, LineString, Polygon};

/// Segments per full circle (16 per quadrant).
pub const CIRCLE_SEGMENTS: usize = 64;

/// Builds a closed, counter-clockwise circle of `radius_degrees` around
/// `(lon, lat)`, starting due east of the center.
///
/// The same inputs always yield an identical polygon. A radius that is
/// not a positive finite number is replaced by
/// [`DEFAULT_FALLBACK_RADIUS_DEGREES`].
#[must_use]
pub fn build_fallback(lon: f64, lat: f64, radius_degrees: f64) -> BoundaryGeometry {
    let radius = if radius_degrees.is_finite() && radius_degrees > 0.0 {
        radius_degrees
    } else {
        log::warn!(
            "Invalid fallback radius {radius_degrees}, using {DEFAULT_FALLBACK_RADIUS_DEGREES}"
        );
        DEFAULT_FALLBACK_RADIUS_DEGREES
    };

    let mut ring: Vec<Coord<f64>> = (0..CIRCLE_SEGMENTS)
        .map(|i| {
            #[allow(clippy::cast_precision_loss)]
            let angle = std::f64::consts::TAU * (i as f64) / (CIRCLE_SEGMENTS as f64);
            Coord {
                x: radius.mul_add(angle.cos(), lon),
                y: radius.mul_add(angle.sin(), lat),
            }
        })
        .collect();
    ring.push(ring[0]);

    BoundaryGeometry::Polygon(Polygon::new(LineString::new(ring), vec![]))
}

/// Builds the fallback circle with the default radius.
#[must_use]
pub fn build_default_fallback(lon: f64, lat: f64) -> BoundaryGeometry {
    build_fallback(lon, lat, DEFAULT_FALLBACK_RADIUS_DEGREES)
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::{Centroid, Winding};

    fn exterior(boundary: &BoundaryGeometry) -> &LineString<f64> {
        let BoundaryGeometry::Polygon(p) = boundary else {
            panic!("fallback must be a single polygon");
        };
        p.exterior()
    }

    #[test]
    fn vertices_lie_on_the_circle() {
        let boundary = build_fallback(-122.0, 37.0, 0.01);
        for c in &exterior(&boundary).0 {
            let distance = (c.x + 122.0).hypot(c.y - 37.0);
            assert!((distance - 0.01).abs() < 1e-12, "distance {distance}");
        }
    }

    #[test]
    fn ring_is_closed_with_expected_vertex_count() {
        let boundary = build_fallback(-122.0, 37.0, 0.01);
        let ring = exterior(&boundary);
        assert_eq!(ring.0.len(), CIRCLE_SEGMENTS + 1);
        assert_eq!(ring.0.first(), ring.0.last());
        assert!(ring.is_ccw());
    }

    #[test]
    fn centered_on_the_input() {
        let boundary = build_fallback(-122.4194, 37.7749, 0.01);
        let BoundaryGeometry::Polygon(p) = &boundary else {
            unreachable!()
        };
        let centroid = p.centroid().unwrap();
        assert!((centroid.x() + 122.4194).abs() < 1e-9);
        assert!((centroid.y() - 37.7749).abs() < 1e-9);
        assert!(boundary.contains_point(-122.4194, 37.7749));
    }

    #[test]
    fn bounding_box_spans_the_radius() {
        let rect = build_fallback(-122.0, 37.0, 0.01).bounding_rect().unwrap();
        assert!((rect.min().x - -122.01).abs() < 1e-12);
        assert!((rect.max().x - -121.99).abs() < 1e-12);
        assert!((rect.min().y - 36.99).abs() < 1e-12);
        assert!((rect.max().y - 37.01).abs() < 1e-12);
    }

    #[test]
    fn deterministic() {
        assert_eq!(
            build_fallback(10.5, -33.25, 0.01),
            build_fallback(10.5, -33.25, 0.01)
        );
    }

    #[test]
    fn invalid_radius_uses_default() {
        assert_eq!(build_fallback(1.0, 2.0, -1.0), build_default_fallback(1.0, 2.0));
        assert_eq!(
            build_fallback(1.0, 2.0, f64::NAN),
            build_default_fallback(1.0, 2.0)
        );
    }
}
