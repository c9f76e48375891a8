#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Boundary geometry and location query types.
//!
//! A [`BoundaryGeometry`] is the region amenities are searched within. It
//! is produced once per [`LocationQuery`] and then only read. Resolution
//! outcomes carry an advisory [`Status`] for the presentation layer.

use geo::{BoundingRect, Contains, Geometry, MultiPolygon, Point, Polygon, Rect, Validation};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// Default center used when an address cannot be geocoded
/// (San Francisco, CA).
pub const DEFAULT_CENTER_LAT: f64 = 37.7749;

/// Longitude half of the default center.
pub const DEFAULT_CENTER_LON: f64 = -122.4194;

/// Radius of the synthetic fallback circle in degrees (roughly 1 km).
pub const DEFAULT_FALLBACK_RADIUS_DEGREES: f64 = 0.01;

/// A user request for an area of interest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LocationQuery {
    /// Free-text address, city, or neighborhood name.
    Address(String),
    /// A clicked coordinate.
    Point {
        /// Latitude (WGS84).
        lat: f64,
        /// Longitude (WGS84).
        lon: f64,
    },
}

impl std::fmt::Display for LocationQuery {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Address(address) => write!(f, "\"{address}\""),
            Self::Point { lat, lon } => write!(f, "({lat}, {lon})"),
        }
    }
}

/// A polygonal search region in (longitude, latitude) space.
///
/// Always non-empty and valid: the constructors reject geometries without a
/// usable exterior ring or that fail [`Validation::is_valid`].
#[derive(Debug, Clone, PartialEq)]
pub enum BoundaryGeometry {
    /// A single polygon (geocoded place or synthetic fallback circle).
    Polygon(Polygon<f64>),
    /// Several polygons (multi-part places or unioned admin boundaries).
    MultiPolygon(MultiPolygon<f64>),
}

/// A ring needs at least three distinct vertices plus the closing one.
const MIN_RING_COORDS: usize = 4;

fn polygon_is_usable(polygon: &Polygon<f64>) -> bool {
    polygon.exterior().0.len() >= MIN_RING_COORDS && polygon.is_valid()
}

impl BoundaryGeometry {
    /// Wraps a polygon, returning `None` when it is degenerate or invalid.
    #[must_use]
    pub fn polygon(polygon: Polygon<f64>) -> Option<Self> {
        if !polygon_is_usable(&polygon) {
            return None;
        }
        Some(Self::Polygon(polygon))
    }

    /// Wraps a multi-polygon, dropping degenerate or invalid parts.
    /// Returns `None` when nothing usable remains.
    #[must_use]
    pub fn multi_polygon(multi_polygon: MultiPolygon<f64>) -> Option<Self> {
        let parts: Vec<Polygon<f64>> = multi_polygon
            .0
            .into_iter()
            .filter(polygon_is_usable)
            .collect();

        if parts.is_empty() {
            return None;
        }

        Some(Self::MultiPolygon(MultiPolygon::new(parts)))
    }

    /// Accepts any geometry that is areal.
    #[must_use]
    pub fn from_geometry(geometry: Geometry<f64>) -> Option<Self> {
        match geometry {
            Geometry::Polygon(p) => Self::polygon(p),
            Geometry::MultiPolygon(mp) => Self::multi_polygon(mp),
            Geometry::Rect(r) => Self::polygon(r.to_polygon()),
            _ => None,
        }
    }

    /// Iterates the polygon parts.
    pub fn polygons(&self) -> impl Iterator<Item = &Polygon<f64>> {
        let parts: &[Polygon<f64>] = match self {
            Self::Polygon(p) => std::slice::from_ref(p),
            Self::MultiPolygon(mp) => &mp.0,
        };
        parts.iter()
    }

    /// Returns the boundary as a multi-polygon (a single polygon becomes a
    /// one-part multi-polygon).
    #[must_use]
    pub fn to_multi_polygon(&self) -> MultiPolygon<f64> {
        match self {
            Self::Polygon(p) => MultiPolygon::new(vec![p.clone()]),
            Self::MultiPolygon(mp) => mp.clone(),
        }
    }

    /// Bounding rectangle of the whole boundary.
    #[must_use]
    pub fn bounding_rect(&self) -> Option<Rect<f64>> {
        match self {
            Self::Polygon(p) => p.bounding_rect(),
            Self::MultiPolygon(mp) => mp.bounding_rect(),
        }
    }

    /// Whether the point `(lon, lat)` lies strictly inside the boundary.
    #[must_use]
    pub fn contains_point(&self, lon: f64, lat: f64) -> bool {
        let point = Point::new(lon, lat);
        match self {
            Self::Polygon(p) => p.contains(&point),
            Self::MultiPolygon(mp) => mp.contains(&point),
        }
    }

    /// Total number of vertices across all rings.
    #[must_use]
    pub fn vertex_count(&self) -> usize {
        self.polygons()
            .map(|p| {
                p.exterior().0.len() + p.interiors().iter().map(|r| r.0.len()).sum::<usize>()
            })
            .sum()
    }
}

/// Canonical text form of a [`BoundaryGeometry`].
///
/// Equal geometries always produce equal text, which makes this usable as
/// a cache key where the geometry itself is not (`f64` is neither `Eq` nor
/// `Hash`).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SerializedBoundary(String);

impl SerializedBoundary {
    /// Wraps already-encoded text. No validation happens until the value
    /// is deserialized.
    #[must_use]
    pub const fn new(text: String) -> Self {
        Self(text)
    }

    /// Returns the encoded text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for SerializedBoundary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Severity of an advisory [`Status`].
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
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum StatusLevel {
    /// The step completed as requested.
    Success,
    /// The step degraded (fallback boundary, empty category).
    Warning,
}

/// Human-readable outcome of a pipeline step. Advisory only; never
/// changes control flow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Status {
    /// Severity.
    pub level: StatusLevel,
    /// Message suitable for display.
    pub message: String,
}

impl Status {
    /// Creates a success status.
    #[must_use]
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            level: StatusLevel::Success,
            message: message.into(),
        }
    }

    /// Creates a warning status.
    #[must_use]
    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            level: StatusLevel::Warning,
            message: message.into(),
        }
    }

    /// Whether this is a warning.
    #[must_use]
    pub fn is_warning(&self) -> bool {
        self.level == StatusLevel::Warning
    }
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.level, self.message)
    }
}

/// How a [`Resolution`]'s boundary was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ResolutionSource {
    /// The address was geocoded to a place polygon.
    Geocoded,
    /// Administrative polygons around a point were merged.
    AdministrativeUnion {
        /// Number of polygons merged into the boundary.
        count: usize,
    },
    /// A synthetic circle was substituted.
    Fallback,
}

impl std::fmt::Display for ResolutionSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Geocoded => f.write_str("geocoded boundary"),
            Self::AdministrativeUnion { count } => {
                write!(f, "union of {count} administrative boundaries")
            }
            Self::Fallback => f.write_str("fallback circle"),
        }
    }
}

/// Result of resolving a [`LocationQuery`]. The boundary is always present.
#[derive(Debug, Clone)]
pub struct Resolution {
    /// The search region.
    pub boundary: BoundaryGeometry,
    /// Advisory outcome for the caller to surface.
    pub status: Status,
    /// How the boundary was obtained.
    pub source: ResolutionSource,
}

impl Resolution {
    /// Whether the boundary is a synthetic fallback circle.
    #[must_use]
    pub const fn is_fallback(&self) -> bool {
        matches!(self.source, ResolutionSource::Fallback)
    }
}
