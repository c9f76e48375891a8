//! Location resolution with fallback.
//!
//! [`LocationResolver::resolve`] never fails. Every failure path degrades
//! to a fallback circle and a warning [`Status`] describing why.

use std::sync::Arc;

use amenity_map_boundary_models::{
    BoundaryGeometry, DEFAULT_CENTER_LAT, DEFAULT_CENTER_LON, DEFAULT_FALLBACK_RADIUS_DEGREES,
    LocationQuery, Resolution, ResolutionSource, Status,
};
use geo::{BooleanOps, MultiPolygon};

use crate::fallback::build_fallback;
use crate::{BoundaryLookup, Geocoder};

/// Tunables for [`LocationResolver`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResolverConfig {
    /// Latitude of the circle used when an address cannot be geocoded.
    pub default_lat: f64,
    /// Longitude of the circle used when an address cannot be geocoded.
    pub default_lon: f64,
    /// Radius of every fallback circle, in degrees.
    pub fallback_radius_degrees: f64,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            default_lat: DEFAULT_CENTER_LAT,
            default_lon: DEFAULT_CENTER_LON,
            fallback_radius_degrees: DEFAULT_FALLBACK_RADIUS_DEGREES,
        }
    }
}

/// Resolves [`LocationQuery`] values into boundaries.
pub struct LocationResolver {
    geocoder: Arc<dyn Geocoder>,
    boundary_lookup: Arc<dyn BoundaryLookup>,
    config: ResolverConfig,
}

impl LocationResolver {
    /// Creates a resolver over the given collaborators.
    #[must_use]
    pub fn new(
        geocoder: Arc<dyn Geocoder>,
        boundary_lookup: Arc<dyn BoundaryLookup>,
        config: ResolverConfig,
    ) -> Self {
        Self {
            geocoder,
            boundary_lookup,
            config,
        }
    }

    /// Resolves `query` into a boundary. Always returns one.
    pub async fn resolve(&self, query: &LocationQuery) -> Resolution {
        log::debug!("Resolving location {query}");

        let resolution = match query {
            LocationQuery::Address(address) => self.resolve_address(address).await,
            LocationQuery::Point { lat, lon } => self.resolve_point(*lat, *lon).await,
        };

        if resolution.status.is_warning() {
            log::warn!("{}", resolution.status.message);
        } else {
            log::info!("{}", resolution.status.message);
        }

        resolution
    }

    async fn resolve_address(&self, address: &str) -> Resolution {
        let address = address.trim();
        if address.is_empty() {
            return self.default_fallback("No address entered; showing the default location");
        }

        match self.geocoder.geocode_address(address).await {
            Ok(boundary) => Resolution {
                boundary,
                status: Status::success(format!("Location found: {address}")),
                source: ResolutionSource::Geocoded,
            },
            Err(e) => self.default_fallback(&format!(
                "Failed to geocode the address. Try refining your input. Error: {e}"
            )),
        }
    }

    async fn resolve_point(&self, lat: f64, lon: f64) -> Resolution {
        if !is_valid_coordinate(lat, lon) {
            return self.default_fallback(&format!(
                "Clicked coordinates ({lat}, {lon}) are out of range; showing the default location"
            ));
        }

        let boundaries = match self
            .boundary_lookup
            .lookup_administrative_boundaries(lat, lon)
            .await
        {
            Ok(boundaries) => boundaries,
            Err(e) => {
                return self.point_fallback(
                    lat,
                    lon,
                    &format!("Boundary lookup failed at ({lat}, {lon}): {e}"),
                );
            }
        };

        let count = boundaries.len();
        if count > 1 {
            log::debug!("Merging {count} administrative boundaries around ({lat}, {lon})");
        }

        match union_boundaries(boundaries) {
            Some(boundary) => Resolution {
                boundary,
                status: Status::success(format!(
                    "Clicked Coordinates: ({lat}, {lon}), merged {count} administrative boundar{}",
                    if count == 1 { "y" } else { "ies" }
                )),
                source: ResolutionSource::AdministrativeUnion { count },
            },
            None => self.point_fallback(
                lat,
                lon,
                &format!("No administrative boundary found at ({lat}, {lon})"),
            ),
        }
    }

    fn default_fallback(&self, reason: &str) -> Resolution {
        let boundary = build_fallback(
            self.config.default_lon,
            self.config.default_lat,
            self.config.fallback_radius_degrees,
        );
        Resolution {
            boundary,
            status: Status::warning(reason),
            source: ResolutionSource::Fallback,
        }
    }

    fn point_fallback(&self, lat: f64, lon: f64, reason: &str) -> Resolution {
        let boundary = build_fallback(lon, lat, self.config.fallback_radius_degrees);
        Resolution {
            boundary,
            status: Status::warning(format!(
                "{reason}; using a {}° radius around the point",
                self.config.fallback_radius_degrees
            )),
            source: ResolutionSource::Fallback,
        }
    }
}

fn is_valid_coordinate(lat: f64, lon: f64) -> bool {
    (-90.0..=90.0).contains(&lat) && (-180.0..=180.0).contains(&lon)
}

/// Merges boundaries by geometric union.
///
/// A single boundary is returned untouched. Every polygon is merged
/// regardless of which administrative level it came from. Returns `None`
/// for an empty input or a degenerate union.
#[must_use]
pub fn union_boundaries(boundaries: Vec<BoundaryGeometry>) -> Option<BoundaryGeometry> {
    let mut iter = boundaries.into_iter();
    let first = iter.next()?;

    let mut merged: Option<MultiPolygon<f64>> = None;
    for next in iter {
        let acc = merged.unwrap_or_else(|| first.to_multi_polygon());
        merged = Some(acc.union(&next.to_multi_polygon()));
    }

    match merged {
        None => Some(first),
        Some(mp) => BoundaryGeometry::multi_polygon(mp),
    }
}
