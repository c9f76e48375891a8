#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Turns a location request into a search boundary.
//!
//! Two resolution strategies are supported by [`resolver::LocationResolver`]:
//!
//! 1. **Address**: geocoded to a place polygon through a [`Geocoder`].
//! 2. **Point**: administrative polygons containing the point are fetched
//!    through a [`BoundaryLookup`] and merged by union.
//!
//! Whenever neither yields a polygon, a circle from [`fallback`] is
//! substituted, so resolution always produces a boundary. The
//! [`serializer`] module provides the canonical text form used as the
//! identity of a boundary downstream.

pub mod fallback;
pub mod resolver;
pub mod serializer;

use amenity_map_boundary_models::BoundaryGeometry;
use async_trait::async_trait;
use thiserror::Error;

/// Errors from encoding or decoding boundaries.
#[derive(Debug, Error)]
pub enum BoundaryError {
    /// The geometry has no usable exterior ring.
    #[error("Boundary geometry is empty")]
    Empty,

    /// Encoding to text failed.
    #[error("Failed to encode boundary: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The text is not valid `GeoJSON` geometry.
    #[error("Failed to decode boundary: {0}")]
    Deserialization(#[from] geojson::Error),

    /// The text decoded to something other than a polygon.
    #[error("Unsupported boundary geometry type: {kind}")]
    UnsupportedGeometry {
        /// Geometry type that was found.
        kind: String,
    },
}

/// Errors from address geocoding.
#[derive(Debug, Error)]
pub enum GeocodeError {
    /// The geocoder returned nothing usable for the query.
    #[error("No match for {query}: {reason}")]
    NoMatch {
        /// The query that was geocoded.
        query: String,
        /// Why nothing matched.
        reason: String,
    },

    /// The geocoding service failed.
    #[error("Geocoding service error: {message}")]
    Service {
        /// Description of the failure.
        message: String,
    },
}

/// Errors from point-based administrative boundary lookups.
#[derive(Debug, Error)]
pub enum BoundaryLookupError {
    /// The lookup service failed.
    #[error("Boundary lookup service error: {message}")]
    Service {
        /// Description of the failure.
        message: String,
    },
}

/// Resolves free-text addresses to place polygons.
#[async_trait]
pub trait Geocoder: Send + Sync {
    /// Geocodes `address` to an areal boundary.
    ///
    /// # Errors
    ///
    /// Returns [`GeocodeError`] when nothing matches or the service fails.
    async fn geocode_address(&self, address: &str) -> Result<BoundaryGeometry, GeocodeError>;
}

/// Finds administrative polygons around a coordinate.
#[async_trait]
pub trait BoundaryLookup: Send + Sync {
    /// Returns every administrative polygon containing `(lat, lon)`.
    ///
    /// An empty vector means nothing contains the point; that is not an
    /// error.
    ///
    /// # Errors
    ///
    /// Returns [`BoundaryLookupError`] when the service fails.
    async fn lookup_administrative_boundaries(
        &self,
        lat: f64,
        lon: f64,
    ) -> Result<Vec<BoundaryGeometry>, BoundaryLookupError>;
}
