#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! `OpenStreetMap` implementations of the boundary and feature
//! collaborators.
//!
//! * [`nominatim::NominatimGeocoder`] geocodes free text to a place
//!   polygon.
//! * [`overpass::OverpassClient`] looks up administrative boundaries
//!   around a point and queries tagged features inside a boundary.
//!
//! Endpoints, user agents, and timeouts come from the embedded
//! [`service_registry`].

pub mod nominatim;
pub mod overpass;
pub mod rings;
pub mod service_registry;

use amenity_map_amenity::FetchError;
use amenity_map_boundary::{BoundaryLookupError, GeocodeError};
use service_registry::OsmService;
use thiserror::Error;

/// Errors from talking to an OSM service.
#[derive(Debug, Error)]
pub enum OsmError {
    /// HTTP request failed (connection, timeout, non-success status).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Response body was not valid JSON of the expected shape.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Response was JSON but could not be interpreted.
    #[error("Parse error: {message}")]
    Parse {
        /// Description of the parsing failure.
        message: String,
    },
}

impl From<OsmError> for GeocodeError {
    fn from(e: OsmError) -> Self {
        Self::Service {
            message: e.to_string(),
        }
    }
}

impl From<OsmError> for BoundaryLookupError {
    fn from(e: OsmError) -> Self {
        Self::Service {
            message: e.to_string(),
        }
    }
}

impl From<OsmError> for FetchError {
    fn from(e: OsmError) -> Self {
        match e {
            OsmError::Http(e) => Self::Upstream {
                message: e.to_string(),
            },
            OsmError::Json(e) => Self::Parse {
                message: e.to_string(),
            },
            OsmError::Parse { message } => Self::Parse { message },
        }
    }
}

/// Builds an HTTP client with the service's user agent and timeout.
///
/// # Errors
///
/// Returns [`OsmError::Http`] if the TLS backend cannot be initialized.
pub fn build_client(service: &OsmService) -> Result<reqwest::Client, OsmError> {
    Ok(reqwest::Client::builder()
        .user_agent(service.user_agent.as_str())
        .timeout(service.timeout())
        .connect_timeout(std::time::Duration::from_secs(10))
        .build()?)
}
