//! Nominatim / `OpenStreetMap` geocoder client.
//!
//! Searches free text with `polygon_geojson=1` so each candidate carries
//! its place outline, and takes the first candidate whose outline is a
//! polygon or multi-polygon. The public instance allows **1 request per
//! second**; one geocode per user query stays well under that.
//!
//! See <https://nominatim.org/release-docs/develop/api/Search/>

use amenity_map_boundary::{GeocodeError, Geocoder};
use amenity_map_boundary_models::BoundaryGeometry;
use async_trait::async_trait;

use crate::OsmError;
use crate::service_registry::{OsmService, ProviderConfig};

/// Geocodes addresses to place polygons through Nominatim.
pub struct NominatimGeocoder {
    client: reqwest::Client,
    base_url: String,
    limit: u32,
}

impl NominatimGeocoder {
    /// Creates a geocoder querying the search endpoint at `base_url`.
    #[must_use]
    pub fn new(client: reqwest::Client, base_url: impl Into<String>, limit: u32) -> Self {
        Self {
            client,
            base_url: base_url.into(),
            limit,
        }
    }

    /// Creates a geocoder from a registry entry.
    ///
    /// # Errors
    ///
    /// * [`OsmError::Parse`] if `service` is not a Nominatim service
    /// * [`OsmError::Http`] if the HTTP client cannot be built
    pub fn from_service(service: &OsmService) -> Result<Self, OsmError> {
        let ProviderConfig::Nominatim { base_url, limit } = &service.provider else {
            return Err(OsmError::Parse {
                message: format!("Service '{}' is not a Nominatim service", service.id),
            });
        };
        Ok(Self::new(crate::build_client(service)?, base_url, *limit))
    }

    async fn search(&self, query: &str) -> Result<serde_json::Value, OsmError> {
        let limit = self.limit.to_string();
        let resp = self
            .client
            .get(&self.base_url)
            .query(&[
                ("q", query),
                ("format", "jsonv2"),
                ("polygon_geojson", "1"),
                ("limit", limit.as_str()),
            ])
            .send()
            .await?
            .error_for_status()?;

        Ok(resp.json().await?)
    }
}

#[async_trait]
impl Geocoder for NominatimGeocoder {
    async fn geocode_address(&self, address: &str) -> Result<BoundaryGeometry, GeocodeError> {
        log::debug!("Nominatim search: {address}");
        let body = self.search(address).await?;
        parse_response(address, &body)
    }
}

/// Picks the first areal candidate from a Nominatim search response.
fn parse_response(query: &str, body: &serde_json::Value) -> Result<BoundaryGeometry, GeocodeError> {
    let results = body.as_array().ok_or_else(|| {
        GeocodeError::from(OsmError::Parse {
            message: "Nominatim response is not an array".to_string(),
        })
    })?;

    if results.is_empty() {
        return Err(GeocodeError::NoMatch {
            query: query.to_string(),
            reason: "no results".to_string(),
        });
    }

    let mut kinds = Vec::new();
    for result in results {
        let Some(value) = result.get("geojson") else {
            kinds.push("none".to_string());
            continue;
        };
        let geometry = match geojson::Geometry::from_json_value(value.clone()) {
            Ok(geometry) => geometry,
            Err(e) => {
                log::debug!("Skipping Nominatim result with invalid geojson: {e}");
                kinds.push("invalid".to_string());
                continue;
            }
        };
        kinds.push(geometry.value.type_name().to_string());

        let Ok(geometry) = geo::Geometry::<f64>::try_from(geometry) else {
            continue;
        };
        if let Some(boundary) = BoundaryGeometry::from_geometry(geometry) {
            if let Some(name) = result["display_name"].as_str() {
                log::info!("Nominatim matched {name}");
            }
            return Ok(boundary);
        }
    }

    Err(GeocodeError::NoMatch {
        query: query.to_string(),
        reason: format!(
            "no result has a valid polygon boundary (found {})",
            kinds.join(", ")
        ),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square(x0: f64, y0: f64) -> serde_json::Value {
        serde_json::json!([[
            [x0, y0],
            [x0 + 0.1, y0],
            [x0 + 0.1, y0 + 0.1],
            [x0, y0 + 0.1],
            [x0, y0]
        ]])
    }

    #[test]
    fn parses_polygon_result() {
        let body = serde_json::json!([{
            "display_name": "San Francisco, California, United States",
            "lat": "37.7792588",
            "lon": "-122.4193286",
            "geojson": { "type": "Polygon", "coordinates": square(-122.5, 37.7) }
        }]);
        let boundary = parse_response("San Francisco, CA", &body).unwrap();
        assert!(matches!(boundary, BoundaryGeometry::Polygon(_)));
        assert!(boundary.contains_point(-122.45, 37.75));
    }

    #[test]
    fn parses_multi_polygon_result() {
        let body = serde_json::json!([{
            "display_name": "Hawaii",
            "geojson": {
                "type": "MultiPolygon",
                "coordinates": [square(-157.9, 21.3), square(-156.5, 20.8)]
            }
        }]);
        let boundary = parse_response("Hawaii", &body).unwrap();
        assert_eq!(boundary.polygons().count(), 2);
    }

    #[test]
    fn skips_point_results_for_a_later_polygon() {
        let body = serde_json::json!([
            {
                "display_name": "Main St Cafe",
                "geojson": { "type": "Point", "coordinates": [-122.4, 37.7] }
            },
            {
                "display_name": "Mission District",
                "geojson": { "type": "Polygon", "coordinates": square(-122.43, 37.75) }
            }
        ]);
        let boundary = parse_response("Mission", &body).unwrap();
        assert!(boundary.contains_point(-122.38, 37.8));
    }

    #[test]
    fn empty_result_is_no_match() {
        let body = serde_json::json!([]);
        assert!(matches!(
            parse_response("Atlantis", &body),
            Err(GeocodeError::NoMatch { reason, .. }) if reason == "no results"
        ));
    }

    #[test]
    fn point_only_results_explain_the_miss() {
        let body = serde_json::json!([{
            "display_name": "1 Market St",
            "geojson": { "type": "Point", "coordinates": [-122.39, 37.79] }
        }]);
        let Err(GeocodeError::NoMatch { query, reason }) = parse_response("1 Market St", &body)
        else {
            panic!("expected no match");
        };
        assert_eq!(query, "1 Market St");
        assert!(reason.contains("Point"), "{reason}");
    }

    #[test]
    fn self_crossing_polygon_is_no_match() {
        let body = serde_json::json!([{
            "display_name": "Bowtie Park",
            "geojson": {
                "type": "Polygon",
                "coordinates": [[[0.0, 0.0], [1.0, 1.0], [1.0, 0.0], [0.0, 1.0], [0.0, 0.0]]]
            }
        }]);
        let Err(GeocodeError::NoMatch { reason, .. }) = parse_response("Bowtie Park", &body) else {
            panic!("expected no match");
        };
        assert!(reason.contains("valid polygon"), "{reason}");
    }

    #[test]
    fn non_array_is_a_service_error() {
        let body = serde_json::json!({ "error": "Unable to geocode" });
        assert!(matches!(
            parse_response("x", &body),
            Err(GeocodeError::Service { .. })
        ));
    }
}
