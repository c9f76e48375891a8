//! Overpass API client.
//!
//! Serves both as the administrative [`BoundaryLookup`] for clicked points
//! and as the [`FeatureSource`] for tag-filtered amenity queries. Every
//! query asks for `out geom`, so ways and relation members arrive with
//! inline coordinates and no second round trip is needed.
//!
//! See <https://wiki.openstreetmap.org/wiki/Overpass_API/Overpass_QL>

use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Write as _;

use amenity_map_amenity::{FeatureSource, FetchError};
use amenity_map_amenity_models::{ElementKind, FeatureCollection, SourceFeature, TagFilter};
use amenity_map_boundary::{BoundaryLookup, BoundaryLookupError};
use amenity_map_boundary_models::BoundaryGeometry;
use async_trait::async_trait;
use geo::{Coord, Geometry, LineString, Point, Polygon};
use serde::Deserialize;

use crate::OsmError;
use crate::rings::assemble_multi_polygon;
use crate::service_registry::{OsmService, ProviderConfig};

/// Client for an Overpass QL interpreter endpoint.
pub struct OverpassClient {
    client: reqwest::Client,
    base_url: String,
    query_timeout_secs: u64,
}

impl OverpassClient {
    /// Creates a client posting queries to `base_url`.
    #[must_use]
    pub fn new(client: reqwest::Client, base_url: impl Into<String>, query_timeout_secs: u64) -> Self {
        Self {
            client,
            base_url: base_url.into(),
            query_timeout_secs,
        }
    }

    /// Creates a client from a registry entry.
    ///
    /// # Errors
    ///
    /// * [`OsmError::Parse`] if `service` is not an Overpass service
    /// * [`OsmError::Http`] if the HTTP client cannot be built
    pub fn from_service(service: &OsmService) -> Result<Self, OsmError> {
        let ProviderConfig::Overpass {
            base_url,
            query_timeout_secs,
        } = &service.provider
        else {
            return Err(OsmError::Parse {
                message: format!("Service '{}' is not an Overpass service", service.id),
            });
        };
        Ok(Self::new(
            crate::build_client(service)?,
            base_url,
            *query_timeout_secs,
        ))
    }

    async fn interpret(&self, query: &str) -> Result<OverpassResponse, OsmError> {
        log::debug!("Overpass query:\n{query}");
        let text = self
            .client
            .post(&self.base_url)
            .form(&[("data", query)])
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;

        check_remark(serde_json::from_str(&text)?)
    }
}

/// Overpass reports runtime failures (timeouts, memory limits) with HTTP
/// 200 and a `remark`, possibly alongside partial results.
fn check_remark(response: OverpassResponse) -> Result<OverpassResponse, OsmError> {
    if let Some(remark) = response.remark.as_deref()
        && remark.contains("error")
    {
        return Err(OsmError::Parse {
            message: format!("Overpass: {remark}"),
        });
    }
    Ok(response)
}

#[async_trait]
impl BoundaryLookup for OverpassClient {
    async fn lookup_administrative_boundaries(
        &self,
        lat: f64,
        lon: f64,
    ) -> Result<Vec<BoundaryGeometry>, BoundaryLookupError> {
        let query = boundary_query(lat, lon, self.query_timeout_secs);
        let response = self.interpret(&query).await?;
        let boundaries = parse_boundaries(&response);
        log::info!(
            "Found {} administrative boundaries around ({lat}, {lon})",
            boundaries.len()
        );
        Ok(boundaries)
    }
}

#[async_trait]
impl FeatureSource for OverpassClient {
    async fn query_features(
        &self,
        boundary: &BoundaryGeometry,
        filter: &TagFilter,
    ) -> Result<FeatureCollection, FetchError> {
        let query = features_query(boundary, filter, self.query_timeout_secs);
        let response = self.interpret(&query).await?;
        Ok(parse_features(&response, filter))
    }
}

// ── Query building ──────────────────────────────────────────────────

/// Escapes a value for use inside a double-quoted Overpass QL string.
fn escape_ql(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}

/// Escapes regex metacharacters so a literal value matches exactly.
fn escape_regex(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for ch in value.chars() {
        if matches!(
            ch,
            '.' | '^' | '$' | '|' | '(' | ')' | '[' | ']' | '{' | '}' | '*' | '+' | '?' | '\\'
        ) {
            out.push('\\');
        }
        out.push(ch);
    }
    out
}

/// Renders a tag filter as an Overpass tag clause.
#[must_use]
pub fn filter_clause(filter: &TagFilter) -> String {
    match filter {
        TagFilter::Equals { key, value } => {
            format!("[\"{}\"=\"{}\"]", escape_ql(key), escape_ql(value))
        }
        TagFilter::AnyOf { key, values } => {
            let alternatives: Vec<String> = values.iter().map(|v| escape_regex(v)).collect();
            format!(
                "[\"{}\"~\"^({})$\"]",
                escape_ql(key),
                escape_ql(&alternatives.join("|"))
            )
        }
        TagFilter::Present { key } => format!("[\"{}\"]", escape_ql(key)),
    }
}

/// Renders a ring as an Overpass `poly:` filter (`"lat lon lat lon ..."`).
/// The closing coordinate is omitted.
#[must_use]
pub fn poly_filter(ring: &LineString<f64>) -> String {
    let coords = &ring.0;
    let open = if coords.len() > 1 && coords.first() == coords.last() {
        &coords[..coords.len() - 1]
    } else {
        &coords[..]
    };

    let mut out = String::from("(poly:\"");
    for (i, c) in open.iter().enumerate() {
        if i > 0 {
            out.push(' ');
        }
        let _ = write!(out, "{} {}", c.y, c.x);
    }
    out.push_str("\")");
    out
}

/// Query for all elements matching `filter` inside any exterior ring of
/// `boundary`.
#[must_use]
pub fn features_query(boundary: &BoundaryGeometry, filter: &TagFilter, timeout_secs: u64) -> String {
    let clause = filter_clause(filter);
    let mut query = format!("[out:json][timeout:{timeout_secs}];\n(\n");
    for polygon in boundary.polygons() {
        let _ = writeln!(query, "  nwr{clause}{};", poly_filter(polygon.exterior()));
    }
    query.push_str(");\nout geom;");
    query
}

/// Query for every administrative boundary relation whose area contains
/// `(lat, lon)`.
#[must_use]
pub fn boundary_query(lat: f64, lon: f64, timeout_secs: u64) -> String {
    format!(
        "[out:json][timeout:{timeout_secs}];\n\
         is_in({lat},{lon})->.areas;\n\
         rel(pivot.areas)[\"boundary\"=\"administrative\"];\n\
         out geom;"
    )
}

// ── Response parsing ────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct OverpassResponse {
    #[serde(default)]
    elements: Vec<Element>,
    #[serde(default)]
    remark: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Element {
    #[serde(rename = "type")]
    kind: String,
    id: i64,
    lat: Option<f64>,
    lon: Option<f64>,
    #[serde(default)]
    geometry: Vec<LatLon>,
    #[serde(default)]
    members: Vec<Member>,
    #[serde(default)]
    tags: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
struct LatLon {
    lat: f64,
    lon: f64,
}

impl From<LatLon> for Coord<f64> {
    fn from(p: LatLon) -> Self {
        Self { x: p.lon, y: p.lat }
    }
}

#[derive(Debug, Deserialize)]
struct Member {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    role: String,
    #[serde(default)]
    geometry: Vec<LatLon>,
}

fn way_geometry(points: &[LatLon]) -> Option<Geometry<f64>> {
    let coords: Vec<Coord<f64>> = points.iter().copied().map(Coord::from).collect();
    match coords.len() {
        0 => None,
        1 => Some(Geometry::Point(Point(coords[0]))),
        n if n >= 4 && coords.first() == coords.last() => Some(Geometry::Polygon(Polygon::new(
            LineString::new(coords),
            vec![],
        ))),
        _ => Some(Geometry::LineString(LineString::new(coords))),
    }
}

fn relation_geometry(members: &[Member]) -> Option<Geometry<f64>> {
    let mut outer = Vec::new();
    let mut inner = Vec::new();
    for member in members.iter().filter(|m| m.kind == "way") {
        let coords: Vec<Coord<f64>> = member.geometry.iter().copied().map(Coord::from).collect();
        match member.role.as_str() {
            "inner" => inner.push(coords),
            "outer" | "" => outer.push(coords),
            _ => {}
        }
    }

    let multi = assemble_multi_polygon(outer, inner);
    if multi.0.is_empty() {
        None
    } else {
        Some(Geometry::MultiPolygon(multi))
    }
}

fn element_geometry(element: &Element, kind: ElementKind) -> Option<Geometry<f64>> {
    match kind {
        ElementKind::Node => Some(Geometry::Point(Point::new(element.lon?, element.lat?))),
        ElementKind::Way => way_geometry(&element.geometry),
        ElementKind::Relation => relation_geometry(&element.members),
    }
}

fn parse_boundaries(response: &OverpassResponse) -> Vec<BoundaryGeometry> {
    response
        .elements
        .iter()
        .filter(|e| e.kind == "relation" || e.kind == "way")
        .filter_map(|e| {
            let kind = e.kind.parse::<ElementKind>().ok()?;
            let geometry = element_geometry(e, kind)?;
            let boundary = BoundaryGeometry::from_geometry(geometry);
            if boundary.is_none() {
                log::debug!("Administrative {} {} has no valid closed outline", e.kind, e.id);
            }
            boundary
        })
        .collect()
}

fn parse_features(response: &OverpassResponse, filter: &TagFilter) -> FeatureCollection {
    let mut seen = BTreeSet::new();
    let mut skipped = 0_usize;

    let features: FeatureCollection = response
        .elements
        .iter()
        .filter_map(|e| {
            let kind = e.kind.parse::<ElementKind>().ok()?;
            if !filter.matches(&e.tags) || !seen.insert((kind, e.id)) {
                return None;
            }
            let Some(geometry) = element_geometry(e, kind) else {
                skipped += 1;
                return None;
            };
            Some(SourceFeature {
                kind,
                id: e.id,
                geometry,
                tags: e.tags.clone(),
            })
        })
        .collect();

    if skipped > 0 {
        log::debug!("Skipped {skipped} elements without usable geometry for {filter}");
    }

    features
}

#[cfg(test)]
mod tests {
    use geo::polygon;

    use super::*;

    fn response(value: serde_json::Value) -> OverpassResponse {
        serde_json::from_value(value).unwrap()
    }

    fn ring(x0: f64, y0: f64, size: f64) -> serde_json::Value {
        serde_json::json!([
            { "lat": y0, "lon": x0 },
            { "lat": y0, "lon": x0 + size },
            { "lat": y0 + size, "lon": x0 + size },
            { "lat": y0 + size, "lon": x0 },
            { "lat": y0, "lon": x0 }
        ])
    }

    #[test]
    fn equals_clause() {
        assert_eq!(
            filter_clause(&TagFilter::equals("amenity", "library")),
            r#"["amenity"="library"]"#
        );
    }

    #[test]
    fn any_of_clause_is_an_anchored_regex() {
        assert_eq!(
            filter_clause(&TagFilter::any_of("amenity", ["pub", "cafe", "restaurant"])),
            r#"["amenity"~"^(cafe|pub|restaurant)$"]"#
        );
    }

    #[test]
    fn present_clause() {
        assert_eq!(filter_clause(&TagFilter::present("historic")), r#"["historic"]"#);
    }

    #[test]
    fn quotes_and_metacharacters_are_escaped() {
        assert_eq!(
            filter_clause(&TagFilter::equals("name", "Joe's \"Diner\"")),
            r#"["name"="Joe's \"Diner\""]"#
        );
        assert_eq!(
            filter_clause(&TagFilter::any_of("shop", ["a.b"])),
            r#"["shop"~"^(a\\.b)$"]"#
        );
    }

    #[test]
    fn poly_filter_is_lat_lon_without_closing_point() {
        let ring: LineString<f64> = vec![(-122.5, 37.7), (-122.3, 37.7), (-122.3, 37.8), (-122.5, 37.7)].into();
        assert_eq!(
            poly_filter(&ring),
            r#"(poly:"37.7 -122.5 37.7 -122.3 37.8 -122.3")"#
        );
    }

    #[test]
    fn features_query_has_one_clause_per_part() {
        let a = polygon![(x: 0.0, y: 0.0), (x: 1.0, y: 0.0), (x: 1.0, y: 1.0), (x: 0.0, y: 0.0)];
        let b = polygon![(x: 5.0, y: 5.0), (x: 6.0, y: 5.0), (x: 6.0, y: 6.0), (x: 5.0, y: 5.0)];
        let boundary =
            BoundaryGeometry::multi_polygon(geo::MultiPolygon::new(vec![a, b])).unwrap();

        let query = features_query(&boundary, &TagFilter::present("tourism"), 50);
        assert!(query.starts_with("[out:json][timeout:50];"));
        assert_eq!(query.matches("nwr[\"tourism\"](poly:").count(), 2);
        assert!(query.ends_with("out geom;"));
    }

    #[test]
    fn boundary_query_uses_is_in() {
        let query = boundary_query(37.0, -122.0, 25);
        assert!(query.contains("is_in(37,-122)->.areas;"));
        assert!(query.contains(r#"rel(pivot.areas)["boundary"="administrative"];"#));
    }

    #[test]
    fn parses_nodes_ways_and_relations() {
        let body = response(serde_json::json!({
            "elements": [
                {
                    "type": "node", "id": 1, "lat": 37.77, "lon": -122.41,
                    "tags": { "amenity": "cafe", "name": "Sightglass" }
                },
                {
                    "type": "way", "id": 2, "geometry": ring(-122.42, 37.76, 0.001),
                    "tags": { "amenity": "restaurant" }
                },
                {
                    "type": "way", "id": 3,
                    "geometry": [{ "lat": 37.7, "lon": -122.4 }, { "lat": 37.71, "lon": -122.41 }],
                    "tags": { "amenity": "pub" }
                },
                {
                    "type": "relation", "id": 4,
                    "members": [
                        { "type": "way", "ref": 10, "role": "outer", "geometry": ring(-122.45, 37.75, 0.01) },
                        { "type": "way", "ref": 11, "role": "inner", "geometry": ring(-122.445, 37.755, 0.002) }
                    ],
                    "tags": { "amenity": "cafe", "type": "multipolygon" }
                }
            ]
        }));

        let features = parse_features(&body, &TagFilter::any_of("amenity", ["cafe", "restaurant", "pub"]));
        let kinds: Vec<(ElementKind, i64)> = features.iter().map(|f| (f.kind, f.id)).collect();
        assert_eq!(
            kinds,
            vec![
                (ElementKind::Node, 1),
                (ElementKind::Way, 2),
                (ElementKind::Way, 3),
                (ElementKind::Relation, 4),
            ]
        );

        let geometries: Vec<&Geometry<f64>> = features.iter().map(|f| &f.geometry).collect();
        assert!(matches!(geometries[0], Geometry::Point(p) if p.x() == -122.41 && p.y() == 37.77));
        assert!(matches!(geometries[1], Geometry::Polygon(_)));
        assert!(matches!(geometries[2], Geometry::LineString(_)));
        let Geometry::MultiPolygon(multi) = geometries[3] else {
            panic!("expected a multipolygon");
        };
        assert_eq!(multi.0[0].interiors().len(), 1);
    }

    #[test]
    fn drops_elements_not_matching_the_filter() {
        let body = response(serde_json::json!({
            "elements": [
                { "type": "node", "id": 1, "lat": 1.0, "lon": 1.0, "tags": { "amenity": "bench" } },
                { "type": "node", "id": 2, "lat": 1.0, "lon": 1.0, "tags": { "amenity": "library" } },
                { "type": "node", "id": 2, "lat": 1.0, "lon": 1.0, "tags": { "amenity": "library" } }
            ]
        }));
        let features = parse_features(&body, &TagFilter::equals("amenity", "library"));
        assert_eq!(features.len(), 1);
    }

    #[test]
    fn empty_response_is_empty() {
        let body = response(serde_json::json!({ "version": 0.6, "elements": [] }));
        assert!(parse_features(&body, &TagFilter::present("historic")).is_empty());
        assert!(parse_boundaries(&body).is_empty());
    }

    #[test]
    fn boundary_relations_are_assembled_from_split_ways() {
        let body = response(serde_json::json!({
            "elements": [{
                "type": "relation", "id": 111968,
                "tags": { "boundary": "administrative", "admin_level": "8" },
                "members": [
                    {
                        "type": "way", "role": "outer",
                        "geometry": [
                            { "lat": 36.9, "lon": -122.1 },
                            { "lat": 36.9, "lon": -121.9 },
                            { "lat": 37.1, "lon": -121.9 }
                        ]
                    },
                    {
                        "type": "way", "role": "outer",
                        "geometry": [
                            { "lat": 36.9, "lon": -122.1 },
                            { "lat": 37.1, "lon": -122.1 },
                            { "lat": 37.1, "lon": -121.9 }
                        ]
                    },
                    { "type": "node", "role": "admin_centre", "lat": 37.0, "lon": -122.0 }
                ]
            }]
        }));

        let boundaries = parse_boundaries(&body);
        assert_eq!(boundaries.len(), 1);
        assert!(boundaries[0].contains_point(-122.0, 37.0));
    }

    #[test]
    fn error_remark_becomes_a_parse_failure() {
        let body = response(serde_json::json!({
            "elements": [],
            "remark": "runtime error: Query timed out in \"query\" at line 3 after 51 seconds."
        }));

        let err = FetchError::from(check_remark(body).unwrap_err());
        let FetchError::Parse { message } = err else {
            panic!("expected a parse failure, got {err:?}");
        };
        assert!(message.contains("Query timed out"));
    }

    #[test]
    fn informational_remark_passes_through() {
        let body = response(serde_json::json!({
            "elements": [{ "type": "node", "id": 1, "lat": 37.0, "lon": -122.0 }],
            "remark": "Note: results may be incomplete"
        }));

        let checked = check_remark(body).unwrap();
        assert_eq!(checked.elements.len(), 1);
    }
}
