use std::collections::BTreeMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use amenity_map_amenity_models::{ElementKind, FeatureCollection, SourceFeature, TagFilter};
use amenity_map_boundary::{BoundaryLookup, BoundaryLookupError, GeocodeError, Geocoder};
use amenity_map_boundary_models::BoundaryGeometry;
use async_trait::async_trait;
use geo::{Geometry, LineString, Point, Polygon, polygon};

use crate::{FeatureSource, FetchError};

/// In-memory feature source answering per filter, counting every call.
#[derive(Default)]
pub struct StubSource {
    responses: BTreeMap<TagFilter, Result<Vec<SourceFeature>, String>>,
    calls: AtomicUsize,
    seen: Mutex<Vec<TagFilter>>,
}

impl StubSource {
    pub fn with(mut self, filter: TagFilter, features: Vec<SourceFeature>) -> Self {
        self.responses.insert(filter, Ok(features));
        self
    }

    pub fn failing(mut self, filter: TagFilter, message: &str) -> Self {
        self.responses.insert(filter, Err(message.to_string()));
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn seen(&self) -> Vec<TagFilter> {
        self.seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl FeatureSource for StubSource {
    async fn query_features(
        &self,
        _boundary: &BoundaryGeometry,
        filter: &TagFilter,
    ) -> Result<FeatureCollection, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.seen.lock().unwrap().push(filter.clone());
        match self.responses.get(filter) {
            Some(Ok(features)) => Ok(features.iter().cloned().collect()),
            Some(Err(message)) => Err(FetchError::Upstream {
                message: message.clone(),
            }),
            None => Ok(FeatureCollection::empty()),
        }
    }
}

pub fn tags(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
        .collect()
}

pub fn node(id: i64, lon: f64, lat: f64, pairs: &[(&str, &str)]) -> SourceFeature {
    SourceFeature {
        kind: ElementKind::Node,
        id,
        geometry: Geometry::Point(Point::new(lon, lat)),
        tags: tags(pairs),
    }
}

/// A closed square way with its lower-left corner at `(lon, lat)`.
pub fn square_way(id: i64, lon: f64, lat: f64, size: f64, pairs: &[(&str, &str)]) -> SourceFeature {
    let ring = LineString::from(vec![
        (lon, lat),
        (lon + size, lat),
        (lon + size, lat + size),
        (lon, lat + size),
        (lon, lat),
    ]);
    SourceFeature {
        kind: ElementKind::Way,
        id,
        geometry: Geometry::Polygon(Polygon::new(ring, vec![])),
        tags: tags(pairs),
    }
}

/// Rough rectangle around San Francisco.
pub fn san_francisco() -> BoundaryGeometry {
    BoundaryGeometry::polygon(polygon![
        (x: -122.52, y: 37.70),
        (x: -122.35, y: 37.70),
        (x: -122.35, y: 37.83),
        (x: -122.52, y: 37.83),
        (x: -122.52, y: 37.70),
    ])
    .unwrap()
}

/// Geocoder returning a fixed polygon, or no match when `None`.
pub struct StubGeocoder(pub Option<BoundaryGeometry>);

#[async_trait]
impl Geocoder for StubGeocoder {
    async fn geocode_address(&self, address: &str) -> Result<BoundaryGeometry, GeocodeError> {
        self.0.clone().ok_or_else(|| GeocodeError::NoMatch {
            query: address.to_string(),
            reason: "no results".to_string(),
        })
    }
}

/// Boundary lookup returning a fixed list of polygons.
pub struct StubLookup(pub Vec<BoundaryGeometry>);

#[async_trait]
impl BoundaryLookup for StubLookup {
    async fn lookup_administrative_boundaries(
        &self,
        _lat: f64,
        _lon: f64,
    ) -> Result<Vec<BoundaryGeometry>, BoundaryLookupError> {
        Ok(self.0.clone())
    }
}
