//! Memoized feature fetching.
//!
//! Geometry values cannot serve as map keys, so every boundary is first
//! reduced to its canonical [`SerializedBoundary`]. The cache is keyed by
//! `(serialized boundary, filter)`: two separately computed but equal
//! boundaries share an entry, and each distinct pair reaches the upstream
//! source at most once per process. Failed and empty fetches are cached
//! as empty collections as well, and every empty result carries a warning.

use std::collections::BTreeMap;
use std::sync::{Arc, PoisonError, RwLock};

use amenity_map_amenity_models::{FeatureCollection, TagFilter};
use amenity_map_boundary::serializer::{deserialize, serialize};
use amenity_map_boundary_models::{BoundaryGeometry, SerializedBoundary, Status};
use geo::Intersects;

use crate::FeatureSource;

type CacheKey = (SerializedBoundary, TagFilter);

fn nothing_found(filter: &TagFilter) -> Status {
    Status::warning(format!("No amenities found ({filter})"))
}

/// Outcome of one [`FeatureFetcher::fetch`] call.
#[derive(Debug, Clone)]
pub struct FetchResult {
    /// Features inside the boundary matching the filter. Possibly empty.
    pub features: Arc<FeatureCollection>,
    /// Warning when the upstream query failed or nothing was found.
    pub status: Option<Status>,
    /// Whether the result came from the cache.
    pub cache_hit: bool,
}

/// Fetches features through a [`FeatureSource`], memoizing by value.
pub struct FeatureFetcher {
    source: Arc<dyn FeatureSource>,
    cache: RwLock<BTreeMap<CacheKey, Arc<FeatureCollection>>>,
}

impl FeatureFetcher {
    /// Creates a fetcher with an empty cache.
    #[must_use]
    pub fn new(source: Arc<dyn FeatureSource>) -> Self {
        Self {
            source,
            cache: RwLock::new(BTreeMap::new()),
        }
    }

    /// Returns the features inside `boundary` matching `filter`.
    ///
    /// Never fails: upstream errors yield an empty collection plus a
    /// warning status, and that empty result is cached. Empty results
    /// warn too, whether fresh or cached.
    pub async fn fetch(&self, boundary: &BoundaryGeometry, filter: &TagFilter) -> FetchResult {
        let serialized = match serialize(boundary) {
            Ok(serialized) => serialized,
            Err(e) => {
                let message = format!("Failed to fetch amenities ({filter}): {e}");
                log::warn!("{message}");
                return FetchResult {
                    features: Arc::new(FeatureCollection::empty()),
                    status: Some(Status::warning(message)),
                    cache_hit: false,
                };
            }
        };

        let key = (serialized, filter.clone());

        if let Some(features) = self.cached(&key) {
            log::debug!("Cache hit for {filter} ({} features)", features.len());
            let status = features.is_empty().then(|| nothing_found(filter));
            return FetchResult {
                features,
                status,
                cache_hit: true,
            };
        }

        let (features, status) = match self.query(&key.0, filter).await {
            Ok(features) if features.is_empty() => {
                let status = nothing_found(filter);
                log::warn!("{}", status.message);
                (features, Some(status))
            }
            Ok(features) => {
                log::info!("Fetched {} features for {filter}", features.len());
                (features, None)
            }
            Err(message) => {
                let message = format!("Failed to fetch amenities ({filter}): {message}");
                log::warn!("{message}");
                (FeatureCollection::empty(), Some(Status::warning(message)))
            }
        };

        let features = Arc::new(features);
        self.cache
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key, Arc::clone(&features));

        FetchResult {
            features,
            status,
            cache_hit: false,
        }
    }

    async fn query(
        &self,
        serialized: &SerializedBoundary,
        filter: &TagFilter,
    ) -> Result<FeatureCollection, String> {
        let boundary = deserialize(serialized).map_err(|e| e.to_string())?;
        let features = self
            .source
            .query_features(&boundary, filter)
            .await
            .map_err(|e| e.to_string())?;

        let region = boundary.to_multi_polygon();
        let total = features.len();
        let inside: FeatureCollection = features
            .iter()
            .filter(|f| f.geometry.intersects(&region))
            .cloned()
            .collect();

        if inside.len() < total {
            log::debug!(
                "Dropped {} of {total} features outside the boundary",
                total - inside.len()
            );
        }

        Ok(inside)
    }

    fn cached(&self, key: &CacheKey) -> Option<Arc<FeatureCollection>> {
        self.cache
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    /// Number of cached `(boundary, filter)` entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.cache
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Whether the cache is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drops every cached entry.
    pub fn clear(&self) {
        self.cache
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}
