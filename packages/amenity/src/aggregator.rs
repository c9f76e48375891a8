//! Merges per-category fetches into one labeled point dataset.

use std::sync::Arc;

use amenity_map_amenity_models::{AmenityCollection, AmenityFeature, Category, SourceFeature};
use amenity_map_boundary_models::{BoundaryGeometry, Status};
use geo::{Centroid, Geometry};

use crate::fetcher::FeatureFetcher;
use crate::progress::ProgressCallback;

/// Aggregated amenities plus the warnings raised by failed fetches.
#[derive(Debug, Clone, Default)]
pub struct Aggregation {
    /// Labeled representative points, in selection order.
    pub collection: AmenityCollection,
    /// One warning per failed fetch, naming the category.
    pub warnings: Vec<Status>,
}

/// Runs one fetch per category and labels the results.
pub struct AmenityAggregator {
    fetcher: Arc<FeatureFetcher>,
}

impl AmenityAggregator {
    /// Creates an aggregator sharing `fetcher`'s cache.
    #[must_use]
    pub const fn new(fetcher: Arc<FeatureFetcher>) -> Self {
        Self { fetcher }
    }

    /// Fetches every category in order and then `specific`, appending
    /// each result labeled with its category name.
    ///
    /// Never fails. A failed or empty fetch contributes nothing and adds a
    /// warning.
    pub async fn aggregate(
        &self,
        boundary: &BoundaryGeometry,
        categories: &[Category],
        specific: &Category,
        progress: &dyn ProgressCallback,
    ) -> Aggregation {
        let mut aggregation = Aggregation::default();
        progress.set_total(categories.len() as u64 + 1);

        for category in categories.iter().chain(std::iter::once(specific)) {
            progress.set_message(format!("Fetching {}", category.name));

            let result = self.fetcher.fetch(boundary, &category.filter).await;
            let before = aggregation.collection.len();

            aggregation.collection.extend(
                result
                    .features
                    .iter()
                    .filter_map(|feature| label(feature, &category.name)),
            );

            log::debug!(
                "{}: {} amenities{}",
                category.name,
                aggregation.collection.len() - before,
                if result.cache_hit { " (cached)" } else { "" }
            );

            if let Some(status) = result.status {
                aggregation.warnings.push(Status::warning(format!(
                    "{}: {}",
                    category.name, status.message
                )));
            }

            progress.inc(1);
        }

        progress.finish(format!("{} amenities", aggregation.collection.len()));
        log::info!(
            "Aggregated {} amenities across {} fetches",
            aggregation.collection.len(),
            categories.len() + 1
        );

        aggregation
    }
}

/// Reduces a feature to its representative point and attaches `category`.
///
/// Points keep their coordinates exactly; everything else uses the
/// geometric centroid. Returns `None` when no finite point exists.
fn label(feature: &SourceFeature, category: &str) -> Option<AmenityFeature> {
    let point = match &feature.geometry {
        Geometry::Point(point) => Some(*point),
        other => other.centroid(),
    };

    let Some(point) = point.filter(|p| p.x().is_finite() && p.y().is_finite()) else {
        log::debug!(
            "Skipping {} {} in {category}: no usable centroid",
            feature.kind,
            feature.id
        );
        return None;
    };

    Some(AmenityFeature {
        category: category.to_string(),
        x: point.x(),
        y: point.y(),
        kind: feature.kind,
        id: feature.id,
        geometry: feature.geometry.clone(),
        tags: feature.tags.clone(),
    })
}
