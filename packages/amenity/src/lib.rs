#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Amenity retrieval and aggregation.
//!
//! A [`FeatureSource`] answers "which features inside this boundary match
//! this tag filter". The [`fetcher::FeatureFetcher`] memoizes those
//! answers keyed by the boundary's canonical text, and the
//! [`aggregator::AmenityAggregator`] runs one fetch per selected category
//! (plus the specific amenity) and merges the results into a single
//! labeled point dataset. [`pipeline::Pipeline`] wires resolution and
//! aggregation into one request cycle.

pub mod aggregator;
pub mod fetcher;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod registry;

#[cfg(test)]
mod test_support;

use amenity_map_amenity_models::{FeatureCollection, TagFilter};
use amenity_map_boundary_models::BoundaryGeometry;
use async_trait::async_trait;
use thiserror::Error;

/// Errors from the upstream feature source.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The request failed (network, HTTP status, timeout).
    #[error("Upstream request failed: {message}")]
    Upstream {
        /// Description of the failure.
        message: String,
    },

    /// The response could not be interpreted.
    #[error("Malformed upstream response: {message}")]
    Parse {
        /// Description of the failure.
        message: String,
    },
}

/// Errors a caller can make when driving the pipeline.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The selection names a category that is not in the catalog.
    #[error("Unknown amenity category: {name}")]
    UnknownCategory {
        /// The unrecognized name.
        name: String,
    },
}

/// Queries real-world features inside a boundary.
#[async_trait]
pub trait FeatureSource: Send + Sync {
    /// Returns every feature inside `boundary` matching `filter`.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError`] if the upstream service fails or responds
    /// with something unparseable.
    async fn query_features(
        &self,
        boundary: &BoundaryGeometry,
        filter: &TagFilter,
    ) -> Result<FeatureCollection, FetchError>;
}
