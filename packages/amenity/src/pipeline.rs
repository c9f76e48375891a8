//! One resolve, fetch, aggregate cycle.
//!
//! The boundary is returned by [`Pipeline::resolve`] and passed by value
//! into aggregation; nothing about the current location is stored on the
//! pipeline itself. The only state shared across cycles is the fetch
//! cache inside [`FeatureFetcher`].

use std::sync::Arc;

use amenity_map_boundary::resolver::LocationResolver;
use amenity_map_boundary_models::{LocationQuery, Resolution};

use crate::PipelineError;
use crate::aggregator::{AmenityAggregator, Aggregation};
use crate::fetcher::FeatureFetcher;
use crate::progress::ProgressCallback;
use crate::registry::{AmenityCatalog, Selection};

/// Boundary plus amenities for one query.
#[derive(Debug, Clone)]
pub struct CycleResult {
    /// How the query was resolved.
    pub resolution: Resolution,
    /// Aggregated amenities and per-category warnings.
    pub aggregation: Aggregation,
}

/// Outcome of [`Pipeline::run`].
#[derive(Debug, Clone)]
pub enum PipelineOutcome {
    /// No location has been given yet; nothing was fetched.
    AwaitingLocation,
    /// The cycle ran to completion.
    Completed(Box<CycleResult>),
}

/// Wires the resolver, the memoizing fetcher, and the catalog together.
pub struct Pipeline {
    resolver: LocationResolver,
    aggregator: AmenityAggregator,
    catalog: AmenityCatalog,
}

impl Pipeline {
    /// Assembles a pipeline from its resolver, fetch cache, and catalog.
    #[must_use]
    pub const fn new(
        resolver: LocationResolver,
        fetcher: Arc<FeatureFetcher>,
        catalog: AmenityCatalog,
    ) -> Self {
        Self {
            resolver,
            aggregator: AmenityAggregator::new(fetcher),
            catalog,
        }
    }

    /// The catalog selections are validated against.
    #[must_use]
    pub const fn catalog(&self) -> &AmenityCatalog {
        &self.catalog
    }

    /// Resolves `query` to a boundary. Always yields one.
    pub async fn resolve(&self, query: &LocationQuery) -> Resolution {
        self.resolver.resolve(query).await
    }

    /// Resolves `query` and aggregates the selected amenities inside it.
    ///
    /// # Errors
    ///
    /// * [`PipelineError::UnknownCategory`] if `selection` names an entry
    ///   missing from the catalog. Checked before anything is resolved or
    ///   fetched.
    pub async fn run(
        &self,
        query: Option<&LocationQuery>,
        selection: &Selection,
        progress: &dyn ProgressCallback,
    ) -> Result<PipelineOutcome, PipelineError> {
        let (categories, specific) = self.catalog.select(selection)?;

        let Some(query) = query else {
            log::debug!("No location yet; skipping fetch");
            return Ok(PipelineOutcome::AwaitingLocation);
        };

        let resolution = self.resolve(query).await;
        let aggregation = self
            .aggregator
            .aggregate(&resolution.boundary, &categories, &specific, progress)
            .await;

        Ok(PipelineOutcome::Completed(Box::new(CycleResult {
            resolution,
            aggregation,
        })))
    }
}
