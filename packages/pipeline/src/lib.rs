#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Property boundary search pipeline.
//!
//! Ties the stages together: a [`DataSource`] geocodes and fetches raw
//! parcel features, [`parcel_boundary::normalize`] reshapes them, and
//! [`parcel_geometry`] validates and measures the rings. The result is a
//! list of rendering-ready [`Property`] records.
//!
//! ```text
//! address ──▶ geocode ──▶ boundary fetch ──▶ normalize ──▶ validate ──▶ Property
//! ```

pub mod config;
pub mod controller;
pub mod debounce;
pub mod import;
pub mod progress;
pub mod registry;
pub mod source;

use std::sync::Arc;

use futures::future::join_all;
use parcel_boundary::normalize::normalize_features;
use parcel_boundary::{BoundaryError, BoundaryLookup};
use parcel_geocoder::GeocodeError;
use parcel_geometry::{RingIssue, centroid, measure_ring, validate_rings};
use parcel_property_models::{AddressCandidate, Property, PropertyId, Provenance};
use thiserror::Error;

pub use config::{ConfigError, Deployment, PipelineConfig, TileSource};
pub use progress::{NullProgress, ProgressCallback, null_progress};
pub use source::{BoundaryQuery, DataSource, build_data_source};

/// Errors from a pipeline search.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Geocoding failed.
    #[error(transparent)]
    Geocode(#[from] GeocodeError),

    /// The boundary lookup failed.
    #[error(transparent)]
    Boundary(#[from] BoundaryError),

    /// The address did not geocode to anything.
    #[error("No addresses found for {query}")]
    NoAddressFound {
        /// The query as entered.
        query: String,
    },

    /// The lookup returned no parcel features.
    #[error("No property boundaries found")]
    NoBoundaries,

    /// Every returned ring was dropped by validation.
    #[error("No valid boundaries in {features} feature(s)")]
    NoValidBoundaries {
        /// Features that were examined.
        features: usize,
    },

    /// A `GeoJSON` document could not be parsed.
    #[error("GeoJSON error: {0}")]
    GeoJson(#[from] geojson::Error),

    /// Configuration could not be loaded.
    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl PipelineError {
    /// Returns `true` for input errors raised before any network call.
    #[must_use]
    pub const fn is_validation(&self) -> bool {
        match self {
            Self::Geocode(e) => e.is_validation(),
            Self::Boundary(e) => e.is_validation(),
            Self::GeoJson(_) => true,
            Self::NoAddressFound { .. }
            | Self::NoBoundaries
            | Self::NoValidBoundaries { .. }
            | Self::Config(_) => false,
        }
    }

    /// Returns `true` when the search ran but found nothing usable.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::NoAddressFound { .. } | Self::NoBoundaries | Self::NoValidBoundaries { .. }
        )
    }
}

/// What one search produced.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchOutcome {
    /// One property per parcel with at least one valid ring.
    pub properties: Vec<Property>,
    /// The geocode match the search resolved to, for address searches.
    pub candidate: Option<AddressCandidate>,
    /// Rings that were dropped, across all parcels.
    pub issues: Vec<RingIssue>,
    /// Whether any returned geometry was fabricated.
    pub provenance: Provenance,
}

/// The search pipeline over an injected [`DataSource`].
pub struct Pipeline {
    source: Arc<dyn DataSource>,
}

impl Pipeline {
    /// Creates a pipeline over `source`.
    #[must_use]
    pub fn new(source: Arc<dyn DataSource>) -> Self {
        Self { source }
    }

    /// Builds the HTTP client and data source a configuration calls for.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Config`] if the HTTP client cannot be built.
    pub fn from_config(config: &PipelineConfig) -> Result<Self, PipelineError> {
        let client = config.http_client()?;
        Ok(Self::new(build_data_source(config, client)))
    }

    /// Name of the underlying data source.
    #[must_use]
    pub fn source_name(&self) -> &str {
        self.source.name()
    }

    /// Geocodes an address. Zero candidates is not an error.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Geocode`] for a blank address or a failed
    /// call.
    pub async fn geocode(&self, address: &str) -> Result<Vec<AddressCandidate>, PipelineError> {
        Ok(self.source.geocode(address).await?)
    }

    /// Fetches raw parcel features without validating them.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Boundary`] for invalid input or a failed
    /// call.
    pub async fn fetch_boundary(&self, query: &BoundaryQuery) -> Result<BoundaryLookup, PipelineError> {
        Ok(self.source.fetch_boundary(query).await?)
    }

    /// Runs a full search and returns the validated properties.
    ///
    /// # Errors
    ///
    /// * [`PipelineError::Boundary`] for invalid input or a failed call
    /// * [`PipelineError::NoAddressFound`] if an address did not geocode
    /// * [`PipelineError::NoBoundaries`] if no parcel features came back
    /// * [`PipelineError::NoValidBoundaries`] if every ring was dropped
    pub async fn search(&self, query: &BoundaryQuery) -> Result<SearchOutcome, PipelineError> {
        log::info!("Searching {} via {}", query.describe(), self.source.name());
        let lookup = self.source.fetch_boundary(query).await?;
        assemble(query, lookup)
    }

    /// Runs several searches concurrently.
    ///
    /// Every search runs to completion regardless of the others; results
    /// come back in input order.
    pub async fn search_many(
        &self,
        queries: &[BoundaryQuery],
        progress: Arc<dyn ProgressCallback>,
    ) -> Vec<Result<SearchOutcome, PipelineError>> {
        progress.set_total(queries.len() as u64);
        progress.set_message(format!("Searching {} address(es)", queries.len()));

        let results = join_all(queries.iter().map(|query| {
            let progress = progress.clone();
            async move {
                let result = self.search(query).await;
                if let Err(e) = &result {
                    log::warn!("Search for {} failed: {e}", query.describe());
                }
                progress.inc(1);
                result
            }
        }))
        .await;

        let found = results.iter().filter(|r| r.is_ok()).count();
        progress.finish(format!("{found}/{} search(es) found boundaries", results.len()));
        results
    }
}

/// Re-validates a property built outside the pipeline, such as one a
/// client is about to save.
///
/// Rings go through the same validation as fetched boundaries, and the
/// measurements are recomputed from the first surviving ring rather than
/// trusted.
///
/// # Errors
///
/// Returns [`PipelineError::NoValidBoundaries`] if no ring survives.
pub fn revalidate(mut property: Property) -> Result<Property, PipelineError> {
    let raw: Vec<serde_json::Value> = property
        .boundaries
        .iter()
        .map(|ring| serde_json::json!(ring))
        .collect();
    let validated = validate_rings(&raw);
    for issue in &validated.issues {
        log::warn!("Property {}: {issue}", property.id);
    }

    let Some(first) = validated.rings.first() else {
        return Err(PipelineError::NoValidBoundaries { features: 1 });
    };
    property.measurements = measure_ring(first).ok();
    property.boundaries = validated.rings;
    Ok(property)
}

/// Turns a raw lookup into validated properties.
fn assemble(query: &BoundaryQuery, lookup: BoundaryLookup) -> Result<SearchOutcome, PipelineError> {
    let BoundaryLookup {
        candidate,
        features,
        provenance,
    } = lookup;

    if features.is_empty() {
        return Err(match (query, &candidate) {
            (BoundaryQuery::Address(address), None) => PipelineError::NoAddressFound {
                query: address.trim().to_string(),
            },
            _ => PipelineError::NoBoundaries,
        });
    }

    let mut properties = Vec::new();
    let mut issues = Vec::new();

    for parcel in normalize_features(&features) {
        let validated = validate_rings(&parcel.boundary.coordinates);
        issues.extend(validated.issues);
        let Some(first) = validated.rings.first() else {
            continue;
        };

        let Some(location) = candidate
            .as_ref()
            .map(|c| c.location)
            .or(parcel.location)
            .filter(|p| p.is_finite())
            .or_else(|| centroid(first))
        else {
            continue;
        };

        let measurements = match measure_ring(first) {
            Ok(m) => Some(m),
            Err(e) => {
                log::warn!("Could not measure boundary: {e}");
                None
            }
        };

        let address = parcel
            .address
            .or_else(|| candidate.as_ref().map(|c| c.address.clone()));
        let id = PropertyId::temporary();

        properties.push(Property {
            name: Property::resolve_name(None, address.as_deref(), &id),
            id,
            description: None,
            address,
            location,
            boundaries: validated.rings,
            measurements,
            provenance,
        });
    }

    if properties.is_empty() {
        log::warn!(
            "All {} boundary ring(s) in {} feature(s) were invalid",
            issues.len(),
            features.len()
        );
        return Err(PipelineError::NoValidBoundaries {
            features: features.len(),
        });
    }

    log::info!(
        "Found {} propert{} ({provenance})",
        properties.len(),
        if properties.len() == 1 { "y" } else { "ies" }
    );

    Ok(SearchOutcome {
        properties,
        candidate,
        issues,
        provenance,
    })
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::time::Duration;

    use async_trait::async_trait;
    use parcel_boundary::fetchers::synthetic::SyntheticParcels;
    use parcel_property_models::{AddressComponents, LngLat};
    use serde_json::json;

    use super::*;
    use crate::source::SyntheticDataSource;

    fn synthetic_pipeline() -> Pipeline {
        Pipeline::new(Arc::new(SyntheticDataSource::new(SyntheticParcels::new(
            Duration::ZERO,
        ))))
    }

    /// Returns a fixed lookup for every boundary query.
    struct FixedSource(BoundaryLookup);

    #[async_trait]
    impl DataSource for FixedSource {
        fn name(&self) -> &str {
            "fixed"
        }

        async fn geocode(&self, _address: &str) -> Result<Vec<AddressCandidate>, GeocodeError> {
            Ok(self.0.candidate.clone().into_iter().collect())
        }

        async fn fetch_boundary(
            &self,
            _query: &BoundaryQuery,
        ) -> Result<BoundaryLookup, BoundaryError> {
            Ok(self.0.clone())
        }
    }

    fn fixed_pipeline(features: Vec<serde_json::Value>) -> Pipeline {
        Pipeline::new(Arc::new(FixedSource(BoundaryLookup {
            candidate: None,
            features,
            provenance: Provenance::Live,
        })))
    }

    #[tokio::test]
    async fn address_search_without_backend_yields_property() {
        let pipeline = synthetic_pipeline();
        let query = BoundaryQuery::Address("123 Example Street, Brisbane QLD 4000".to_string());

        let candidates = pipeline
            .geocode("123 Example Street, Brisbane QLD 4000")
            .await
            .unwrap();
        assert_eq!(candidates[0].address, "123 Example Street, Brisbane QLD 4000");

        let outcome = pipeline.search(&query).await.unwrap();
        assert_eq!(outcome.provenance, Provenance::Synthetic);
        assert_eq!(outcome.properties.len(), 1);

        let property = &outcome.properties[0];
        assert!(property.id.is_temporary());
        assert!(property.boundaries[0].len() >= 3);
        assert!(property.location.is_finite());
        assert!(property.measurements.as_ref().unwrap().area_m2 > 0.0);
        assert_eq!(
            property.location,
            outcome.candidate.as_ref().unwrap().location
        );
    }

    #[tokio::test]
    async fn blank_address_is_validation_error() {
        let pipeline = synthetic_pipeline();
        let err = pipeline
            .search(&BoundaryQuery::Address("   ".to_string()))
            .await
            .unwrap_err();
        assert!(err.is_validation());
        assert!(pipeline.geocode("").await.unwrap_err().is_validation());
    }

    #[tokio::test]
    async fn component_search_uses_generated_address() {
        let pipeline = synthetic_pipeline();
        let components = AddressComponents {
            house_number: "12".to_string(),
            street_name: "Smith Street".to_string(),
            suburb: Some("Townsville".to_string()),
            postcode: Some("4810".to_string()),
        };
        let outcome = pipeline
            .search(&BoundaryQuery::Components(components))
            .await
            .unwrap();
        let property = &outcome.properties[0];
        assert_eq!(
            property.address.as_deref(),
            Some("12 Smith Street, Townsville 4810")
        );
        assert_eq!(property.name, "12 Smith Street, Townsville 4810");
    }

    #[tokio::test]
    async fn no_features_without_candidate_is_no_address() {
        let err = fixed_pipeline(vec![])
            .search(&BoundaryQuery::Address("nowhere".to_string()))
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::NoAddressFound { ref query } if query == "nowhere"));

        let err = fixed_pipeline(vec![])
            .search(&BoundaryQuery::Location(LngLat::new(153.0, -27.0)))
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::NoBoundaries));
    }

    #[tokio::test]
    async fn all_invalid_rings_is_no_valid_boundaries() {
        let features = vec![
            json!({"geometry": {"rings": [[[0, 0], [1, 1]]]}}),
            json!({"geometry": {"x": 153.0, "y": -27.0}}),
        ];
        let err = fixed_pipeline(features)
            .search(&BoundaryQuery::Location(LngLat::new(153.0, -27.0)))
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::NoValidBoundaries { features: 2 }));
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn invalid_rings_are_reported_alongside_valid_ones() {
        let features = vec![json!({
            "attributes": {"ADDRESS": "1 Good St"},
            "geometry": {"rings": [
                [[153.0, -27.0], [153.001, -27.0], [153.001, -27.001], [153.0, -27.0]],
                [[153.0, -27.0], ["x", -27.0], [153.001, -27.001]]
            ]}
        })];
        let outcome = fixed_pipeline(features)
            .search(&BoundaryQuery::Location(LngLat::new(153.0, -27.0)))
            .await
            .unwrap();
        assert_eq!(outcome.properties[0].boundaries.len(), 1);
        assert_eq!(outcome.issues.len(), 1);
        assert_eq!(outcome.properties[0].name, "1 Good St");
    }

    #[tokio::test]
    async fn search_many_keeps_going_after_failures() {
        let pipeline = synthetic_pipeline();
        let queries = vec![
            BoundaryQuery::Address("1 First Avenue, Brisbane".to_string()),
            BoundaryQuery::Address(String::new()),
            BoundaryQuery::Location(LngLat::new(153.0, -27.4)),
        ];
        let results = pipeline.search_many(&queries, null_progress()).await;
        assert_eq!(results.len(), 3);
        assert!(results[0].is_ok());
        assert!(results[1].as_ref().unwrap_err().is_validation());
        assert!(results[2].is_ok());
    }

    /// Records what a batch reported.
    #[derive(Default)]
    struct RecordedProgress {
        total: AtomicU64,
        done: AtomicU64,
        summary: Mutex<Option<String>>,
    }

    impl ProgressCallback for RecordedProgress {
        fn set_total(&self, total: u64) {
            self.total.store(total, Ordering::SeqCst);
        }

        fn inc(&self, delta: u64) {
            self.done.fetch_add(delta, Ordering::SeqCst);
        }

        fn set_message(&self, _msg: String) {}

        fn finish(&self, msg: String) {
            *self.summary.lock().unwrap() = Some(msg);
        }

        fn finish_and_clear(&self) {}
    }

    #[tokio::test]
    async fn search_many_reports_each_finished_query() {
        let pipeline = synthetic_pipeline();
        let queries = vec![
            BoundaryQuery::Address("3 Second Street, Brisbane".to_string()),
            BoundaryQuery::Address("  ".to_string()),
        ];
        let progress = Arc::new(RecordedProgress::default());
        pipeline.search_many(&queries, progress.clone()).await;

        assert_eq!(progress.total.load(Ordering::SeqCst), 2);
        assert_eq!(progress.done.load(Ordering::SeqCst), 2);
        assert_eq!(
            progress.summary.lock().unwrap().as_deref(),
            Some("1/2 search(es) found boundaries")
        );
    }

    fn client_property(boundaries: Vec<Vec<LngLat>>) -> Property {
        Property {
            id: PropertyId::temporary(),
            name: "Posted".to_string(),
            description: None,
            address: None,
            location: LngLat::new(0.5, 0.5),
            boundaries,
            measurements: None,
            provenance: Provenance::Live,
        }
    }

    #[test]
    fn revalidate_drops_short_rings_and_remeasures() {
        let open = vec![
            LngLat::new(0.0, 0.0),
            LngLat::new(0.001, 0.0),
            LngLat::new(0.001, 0.001),
        ];
        let short = vec![LngLat::new(0.0, 0.0), LngLat::new(1.0, 1.0)];

        let property = revalidate(client_property(vec![short, open])).unwrap();
        assert_eq!(property.boundaries.len(), 1);
        assert_eq!(property.boundaries[0].len(), 4);
        assert_eq!(property.boundaries[0][0], property.boundaries[0][3]);
        assert_eq!(property.measurements.as_ref().unwrap().segments.len(), 3);
    }

    #[test]
    fn revalidate_rejects_property_without_valid_rings() {
        let short = vec![LngLat::new(0.0, 0.0), LngLat::new(1.0, 1.0)];
        assert!(matches!(
            revalidate(client_property(vec![short])),
            Err(PipelineError::NoValidBoundaries { features: 1 })
        ));
        assert!(revalidate(client_property(vec![])).is_err());
    }
}
