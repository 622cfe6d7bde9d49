//! Data sources the pipeline can run against.
//!
//! A [`DataSource`] answers the two questions the pipeline asks: "where is
//! this address?" and "what parcel is here?". The live source talks to
//! `ArcGIS`, the synthetic source fabricates plausible answers, and the
//! fallback source tries the first and degrades to the second when a
//! service call fails.

use std::sync::Arc;

use async_trait::async_trait;
use parcel_boundary::fetchers::arcgis::ParcelFetcher;
use parcel_boundary::fetchers::synthetic::SyntheticParcels;
use parcel_boundary::{BoundaryError, BoundaryLookup};
use parcel_geocoder::arcgis::ArcGisGeocoder;
use parcel_geocoder::synthetic::synthetic_candidates;
use parcel_geocoder::{GeocodeError, best_candidate};
use parcel_property_models::{AddressCandidate, AddressComponents, LngLat, Provenance};

use crate::config::{Deployment, PipelineConfig};
use crate::registry::{self, ProviderConfig};

/// What to look a boundary up by.
#[derive(Debug, Clone, PartialEq)]
pub enum BoundaryQuery {
    /// Free-text address, geocoded first.
    Address(String),
    /// Structured address parts.
    Components(AddressComponents),
    /// A map point.
    Location(LngLat),
}

impl BoundaryQuery {
    /// Short description for logs and messages.
    #[must_use]
    pub fn describe(&self) -> String {
        match self {
            Self::Address(address) => format!("address {:?}", address.trim()),
            Self::Components(components) => format!("components {:?}", components.one_line()),
            Self::Location(point) => format!("location {point}"),
        }
    }
}

/// A provider of geocodes and raw parcel features.
#[async_trait]
pub trait DataSource: Send + Sync {
    /// Returns a short identifier for logs (e.g., `"arcgis"`).
    fn name(&self) -> &str;

    /// Finds candidates for an address, best first.
    ///
    /// # Errors
    ///
    /// Returns [`GeocodeError`] for a blank address or a failed call.
    async fn geocode(&self, address: &str) -> Result<Vec<AddressCandidate>, GeocodeError>;

    /// Fetches raw parcel features for a query.
    ///
    /// # Errors
    ///
    /// Returns [`BoundaryError`] for invalid input or a failed call.
    async fn fetch_boundary(&self, query: &BoundaryQuery) -> Result<BoundaryLookup, BoundaryError>;

    /// Fetches the parcel for `address` at a candidate that has already
    /// been geocoded, keeping the candidate on the lookup.
    ///
    /// # Errors
    ///
    /// Returns [`BoundaryError`] for invalid input or a failed call.
    async fn fetch_boundary_at(
        &self,
        _address: &str,
        candidate: &AddressCandidate,
    ) -> Result<BoundaryLookup, BoundaryError> {
        let mut lookup = self
            .fetch_boundary(&BoundaryQuery::Location(candidate.location))
            .await?;
        lookup.candidate = Some(candidate.clone());
        Ok(lookup)
    }
}

/// Live `ArcGIS` geocoder plus parcel layer.
#[derive(Debug, Clone)]
pub struct ArcGisDataSource {
    fetcher: ParcelFetcher,
}

impl ArcGisDataSource {
    /// Wraps a configured parcel fetcher.
    #[must_use]
    pub const fn new(fetcher: ParcelFetcher) -> Self {
        Self { fetcher }
    }
}

#[async_trait]
impl DataSource for ArcGisDataSource {
    fn name(&self) -> &str {
        "arcgis"
    }

    async fn geocode(&self, address: &str) -> Result<Vec<AddressCandidate>, GeocodeError> {
        self.fetcher.geocoder().find_candidates(address).await
    }

    async fn fetch_boundary(&self, query: &BoundaryQuery) -> Result<BoundaryLookup, BoundaryError> {
        match query {
            BoundaryQuery::Address(address) => self.fetcher.by_address(address).await,
            BoundaryQuery::Components(components) => self.fetcher.by_components(components).await,
            BoundaryQuery::Location(point) => self.fetcher.by_location(*point).await,
        }
    }

    async fn fetch_boundary_at(
        &self,
        _address: &str,
        candidate: &AddressCandidate,
    ) -> Result<BoundaryLookup, BoundaryError> {
        self.fetcher.at_candidate(candidate.clone()).await
    }
}

/// Deterministic fabricated data. Never touches the network.
#[derive(Debug, Clone, Default)]
pub struct SyntheticDataSource {
    parcels: SyntheticParcels,
}

impl SyntheticDataSource {
    /// Creates a source that answers boundary queries after `parcels`'
    /// simulated latency.
    #[must_use]
    pub const fn new(parcels: SyntheticParcels) -> Self {
        Self { parcels }
    }
}

#[async_trait]
impl DataSource for SyntheticDataSource {
    fn name(&self) -> &str {
        "synthetic"
    }

    async fn geocode(&self, address: &str) -> Result<Vec<AddressCandidate>, GeocodeError> {
        synthetic_candidates(address)
    }

    async fn fetch_boundary(&self, query: &BoundaryQuery) -> Result<BoundaryLookup, BoundaryError> {
        match query {
            BoundaryQuery::Address(address) => self.parcels.by_address(address).await,
            BoundaryQuery::Components(components) => self.parcels.by_components(components).await,
            BoundaryQuery::Location(point) => self.parcels.by_location(*point).await,
        }
    }

    async fn fetch_boundary_at(
        &self,
        address: &str,
        candidate: &AddressCandidate,
    ) -> Result<BoundaryLookup, BoundaryError> {
        self.parcels.at_candidate(address, candidate.clone()).await
    }
}

/// Tries `primary` and answers from `fallback` when a service call fails.
///
/// Validation errors are returned as-is: bad input stays bad input no
/// matter which source sees it. Address lookups geocode first, so a live
/// geocode match survives a failed parcel query and the fallback parcel is
/// built at that match.
pub struct FallbackDataSource {
    primary: Arc<dyn DataSource>,
    fallback: Arc<dyn DataSource>,
}

impl FallbackDataSource {
    /// Pairs a primary source with its fallback.
    #[must_use]
    pub fn new(primary: Arc<dyn DataSource>, fallback: Arc<dyn DataSource>) -> Self {
        Self { primary, fallback }
    }

    async fn fetch_by_address(&self, address: &str) -> Result<BoundaryLookup, BoundaryError> {
        let candidates = self.geocode(address).await?;
        let Some(candidate) = best_candidate(&candidates) else {
            log::info!("No addresses found for {:?}", address.trim());
            return Ok(BoundaryLookup::no_match());
        };

        if candidate.provenance == Provenance::Synthetic {
            return self.fallback.fetch_boundary_at(address, candidate).await;
        }
        self.fetch_boundary_at(address, candidate).await
    }
}

#[async_trait]
impl DataSource for FallbackDataSource {
    fn name(&self) -> &str {
        "fallback"
    }

    async fn geocode(&self, address: &str) -> Result<Vec<AddressCandidate>, GeocodeError> {
        match self.primary.geocode(address).await {
            Err(e) if !e.is_validation() => {
                log::warn!(
                    "Geocoding via {} failed ({e}), using {} data",
                    self.primary.name(),
                    self.fallback.name()
                );
                self.fallback.geocode(address).await
            }
            result => result,
        }
    }

    async fn fetch_boundary(&self, query: &BoundaryQuery) -> Result<BoundaryLookup, BoundaryError> {
        if let BoundaryQuery::Address(address) = query {
            return self.fetch_by_address(address).await;
        }

        match self.primary.fetch_boundary(query).await {
            Err(e) if !e.is_validation() => {
                log::warn!(
                    "Boundary lookup for {} via {} failed ({e}), using {} data",
                    query.describe(),
                    self.primary.name(),
                    self.fallback.name()
                );
                self.fallback.fetch_boundary(query).await
            }
            result => result,
        }
    }

    async fn fetch_boundary_at(
        &self,
        address: &str,
        candidate: &AddressCandidate,
    ) -> Result<BoundaryLookup, BoundaryError> {
        match self.primary.fetch_boundary_at(address, candidate).await {
            Err(e) if !e.is_validation() => {
                log::warn!(
                    "Parcel lookup at {} via {} failed ({e}), using {} data",
                    candidate.location,
                    self.primary.name(),
                    self.fallback.name()
                );
                self.fallback.fetch_boundary_at(address, candidate).await
            }
            result => result,
        }
    }
}

/// Picks the data source for a configuration.
///
/// `Local` deployments, and live ones with no enabled services, get the
/// synthetic source alone. Otherwise the live `ArcGIS` source is used with
/// the synthetic source behind it.
#[must_use]
pub fn build_data_source(config: &PipelineConfig, client: reqwest::Client) -> Arc<dyn DataSource> {
    let synthetic = Arc::new(SyntheticDataSource::new(SyntheticParcels::new(
        config.simulated_latency,
    )));

    if config.deployment == Deployment::Local {
        log::info!("Local deployment, using synthetic data only");
        return synthetic;
    }

    let geocoder = registry::geocoder_service().and_then(|svc| match svc.provider {
        ProviderConfig::ArcgisGeocoder { url, max_locations } => Some((url, max_locations)),
        ProviderConfig::ArcgisParcels { .. } => None,
    });
    let parcel_url = registry::parcel_service().map(|svc| svc.url().to_string());

    let (Some((geocode_url, max_locations)), Some(parcel_url)) = (geocoder, parcel_url) else {
        log::warn!("No enabled geocoder and parcel services, using synthetic data only");
        return synthetic;
    };

    let geocoder = ArcGisGeocoder::new(
        client.clone(),
        config.geocode_url.clone().unwrap_or(geocode_url),
    )
    .with_max_locations(max_locations)
    .with_token(config.token.clone());
    let fetcher = ParcelFetcher::new(
        client,
        config.parcel_url.clone().unwrap_or(parcel_url),
        geocoder,
    )
    .with_token(config.token.clone());

    log::info!("Live deployment, using ArcGIS with synthetic fallback");
    Arc::new(FallbackDataSource::new(
        Arc::new(ArcGisDataSource::new(fetcher)),
        synthetic,
    ))
}
