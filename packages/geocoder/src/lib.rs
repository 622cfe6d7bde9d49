#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Address geocoding for property boundary search.
//!
//! Turns a free-text address into ranked [`AddressCandidate`]s:
//!
//! 1. **`ArcGIS` World Geocoder** ([`arcgis`]) for live lookups.
//! 2. **Synthetic candidates** ([`synthetic`]) derived deterministically
//!    from the query, used when no backend is configured or the live
//!    service fails.
//!
//! Also provides the regex-based address fragment extraction
//! ([`address`]) shared with the boundary fetchers, and the single-shot
//! JSON request helper ([`http`]) both crates send through.

pub mod address;
pub mod arcgis;
pub mod http;
pub mod synthetic;

use parcel_property_models::AddressCandidate;
use thiserror::Error;

/// Errors from geocoding operations.
#[derive(Debug, Error)]
pub enum GeocodeError {
    /// The query was empty or whitespace. No request was made.
    #[error("Address is required")]
    EmptyAddress,

    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The service answered with an error status or error payload.
    #[error("Geocoding service error: {message}")]
    Service {
        /// Description of the service failure.
        message: String,
    },

    /// Response parsing failed.
    #[error("Parse error: {message}")]
    Parse {
        /// Description of the parsing failure.
        message: String,
    },
}

impl GeocodeError {
    /// Returns `true` for input errors raised before any network call.
    #[must_use]
    pub const fn is_validation(&self) -> bool {
        matches!(self, Self::EmptyAddress)
    }
}

impl From<http::HttpFailure> for GeocodeError {
    fn from(value: http::HttpFailure) -> Self {
        match value {
            http::HttpFailure::Request(e) => Self::Http(e),
            http::HttpFailure::Status { .. } | http::HttpFailure::Esri { .. } => Self::Service {
                message: value.to_string(),
            },
            http::HttpFailure::Decode { message } => Self::Parse { message },
        }
    }
}

/// Trims a query and rejects it if nothing is left.
///
/// # Errors
///
/// Returns [`GeocodeError::EmptyAddress`] for an empty or whitespace-only
/// query.
pub fn validate_query(address: &str) -> Result<&str, GeocodeError> {
    let trimmed = address.trim();
    if trimmed.is_empty() {
        return Err(GeocodeError::EmptyAddress);
    }
    Ok(trimmed)
}

/// Sorts candidates best first.
pub fn sort_by_score(candidates: &mut [AddressCandidate]) {
    candidates.sort_by(|a, b| b.score.total_cmp(&a.score));
}

/// Returns the highest-scoring candidate.
#[must_use]
pub fn best_candidate(candidates: &[AddressCandidate]) -> Option<&AddressCandidate> {
    candidates.iter().max_by(|a, b| a.score.total_cmp(&b.score))
}
