#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Property parcel boundary fetching and normalization.
//!
//! Looks up cadastral parcels by address, by address components, or by
//! map point, and turns whatever shape the service returns into
//! [`normalize::NormalizedParcel`] values. Fetchers live in [`fetchers`]:
//! the live `ArcGIS` `FeatureServer` client and a synthetic generator with
//! the same attribute schema.

pub mod fetchers;
pub mod normalize;

use parcel_geocoder::GeocodeError;
use parcel_geocoder::http::HttpFailure;
use parcel_property_models::{
    AddressCandidate, InvalidCoordinateError, MissingComponentError, Provenance,
};
use thiserror::Error;

/// Errors that can occur during boundary lookups.
#[derive(Debug, Error)]
pub enum BoundaryError {
    /// Geocoding the address failed.
    #[error(transparent)]
    Geocode(#[from] GeocodeError),

    /// A required address component was blank.
    #[error("Missing address component: {0}")]
    MissingComponent(#[from] MissingComponentError),

    /// The lookup point was not finite.
    #[error("Invalid location: {0}")]
    InvalidLocation(#[from] InvalidCoordinateError),

    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The parcel service answered with an error status or payload.
    #[error("Boundary service error: {message}")]
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

impl BoundaryError {
    /// Returns `true` for input errors raised before any network call.
    #[must_use]
    pub const fn is_validation(&self) -> bool {
        match self {
            Self::Geocode(e) => e.is_validation(),
            Self::MissingComponent(_) | Self::InvalidLocation(_) => true,
            Self::Http(_) | Self::Service { .. } | Self::Parse { .. } => false,
        }
    }
}

impl From<HttpFailure> for BoundaryError {
    fn from(value: HttpFailure) -> Self {
        match value {
            HttpFailure::Request(e) => Self::Http(e),
            HttpFailure::Status { .. } | HttpFailure::Esri { .. } => Self::Service {
                message: value.to_string(),
            },
            HttpFailure::Decode { message } => Self::Parse { message },
        }
    }
}

/// Raw result of a boundary lookup, before normalization.
#[derive(Debug, Clone, PartialEq)]
pub struct BoundaryLookup {
    /// The geocode match the lookup was made for, if it started from an
    /// address.
    pub candidate: Option<AddressCandidate>,
    /// Raw parcel features (`ArcGIS` or `GeoJSON` shaped).
    pub features: Vec<serde_json::Value>,
    /// Whether any feature was fabricated.
    pub provenance: Provenance,
}

impl BoundaryLookup {
    /// A lookup whose address could not be geocoded.
    #[must_use]
    pub const fn no_match() -> Self {
        Self {
            candidate: None,
            features: Vec::new(),
            provenance: Provenance::Live,
        }
    }

    /// Returns `true` if no features were found.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }
}
