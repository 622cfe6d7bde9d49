//! Render adapters for map widgets that take `[lat, lng]`.
//!
//! Everything else in the workspace is `[lng, lat]`. Conversions happen
//! here and nowhere else.

use parcel_property_models::{InvalidCoordinateError, LngLat};
use serde::{Deserialize, Serialize};

/// Reorders a position to `[lat, lng]`.
#[must_use]
pub const fn to_leaflet_lat_lng(point: LngLat) -> [f64; 2] {
    [point.lat, point.lng]
}

/// Reorders every position of a ring to `[lat, lng]`.
#[must_use]
pub fn ring_to_leaflet(ring: &[LngLat]) -> Vec<[f64; 2]> {
    ring.iter().copied().map(to_leaflet_lat_lng).collect()
}

/// Reads a `[lat, lng]` pair coming back from a map widget (e.g. a click).
///
/// # Errors
///
/// Returns [`InvalidCoordinateError`] if either component is not finite.
pub fn from_leaflet_lat_lng([lat, lng]: [f64; 2]) -> Result<LngLat, InvalidCoordinateError> {
    LngLat::try_new(lng, lat)
}

/// `{ lat, lng }` object literal accepted by most web map libraries.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLngLiteral {
    pub lat: f64,
    pub lng: f64,
}

impl From<LngLat> for LatLngLiteral {
    fn from(point: LngLat) -> Self {
        Self {
            lat: point.lat,
            lng: point.lng,
        }
    }
}

impl TryFrom<LatLngLiteral> for LngLat {
    type Error = InvalidCoordinateError;

    fn try_from(value: LatLngLiteral) -> Result<Self, Self::Error> {
        Self::try_new(value.lng, value.lat)
    }
}
