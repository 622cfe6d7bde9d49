#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Property boundary types shared by every stage of the search pipeline.
//!
//! All coordinates in this crate use a single convention: `[lng, lat]`
//! (`GeoJSON` order). Renderers that want `[lat, lng]` convert at their
//! own boundary via `parcel_geometry::leaflet`, never here.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// A `[lng, lat]` position with finite components.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "[f64; 2]", into = "[f64; 2]")]
pub struct LngLat {
    /// Longitude (x), WGS84 degrees.
    pub lng: f64,
    /// Latitude (y), WGS84 degrees.
    pub lat: f64,
}

impl LngLat {
    /// Creates a position without checking finiteness.
    ///
    /// Use [`LngLat::try_new`] for any value that came from outside the
    /// process.
    #[must_use]
    pub const fn new(lng: f64, lat: f64) -> Self {
        Self { lng, lat }
    }

    /// Creates a position, rejecting `NaN` and infinite components.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidCoordinateError`] if either component is not finite.
    pub fn try_new(lng: f64, lat: f64) -> Result<Self, InvalidCoordinateError> {
        if lng.is_finite() && lat.is_finite() {
            Ok(Self { lng, lat })
        } else {
            Err(InvalidCoordinateError { lng, lat })
        }
    }

    /// Returns `true` if both components are finite.
    #[must_use]
    pub const fn is_finite(self) -> bool {
        self.lng.is_finite() && self.lat.is_finite()
    }

    /// Returns this position offset by `dx` degrees of longitude and `dy`
    /// degrees of latitude.
    #[must_use]
    pub fn offset(self, dx: f64, dy: f64) -> Self {
        Self::new(self.lng + dx, self.lat + dy)
    }
}

impl TryFrom<[f64; 2]> for LngLat {
    type Error = InvalidCoordinateError;

    fn try_from([lng, lat]: [f64; 2]) -> Result<Self, Self::Error> {
        Self::try_new(lng, lat)
    }
}

impl From<LngLat> for [f64; 2] {
    fn from(value: LngLat) -> Self {
        [value.lng, value.lat]
    }
}

impl fmt::Display for LngLat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.6}, {:.6}", self.lng, self.lat)
    }
}

/// Error returned when a coordinate component is `NaN` or infinite.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InvalidCoordinateError {
    /// The rejected longitude.
    pub lng: f64,
    /// The rejected latitude.
    pub lat: f64,
}

impl fmt::Display for InvalidCoordinateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "invalid coordinate [{}, {}]: both components must be finite",
            self.lng, self.lat
        )
    }
}

impl std::error::Error for InvalidCoordinateError {}

/// A closed polygon ring: first position repeated as the last.
pub type Ring = Vec<LngLat>;

/// Whether data came from a live service or was fabricated locally.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Provenance {
    /// Returned by the remote geocode or parcel service.
    #[default]
    Live,
    /// Produced by a synthetic generator (no backend, or the backend failed).
    Synthetic,
}

/// Identifier of a [`Property`].
///
/// Ids minted on the client carry the [`PropertyId::TEMPORARY_PREFIX`] until
/// the property is saved, at which point storage issues a persisted id.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PropertyId(String);

impl PropertyId {
    /// Prefix marking a client-generated id that has not been persisted.
    pub const TEMPORARY_PREFIX: &'static str = "tmp-";

    /// Mints a new temporary id.
    #[must_use]
    pub fn temporary() -> Self {
        Self(format!("{}{}", Self::TEMPORARY_PREFIX, uuid::Uuid::new_v4()))
    }

    /// Mints a new persisted id.
    #[must_use]
    pub fn persisted() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    /// Returns `true` if this id has not been issued by storage yet.
    #[must_use]
    pub fn is_temporary(&self) -> bool {
        self.0.starts_with(Self::TEMPORARY_PREFIX)
    }

    /// Returns the id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the first eight characters after any temporary prefix.
    #[must_use]
    pub fn short(&self) -> &str {
        let bare = self
            .0
            .strip_prefix(Self::TEMPORARY_PREFIX)
            .unwrap_or(&self.0);
        bare.get(..8).unwrap_or(bare)
    }
}

impl From<String> for PropertyId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for PropertyId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl fmt::Display for PropertyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Length of one boundary side.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SegmentMeasurement {
    /// Zero-based side index.
    pub index: usize,
    /// Side start position.
    pub start: LngLat,
    /// Side end position.
    pub end: LngLat,
    /// Approximate length in meters.
    pub length_m: f64,
}

/// Derived measurements of a property's first boundary ring.
///
/// Computed from the ring, never fetched from a service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Measurements {
    /// Sum of all side lengths in meters.
    pub total_length_m: f64,
    /// Per-side lengths in ring order.
    pub segments: Vec<SegmentMeasurement>,
    /// Enclosed area in square meters.
    pub area_m2: f64,
}

/// The canonical record produced by the boundary pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Property {
    /// Temporary or persisted identifier.
    pub id: PropertyId,
    /// Display label.
    pub name: String,
    /// Free text.
    pub description: Option<String>,
    /// Free-text address, used for search and matching.
    pub address: Option<String>,
    /// Representative point (geocode point or first-ring centroid).
    pub location: LngLat,
    /// Closed rings with at least three points each.
    pub boundaries: Vec<Ring>,
    /// Derived measurements of the first ring.
    pub measurements: Option<Measurements>,
    /// Where the geometry came from.
    #[serde(default)]
    pub provenance: Provenance,
}

impl Property {
    /// Picks a display name: explicit name, then address, then a
    /// placeholder derived from the id.
    #[must_use]
    pub fn resolve_name(name: Option<&str>, address: Option<&str>, id: &PropertyId) -> String {
        name.map(str::trim)
            .filter(|s| !s.is_empty())
            .or_else(|| address.map(str::trim).filter(|s| !s.is_empty()))
            .map_or_else(|| format!("Property {}", id.short()), str::to_string)
    }

    /// Renames the property. Blank names fall back to the address or the
    /// placeholder.
    pub fn rename(&mut self, name: &str) {
        self.name = Self::resolve_name(Some(name), self.address.as_deref(), &self.id);
    }

    /// Returns the first boundary ring, if any.
    #[must_use]
    pub fn primary_ring(&self) -> Option<&Ring> {
        self.boundaries.first()
    }
}

/// A geocoder match for a free-text address.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddressCandidate {
    /// The matched address string.
    pub address: String,
    /// Matched point.
    pub location: LngLat,
    /// Confidence, 0-100.
    pub score: f64,
    /// Provider attributes (house number, street, suburb, postcode, ...).
    #[serde(default)]
    pub attributes: BTreeMap<String, String>,
    /// Live or synthetic.
    #[serde(default)]
    pub provenance: Provenance,
}

impl AddressCandidate {
    /// Returns a provider attribute by name.
    #[must_use]
    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).map(String::as_str)
    }
}

/// Structured address input for component searches.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddressComponents {
    /// House number, required.
    pub house_number: String,
    /// Street name including its type (e.g. "Main Street"), required.
    pub street_name: String,
    /// Suburb, optional.
    #[serde(default)]
    pub suburb: Option<String>,
    /// Postcode, optional.
    #[serde(default)]
    pub postcode: Option<String>,
}

impl AddressComponents {
    /// Checks that the required components are present.
    ///
    /// # Errors
    ///
    /// Returns [`MissingComponentError`] naming the first blank required
    /// field.
    pub fn validate(&self) -> Result<(), MissingComponentError> {
        if self.house_number.trim().is_empty() {
            return Err(MissingComponentError {
                field: "house number",
            });
        }
        if self.street_name.trim().is_empty() {
            return Err(MissingComponentError {
                field: "street name",
            });
        }
        Ok(())
    }

    /// Returns the optional suburb, trimmed, if non-blank.
    #[must_use]
    pub fn suburb(&self) -> Option<&str> {
        self.suburb.as_deref().map(str::trim).filter(|s| !s.is_empty())
    }

    /// Returns the optional postcode, trimmed, if non-blank.
    #[must_use]
    pub fn postcode(&self) -> Option<&str> {
        self.postcode
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }

    /// Joins the components as `"<number> <street>, <suburb> <postcode>"`.
    #[must_use]
    pub fn one_line(&self) -> String {
        let mut line = format!("{} {}", self.house_number.trim(), self.street_name.trim());
        if let Some(suburb) = self.suburb() {
            line.push_str(", ");
            line.push_str(suburb);
        }
        if let Some(postcode) = self.postcode() {
            line.push(' ');
            line.push_str(postcode);
        }
        line
    }
}

/// Error returned when a required address component is blank.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MissingComponentError {
    /// Human-readable name of the missing field.
    pub field: &'static str,
}

impl fmt::Display for MissingComponentError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} is required", self.field)
    }
}

impl std::error::Error for MissingComponentError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lng_lat_serializes_as_pair() {
        let point = LngLat::new(153.0251, -27.4698);
        let json = serde_json::to_string(&point).unwrap();
        assert_eq!(json, "[153.0251,-27.4698]");
        let back: LngLat = serde_json::from_str(&json).unwrap();
        assert_eq!(back, point);
    }

    #[test]
    fn lng_lat_rejects_non_finite() {
        assert!(LngLat::try_new(f64::NAN, 1.0).is_err());
        assert!(LngLat::try_new(1.0, f64::INFINITY).is_err());
        assert!(LngLat::try_new(1.0, 2.0).is_ok());
    }

    #[test]
    fn temporary_ids_are_marked() {
        let id = PropertyId::temporary();
        assert!(id.is_temporary());
        assert_eq!(id.short().len(), 8);
        assert!(!PropertyId::persisted().is_temporary());
    }

    #[test]
    fn name_falls_back_to_address_then_placeholder() {
        let id = PropertyId::from("tmp-abcdef123456");
        assert_eq!(
            Property::resolve_name(Some("  "), Some("1 Main St"), &id),
            "1 Main St"
        );
        assert_eq!(Property::resolve_name(None, None, &id), "Property abcdef12");
        assert_eq!(
            Property::resolve_name(Some("Depot"), Some("1 Main St"), &id),
            "Depot"
        );
    }

    #[test]
    fn components_require_house_number_and_street() {
        let mut components = AddressComponents {
            house_number: " ".to_string(),
            street_name: "Main Street".to_string(),
            ..AddressComponents::default()
        };
        assert_eq!(
            components.validate().unwrap_err().field,
            "house number"
        );

        components.house_number = "12".to_string();
        components.street_name = String::new();
        assert_eq!(components.validate().unwrap_err().field, "street name");

        components.street_name = "Main Street".to_string();
        assert!(components.validate().is_ok());
    }

    #[test]
    fn components_one_line_skips_blank_parts() {
        let components = AddressComponents {
            house_number: "12".to_string(),
            street_name: "Smith Street".to_string(),
            suburb: Some("Townsville".to_string()),
            postcode: Some(" ".to_string()),
        };
        assert_eq!(components.one_line(), "12 Smith Street, Townsville");
    }
}
