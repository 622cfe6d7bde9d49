#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! API request and response types for the parcel server.
//!
//! These types are serialized to JSON for the HTTP API. They are separate
//! from the pipeline types so the wire contract can evolve on its own.

use parcel_geometry::frontage::{FrontBoundary, identify_front_boundary};
use parcel_geometry::leaflet::ring_to_leaflet;
use parcel_geometry::{format_area, open_positions, side_label};
use parcel_property_models::{
    AddressCandidate, AddressComponents, LngLat, Property, Provenance,
};
use serde::{Deserialize, Serialize};

/// Health check response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiHealth {
    /// Whether the service is healthy.
    pub healthy: bool,
    /// Service version.
    pub version: String,
    /// Name of the active data source (`fallback`, `synthetic`, ...).
    pub data_source: String,
    /// Base-map tiles clients should draw.
    pub tiles: ApiTiles,
}

/// Base-map tile settings.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiTiles {
    /// XYZ URL template.
    pub url_template: String,
    /// Required attribution text.
    pub attribution: String,
}

/// Error body for every non-2xx response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiError {
    /// Human-readable message.
    pub error: String,
}

impl ApiError {
    /// Wraps a message.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            error: message.into(),
        }
    }
}

/// `POST /functions/v1/geocode` body.
#[derive(Debug, Clone, Deserialize)]
pub struct GeocodeRequest {
    /// Free-text address.
    #[serde(default)]
    pub address: String,
}

/// `POST /functions/v1/geocode` response.
#[derive(Debug, Clone, Serialize)]
pub struct GeocodeResponse {
    /// Candidates, best first.
    pub candidates: Vec<AddressCandidate>,
}

/// An Esri-style `{x, y}` point.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ApiPoint {
    /// Longitude.
    pub x: f64,
    /// Latitude.
    pub y: f64,
}

impl From<ApiPoint> for LngLat {
    fn from(point: ApiPoint) -> Self {
        Self::new(point.x, point.y)
    }
}

/// Body accepted by the boundary and search endpoints.
///
/// Exactly one shape is expected: `{ location }`, the component fields,
/// or `{ address }`. When several are present they are tried in that
/// order.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoundaryRequest {
    /// Free-text address.
    pub address: Option<String>,
    /// House number for a component search.
    pub house_number: Option<String>,
    /// Street name for a component search.
    pub street_name: Option<String>,
    /// Optional suburb for a component search.
    pub suburb: Option<String>,
    /// Optional postcode for a component search.
    pub postcode: Option<String>,
    /// Map point.
    pub location: Option<ApiPoint>,
}

/// What a [`BoundaryRequest`] asks for.
#[derive(Debug, Clone, PartialEq)]
pub enum BoundaryRequestKind {
    /// Free-text address.
    Address(String),
    /// Structured address parts.
    Components(AddressComponents),
    /// A map point.
    Location(LngLat),
}

impl BoundaryRequest {
    /// Classifies the body, or `None` if it names nothing to search for.
    #[must_use]
    pub fn kind(&self) -> Option<BoundaryRequestKind> {
        if let Some(point) = self.location {
            return Some(BoundaryRequestKind::Location(point.into()));
        }
        if self.house_number.is_some() || self.street_name.is_some() {
            return Some(BoundaryRequestKind::Components(AddressComponents {
                house_number: self.house_number.clone().unwrap_or_default(),
                street_name: self.street_name.clone().unwrap_or_default(),
                suburb: self.suburb.clone(),
                postcode: self.postcode.clone(),
            }));
        }
        self.address.clone().map(BoundaryRequestKind::Address)
    }
}

/// `POST /functions/v1/property-boundaries` response: raw features.
#[derive(Debug, Clone, Serialize)]
pub struct BoundaryResponse {
    /// Parcel features as returned by the source.
    pub features: Vec<serde_json::Value>,
    /// The geocode match used, for address lookups.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub candidate: Option<AddressCandidate>,
    /// Whether any feature was fabricated.
    pub provenance: Provenance,
}

/// A property with display extras for map clients.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiProperty {
    /// The property itself.
    #[serde(flatten)]
    pub property: Property,
    /// Formatted area of the first ring.
    pub area_label: Option<String>,
    /// One label per side of the first ring.
    pub side_labels: Vec<String>,
    /// Likely street-facing side of the first ring.
    pub front_boundary: Option<FrontBoundary>,
    /// Rings in `[lat, lng]` order for Leaflet-style widgets.
    pub lat_lng_boundaries: Vec<Vec<[f64; 2]>>,
}

impl From<Property> for ApiProperty {
    fn from(property: Property) -> Self {
        let (area_label, side_labels, lengths) =
            property
                .measurements
                .as_ref()
                .map_or((None, Vec::new(), Vec::new()), |m| {
                    (
                        Some(format_area(m.area_m2)),
                        m.segments
                            .iter()
                            .map(|s| side_label(s.index, s.length_m))
                            .collect(),
                        m.segments.iter().map(|s| s.length_m).collect::<Vec<_>>(),
                    )
                });
        let front_boundary = property
            .primary_ring()
            .and_then(|ring| identify_front_boundary(&lengths, Some(open_positions(ring))));
        let lat_lng_boundaries = property
            .boundaries
            .iter()
            .map(|ring| ring_to_leaflet(ring))
            .collect();

        Self {
            property,
            area_label,
            side_labels,
            front_boundary,
            lat_lng_boundaries,
        }
    }
}

/// `POST /api/search` response.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResponse {
    /// Properties found, with display extras.
    pub properties: Vec<ApiProperty>,
    /// The geocode match used, for address searches.
    pub candidate: Option<AddressCandidate>,
    /// Whether any geometry was fabricated.
    pub provenance: Provenance,
    /// Descriptions of rings dropped by validation.
    pub dropped_rings: Vec<String>,
}

/// `PATCH /api/properties/{id}` body.
#[derive(Debug, Clone, Deserialize)]
pub struct RenameRequest {
    /// New display name. Blank falls back to the address.
    pub name: String,
}

/// A saved property as returned by the properties endpoints.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiSavedProperty {
    /// The stored property (always with a persisted id).
    #[serde(flatten)]
    pub property: Property,
    /// RFC 3339 creation time.
    pub created_at: String,
}

#[cfg(test)]
mod tests {
    use parcel_property_models::{Measurements, PropertyId, SegmentMeasurement};
    use serde_json::json;

    use super::*;

    fn request(value: serde_json::Value) -> BoundaryRequest {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn classifies_request_bodies() {
        assert_eq!(
            request(json!({"address": "1 Main St"})).kind(),
            Some(BoundaryRequestKind::Address("1 Main St".to_string()))
        );
        assert_eq!(
            request(json!({"location": {"x": 153.0, "y": -27.5}})).kind(),
            Some(BoundaryRequestKind::Location(LngLat::new(153.0, -27.5)))
        );
        assert!(matches!(
            request(json!({"houseNumber": "12", "streetName": "Smith Street", "postcode": "4810"}))
                .kind(),
            Some(BoundaryRequestKind::Components(AddressComponents { ref house_number, .. }))
                if house_number == "12"
        ));
        assert_eq!(request(json!({})).kind(), None);
    }

    #[test]
    fn location_wins_over_address() {
        let kind = request(json!({"address": "1 Main St", "location": {"x": 1.0, "y": 2.0}})).kind();
        assert!(matches!(kind, Some(BoundaryRequestKind::Location(_))));
    }

    #[test]
    fn api_property_adds_display_fields() {
        let ring = vec![
            LngLat::new(153.0, -27.0),
            LngLat::new(153.001, -27.0),
            LngLat::new(153.001, -26.999),
            LngLat::new(153.0, -27.0),
        ];
        let segments = vec![
            SegmentMeasurement {
                index: 0,
                start: ring[0],
                end: ring[1],
                length_m: 111.32,
            },
            SegmentMeasurement {
                index: 1,
                start: ring[1],
                end: ring[2],
                length_m: 111.32,
            },
            SegmentMeasurement {
                index: 2,
                start: ring[2],
                end: ring[3],
                length_m: 157.43,
            },
        ];
        let property = Property {
            id: PropertyId::temporary(),
            name: "Lot".to_string(),
            description: None,
            address: None,
            location: LngLat::new(153.0007, -26.9997),
            boundaries: vec![ring],
            measurements: Some(Measurements {
                total_length_m: 380.07,
                segments,
                area_m2: 6_196.0,
            }),
            provenance: Provenance::Live,
        };

        let api = ApiProperty::from(property);
        assert_eq!(api.area_label.as_deref(), Some("6196.0 m²"));
        assert_eq!(api.side_labels[0], "Side 1: 111.32m");
        assert!(api.front_boundary.is_some());
        assert_eq!(api.lat_lng_boundaries[0][1], [-27.0, 153.001]);

        let value = serde_json::to_value(&api).unwrap();
        assert_eq!(value["name"], "Lot");
        assert_eq!(value["location"], json!([153.0007, -26.9997]));
        assert!(value["sideLabels"].is_array());
    }
}
