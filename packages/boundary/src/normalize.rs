//! Normalizes raw parcel features into [`NormalizedParcel`] values.
//!
//! Accepts Esri JSON features (`{ attributes, geometry: { rings } }`),
//! `GeoJSON` features (`{ properties, geometry: { type, coordinates } }`),
//! and the generator's shape (Esri plus top-level `location` and
//! `address`). Rings are passed through untouched; dropping malformed
//! ones is the validator's job.

use parcel_geometry::validate::coerce_point;
use parcel_property_models::LngLat;
use serde::Serialize;
use serde_json::{Map, Value, json};

/// Ring coordinates as received, one JSON value per ring.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BoundaryGeometry {
    /// Raw rings. Each should be an array of `[lng, lat]` pairs.
    pub coordinates: Vec<Value>,
}

/// One parcel in the canonical shape.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct NormalizedParcel {
    /// Rings for the validator.
    pub boundary: BoundaryGeometry,
    /// Feature attributes / properties.
    pub properties: Map<String, Value>,
    /// Explicit location, else the mean of the first ring's points.
    pub location: Option<LngLat>,
    /// Display address, if one could be found or built.
    pub address: Option<String>,
    /// The original geometry object.
    pub geometry: Value,
}

/// Normalizes a list of raw features.
#[must_use]
pub fn normalize_features(features: &[Value]) -> Vec<NormalizedParcel> {
    features.iter().map(normalize_feature).collect()
}

/// Normalizes one raw feature. Never fails: missing pieces are left empty.
#[must_use]
pub fn normalize_feature(feature: &Value) -> NormalizedParcel {
    let properties = feature
        .get("attributes")
        .or_else(|| feature.get("properties"))
        .and_then(Value::as_object)
        .cloned()
        .unwrap_or_default();
    let geometry = feature.get("geometry").cloned().unwrap_or(Value::Null);
    let coordinates = extract_rings(&geometry);

    let location = feature
        .get("location")
        .and_then(explicit_location)
        .or_else(|| first_ring_centroid(&coordinates));
    let address = direct_address(feature, &properties).or_else(|| build_address(&properties));

    NormalizedParcel {
        boundary: BoundaryGeometry { coordinates },
        properties,
        location,
        address,
        geometry,
    }
}

/// Reads rings from a geometry: `rings`, then `paths`, then a bare
/// `{x, y}` point (wrapped as a one-point ring), then `GeoJSON` polygon
/// coordinates.
fn extract_rings(geometry: &Value) -> Vec<Value> {
    if let Some(rings) = geometry.get("rings").and_then(Value::as_array) {
        return rings.clone();
    }
    if let Some(paths) = geometry.get("paths").and_then(Value::as_array) {
        return paths.clone();
    }
    if let (Some(x), Some(y)) = (geometry.get("x"), geometry.get("y")) {
        return vec![json!([[x, y]])];
    }

    let coordinates = geometry.get("coordinates").and_then(Value::as_array);
    match (geometry.get("type").and_then(Value::as_str), coordinates) {
        (Some("Polygon"), Some(rings)) => rings.clone(),
        (Some("MultiPolygon"), Some(polygons)) => polygons
            .iter()
            .filter_map(Value::as_array)
            .flat_map(|rings| rings.iter().cloned())
            .collect(),
        _ => Vec::new(),
    }
}

fn explicit_location(value: &Value) -> Option<LngLat> {
    if let (Some(x), Some(y)) = (value.get("x"), value.get("y")) {
        return coerce_point(&json!([x, y]));
    }
    coerce_point(value)
}

/// Mean over every numeric point of the first ring, closing point included.
fn first_ring_centroid(rings: &[Value]) -> Option<LngLat> {
    let (count, lng, lat) = rings
        .first()?
        .as_array()?
        .iter()
        .filter_map(coerce_point)
        .fold((0_u32, 0.0, 0.0), |(count, lng, lat), p| {
            (count + 1, lng + p.lng, lat + p.lat)
        });
    if count == 0 {
        return None;
    }
    let n = f64::from(count);
    LngLat::try_new(lng / n, lat / n).ok()
}

/// Renders an attribute as display text. Numbers are stringified.
fn text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn direct_address(feature: &Value, properties: &Map<String, Value>) -> Option<String> {
    feature
        .get("address")
        .and_then(text)
        .or_else(|| {
            ["ADDRESS", "address", "Match_addr"]
                .iter()
                .find_map(|key| properties.get(*key).and_then(text))
        })
}

fn attribute(properties: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| properties.get(*key).and_then(text))
}

fn join_present(parts: &[Option<String>], separator: &str) -> Option<String> {
    let joined = parts
        .iter()
        .flatten()
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join(separator);
    if joined.is_empty() { None } else { Some(joined) }
}

/// Builds `"<number><suffix> <street> <type>, <suburb> <postcode>"` from
/// cadastral attributes, leaving out whatever is missing.
#[must_use]
pub fn build_address(properties: &Map<String, Value>) -> Option<String> {
    let number = join_present(
        &[
            attribute(properties, &["HOUSE_NUMBER"]),
            attribute(properties, &["HOUSE_NUMBER_SUFFIX"]),
        ],
        "",
    );
    let street = join_present(
        &[
            attribute(properties, &["CORRIDOR_NAME", "STREET_NAME"]),
            attribute(properties, &["CORRIDOR_SUFFIX_CODE"]),
        ],
        " ",
    );
    let line = join_present(&[number, street], " ");
    let locality = join_present(
        &[
            attribute(properties, &["SUBURB"]),
            attribute(properties, &["POSTCODE"]),
        ],
        " ",
    );

    join_present(&[line, locality], ", ")
}
