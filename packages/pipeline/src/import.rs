//! `GeoJSON` import and export of properties.
//!
//! Import accepts a `FeatureCollection`, a single `Feature`, or a bare
//! geometry. `Polygon` and `MultiPolygon` geometries become properties;
//! anything else is skipped. Rings go through the same validation as
//! fetched boundaries.

use geo::{LineString, MultiPolygon, Polygon};
use geojson::{Feature, FeatureCollection, GeoJson, Geometry, JsonObject};
use parcel_geometry::{centroid, measure_ring, validate_rings};
use parcel_property_models::{Property, PropertyId, Provenance};
use serde_json::{Value, json};

use crate::PipelineError;

fn text(properties: Option<&JsonObject>, key: &str) -> Option<String> {
    properties?
        .get(key)?
        .as_str()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Raw rings of a polygonal geometry, as JSON for the validator.
fn polygon_rings(geometry: &Geometry) -> Option<Vec<Value>> {
    match &geometry.value {
        geojson::Value::Polygon(rings) => Some(rings.iter().map(|ring| json!(ring)).collect()),
        geojson::Value::MultiPolygon(polygons) => Some(
            polygons
                .iter()
                .flatten()
                .map(|ring| json!(ring))
                .collect(),
        ),
        _ => None,
    }
}

fn feature_to_property(index: usize, feature: &Feature) -> Option<Property> {
    let Some(geometry) = &feature.geometry else {
        log::warn!("Skipping feature {index}: no geometry");
        return None;
    };
    let Some(rings) = polygon_rings(geometry) else {
        log::warn!("Skipping feature {index}: not a Polygon or MultiPolygon");
        return None;
    };

    let validated = validate_rings(&rings);
    for issue in &validated.issues {
        log::warn!("Feature {index}: {issue}");
    }
    let first = validated.rings.first()?;
    let location = centroid(first)?;
    let measurements = measure_ring(first).ok();

    let properties = feature.properties.as_ref();
    let id = PropertyId::temporary();
    let address = text(properties, "address");
    let name = Property::resolve_name(
        text(properties, "name").as_deref(),
        address.as_deref(),
        &id,
    );

    Some(Property {
        id,
        name,
        description: text(properties, "description"),
        address,
        location,
        boundaries: validated.rings,
        measurements,
        provenance: Provenance::Live,
    })
}

/// Parses a `GeoJSON` document into properties.
///
/// # Errors
///
/// * [`PipelineError::GeoJson`] if the text is not valid `GeoJSON`
/// * [`PipelineError::NoValidBoundaries`] if no feature had a usable ring
pub fn import_geojson(document: &str) -> Result<Vec<Property>, PipelineError> {
    let features = match document.parse::<GeoJson>()? {
        GeoJson::FeatureCollection(collection) => collection.features,
        GeoJson::Feature(feature) => vec![feature],
        GeoJson::Geometry(geometry) => vec![Feature::from(geometry)],
    };

    let properties: Vec<Property> = features
        .iter()
        .enumerate()
        .filter_map(|(index, feature)| feature_to_property(index, feature))
        .collect();

    if properties.is_empty() {
        return Err(PipelineError::NoValidBoundaries {
            features: features.len(),
        });
    }

    log::info!(
        "Imported {} of {} feature(s)",
        properties.len(),
        features.len()
    );
    Ok(properties)
}

fn to_geometry(property: &Property) -> Geometry {
    let polygons: Vec<Polygon<f64>> = property
        .boundaries
        .iter()
        .map(|ring| {
            Polygon::new(
                LineString::from(ring.iter().map(|p| (p.lng, p.lat)).collect::<Vec<_>>()),
                vec![],
            )
        })
        .collect();

    match <[Polygon<f64>; 1]>::try_from(polygons) {
        Ok([polygon]) => Geometry::new(geojson::Value::from(&polygon)),
        Err(polygons) => Geometry::new(geojson::Value::from(&MultiPolygon::new(polygons))),
    }
}

/// Converts properties to a `FeatureCollection`, one feature each.
#[must_use]
pub fn to_feature_collection(properties: &[Property]) -> FeatureCollection {
    let features = properties
        .iter()
        .map(|property| {
            let mut attributes = JsonObject::new();
            attributes.insert("id".to_string(), json!(property.id.as_str()));
            attributes.insert("name".to_string(), json!(property.name));
            if let Some(address) = &property.address {
                attributes.insert("address".to_string(), json!(address));
            }
            if let Some(description) = &property.description {
                attributes.insert("description".to_string(), json!(description));
            }
            if let Some(measurements) = &property.measurements {
                attributes.insert("areaM2".to_string(), json!(measurements.area_m2));
            }

            Feature {
                bbox: None,
                geometry: Some(to_geometry(property)),
                id: None,
                properties: Some(attributes),
                foreign_members: None,
            }
        })
        .collect();

    FeatureCollection {
        bbox: None,
        features,
        foreign_members: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const COLLECTION: &str = r#"{
        "type": "FeatureCollection",
        "features": [
            {
                "type": "Feature",
                "properties": {"name": "Back paddock", "address": "9 Farm Rd"},
                "geometry": {
                    "type": "Polygon",
                    "coordinates": [[[153.0, -27.0], [153.001, -27.0], [153.001, -27.001], [153.0, -27.0]]]
                }
            },
            {
                "type": "Feature",
                "properties": {"address": "10 Farm Rd"},
                "geometry": {
                    "type": "MultiPolygon",
                    "coordinates": [
                        [[[153.01, -27.0], [153.011, -27.0], [153.011, -27.001]]],
                        [[[153.02, -27.0], [153.021, -27.0]]]
                    ]
                }
            },
            {
                "type": "Feature",
                "properties": {},
                "geometry": {"type": "Point", "coordinates": [153.0, -27.0]}
            }
        ]
    }"#;

    #[test]
    fn imports_polygon_features() {
        let properties = import_geojson(COLLECTION).unwrap();
        assert_eq!(properties.len(), 2);

        assert_eq!(properties[0].name, "Back paddock");
        assert_eq!(properties[0].address.as_deref(), Some("9 Farm Rd"));
        assert!(properties[0].id.is_temporary());

        // The two-point ring is dropped; the open ring is closed.
        assert_eq!(properties[1].name, "10 Farm Rd");
        assert_eq!(properties[1].boundaries.len(), 1);
        assert_eq!(properties[1].boundaries[0].len(), 4);
    }

    #[test]
    fn bare_geometry_gets_placeholder_name() {
        let doc = r#"{"type": "Polygon", "coordinates": [[[0, 0], [1, 0], [1, 1], [0, 0]]]}"#;
        let properties = import_geojson(doc).unwrap();
        assert!(properties[0].name.starts_with("Property "));
    }

    #[test]
    fn nothing_usable_is_an_error() {
        let doc = r#"{"type": "Point", "coordinates": [0, 0]}"#;
        assert!(matches!(
            import_geojson(doc),
            Err(PipelineError::NoValidBoundaries { features: 1 })
        ));
        assert!(matches!(
            import_geojson("not json"),
            Err(PipelineError::GeoJson(_))
        ));
    }

    #[test]
    fn exports_one_feature_per_property() {
        let properties = import_geojson(COLLECTION).unwrap();
        let collection = to_feature_collection(&properties);
        assert_eq!(collection.features.len(), 2);

        let value = serde_json::to_value(&collection).unwrap();
        assert_eq!(value["features"][0]["geometry"]["type"], "Polygon");
        assert_eq!(value["features"][0]["properties"]["name"], "Back paddock");

        let reimported = import_geojson(&value.to_string()).unwrap();
        assert_eq!(reimported[0].boundaries, properties[0].boundaries);
    }
}
