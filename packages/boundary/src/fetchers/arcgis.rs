//! `ArcGIS` `FeatureServer` parcel fetcher.
//!
//! Queries a cadastral property-boundary layer either spatially (the
//! parcel under a point) or by attribute (house number, street, suburb,
//! postcode). Responses are requested as Esri JSON in WGS84.

use parcel_geocoder::arcgis::ArcGisGeocoder;
use parcel_geocoder::{best_candidate, http};
use parcel_property_models::{AddressCandidate, AddressComponents, LngLat, Provenance};

use super::synthetic::square_feature;
use crate::{BoundaryError, BoundaryLookup};

/// Brisbane City Council property boundary (holding) layer.
pub const DEFAULT_PARCEL_URL: &str = "https://services2.arcgis.com/dEKgZETqwmDAh1rP/arcgis/rest/services/property_boundaries_holding/FeatureServer/0/query";

/// Live parcel lookups against an `ArcGIS` feature layer.
#[derive(Debug, Clone)]
pub struct ParcelFetcher {
    client: reqwest::Client,
    url: String,
    token: Option<String>,
    geocoder: ArcGisGeocoder,
}

impl ParcelFetcher {
    /// Creates a fetcher for the layer's `/query` endpoint. Address
    /// lookups geocode through `geocoder` first.
    #[must_use]
    pub fn new(client: reqwest::Client, url: impl Into<String>, geocoder: ArcGisGeocoder) -> Self {
        Self {
            client,
            url: url.into(),
            token: None,
            geocoder,
        }
    }

    /// Sets the access token sent with each query.
    #[must_use]
    pub fn with_token(mut self, token: Option<String>) -> Self {
        self.token = token.filter(|t| !t.trim().is_empty());
        self
    }

    /// Returns the geocoder used for address lookups.
    #[must_use]
    pub const fn geocoder(&self) -> &ArcGisGeocoder {
        &self.geocoder
    }

    async fn query(&self, params: &[(&str, &str)]) -> Result<Vec<serde_json::Value>, BoundaryError> {
        let mut params = params.to_vec();
        params.extend([
            ("f", "json"),
            ("outFields", "*"),
            ("returnGeometry", "true"),
            ("outSR", "4326"),
        ]);
        if let Some(token) = &self.token {
            params.push(("token", token.as_str()));
        }

        let body = http::send_json(self.client.get(&self.url).query(&params)).await?;
        parse_features(&body)
    }

    async fn query_point(&self, point: LngLat) -> Result<Vec<serde_json::Value>, BoundaryError> {
        let geometry = serde_json::json!({
            "x": point.lng,
            "y": point.lat,
            "spatialReference": {"wkid": 4326},
        })
        .to_string();

        log::debug!("Parcel query at {point}");
        self.query(&[
            ("where", "1=1"),
            ("geometry", geometry.as_str()),
            ("geometryType", "esriGeometryPoint"),
            ("spatialRel", "esriSpatialRelIntersects"),
            ("inSR", "4326"),
        ])
        .await
    }

    /// Geocodes an address and returns the parcel under its best match.
    ///
    /// An address with no geocode match yields [`BoundaryLookup::no_match`].
    /// A match with no parcel under it yields the placeholder square.
    ///
    /// # Errors
    ///
    /// Returns [`BoundaryError`] for a blank address or if either service
    /// call fails.
    pub async fn by_address(&self, address: &str) -> Result<BoundaryLookup, BoundaryError> {
        let candidates = self.geocoder.find_candidates(address).await?;
        let Some(candidate) = best_candidate(&candidates).cloned() else {
            log::info!("No addresses found for {:?}", address.trim());
            return Ok(BoundaryLookup::no_match());
        };

        self.at_candidate(candidate).await
    }

    /// Returns the parcel under an already geocoded candidate.
    ///
    /// # Errors
    ///
    /// Returns [`BoundaryError`] if the parcel query fails.
    pub async fn at_candidate(
        &self,
        candidate: AddressCandidate,
    ) -> Result<BoundaryLookup, BoundaryError> {
        let features = self.query_point(candidate.location).await?;
        Ok(lookup_at_point(candidate.location, Some(candidate), features))
    }

    /// Finds parcels by address attributes.
    ///
    /// # Errors
    ///
    /// Returns [`BoundaryError::MissingComponent`] without a request if the
    /// house number or street is blank, or a service error if the query
    /// fails.
    pub async fn by_components(
        &self,
        components: &AddressComponents,
    ) -> Result<BoundaryLookup, BoundaryError> {
        components.validate()?;
        let where_clause = components_where_clause(components);
        log::debug!("Parcel query where {where_clause}");

        let features = self.query(&[("where", where_clause.as_str())]).await?;
        log::info!(
            "Parcel component query returned {} feature(s)",
            features.len()
        );

        Ok(BoundaryLookup {
            candidate: None,
            features,
            provenance: Provenance::Live,
        })
    }

    /// Returns the parcel under a point, or the placeholder square.
    ///
    /// # Errors
    ///
    /// Returns [`BoundaryError::InvalidLocation`] without a request if the
    /// point is not finite, or a service error if the query fails.
    pub async fn by_location(&self, point: LngLat) -> Result<BoundaryLookup, BoundaryError> {
        let point = LngLat::try_new(point.lng, point.lat)?;
        let features = self.query_point(point).await?;
        Ok(lookup_at_point(point, None, features))
    }
}

/// Wraps point-query features, substituting the placeholder square when
/// the layer has nothing at the point.
#[must_use]
pub fn lookup_at_point(
    point: LngLat,
    candidate: Option<AddressCandidate>,
    features: Vec<serde_json::Value>,
) -> BoundaryLookup {
    if features.is_empty() {
        log::warn!("No parcel found at {point}, using placeholder boundary");
        return BoundaryLookup {
            features: vec![square_feature(point, candidate.as_ref())],
            candidate,
            provenance: Provenance::Synthetic,
        };
    }

    log::info!("Parcel query at {point} returned {} feature(s)", features.len());
    BoundaryLookup {
        candidate,
        features,
        provenance: Provenance::Live,
    }
}

/// Parses a `FeatureServer` query response into its features.
///
/// # Errors
///
/// Returns [`BoundaryError::Service`] for an error payload or
/// [`BoundaryError::Parse`] if there is no `features` array.
pub fn parse_features(body: &serde_json::Value) -> Result<Vec<serde_json::Value>, BoundaryError> {
    if let Some(message) = http::esri_error_message(body) {
        return Err(BoundaryError::Service { message });
    }

    body.get("features")
        .and_then(serde_json::Value::as_array)
        .cloned()
        .ok_or_else(|| BoundaryError::Parse {
            message: "No features array in parcel response".to_string(),
        })
}

fn escape(value: &str) -> String {
    value.replace('\'', "''")
}

/// Numbers go in bare; anything else is quoted.
fn sql_value(value: &str) -> String {
    if !value.is_empty() && value.chars().all(|c| c.is_ascii_digit()) {
        value.to_string()
    } else {
        format!("'{}'", escape(value))
    }
}

/// Builds the attribute filter for a component search.
///
/// The street is matched on its first word only, since the layer stores
/// the street type separately (`CORRIDOR_SUFFIX_CODE`).
#[must_use]
pub fn components_where_clause(components: &AddressComponents) -> String {
    let (street_base, _) = parcel_geocoder::address::split_street(&components.street_name);

    let mut clauses = vec![
        format!("HOUSE_NUMBER = {}", sql_value(components.house_number.trim())),
        format!("CORRIDOR_NAME LIKE '%{}%'", escape(&street_base)),
    ];
    if let Some(suburb) = components.suburb() {
        clauses.push(format!("SUBURB LIKE '%{}%'", escape(suburb)));
    }
    if let Some(postcode) = components.postcode() {
        clauses.push(format!("POSTCODE = {}", sql_value(postcode)));
    }

    clauses.join(" AND ")
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn components(house: &str, street: &str, suburb: Option<&str>, postcode: Option<&str>) -> AddressComponents {
        AddressComponents {
            house_number: house.to_string(),
            street_name: street.to_string(),
            suburb: suburb.map(str::to_string),
            postcode: postcode.map(str::to_string),
        }
    }

    #[test]
    fn where_clause_with_all_components() {
        let clause = components_where_clause(&components(
            "12",
            "Smith Street",
            Some("Townsville"),
            Some("4810"),
        ));
        assert_eq!(
            clause,
            "HOUSE_NUMBER = 12 AND CORRIDOR_NAME LIKE '%Smith%' AND SUBURB LIKE '%Townsville%' AND POSTCODE = 4810"
        );
    }

    #[test]
    fn where_clause_skips_blank_optionals() {
        let clause = components_where_clause(&components("12", "Smith Street", Some(" "), None));
        assert_eq!(clause, "HOUSE_NUMBER = 12 AND CORRIDOR_NAME LIKE '%Smith%'");
    }

    #[test]
    fn where_clause_quotes_and_escapes() {
        let clause = components_where_clause(&components("12A", "O'Connell Street", Some("St Kilda"), None));
        assert_eq!(
            clause,
            "HOUSE_NUMBER = '12A' AND CORRIDOR_NAME LIKE '%O''Connell%' AND SUBURB LIKE '%St Kilda%'"
        );
    }

    #[test]
    fn parses_features() {
        let body = json!({
            "objectIdFieldName": "OBJECTID",
            "features": [
                {"attributes": {"OBJECTID": 1}, "geometry": {"rings": [[[153.0, -27.0]]]}}
            ]
        });
        assert_eq!(parse_features(&body).unwrap().len(), 1);
    }

    #[test]
    fn error_payload_is_service_error() {
        let body = json!({"error": {"code": 400, "message": "Invalid query"}});
        assert!(matches!(
            parse_features(&body),
            Err(BoundaryError::Service { .. })
        ));
    }

    #[test]
    fn missing_features_is_parse_error() {
        assert!(matches!(
            parse_features(&json!({})),
            Err(BoundaryError::Parse { .. })
        ));
    }

    #[test]
    fn empty_point_query_substitutes_square() {
        let point = LngLat::new(153.0251, -27.4698);
        let lookup = lookup_at_point(point, None, vec![]);
        assert_eq!(lookup.provenance, Provenance::Synthetic);
        assert_eq!(lookup.features.len(), 1);

        let ring = lookup.features[0]["geometry"]["rings"][0].as_array().unwrap();
        assert_eq!(ring.len(), 5);
        for p in ring {
            let x = p[0].as_f64().unwrap();
            let y = p[1].as_f64().unwrap();
            assert!((x - point.lng).abs() <= 0.0004 + 1e-12);
            assert!((y - point.lat).abs() <= 0.0004 + 1e-12);
        }
    }

    #[test]
    fn non_empty_point_query_is_live() {
        let lookup = lookup_at_point(LngLat::new(1.0, 1.0), None, vec![json!({"attributes": {}})]);
        assert_eq!(lookup.provenance, Provenance::Live);
    }

    #[tokio::test]
    async fn invalid_inputs_make_no_request() {
        let client = reqwest::Client::new();
        let geocoder = ArcGisGeocoder::new(client.clone(), "http://127.0.0.1:9/geocode");
        let fetcher = ParcelFetcher::new(client, "http://127.0.0.1:9/query", geocoder);

        assert!(
            fetcher
                .by_address("")
                .await
                .unwrap_err()
                .is_validation()
        );
        assert!(
            fetcher
                .by_components(&components("", "Smith Street", None, None))
                .await
                .unwrap_err()
                .is_validation()
        );
        assert!(
            fetcher
                .by_location(LngLat::new(153.0, f64::INFINITY))
                .await
                .unwrap_err()
                .is_validation()
        );
    }
}
