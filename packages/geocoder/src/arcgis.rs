//! `ArcGIS` World Geocoder client.
//!
//! Calls `findAddressCandidates` with a single-line address and returns the
//! candidates best first. The token, when configured, is sent as a query
//! parameter and never logged.
//!
//! See <https://developers.arcgis.com/rest/geocode/api-reference/geocoding-find-address-candidates.htm>

use std::collections::BTreeMap;

use parcel_property_models::{AddressCandidate, LngLat, Provenance};

use crate::{GeocodeError, http, sort_by_score, validate_query};

/// Public `findAddressCandidates` endpoint.
pub const DEFAULT_BASE_URL: &str =
    "https://geocode.arcgis.com/arcgis/rest/services/World/GeocodeServer/findAddressCandidates";

/// Candidates requested per query.
pub const DEFAULT_MAX_LOCATIONS: u32 = 5;

/// Client for the `ArcGIS` World Geocoder.
#[derive(Debug, Clone)]
pub struct ArcGisGeocoder {
    client: reqwest::Client,
    base_url: String,
    max_locations: u32,
    token: Option<String>,
}

impl ArcGisGeocoder {
    /// Creates a geocoder for the given endpoint with no token.
    #[must_use]
    pub fn new(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
            max_locations: DEFAULT_MAX_LOCATIONS,
            token: None,
        }
    }

    /// Sets how many candidates to ask for.
    #[must_use]
    pub const fn with_max_locations(mut self, max_locations: u32) -> Self {
        self.max_locations = max_locations;
        self
    }

    /// Sets the access token sent with each request.
    #[must_use]
    pub fn with_token(mut self, token: Option<String>) -> Self {
        self.token = token.filter(|t| !t.trim().is_empty());
        self
    }

    /// Geocodes a free-text address.
    ///
    /// An empty result is `Ok(vec![])`, not an error.
    ///
    /// # Errors
    ///
    /// Returns [`GeocodeError::EmptyAddress`] for a blank query without
    /// making a request, or a service/HTTP/parse error if the call fails.
    pub async fn find_candidates(
        &self,
        address: &str,
    ) -> Result<Vec<AddressCandidate>, GeocodeError> {
        let address = validate_query(address)?;
        let max_locations = self.max_locations.to_string();

        let mut params = vec![
            ("f", "json"),
            ("singleLine", address),
            ("outFields", "*"),
            ("maxLocations", max_locations.as_str()),
            ("forStorage", "false"),
        ];
        if let Some(token) = &self.token {
            params.push(("token", token.as_str()));
        }

        log::debug!(
            "ArcGIS geocode: {address:?} (token: {})",
            self.token
                .as_deref()
                .map_or_else(|| "none".to_string(), http::redact_token)
        );

        let body = http::send_json(self.client.get(&self.base_url).query(&params)).await?;
        let candidates = parse_candidates(&body)?;

        log::info!(
            "ArcGIS geocode returned {} candidate(s) for {address:?}",
            candidates.len()
        );
        Ok(candidates)
    }
}

fn attribute_string(value: &serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        serde_json::Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn parse_candidate(value: &serde_json::Value) -> Option<AddressCandidate> {
    let location = value.get("location")?;
    let x = location.get("x")?.as_f64()?;
    let y = location.get("y")?.as_f64()?;
    let location = LngLat::try_new(x, y).ok()?;

    let address = value
        .get("address")
        .and_then(serde_json::Value::as_str)
        .unwrap_or_default()
        .to_string();
    let score = value
        .get("score")
        .and_then(serde_json::Value::as_f64)
        .filter(|s| s.is_finite())
        .map_or(0.0, |s| s.clamp(0.0, 100.0));

    let attributes: BTreeMap<String, String> = value
        .get("attributes")
        .and_then(serde_json::Value::as_object)
        .map(|attrs| {
            attrs
                .iter()
                .filter_map(|(k, v)| attribute_string(v).map(|v| (k.clone(), v)))
                .collect()
        })
        .unwrap_or_default();

    Some(AddressCandidate {
        address,
        location,
        score,
        attributes,
        provenance: Provenance::Live,
    })
}

/// Parses a `findAddressCandidates` response body.
///
/// Candidates without a finite `location` are skipped. The rest are
/// returned best first.
///
/// # Errors
///
/// Returns [`GeocodeError::Service`] for an `ArcGIS` error payload, or
/// [`GeocodeError::Parse`] if there is no `candidates` array.
pub fn parse_candidates(body: &serde_json::Value) -> Result<Vec<AddressCandidate>, GeocodeError> {
    if let Some(message) = http::esri_error_message(body) {
        return Err(GeocodeError::Service { message });
    }

    let raw = body
        .get("candidates")
        .and_then(serde_json::Value::as_array)
        .ok_or_else(|| GeocodeError::Parse {
            message: "No candidates array in geocode response".to_string(),
        })?;

    let mut candidates: Vec<AddressCandidate> = raw.iter().filter_map(parse_candidate).collect();
    if candidates.len() < raw.len() {
        log::debug!(
            "Skipped {} geocode candidate(s) without a usable location",
            raw.len() - candidates.len()
        );
    }

    sort_by_score(&mut candidates);
    Ok(candidates)
}
