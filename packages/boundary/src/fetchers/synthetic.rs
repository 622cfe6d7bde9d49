//! Synthetic parcel generator.
//!
//! Builds square lots in the cadastral layer's attribute schema so the
//! rest of the pipeline cannot tell them apart from live features, apart
//! from their [`Provenance::Synthetic`] marker. Address fragments come from
//! the query; anything missing falls back to `123 Example Street, Brisbane
//! 4000`. Every lookup awaits a configurable latency before returning.

use std::time::Duration;

use parcel_geocoder::address::{AddressParts, extract_parts, parts_from_attributes, split_street};
use parcel_geocoder::synthetic::{Jitter, REFERENCE_POINT, synthetic_candidates};
use parcel_geocoder::validate_query;
use parcel_property_models::{AddressCandidate, AddressComponents, LngLat, Provenance};
use serde_json::json;

use crate::{BoundaryError, BoundaryLookup};

/// Half the side length, in degrees, of a fabricated square lot.
pub const SQUARE_HALF_SIZE: f64 = 0.0004;

/// Spread, in degrees, of generated lot centres around the reference point.
pub const CENTRE_SPREAD: f64 = 0.01;

/// Default simulated service latency.
pub const DEFAULT_LATENCY: Duration = Duration::from_millis(1500);

const DEFAULT_HOUSE_NUMBER: &str = "123";
const DEFAULT_STREET: &str = "Example Street";
const DEFAULT_SUBURB: &str = "Brisbane";
const DEFAULT_POSTCODE: &str = "4000";

/// Five `[lng, lat]` points: four corners counter-clockwise from the
/// south-west, then the first corner again.
#[must_use]
pub fn square_ring(centre: LngLat, half_size: f64) -> Vec<[f64; 2]> {
    let (x, y) = (centre.lng, centre.lat);
    vec![
        [x - half_size, y - half_size],
        [x + half_size, y - half_size],
        [x + half_size, y + half_size],
        [x - half_size, y + half_size],
        [x - half_size, y - half_size],
    ]
}

/// Placeholder feature for a point the parcel layer has nothing for.
///
/// The square is centred on `point`. Address attributes are copied from
/// the geocode candidate when there is one.
#[must_use]
pub fn square_feature(point: LngLat, candidate: Option<&AddressCandidate>) -> serde_json::Value {
    let parts = candidate
        .map(|c| parts_from_attributes(&c.attributes, &c.address))
        .unwrap_or_default();

    json!({
        "geometry": {
            "rings": [square_ring(point, SQUARE_HALF_SIZE)],
            "spatialReference": {"wkid": 4326},
        },
        "attributes": {
            "OBJECTID": 0,
            "HOUSE_NUMBER": parts.house_number.unwrap_or_default(),
            "STREET_NAME": parts.street.unwrap_or_default(),
            "SUBURB": parts.suburb.unwrap_or_default(),
            "POSTCODE": parts.postcode.unwrap_or_default(),
        },
    })
}

/// Builds a generated parcel feature centred on `centre`.
///
/// `seed` drives the land use, lot area, and object id so repeated
/// lookups agree.
#[must_use]
pub fn generated_feature(parts: &AddressParts, centre: LngLat, seed: &str) -> serde_json::Value {
    let jitter = Jitter::new(seed);

    let house_number = parts.house_number.as_deref().unwrap_or(DEFAULT_HOUSE_NUMBER);
    let street = parts.street.as_deref().unwrap_or(DEFAULT_STREET);
    let suburb = parts.suburb.as_deref().unwrap_or(DEFAULT_SUBURB);
    let postcode = parts.postcode.as_deref().unwrap_or(DEFAULT_POSTCODE);
    let (corridor, suffix) = split_street(street);
    let suffix = suffix.unwrap_or_else(|| "Street".to_string());

    let land_use = if jitter.fraction(12) > 0.5 {
        "Residential"
    } else {
        "Commercial"
    };
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let lot_area = jitter.fraction(13).mul_add(1000.0, 300.0).floor() as u32;
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let object_id = (jitter.fraction(14) * 10_000.0).floor() as u32;

    json!({
        "geometry": {
            "rings": [square_ring(centre, SQUARE_HALF_SIZE)],
            "spatialReference": {"wkid": 4326},
        },
        "attributes": {
            "OBJECTID": object_id,
            "HOUSE_NUMBER": house_number,
            "HOUSE_NUMBER_SUFFIX": "",
            "CORRIDOR_NAME": corridor,
            "CORRIDOR_SUFFIX_CODE": suffix,
            "SUBURB": suburb,
            "POSTCODE": postcode,
            "LAND_USE": land_use,
            "LOT_AREA": lot_area.to_string(),
        },
        "location": {"x": centre.lng, "y": centre.lat},
        "address": format!("{house_number} {street}, {suburb} {postcode}"),
    })
}

/// Synthetic stand-in for the live parcel service.
#[derive(Debug, Clone)]
pub struct SyntheticParcels {
    latency: Duration,
}

impl Default for SyntheticParcels {
    fn default() -> Self {
        Self::new(DEFAULT_LATENCY)
    }
}

impl SyntheticParcels {
    /// Creates a generator that waits `latency` before each answer.
    #[must_use]
    pub const fn new(latency: Duration) -> Self {
        Self { latency }
    }

    async fn simulate_latency(&self) {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
    }

    /// Fabricates a parcel for a free-text address, centred on the best
    /// synthetic geocode candidate.
    ///
    /// # Errors
    ///
    /// Returns [`BoundaryError::Geocode`] for a blank address.
    pub async fn by_address(&self, address: &str) -> Result<BoundaryLookup, BoundaryError> {
        let address = validate_query(address)?;
        if let Some(candidate) = synthetic_candidates(address)?.into_iter().next() {
            return self.at_candidate(address, candidate).await;
        }

        let centre = Jitter::new(address).point_within(REFERENCE_POINT, 6, CENTRE_SPREAD);
        let feature = generated_feature(&extract_parts(address), centre, address);

        self.simulate_latency().await;
        log::info!("Generated synthetic parcel for {address:?}");

        Ok(BoundaryLookup {
            candidate: None,
            features: vec![feature],
            provenance: Provenance::Synthetic,
        })
    }

    /// Fabricates a parcel for an address that has already been geocoded,
    /// centred on `candidate`'s point. The candidate is kept on the lookup
    /// as-is, live or not.
    ///
    /// # Errors
    ///
    /// Returns [`BoundaryError::Geocode`] for a blank address.
    pub async fn at_candidate(
        &self,
        address: &str,
        candidate: AddressCandidate,
    ) -> Result<BoundaryLookup, BoundaryError> {
        let address = validate_query(address)?;
        let feature = generated_feature(&extract_parts(address), candidate.location, address);

        self.simulate_latency().await;
        log::info!(
            "Generated synthetic parcel for {address:?} at {}",
            candidate.location
        );

        Ok(BoundaryLookup {
            candidate: Some(candidate),
            features: vec![feature],
            provenance: Provenance::Synthetic,
        })
    }

    /// Fabricates a parcel for address components.
    ///
    /// # Errors
    ///
    /// Returns [`BoundaryError::MissingComponent`] if the house number or
    /// street is blank.
    pub async fn by_components(
        &self,
        components: &AddressComponents,
    ) -> Result<BoundaryLookup, BoundaryError> {
        components.validate()?;
        let seed = components.one_line();
        let parts = AddressParts {
            house_number: Some(components.house_number.trim().to_string()),
            street: Some(components.street_name.trim().to_string()),
            suburb: components.suburb().map(str::to_string),
            postcode: components.postcode().map(str::to_string),
        };
        let centre = Jitter::new(&seed).point_within(REFERENCE_POINT, 6, CENTRE_SPREAD);
        let feature = generated_feature(&parts, centre, &seed);

        self.simulate_latency().await;
        log::info!("Generated synthetic parcel for components {seed:?}");

        Ok(BoundaryLookup {
            candidate: None,
            features: vec![feature],
            provenance: Provenance::Synthetic,
        })
    }

    /// Fabricates the placeholder square around a point.
    ///
    /// # Errors
    ///
    /// Returns [`BoundaryError::InvalidLocation`] if the point is not
    /// finite.
    pub async fn by_location(&self, point: LngLat) -> Result<BoundaryLookup, BoundaryError> {
        let point = LngLat::try_new(point.lng, point.lat)?;

        self.simulate_latency().await;
        log::info!("Generated synthetic parcel at {point}");

        Ok(BoundaryLookup {
            candidate: None,
            features: vec![square_feature(point, None)],
            provenance: Provenance::Synthetic,
        })
    }
}
