//! Synthetic geocoder used when no live backend is available.
//!
//! Produces three candidates for any non-blank query: the query itself,
//! the neighbouring house number, and an `EAST` variant. Positions and
//! scores are jittered around [`REFERENCE_POINT`] with values derived from
//! a SHA-256 digest of the query, so the same query always yields the same
//! candidates.

use std::collections::BTreeMap;

use parcel_property_models::{AddressCandidate, LngLat, Provenance};
use sha2::{Digest, Sha256};

use crate::address::{bump_house_number, extract_parts};
use crate::{GeocodeError, sort_by_score, validate_query};

/// Centre of the synthetic search area (Brisbane).
pub const REFERENCE_POINT: LngLat = LngLat::new(152.9814, -27.4698);

/// Width in degrees of the box synthetic points are spread over, per axis.
pub const JITTER_DEGREES: f64 = 0.1;

/// Deterministic pseudo-random fractions in `[0, 1)` seeded by a string.
#[derive(Debug, Clone)]
pub struct Jitter {
    values: [f64; 16],
}

impl Jitter {
    /// Derives sixteen fractions from the SHA-256 digest of `seed`.
    #[must_use]
    pub fn new(seed: &str) -> Self {
        let digest = Sha256::digest(seed.as_bytes());
        let mut values = [0.0; 16];
        for (value, chunk) in values.iter_mut().zip(digest.chunks_exact(2)) {
            *value = f64::from(u16::from_be_bytes([chunk[0], chunk[1]])) / 65_536.0;
        }
        Self { values }
    }

    /// Returns the `index`-th fraction, wrapping after sixteen.
    #[must_use]
    pub const fn fraction(&self, index: usize) -> f64 {
        self.values[index % self.values.len()]
    }

    /// Returns a point within `spread / 2` degrees of `centre` on each axis,
    /// using fractions `2 * slot` and `2 * slot + 1`.
    #[must_use]
    pub fn point_within(&self, centre: LngLat, slot: usize, spread: f64) -> LngLat {
        centre.offset(
            (self.fraction(slot * 2) - 0.5) * spread,
            (self.fraction(slot * 2 + 1) - 0.5) * spread,
        )
    }

    /// [`Jitter::point_within`] with the default [`JITTER_DEGREES`] spread.
    #[must_use]
    pub fn point_near(&self, centre: LngLat, slot: usize) -> LngLat {
        self.point_within(centre, slot, JITTER_DEGREES)
    }
}

fn attributes_for(address: &str) -> BTreeMap<String, String> {
    let parts = extract_parts(address);
    let mut attributes = BTreeMap::from([("Match_addr".to_string(), address.to_string())]);
    for (key, value) in [
        ("House", parts.house_number),
        ("Street", parts.street),
        ("City", parts.suburb),
        ("Postal", parts.postcode),
    ] {
        if let Some(value) = value {
            attributes.insert(key.to_string(), value);
        }
    }
    attributes
}

/// Builds the synthetic candidates for a query, best first.
///
/// # Errors
///
/// Returns [`GeocodeError::EmptyAddress`] for a blank query.
pub fn synthetic_candidates(query: &str) -> Result<Vec<AddressCandidate>, GeocodeError> {
    let query = validate_query(query)?;
    let jitter = Jitter::new(query);

    let variants = [
        (query.to_string(), 95.0, 5.0),
        (bump_house_number(query, 2), 85.0, 10.0),
        (format!("{query} EAST"), 75.0, 10.0),
    ];

    let mut candidates: Vec<AddressCandidate> = variants
        .into_iter()
        .enumerate()
        .map(|(slot, (address, base, spread))| AddressCandidate {
            location: jitter.point_near(REFERENCE_POINT, slot),
            score: jitter.fraction(slot + 8).mul_add(spread, base),
            attributes: attributes_for(&address),
            address,
            provenance: Provenance::Synthetic,
        })
        .collect();

    sort_by_score(&mut candidates);
    log::debug!(
        "Synthetic geocode produced {} candidate(s) for {query:?}",
        candidates.len()
    );
    Ok(candidates)
}

#[cfg(test)]
mod tests {
    use super::*;

    const QUERY: &str = "123 Example Street, Brisbane QLD 4000";

    #[test]
    fn echoes_query_first() {
        let candidates = synthetic_candidates(QUERY).unwrap();
        assert_eq!(candidates.len(), 3);
        assert_eq!(candidates[0].address, QUERY);
        assert!(candidates[0].score >= 95.0);
        assert_eq!(candidates[1].address, "125 Example Street, Brisbane QLD 4000");
        assert!(candidates[1].score >= 85.0);
        assert_eq!(candidates[2].address, format!("{QUERY} EAST"));
        assert!(candidates[2].score >= 75.0);
    }

    #[test]
    fn is_deterministic() {
        assert_eq!(
            synthetic_candidates(QUERY).unwrap(),
            synthetic_candidates(&format!("  {QUERY} ")).unwrap()
        );
    }

    #[test]
    fn stays_near_reference_point() {
        for candidate in synthetic_candidates(QUERY).unwrap() {
            assert!((candidate.location.lng - REFERENCE_POINT.lng).abs() <= JITTER_DEGREES);
            assert!((candidate.location.lat - REFERENCE_POINT.lat).abs() <= JITTER_DEGREES);
            assert_eq!(candidate.provenance, Provenance::Synthetic);
        }
    }

    #[test]
    fn carries_address_attributes() {
        let candidates = synthetic_candidates(QUERY).unwrap();
        let best = &candidates[0];
        assert_eq!(best.attribute("House"), Some("123"));
        assert_eq!(best.attribute("Street"), Some("Example Street"));
        assert_eq!(best.attribute("City"), Some("Brisbane"));
        assert_eq!(best.attribute("Postal"), Some("4000"));
    }

    #[test]
    fn blank_query_is_rejected() {
        assert!(matches!(
            synthetic_candidates(" "),
            Err(GeocodeError::EmptyAddress)
        ));
    }

    #[test]
    fn jitter_fractions_are_in_unit_range() {
        let jitter = Jitter::new("seed");
        for i in 0..16 {
            let f = jitter.fraction(i);
            assert!((0.0..1.0).contains(&f));
        }
    }
}
