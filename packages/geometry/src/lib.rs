#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Coordinate validation and measurement for property boundaries.
//!
//! Raw service rings arrive as loosely typed JSON. [`validate`] turns them
//! into closed [`Ring`]s of finite `[lng, lat]` positions and reports what
//! was dropped. [`measure`] derives lengths, area, centroid, and bounds
//! from a validated ring. [`leaflet`] is the only place positions are
//! reordered to `[lat, lng]`. [`frontage`] guesses which side of a lot
//! faces the street.

pub mod frontage;
pub mod leaflet;
pub mod measure;
pub mod validate;

use parcel_property_models::Ring;
use thiserror::Error;

pub use measure::{
    Bounds, METERS_PER_DEGREE, bounds, centroid, format_area, format_length, measure_ring,
    side_label,
};
pub use validate::{MIN_RING_POINTS, RingIssue, ValidatedRings, close_ring, validate_rings};

/// Errors from geometry operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GeometryError {
    /// The ring has fewer distinct positions than a polygon needs.
    #[error("Degenerate ring: {points} distinct points, at least {MIN_RING_POINTS} required")]
    DegenerateRing {
        /// Number of distinct positions found.
        points: usize,
    },
}

/// Returns the positions of a ring without its closing duplicate.
#[must_use]
pub fn open_positions(ring: &Ring) -> &[parcel_property_models::LngLat] {
    match (ring.first(), ring.last()) {
        (Some(first), Some(last)) if ring.len() > 1 && first == last => &ring[..ring.len() - 1],
        _ => ring.as_slice(),
    }
}
