//! Planar measurements over `[lng, lat]` rings.
//!
//! Distances treat degrees as a flat grid scaled by [`METERS_PER_DEGREE`].
//! That is accurate enough for lot-sized polygons near the equator and
//! drifts with latitude; nothing here is geodesic.

use geo::{Area, BoundingRect, Coord, LineString, Polygon};
use parcel_property_models::{LngLat, Measurements, Ring, SegmentMeasurement};
use serde::{Deserialize, Serialize};

use crate::{GeometryError, MIN_RING_POINTS, open_positions};

/// Meters per degree used for every length and area conversion.
pub const METERS_PER_DEGREE: f64 = 111_319.9;

fn to_line_string(ring: &[LngLat]) -> LineString<f64> {
    ring.iter()
        .map(|p| Coord { x: p.lng, y: p.lat })
        .collect::<Vec<_>>()
        .into()
}

/// Length of the straight line between two positions, in meters.
#[must_use]
pub fn segment_length_m(start: LngLat, end: LngLat) -> f64 {
    (end.lng - start.lng).hypot(end.lat - start.lat) * METERS_PER_DEGREE
}

/// Per-side lengths of a ring, in ring order. The closing side is included
/// whether or not the ring is stored closed.
#[must_use]
pub fn segments(ring: &Ring) -> Vec<SegmentMeasurement> {
    let open = open_positions(ring);
    let n = open.len();
    if n < 2 {
        return Vec::new();
    }

    (0..n)
        .map(|index| {
            let start = open[index];
            let end = open[(index + 1) % n];
            SegmentMeasurement {
                index,
                start,
                end,
                length_m: segment_length_m(start, end),
            }
        })
        .collect()
}

/// Enclosed area of a ring in square meters (shoelace over degrees).
#[must_use]
pub fn area_m2(ring: &Ring) -> f64 {
    let polygon = Polygon::new(to_line_string(ring), vec![]);
    polygon.unsigned_area() * METERS_PER_DEGREE * METERS_PER_DEGREE
}

/// Arithmetic mean of a ring's distinct vertices.
#[must_use]
pub fn centroid(ring: &Ring) -> Option<LngLat> {
    let open = open_positions(ring);
    if open.is_empty() {
        return None;
    }
    #[allow(clippy::cast_precision_loss)]
    let n = open.len() as f64;
    let (lng, lat) = open
        .iter()
        .fold((0.0, 0.0), |(lng, lat), p| (lng + p.lng, lat + p.lat));
    LngLat::try_new(lng / n, lat / n).ok()
}

/// Axis-aligned extent of a ring, in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bounds {
    /// Western edge.
    pub min_lng: f64,
    /// Southern edge.
    pub min_lat: f64,
    /// Eastern edge.
    pub max_lng: f64,
    /// Northern edge.
    pub max_lat: f64,
}

impl Bounds {
    /// East-west extent in degrees.
    #[must_use]
    pub fn width(&self) -> f64 {
        self.max_lng - self.min_lng
    }

    /// North-south extent in degrees.
    #[must_use]
    pub fn height(&self) -> f64 {
        self.max_lat - self.min_lat
    }

    /// Centre of the box.
    #[must_use]
    pub fn center(&self) -> LngLat {
        LngLat::new(
            f64::midpoint(self.min_lng, self.max_lng),
            f64::midpoint(self.min_lat, self.max_lat),
        )
    }
}

/// Bounding box of a ring, or `None` for an empty ring.
#[must_use]
pub fn bounds(ring: &Ring) -> Option<Bounds> {
    let rect = to_line_string(ring).bounding_rect()?;
    Some(Bounds {
        min_lng: rect.min().x,
        min_lat: rect.min().y,
        max_lng: rect.max().x,
        max_lat: rect.max().y,
    })
}

/// Formats an area for display: `0 m²` below one square meter, square
/// meters with one decimal below a hectare, hectares with two decimals
/// above.
#[must_use]
pub fn format_area(area_m2: f64) -> String {
    if area_m2 < 1.0 {
        "0 m²".to_string()
    } else if area_m2 < 10_000.0 {
        format!("{area_m2:.1} m²")
    } else {
        format!("{:.2} ha", area_m2 / 10_000.0)
    }
}

/// Formats a length for display in meters or kilometers.
#[must_use]
pub fn format_length(length_m: f64) -> String {
    if length_m < 1000.0 {
        format!("{length_m:.2} m")
    } else {
        format!("{:.2} km", length_m / 1000.0)
    }
}

/// Label drawn beside a boundary side, numbered from one.
#[must_use]
pub fn side_label(index: usize, length_m: f64) -> String {
    format!("Side {}: {length_m:.2}m", index + 1)
}

/// Computes [`Measurements`] for a validated ring.
///
/// # Errors
///
/// Returns [`GeometryError::DegenerateRing`] if the ring has fewer than
/// [`MIN_RING_POINTS`] positions once its closing point is removed.
pub fn measure_ring(ring: &Ring) -> Result<Measurements, GeometryError> {
    let points = open_positions(ring).len();
    if points < MIN_RING_POINTS {
        return Err(GeometryError::DegenerateRing { points });
    }

    let segments = segments(ring);
    let total_length_m = segments.iter().map(|s| s.length_m).sum();

    Ok(Measurements {
        total_length_m,
        segments,
        area_m2: area_m2(ring),
    })
}
