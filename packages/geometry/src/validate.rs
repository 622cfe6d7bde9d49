//! Ring validation: loosely typed JSON rings to closed [`Ring`]s.
//!
//! A point must be a two-element array whose components coerce to finite
//! numbers. A ring with any malformed point is dropped whole, as is a ring
//! with fewer than [`MIN_RING_POINTS`] points. Repeated positions count:
//! the check is on points, not on the area they enclose. Surviving rings
//! are returned closed.

use std::fmt;

use parcel_property_models::{LngLat, Ring};
use serde_json::Value;

/// Fewest valid points a ring may have.
pub const MIN_RING_POINTS: usize = 3;

/// Why a ring was dropped during validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RingIssue {
    /// The ring value was not a JSON array.
    NotAnArray {
        /// Index of the ring in the input.
        ring: usize,
    },
    /// The ring had a point that was not a pair of finite numbers.
    MalformedPoint {
        /// Index of the ring in the input.
        ring: usize,
        /// Index of the offending point within the ring.
        point: usize,
    },
    /// The ring had too few points.
    TooFewPoints {
        /// Index of the ring in the input.
        ring: usize,
        /// Distinct positions found.
        points: usize,
    },
}

impl fmt::Display for RingIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotAnArray { ring } => write!(f, "ring {ring} is not an array"),
            Self::MalformedPoint { ring, point } => {
                write!(f, "ring {ring} has a malformed point at index {point}")
            }
            Self::TooFewPoints { ring, points } => write!(
                f,
                "ring {ring} has {points} points, need at least {MIN_RING_POINTS}"
            ),
        }
    }
}

/// Rings that passed validation, and the reasons the others did not.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValidatedRings {
    /// Closed rings of finite positions.
    pub rings: Vec<Ring>,
    /// One entry per dropped ring.
    pub issues: Vec<RingIssue>,
}

impl ValidatedRings {
    /// Returns `true` if no ring survived.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rings.is_empty()
    }
}

/// Coerces a JSON number or numeric string to a finite `f64`.
#[must_use]
pub fn coerce_number(value: &Value) -> Option<f64> {
    let number = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    number.is_finite().then_some(number)
}

/// Coerces a `[lng, lat]` JSON pair to a [`LngLat`].
#[must_use]
pub fn coerce_point(value: &Value) -> Option<LngLat> {
    let pair = value.as_array()?;
    if pair.len() != 2 {
        return None;
    }
    let lng = coerce_number(&pair[0])?;
    let lat = coerce_number(&pair[1])?;
    LngLat::try_new(lng, lat).ok()
}

/// Closes a ring by appending its first position if needed.
#[must_use]
pub fn close_ring(mut points: Vec<LngLat>) -> Ring {
    if let (Some(first), Some(last)) = (points.first().copied(), points.last())
        && first != *last
    {
        points.push(first);
    }
    points
}

fn validate_ring(index: usize, value: &Value) -> Result<Ring, RingIssue> {
    let raw = value
        .as_array()
        .ok_or(RingIssue::NotAnArray { ring: index })?;

    let points = raw
        .iter()
        .enumerate()
        .map(|(point, v)| {
            coerce_point(v).ok_or(RingIssue::MalformedPoint { ring: index, point })
        })
        .collect::<Result<Vec<_>, _>>()?;

    if points.len() < MIN_RING_POINTS {
        return Err(RingIssue::TooFewPoints {
            ring: index,
            points: points.len(),
        });
    }

    Ok(close_ring(points))
}

/// Validates every ring, keeping the good ones and recording the rest.
#[must_use]
pub fn validate_rings(rings: &[Value]) -> ValidatedRings {
    let mut validated = ValidatedRings::default();

    for (index, value) in rings.iter().enumerate() {
        match validate_ring(index, value) {
            Ok(ring) => validated.rings.push(ring),
            Err(issue) => {
                log::debug!("Dropping boundary ring: {issue}");
                validated.issues.push(issue);
            }
        }
    }

    validated
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn keeps_valid_ring_and_closes_it() {
        let rings = vec![json!([[153.0, -27.0], [153.001, -27.0], [153.001, -27.001]])];
        let result = validate_rings(&rings);
        assert_eq!(result.rings.len(), 1);
        assert_eq!(result.rings[0].len(), 4);
        assert_eq!(result.rings[0][0], result.rings[0][3]);
        assert!(result.issues.is_empty());
    }

    #[test]
    fn already_closed_ring_is_not_closed_twice() {
        let rings = vec![json!([[0, 0], [1, 0], [1, 1], [0, 0]])];
        let result = validate_rings(&rings);
        assert_eq!(result.rings[0].len(), 4);
    }

    #[test]
    fn drops_ring_with_too_few_points() {
        let rings = vec![json!([[0, 0], [1, 0]]), json!([])];
        let result = validate_rings(&rings);
        assert!(result.is_empty());
        assert_eq!(
            result.issues,
            vec![
                RingIssue::TooFewPoints { ring: 0, points: 2 },
                RingIssue::TooFewPoints { ring: 1, points: 0 },
            ]
        );
    }

    #[test]
    fn three_points_survive_even_with_a_repeat() {
        let result = validate_rings(&[json!([[0, 0], [1, 0], [0, 0]])]);
        assert!(result.issues.is_empty());
        assert_eq!(
            result.rings,
            vec![vec![
                LngLat::new(0.0, 0.0),
                LngLat::new(1.0, 0.0),
                LngLat::new(0.0, 0.0),
            ]]
        );
    }

    #[test]
    fn drops_ring_with_non_numeric_point() {
        let rings = vec![
            json!([[0, 0], ["east", 0], [1, 1]]),
            json!([[0, 0], [1, 0], [1, 1]]),
        ];
        let result = validate_rings(&rings);
        assert_eq!(result.rings.len(), 1);
        assert_eq!(
            result.issues,
            vec![RingIssue::MalformedPoint { ring: 0, point: 1 }]
        );
    }

    #[test]
    fn drops_ring_with_wrong_arity_point() {
        let rings = vec![json!([[0, 0, 5], [1, 0], [1, 1]])];
        let result = validate_rings(&rings);
        assert!(result.is_empty());
    }

    #[test]
    fn drops_non_array_ring() {
        let result = validate_rings(&[json!({"x": 1})]);
        assert_eq!(result.issues, vec![RingIssue::NotAnArray { ring: 0 }]);
    }

    #[test]
    fn degenerate_point_geometry_is_dropped() {
        let result = validate_rings(&[json!([[153.0, -27.0]])]);
        assert!(result.is_empty());
    }

    #[test]
    fn coerces_numeric_strings() {
        assert_eq!(coerce_number(&json!(" 12.5 ")), Some(12.5));
        assert_eq!(coerce_number(&json!("NaN")), None);
        assert_eq!(coerce_number(&json!("inf")), None);
        assert_eq!(coerce_number(&json!(null)), None);
        assert_eq!(
            coerce_point(&json!(["153.1", -27])),
            Some(LngLat::new(153.1, -27.0))
        );
    }
}
