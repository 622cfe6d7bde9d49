//! Street-frontage guess for a lot boundary.
//!
//! Scores each side of a lot by position, length, and orientation and
//! returns the side most likely to face the street. Lots in the service
//! area mostly front to the south, so southern sides score higher.

use parcel_property_models::LngLat;
use serde::Serialize;

/// The chosen front side.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FrontBoundary {
    /// Zero-based side index (side `i` runs from vertex `i` to `i + 1`).
    pub index: usize,
    /// 0.0 to 1.0.
    pub confidence: f64,
    /// Which rule picked the side.
    pub reason: String,
}

impl FrontBoundary {
    fn new(index: usize, confidence: f64, reason: impl Into<String>) -> Self {
        Self {
            index,
            confidence,
            reason: reason.into(),
        }
    }
}

/// Picks the likely street-facing side.
///
/// `lengths[i]` is the length of side `i`. `vertices`, when given, are the
/// ring's open positions; they are only used when there is one per side.
/// Returns `None` when there are no sides.
#[must_use]
pub fn identify_front_boundary(
    lengths: &[f64],
    vertices: Option<&[LngLat]>,
) -> Option<FrontBoundary> {
    if lengths.is_empty() {
        return None;
    }
    let vertices = vertices.filter(|v| v.len() == lengths.len());

    let front = match (lengths.len(), vertices) {
        (n, Some(vertices)) if n >= 5 => irregular(lengths, vertices),
        (n, None) if n >= 5 => irregular_by_length(lengths),
        (3 | 4, Some(vertices)) => scored(lengths, vertices),
        (4, None) => rectangular_by_length(lengths),
        (3, None) => FrontBoundary::new(
            longest_index(lengths),
            0.7,
            "Longest boundary (triangular lot street frontage)",
        ),
        _ => FrontBoundary::new(longest_index(lengths), 0.3, "Fallback: longest boundary"),
    };

    log::debug!(
        "Front boundary: side {} ({:.2}) {}",
        front.index,
        front.confidence,
        front.reason
    );
    Some(front)
}

fn longest_index(lengths: &[f64]) -> usize {
    let max = max_of(lengths);
    lengths.iter().position(|&l| l >= max).unwrap_or(0)
}

fn max_of(values: &[f64]) -> f64 {
    values.iter().copied().fold(f64::NEG_INFINITY, f64::max)
}

fn min_of(values: &[f64]) -> f64 {
    values.iter().copied().fold(f64::INFINITY, f64::min)
}

/// 1.0 for an east-west side, 0.0 for a north-south one.
fn east_west(start: LngLat, end: LngLat) -> f64 {
    (end.lat - start.lat).atan2(end.lng - start.lng).cos().abs()
}

fn rectangular_by_length(lengths: &[f64]) -> FrontBoundary {
    let max = max_of(lengths);
    let min = min_of(lengths);
    // Sides 0 and 2 run across the lot; sides 1 and 3 run along it.
    let longer_horizontal = if lengths[0] > lengths[2] { 0 } else { 2 };

    if min > 0.0 && max / min > 1.5 {
        let longest = longest_index(lengths);
        if longest == 0 || longest == 2 {
            return FrontBoundary::new(
                longest,
                0.8,
                "Longest horizontal boundary (typical street frontage)",
            );
        }
        if lengths[longer_horizontal] >= max * 0.6 {
            return FrontBoundary::new(
                longer_horizontal,
                0.7,
                "Substantial horizontal boundary preferred over longest vertical",
            );
        }
        return FrontBoundary::new(longest, 0.6, "Longest boundary (vertical street frontage)");
    }

    FrontBoundary::new(
        2,
        0.5,
        "Bottom boundary preferred (typical Australian lot orientation)",
    )
}

fn scored(lengths: &[f64], vertices: &[LngLat]) -> FrontBoundary {
    let n = vertices.len();
    let max_lat = max_of(&vertices.iter().map(|v| v.lat).collect::<Vec<_>>());
    let min_lat = min_of(&vertices.iter().map(|v| v.lat).collect::<Vec<_>>());
    let lat_range = max_lat - min_lat;
    let min_len = min_of(lengths);
    let len_range = max_of(lengths) - min_len;

    let mut best = (0, 0.0);
    for i in 0..n {
        let (start, end) = (vertices[i], vertices[(i + 1) % n]);
        let mid_lat = f64::midpoint(start.lat, end.lat);
        let mut score = 0.0;

        if lat_range > 0.0 {
            score += (max_lat - mid_lat) / lat_range * 40.0;
        }

        if len_range > 0.0 {
            let ratio = (lengths[i] - min_len) / len_range;
            let length_score = if ratio >= 0.6 {
                1.0
            } else if ratio >= 0.3 {
                0.8
            } else {
                ratio / 0.3 * 0.4
            };
            score += length_score * 35.0;
        }

        score += east_west(start, end) * 25.0;

        if score > best.1 {
            best = (i, score);
        }
    }

    FrontBoundary::new(
        best.0,
        (best.1 / 100.0).min(0.95),
        format!("Coordinate analysis (score: {:.1})", best.1),
    )
}

fn irregular(lengths: &[f64], vertices: &[LngLat]) -> FrontBoundary {
    let n = vertices.len();
    #[allow(clippy::cast_precision_loss)]
    let count = n as f64;
    let centre = LngLat::new(
        vertices.iter().map(|v| v.lng).sum::<f64>() / count,
        vertices.iter().map(|v| v.lat).sum::<f64>() / count,
    );
    let distance = |a: LngLat, b: LngLat| (a.lng - b.lng).hypot(a.lat - b.lat);

    let lats = vertices.iter().map(|v| v.lat).collect::<Vec<_>>();
    let (max_lat, min_lat) = (max_of(&lats), min_of(&lats));
    let lat_range = max_lat - min_lat;
    let min_len = min_of(lengths);
    let len_range = max_of(lengths) - min_len;
    let max_distance = max_of(
        &vertices
            .iter()
            .map(|v| distance(*v, centre))
            .collect::<Vec<_>>(),
    );

    let mut best = (0, 0.0);
    for i in 0..n {
        let (start, end) = (vertices[i], vertices[(i + 1) % n]);
        let mid = LngLat::new(
            f64::midpoint(start.lng, end.lng),
            f64::midpoint(start.lat, end.lat),
        );
        let mut score = 0.0;

        if lat_range > 0.0 {
            score += (max_lat - mid.lat) / lat_range * 30.0;
        }

        if len_range > 0.0 {
            let ratio = (lengths[i] - min_len) / len_range;
            let length_score = if (0.2..=0.7).contains(&ratio) {
                1.0 - (ratio - 0.45).abs() / 0.25
            } else if ratio < 0.2 {
                ratio / 0.2 * 0.3
            } else {
                ((1.0 - ratio) / 0.3 * 0.5).max(0.0)
            };
            score += length_score * 30.0;
        }

        score += east_west(start, end) * 25.0;

        if max_distance > 0.0 {
            score += (1.0 - distance(mid, centre) / max_distance) * 15.0;
        }

        if score > best.1 {
            best = (i, score);
        }
    }

    FrontBoundary::new(
        best.0,
        (best.1 / 100.0).min(0.9),
        format!("Irregular property analysis (score: {:.1})", best.1),
    )
}

fn irregular_by_length(lengths: &[f64]) -> FrontBoundary {
    let mut sorted = lengths.iter().copied().enumerate().collect::<Vec<_>>();
    sorted.sort_by(|a, b| a.1.total_cmp(&b.1));

    let min = sorted[0].1;
    let range = sorted[sorted.len() - 1].1 - min;

    if range > min * 2.0
        && let Some((index, _)) = sorted.iter().find(|(_, length)| {
            let ratio = (length - min) / range;
            (0.25..=0.65).contains(&ratio)
        })
    {
        return FrontBoundary::new(*index, 0.6, "Medium-length boundary suitable for access");
    }

    let pick = sorted.len() * 3 / 10;
    FrontBoundary::new(
        sorted[pick].0,
        0.4,
        "30th percentile boundary (irregular property fallback)",
    )
}
