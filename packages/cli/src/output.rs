//! Terminal rendering of candidates and properties.

use parcel_geometry::frontage::identify_front_boundary;
use parcel_geometry::{bounds, format_area, format_length, open_positions, side_label};
use parcel_pipeline::SearchOutcome;
use parcel_property_models::{AddressCandidate, Property};

/// Prints geocode candidates as a table.
pub fn print_candidates(candidates: &[AddressCandidate]) {
    if candidates.is_empty() {
        println!("No candidates found.");
        return;
    }

    println!("{:<6} {:<28} {:<10} ADDRESS", "SCORE", "LOCATION", "SOURCE");
    println!("{}", "-".repeat(90));
    for candidate in candidates {
        println!(
            "{:<6.1} {:<28} {:<10} {}",
            candidate.score,
            candidate.location.to_string(),
            candidate.provenance.as_ref(),
            candidate.address
        );
    }
    println!("\n{} candidate(s)", candidates.len());
}

/// Describes one property, one line per fact.
#[must_use]
pub fn property_lines(property: &Property) -> Vec<String> {
    let mut lines = vec![format!("{} [{}]", property.name, property.id)];
    if let Some(address) = &property.address {
        lines.push(format!("  Address:   {address}"));
    }
    if let Some(description) = &property.description {
        lines.push(format!("  Notes:     {description}"));
    }
    lines.push(format!("  Location:  {}", property.location));
    lines.push(format!("  Source:    {}", property.provenance));
    lines.push(format!("  Rings:     {}", property.boundaries.len()));

    if let Some(extent) = property.primary_ring().and_then(bounds) {
        lines.push(format!(
            "  Extent:    {:.6}..{:.6} lng, {:.6}..{:.6} lat",
            extent.min_lng, extent.max_lng, extent.min_lat, extent.max_lat
        ));
    }

    if let Some(measurements) = &property.measurements {
        lines.push(format!("  Area:      {}", format_area(measurements.area_m2)));
        lines.push(format!(
            "  Perimeter: {}",
            format_length(measurements.total_length_m)
        ));
        for segment in &measurements.segments {
            lines.push(format!("    {}", side_label(segment.index, segment.length_m)));
        }

        let lengths: Vec<f64> = measurements.segments.iter().map(|s| s.length_m).collect();
        let vertices = property.primary_ring().map(open_positions);
        if let Some(front) = identify_front_boundary(&lengths, vertices) {
            lines.push(format!(
                "  Frontage:  side {} ({:.0}%: {})",
                front.index + 1,
                front.confidence * 100.0,
                front.reason
            ));
        }
    }

    lines
}

/// Prints one property.
pub fn print_property(property: &Property) {
    for line in property_lines(property) {
        println!("{line}");
    }
}

/// Prints a search outcome: the match, dropped rings, and each property.
pub fn print_outcome(outcome: &SearchOutcome) {
    if let Some(candidate) = &outcome.candidate {
        println!(
            "Matched: {} ({:.1}) at {}",
            candidate.address, candidate.score, candidate.location
        );
    }
    if !outcome.issues.is_empty() {
        println!("Dropped {} ring(s):", outcome.issues.len());
        for issue in &outcome.issues {
            println!("  - {issue}");
        }
    }
    println!();
    for property in &outcome.properties {
        print_property(property);
        println!();
    }
}

#[cfg(test)]
mod tests {
    use parcel_geometry::measure_ring;
    use parcel_property_models::{LngLat, PropertyId, Provenance};

    use super::*;

    #[test]
    fn describes_measured_property() {
        let ring = vec![
            LngLat::new(153.0, -27.0),
            LngLat::new(153.001, -27.0),
            LngLat::new(153.001, -26.999),
            LngLat::new(153.0, -26.999),
            LngLat::new(153.0, -27.0),
        ];
        let property = Property {
            id: PropertyId::from("abc"),
            name: "Corner lot".to_string(),
            description: None,
            address: Some("1 Corner St".to_string()),
            location: LngLat::new(153.0005, -26.9995),
            measurements: measure_ring(&ring).ok(),
            boundaries: vec![ring],
            provenance: Provenance::Synthetic,
        };

        let lines = property_lines(&property);
        assert_eq!(lines[0], "Corner lot [abc]");
        assert!(lines.iter().any(|l| l.contains("Address:   1 Corner St")));
        assert!(lines.iter().any(|l| l.contains("Source:    synthetic")));
        assert!(lines.iter().any(|l| l.trim_start().starts_with("Side 4:")));
        assert!(lines.iter().any(|l| l.contains("Frontage:")));
    }

    #[test]
    fn unmeasured_property_has_no_area() {
        let property = Property {
            id: PropertyId::from("abc"),
            name: "Bare".to_string(),
            description: None,
            address: None,
            location: LngLat::new(0.0, 0.0),
            boundaries: vec![],
            measurements: None,
            provenance: Provenance::Live,
        };
        let lines = property_lines(&property);
        assert!(!lines.iter().any(|l| l.contains("Area:")));
        assert!(!lines.iter().any(|l| l.contains("Extent:")));
    }
}
