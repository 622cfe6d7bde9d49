//! Batch search over a list of addresses or points.

use parcel_cli_utils::{IndicatifProgress, MultiProgress};
use parcel_pipeline::{BoundaryQuery, Pipeline};
use parcel_property_models::LngLat;

/// Parses one query per line.
///
/// A line of two comma-separated numbers is a `lng,lat` point; anything
/// else is a free-text address. Blank lines and `#` comments are skipped.
#[must_use]
pub fn parse_queries(text: &str) -> Vec<BoundaryQuery> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(|line| {
            parse_point(line).map_or_else(
                || BoundaryQuery::Address(line.to_string()),
                BoundaryQuery::Location,
            )
        })
        .collect()
}

fn parse_point(line: &str) -> Option<LngLat> {
    let (lng, lat) = line.split_once(',')?;
    LngLat::try_new(lng.trim().parse().ok()?, lat.trim().parse().ok()?).ok()
}

/// Searches every query in `text` concurrently and prints a summary.
///
/// # Errors
///
/// Returns an error only if JSON output cannot be written. Failed
/// searches are reported per line.
pub async fn run(
    pipeline: &Pipeline,
    multi: &MultiProgress,
    text: &str,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let queries = parse_queries(text);
    if queries.is_empty() {
        println!("No queries in file.");
        return Ok(());
    }

    let progress = IndicatifProgress::batch_bar(multi, "Searching");
    let results = pipeline.search_many(&queries, progress.clone()).await;

    let succeeded = results.iter().filter(|r| r.is_ok()).count();
    progress.finish(format!("{succeeded}/{} searches succeeded", queries.len()));

    if json {
        let properties: Vec<_> = results
            .iter()
            .filter_map(|r| r.as_ref().ok())
            .flat_map(|outcome| &outcome.properties)
            .collect();
        println!("{}", serde_json::to_string_pretty(&properties)?);
        return Ok(());
    }

    for (query, result) in queries.iter().zip(&results) {
        match result {
            Ok(outcome) => {
                let areas: Vec<String> = outcome
                    .properties
                    .iter()
                    .filter_map(|p| p.measurements.as_ref())
                    .map(|m| parcel_geometry::format_area(m.area_m2))
                    .collect();
                println!(
                    "OK    {} -> {} propert(ies) [{}] ({})",
                    query.describe(),
                    outcome.properties.len(),
                    areas.join(", "),
                    outcome.provenance
                );
            }
            Err(e) => println!("FAIL  {} -> {e}", query.describe()),
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_addresses_and_points() {
        let queries = parse_queries(
            "# suburbs\n12 Smith Street, Townsville 4810\n\n153.02, -27.47\n  5 Park Road  \n",
        );
        assert_eq!(
            queries,
            vec![
                BoundaryQuery::Address("12 Smith Street, Townsville 4810".to_string()),
                BoundaryQuery::Location(LngLat::new(153.02, -27.47)),
                BoundaryQuery::Address("5 Park Road".to_string()),
            ]
        );
    }

    #[test]
    fn non_numeric_pair_is_an_address() {
        assert_eq!(
            parse_queries("Unit 4, 10 Main St"),
            vec![BoundaryQuery::Address("Unit 4, 10 Main St".to_string())]
        );
    }
}
