#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Command-line front end for property boundary search.
//!
//! ```text
//! parcel geocode "12 Smith Street, Townsville"
//! parcel search "123 Example Street, Brisbane QLD 4000"
//! parcel search-components 12 "Smith Street" --suburb Townsville --postcode 4810
//! parcel search-location 153.02 -27.47
//! parcel batch addresses.txt
//! parcel import lots.geojson [--save]
//! parcel saved list | save <address> | delete <id> | export
//! parcel serve
//! ```
//!
//! Running `parcel` with no subcommand enters interactive mode.
//!
//! Uses `indicatif-log-bridge` (via [`parcel_cli_utils::init_logger`]) to
//! route `log` output through `indicatif::MultiProgress` so that log lines
//! and progress bars never fight for the terminal.

mod batch;
mod interactive;
mod output;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use parcel_cli_utils::{IndicatifProgress, MultiProgress};
use parcel_pipeline::import::{import_geojson, to_feature_collection};
use parcel_pipeline::{BoundaryQuery, Pipeline, PipelineConfig, SearchOutcome};
use parcel_property_models::{AddressComponents, LngLat};

#[derive(Parser)]
#[command(name = "parcel", about = "Find and measure property boundaries")]
struct Cli {
    /// `ArcGIS` access token (overrides every other token source)
    #[arg(long, global = true)]
    token: Option<String>,

    /// User id that owns saved properties
    #[arg(long, global = true, default_value = "local")]
    user: String,

    /// Print JSON instead of a summary
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Geocode an address to candidate locations
    Geocode {
        /// Free-text address
        address: String,
    },
    /// Find the boundary of the property at an address
    Search {
        /// Free-text address
        address: String,
    },
    /// Find a boundary from structured address parts
    SearchComponents {
        /// House number
        house_number: String,
        /// Street name including its type, e.g. "Smith Street"
        street_name: String,
        /// Suburb
        #[arg(long)]
        suburb: Option<String>,
        /// Postcode
        #[arg(long)]
        postcode: Option<String>,
    },
    /// Find the boundary of the parcel containing a point
    #[command(allow_negative_numbers = true)]
    SearchLocation {
        /// Longitude
        lng: f64,
        /// Latitude
        lat: f64,
    },
    /// Search every address (or `lng,lat` pair) in a file, one per line
    Batch {
        /// Input file
        file: PathBuf,
    },
    /// Import polygons from a `GeoJSON` file
    Import {
        /// `GeoJSON` file
        file: PathBuf,
        /// Save the imported properties
        #[arg(long)]
        save: bool,
    },
    /// Manage saved properties
    Saved {
        #[command(subcommand)]
        command: SavedCommands,
    },
    /// Start the HTTP API server
    Serve,
}

#[derive(Subcommand)]
enum SavedCommands {
    /// List saved properties
    List,
    /// Search an address and save the result
    Save {
        /// Free-text address
        address: String,
        /// Display name for the saved property
        #[arg(long)]
        name: Option<String>,
    },
    /// Delete a saved property
    Delete {
        /// Property id
        id: String,
    },
    /// Print saved properties as a `GeoJSON` `FeatureCollection`
    Export,
}

fn print_json(value: &impl serde::Serialize) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Runs one search behind a spinner.
async fn search_with_spinner(
    pipeline: &Pipeline,
    multi: &MultiProgress,
    query: &BoundaryQuery,
) -> Result<SearchOutcome, parcel_pipeline::PipelineError> {
    let spinner = IndicatifProgress::spinner(multi, &format!("Searching {}", query.describe()));
    let result = pipeline.search(query).await;
    spinner.finish_and_clear();
    result
}

async fn run_search(
    pipeline: &Pipeline,
    multi: &MultiProgress,
    query: &BoundaryQuery,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let outcome = search_with_spinner(pipeline, multi, query).await?;
    if json {
        print_json(&outcome.properties)?;
    } else {
        output::print_outcome(&outcome);
    }
    Ok(())
}

async fn run_saved(
    pipeline: &Pipeline,
    multi: &MultiProgress,
    user: &str,
    command: SavedCommands,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let db = parcel_database::open_db(&parcel_database::db_path_from_env()).await?;

    match command {
        SavedCommands::List => {
            let stored = parcel_database::list_properties(db.as_ref(), user).await?;
            if json {
                let properties: Vec<_> = stored.iter().map(|s| &s.property).collect();
                return print_json(&properties);
            }
            if stored.is_empty() {
                println!("No saved properties.");
                return Ok(());
            }

            println!("{:<38} {:<22} {:<12} NAME", "ID", "CREATED", "AREA");
            println!("{}", "-".repeat(100));
            for s in &stored {
                let created = s.created_at.get(..19).unwrap_or(&s.created_at);
                let area = s
                    .property
                    .measurements
                    .as_ref()
                    .map(|m| parcel_geometry::format_area(m.area_m2))
                    .unwrap_or_default();
                println!(
                    "{:<38} {:<22} {:<12} {}",
                    s.property.id, created, area, s.property.name
                );
            }
            println!("\n{} saved propert(ies)", stored.len());
        }
        SavedCommands::Save { address, name } => {
            let query = BoundaryQuery::Address(address);
            let outcome = search_with_spinner(pipeline, multi, &query).await?;
            for mut property in outcome.properties {
                if let Some(name) = &name {
                    property.rename(name);
                }
                let stored = parcel_database::save_property(db.as_ref(), user, &property).await?;
                println!("Saved {} as {}", stored.property.name, stored.property.id);
            }
        }
        SavedCommands::Delete { id } => {
            if parcel_database::delete_property(db.as_ref(), user, &id).await? {
                println!("Deleted property: {id}");
            } else {
                eprintln!("Property not found: {id}");
                std::process::exit(1);
            }
        }
        SavedCommands::Export => {
            let properties: Vec<_> = parcel_database::list_properties(db.as_ref(), user)
                .await?
                .into_iter()
                .map(|s| s.property)
                .collect();
            print_json(&to_feature_collection(&properties))?;
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let multi = parcel_cli_utils::init_logger();
    let cli = Cli::parse();

    let config = PipelineConfig::from_env(cli.token.clone())?;
    log::debug!("Configuration: {config:?}");

    let Some(command) = cli.command else {
        return interactive::run(&multi, config, &cli.user).await;
    };

    let pipeline = Pipeline::from_config(&config)?;

    match command {
        Commands::Geocode { address } => {
            let candidates = pipeline.geocode(&address).await?;
            if cli.json {
                print_json(&candidates)?;
            } else {
                output::print_candidates(&candidates);
            }
        }
        Commands::Search { address } => {
            run_search(&pipeline, &multi, &BoundaryQuery::Address(address), cli.json).await?;
        }
        Commands::SearchComponents {
            house_number,
            street_name,
            suburb,
            postcode,
        } => {
            let query = BoundaryQuery::Components(AddressComponents {
                house_number,
                street_name,
                suburb,
                postcode,
            });
            run_search(&pipeline, &multi, &query, cli.json).await?;
        }
        Commands::SearchLocation { lng, lat } => {
            let query = BoundaryQuery::Location(LngLat::try_new(lng, lat)?);
            run_search(&pipeline, &multi, &query, cli.json).await?;
        }
        Commands::Batch { file } => {
            let text = std::fs::read_to_string(&file)?;
            batch::run(&pipeline, &multi, &text, cli.json).await?;
        }
        Commands::Import { file, save } => {
            let properties = import_geojson(&std::fs::read_to_string(&file)?)?;
            if save {
                let db = parcel_database::open_db(&parcel_database::db_path_from_env()).await?;
                for property in &properties {
                    let stored =
                        parcel_database::save_property(db.as_ref(), &cli.user, property).await?;
                    println!("Saved {} as {}", stored.property.name, stored.property.id);
                }
            } else if cli.json {
                print_json(&properties)?;
            } else {
                for property in &properties {
                    output::print_property(property);
                    println!();
                }
            }
        }
        Commands::Saved { command } => {
            run_saved(&pipeline, &multi, &cli.user, command, cli.json).await?;
        }
        Commands::Serve => {
            // The server uses actix-web's runtime, so we need to run it
            // in a blocking task to avoid nesting tokio runtimes.
            tokio::task::spawn_blocking(move || {
                actix_web::rt::System::new().block_on(parcel_server::serve(config))
            })
            .await??;
        }
    }

    Ok(())
}
