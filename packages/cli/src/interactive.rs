//! Interactive menu for the parcel CLI.
//!
//! Runs searches through a [`SearchController`] so the last result stays
//! available for saving, and manages saved properties.

use std::sync::Arc;

use dialoguer::{Confirm, Input, Select};
use parcel_cli_utils::MultiProgress;
use parcel_pipeline::controller::{SearchController, SearchState};
use parcel_pipeline::{BoundaryQuery, Pipeline, PipelineConfig};
use parcel_property_models::{AddressComponents, LngLat};
use switchy_database::Database;

use crate::output;

/// Top-level menu entries.
enum Action {
    SearchAddress,
    SearchComponents,
    SearchLocation,
    SavedProperties,
    Server,
    Quit,
}

impl Action {
    const ALL: &[Self] = &[
        Self::SearchAddress,
        Self::SearchComponents,
        Self::SearchLocation,
        Self::SavedProperties,
        Self::Server,
        Self::Quit,
    ];

    #[must_use]
    const fn label(&self) -> &'static str {
        match self {
            Self::SearchAddress => "Search by address",
            Self::SearchComponents => "Search by house number and street",
            Self::SearchLocation => "Search by map point",
            Self::SavedProperties => "Saved properties",
            Self::Server => "Start server",
            Self::Quit => "Quit",
        }
    }
}

fn optional(prompt: &str) -> Result<Option<String>, dialoguer::Error> {
    let value: String = Input::new()
        .with_prompt(prompt)
        .allow_empty(true)
        .interact_text()?;
    Ok(Some(value.trim().to_string()).filter(|v| !v.is_empty()))
}

fn prompt_query(action: &Action) -> Result<Option<BoundaryQuery>, Box<dyn std::error::Error>> {
    let query = match action {
        Action::SearchAddress => {
            let address: String = Input::new().with_prompt("Address").interact_text()?;
            BoundaryQuery::Address(address)
        }
        Action::SearchComponents => BoundaryQuery::Components(AddressComponents {
            house_number: Input::new().with_prompt("House number").interact_text()?,
            street_name: Input::new()
                .with_prompt("Street name (e.g. Smith Street)")
                .interact_text()?,
            suburb: optional("Suburb (optional)")?,
            postcode: optional("Postcode (optional)")?,
        }),
        Action::SearchLocation => {
            let lng: f64 = Input::new().with_prompt("Longitude").interact_text()?;
            let lat: f64 = Input::new().with_prompt("Latitude").interact_text()?;
            BoundaryQuery::Location(LngLat::try_new(lng, lat)?)
        }
        Action::SavedProperties | Action::Server | Action::Quit => return Ok(None),
    };
    Ok(Some(query))
}

async fn search(
    controller: &SearchController,
    db: &dyn Database,
    multi: &MultiProgress,
    user: &str,
    query: &BoundaryQuery,
) -> Result<(), Box<dyn std::error::Error>> {
    let spinner = parcel_cli_utils::IndicatifProgress::spinner(
        multi,
        &format!("Searching {}", query.describe()),
    );
    controller.search(query).await;
    spinner.finish_and_clear();

    let outcome = match controller.state() {
        SearchState::Success(outcome) => outcome,
        SearchState::Error(message) => {
            println!("Search failed: {message}\n");
            return Ok(());
        }
        SearchState::Idle | SearchState::Searching { .. } => return Ok(()),
    };
    output::print_outcome(&outcome);

    for mut property in outcome.properties {
        if !Confirm::new()
            .with_prompt(format!("Save \"{}\"?", property.name))
            .default(false)
            .interact()?
        {
            continue;
        }
        let name: String = Input::new()
            .with_prompt("Name")
            .default(property.name.clone())
            .interact_text()?;
        property.rename(&name);

        let stored = parcel_database::save_property(db, user, &property).await?;
        println!("Saved as {}\n", stored.property.id);
    }

    Ok(())
}

async fn saved_properties(db: &dyn Database, user: &str) -> Result<(), Box<dyn std::error::Error>> {
    let stored = parcel_database::list_properties(db, user).await?;
    if stored.is_empty() {
        println!("No saved properties.\n");
        return Ok(());
    }

    let mut labels: Vec<String> = stored
        .iter()
        .map(|s| format!("{} ({})", s.property.name, s.property.id.short()))
        .collect();
    labels.push("Back".to_string());

    let idx = Select::new()
        .with_prompt("Saved properties")
        .items(&labels)
        .default(0)
        .interact()?;
    let Some(selected) = stored.get(idx) else {
        return Ok(());
    };

    output::print_property(&selected.property);
    println!();

    let id = selected.property.id.as_str();
    let choice = Select::new()
        .with_prompt("Action")
        .items(&["Rename", "Delete", "Back"])
        .default(2)
        .interact()?;
    match choice {
        0 => {
            let name: String = Input::new()
                .with_prompt("New name")
                .allow_empty(true)
                .interact_text()?;
            if let Some(property) = parcel_database::rename_property(db, user, id, &name).await? {
                println!("Renamed to {}\n", property.name);
            }
        }
        1 => {
            if Confirm::new()
                .with_prompt(format!("Delete \"{}\"?", selected.property.name))
                .default(false)
                .interact()?
                && parcel_database::delete_property(db, user, id).await?
            {
                println!("Deleted.\n");
            }
        }
        _ => {}
    }

    Ok(())
}

/// Runs the interactive menu until the user quits or starts the server.
///
/// # Errors
///
/// Returns an error if a prompt fails, configuration is invalid, or the
/// database cannot be opened.
pub async fn run(
    multi: &MultiProgress,
    config: PipelineConfig,
    user: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    println!("Property Boundary Search");
    println!(
        "Data: {}, tiles: {}",
        config.deployment,
        config.tile_source()
    );
    println!();

    let pipeline = Arc::new(Pipeline::from_config(&config)?);
    let controller = SearchController::new(pipeline);
    let db = parcel_database::open_db(&parcel_database::db_path_from_env()).await?;

    let labels: Vec<&str> = Action::ALL.iter().map(Action::label).collect();

    loop {
        let idx = Select::new()
            .with_prompt("What would you like to do?")
            .items(&labels)
            .default(0)
            .interact()?;
        let action = &Action::ALL[idx];

        match action {
            Action::SearchAddress | Action::SearchComponents | Action::SearchLocation => {
                if let Some(query) = prompt_query(action)? {
                    search(&controller, db.as_ref(), multi, user, &query).await?;
                }
            }
            Action::SavedProperties => saved_properties(db.as_ref(), user).await?,
            Action::Server => {
                // The server uses actix-web's runtime, so we need to run it
                // in a blocking task to avoid nesting tokio runtimes.
                tokio::task::spawn_blocking(move || {
                    actix_web::rt::System::new()
                        .block_on(parcel_server::interactive::run(config))
                })
                .await??;
                return Ok(());
            }
            Action::Quit => return Ok(()),
        }
    }
}
