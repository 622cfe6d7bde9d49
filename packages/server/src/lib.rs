#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Actix-Web API server for property boundary search.
//!
//! Exposes the geocode and boundary lookups as JSON functions under
//! `/functions/v1`, a combined search under `/api/search`, and per-user
//! saved properties under `/api/properties`. Saved properties live in a
//! `SQLite` database at `DATABASE_PATH` (default `data/properties.db`).

mod handlers;
pub mod interactive;

use std::sync::Arc;

use actix_cors::Cors;
use actix_web::{App, HttpServer, middleware, web};
use parcel_pipeline::{Pipeline, PipelineConfig, TileSource};
use switchy_database::Database;

/// Header carrying the caller's user id for saved-property routes.
pub const USER_ID_HEADER: &str = "X-User-Id";

/// Shared application state.
pub struct AppState {
    /// Search pipeline over the configured data source.
    pub pipeline: Arc<Pipeline>,
    /// Saved properties.
    pub db: Arc<dyn Database>,
    /// Base-map tiles reported to clients.
    pub tiles: TileSource,
}

/// Registers every route on an actix app.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/functions/v1")
            .route("/geocode", web::post().to(handlers::geocode))
            .route(
                "/property-boundaries",
                web::post().to(handlers::property_boundaries),
            ),
    )
    .service(
        web::scope("/api")
            .route("/health", web::get().to(handlers::health))
            .route("/search", web::post().to(handlers::search))
            .route("/properties", web::get().to(handlers::list_properties))
            .route("/properties", web::post().to(handlers::save_property))
            .route("/properties/{id}", web::patch().to(handlers::rename_property))
            .route(
                "/properties/{id}",
                web::delete().to(handlers::delete_property),
            ),
    );
}

/// Builds the application state from a pipeline configuration.
///
/// # Errors
///
/// Returns an `std::io::Error` if the HTTP client cannot be built or the
/// database cannot be opened.
pub async fn build_state(config: &PipelineConfig) -> std::io::Result<AppState> {
    let pipeline = Pipeline::from_config(config).map_err(std::io::Error::other)?;
    log::info!("Using data source: {}", pipeline.source_name());

    let db_path = parcel_database::db_path_from_env();
    log::info!("Opening property database at {}...", db_path.display());
    let db = parcel_database::open_db(&db_path)
        .await
        .map_err(std::io::Error::other)?;

    Ok(AppState {
        pipeline: Arc::new(pipeline),
        db: Arc::from(db),
        tiles: config.tile_source(),
    })
}

/// Starts the HTTP server with an already-installed logger.
///
/// Reads `BIND_ADDR` (default `127.0.0.1`) and `PORT` (default `8080`).
/// The caller provides the async runtime.
///
/// # Errors
///
/// Returns an `std::io::Error` if startup fails, the server cannot bind,
/// or it stops with a runtime error.
#[allow(clippy::future_not_send)]
pub async fn serve(config: PipelineConfig) -> std::io::Result<()> {
    log::debug!("Server configuration: {config:?}");
    let state = web::Data::new(build_state(&config).await?);

    let bind_addr = std::env::var("BIND_ADDR").unwrap_or_else(|_| "127.0.0.1".to_string());
    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(8080);

    log::info!("Starting server on {bind_addr}:{port}");

    HttpServer::new(move || {
        let cors = Cors::permissive();

        App::new()
            .wrap(cors)
            .wrap(middleware::Logger::default())
            .app_data(state.clone())
            .configure(configure)
    })
    .bind((bind_addr, port))?
    .run()
    .await
}

/// Installs the logger, loads configuration from the environment, and
/// starts the server.
///
/// # Errors
///
/// Returns an `std::io::Error` if the configuration is invalid or
/// [`serve`] fails.
#[allow(clippy::future_not_send)]
pub async fn run_server() -> std::io::Result<()> {
    pretty_env_logger::init_custom_env("RUST_LOG");

    let config = PipelineConfig::from_env(None).map_err(std::io::Error::other)?;
    serve(config).await
}
