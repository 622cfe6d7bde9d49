//! Interactive mode for the server.
//!
//! Prompts for bind address and port before starting the server.

use dialoguer::{Confirm, Input};
use parcel_pipeline::PipelineConfig;

/// Runs the server in interactive mode, prompting for configuration.
///
/// Asks for a bind address and port, sets `BIND_ADDR` and `PORT`, and
/// delegates to [`super::serve`]. Expects the logger to be installed.
///
/// # Errors
///
/// Returns an `std::io::Result` error if the underlying server fails to
/// start.
#[allow(clippy::future_not_send)]
pub async fn run(config: PipelineConfig) -> std::io::Result<()> {
    println!("Property Boundary Server");
    println!("Data: {}, tiles: {}", config.deployment, config.tile_source());
    println!();

    let bind_addr: String = Input::new()
        .with_prompt("Bind address")
        .default("127.0.0.1".to_string())
        .interact_text()
        .unwrap_or_else(|_| "127.0.0.1".to_string());

    let port_str: String = Input::new()
        .with_prompt("Port")
        .default("8080".to_string())
        .validate_with(|input: &String| -> Result<(), &str> {
            input.parse::<u16>().map(|_| ()).map_err(|_| "not a valid port")
        })
        .interact_text()
        .unwrap_or_else(|_| "8080".to_string());

    // SAFETY: We are single-threaded at this point (before server starts) and
    // these variables are only read once during server initialisation.
    unsafe {
        std::env::set_var("BIND_ADDR", &bind_addr);
        std::env::set_var("PORT", &port_str);
    }

    if !Confirm::new()
        .with_prompt(format!("Start server on {bind_addr}:{port_str}?"))
        .default(true)
        .interact()
        .unwrap_or(true)
    {
        println!("Cancelled.");
        return Ok(());
    }

    super::serve(config).await
}
