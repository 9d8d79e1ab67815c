//! # Yatube Web Server
//!
//! The main entry point for the Actix-web HTTP server.

use actix_web::{App, HttpServer, web};
use tracing_actix_web::TracingLogger;

mod config;
mod context;
mod handlers;
mod middleware;
mod state;
mod telemetry;
mod views;

use config::AppConfig;
use state::AppState;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let config = AppConfig::from_env();
    telemetry::init_telemetry(&config.telemetry);

    tracing::info!(
        "Starting Yatube web server on {}:{}",
        config.host,
        config.port
    );
    tracing::info!(
        namespace = %config.index_cache.namespace,
        ttl_secs = config.index_cache.ttl.as_secs(),
        "Index page cache configured"
    );

    let state = AppState::new(&config).await;
    let app_state = web::Data::new(state.clone());

    HttpServer::new(move || {
        App::new()
            .wrap(TracingLogger::default())
            .app_data(app_state.clone())
            .configure(handlers::configure_routes)
    })
    .bind((config.host.as_str(), config.port))?
    .run()
    .await?;

    tracing::info!("Server stopped");
    state.shutdown().await;
    Ok(())
}
