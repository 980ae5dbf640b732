//! Earlybird API server entry point.

use std::error::Error;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use chrono::FixedOffset;
use sqlx::postgres::PgPoolOptions;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use earlybird_api::routes;
use earlybird_api::state::AppState;
use earlybird_catalog::{BadgeCatalog, DEFAULT_KIRIBAN_CEILING};
use earlybird_core::clock::SystemClock;
use earlybird_core::store::ArrivalStore;
use earlybird_store::PgArrivalStore;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    // Initialize tracing subscriber.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .json()
        .init();

    tracing::info!("Starting Earlybird API server");

    // Read configuration from environment.
    let database_url = std::env::var("DATABASE_URL")
        .map_err(|_| "DATABASE_URL environment variable must be set")?;
    let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
    let port: u16 = std::env::var("PORT")
        .unwrap_or_else(|_| "3000".to_string())
        .parse()
        .map_err(|e| format!("PORT must be a valid u16: {e}"))?;
    let offset_hours: i32 = std::env::var("LOCAL_UTC_OFFSET_HOURS")
        .unwrap_or_else(|_| "9".to_string())
        .parse()
        .map_err(|e| format!("LOCAL_UTC_OFFSET_HOURS must be a valid integer: {e}"))?;
    let local_offset = FixedOffset::east_opt(offset_hours * 3600)
        .ok_or("LOCAL_UTC_OFFSET_HOURS out of range")?;
    let kiriban_ceiling: u32 = std::env::var("KIRIBAN_CEILING")
        .unwrap_or_else(|_| DEFAULT_KIRIBAN_CEILING.to_string())
        .parse()
        .map_err(|e| format!("KIRIBAN_CEILING must be a valid u32: {e}"))?;

    // Create database connection pool and run migrations.
    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(&database_url)
        .await?;
    sqlx::migrate!("../../migrations").run(&pool).await?;

    // Assemble the badge catalog and seed it into storage.
    let catalog = Arc::new(BadgeCatalog::standard(kiriban_ceiling)?);
    let store: Arc<dyn ArrivalStore> = Arc::new(PgArrivalStore::new(pool));
    store.seed_catalog(catalog.types(), catalog.badges()).await?;

    // Build application state.
    let app_state = AppState::new(store, catalog, Arc::new(SystemClock), local_offset);

    // Build router.
    // TODO: Replace CorsLayer::permissive() with restricted origins for production.
    let app = Router::new()
        .merge(routes::health::router())
        .nest("/api/v1/arrivals", routes::arrivals::router())
        .nest("/api/v1/users", routes::users::router())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(app_state);

    // Start server.
    let addr: SocketAddr = format!("{host}:{port}")
        .parse()
        .map_err(|e| format!("invalid HOST:PORT combination: {e}"))?;
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app).await?;

    Ok(())
}
