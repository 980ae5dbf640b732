//! Shared test helpers for API integration tests.
#![allow(dead_code)]

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use chrono::{FixedOffset, TimeZone, Utc};
use http_body_util::BodyExt;
use sqlx::PgPool;
use tower::ServiceExt;

use earlybird_api::routes;
use earlybird_api::state::AppState;
use earlybird_catalog::{BadgeCatalog, DEFAULT_KIRIBAN_CEILING};
use earlybird_core::clock::Clock;
use earlybird_core::store::ArrivalStore;
use earlybird_store::PgArrivalStore;
use earlybird_test_support::FixedClock;

/// Fixed timestamp used across all integration tests: a Thursday morning
/// inside the early window.
fn fixed_clock() -> Arc<dyn Clock> {
    Arc::new(FixedClock(
        Utc.with_ymd_and_hms(2026, 1, 15, 8, 0, 0).unwrap(),
    ))
}

/// Build the full app router over a real `PgArrivalStore` with the
/// standard catalog seeded and a deterministic clock. Uses the same route
/// structure as `main.rs`.
pub async fn build_test_app(pool: PgPool) -> Router {
    let catalog = Arc::new(BadgeCatalog::standard(DEFAULT_KIRIBAN_CEILING).unwrap());
    let store: Arc<dyn ArrivalStore> = Arc::new(PgArrivalStore::new(pool));
    store
        .seed_catalog(catalog.types(), catalog.badges())
        .await
        .unwrap();

    let app_state = AppState::new(
        store,
        catalog,
        fixed_clock(),
        FixedOffset::east_opt(0).unwrap(),
    );

    Router::new()
        .merge(routes::health::router())
        .nest("/api/v1/arrivals", routes::arrivals::router())
        .nest("/api/v1/users", routes::users::router())
        .with_state(app_state)
}

/// Send a POST request with a JSON body and return the response.
pub async fn post_json(
    app: Router,
    uri: &str,
    body: &serde_json::Value,
) -> (StatusCode, serde_json::Value) {
    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_vec(body).unwrap()))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let body_bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json: serde_json::Value = serde_json::from_slice(&body_bytes).unwrap();

    (status, json)
}

/// Send a GET request and return the response.
pub async fn get_json(app: Router, uri: &str) -> (StatusCode, serde_json::Value) {
    let request = Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let body_bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json: serde_json::Value = serde_json::from_slice(&body_bytes).unwrap();

    (status, json)
}
