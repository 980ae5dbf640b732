//! Routes for arrival registration and badge evaluation.

use axum::extract::{Path, Query, State};
use axum::routing::post;
use axum::{Json, Router};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use earlybird_core::model::ArrivalRecord;
use earlybird_core::store::RegistrationOutcome;
use earlybird_engine::scoring;

use crate::error::ApiError;
use crate::state::AppState;

/// Request body for POST /.
#[derive(Debug, Deserialize)]
pub struct RegisterArrivalRequest {
    /// Chat-platform user id.
    pub user_id: String,
    /// Check-in timestamp; defaults to the server's current time.
    pub arrived_at: Option<DateTime<Utc>>,
}

/// Query parameters for GET /.
#[derive(Debug, Deserialize)]
pub struct DayQuery {
    /// Local calendar day; defaults to today.
    pub date: Option<NaiveDate>,
}

/// One badge awarded during evaluation.
#[derive(Debug, Serialize)]
pub struct AwardedBadge {
    /// Catalog identifier.
    pub badge_id: i64,
    /// Message shown to the user.
    pub message: String,
    /// Prestige score attached to the badge.
    pub score: i64,
}

/// Response body for POST /{arrival_id}/evaluate.
#[derive(Debug, Serialize)]
pub struct EvaluationResponse {
    /// The evaluated arrival.
    pub arrival_id: i64,
    /// Ids of the badges awarded by this evaluation, possibly none.
    pub awarded: Vec<i64>,
    /// Catalog details for the awarded badges.
    pub badges: Vec<AwardedBadge>,
}

/// POST /
#[instrument(skip(state, request), fields(user_id = %request.user_id))]
async fn register_arrival(
    State(state): State<AppState>,
    Json(request): Json<RegisterArrivalRequest>,
) -> Result<Json<RegistrationOutcome>, ApiError> {
    let arrived_at = request.arrived_at.unwrap_or_else(|| state.clock.now());

    info!(arrived_at = %arrived_at, "handling register_arrival");

    let outcome = state.registrar.register(&request.user_id, arrived_at).await?;
    Ok(Json(outcome))
}

/// POST /{arrival_id}/evaluate
#[instrument(skip(state))]
async fn evaluate_arrival(
    State(state): State<AppState>,
    Path(arrival_id): Path<i64>,
) -> Result<Json<EvaluationResponse>, ApiError> {
    let awarded = state.evaluator.evaluate(arrival_id).await?;

    let badges = awarded
        .iter()
        .filter_map(|id| state.catalog.badge(*id))
        .map(|badge| AwardedBadge {
            badge_id: badge.id,
            message: badge.message.clone(),
            score: badge.score,
        })
        .collect();

    Ok(Json(EvaluationResponse {
        arrival_id,
        awarded,
        badges,
    }))
}

/// GET /?date=YYYY-MM-DD
async fn arrivals_on_day(
    State(state): State<AppState>,
    Query(query): Query<DayQuery>,
) -> Result<Json<Vec<ArrivalRecord>>, ApiError> {
    let day = query
        .date
        .unwrap_or_else(|| scoring::local_day(state.clock.now(), state.local_offset));
    let arrivals = state.store.arrivals_on_day(day).await?;
    Ok(Json(arrivals))
}

/// Returns the router for the arrivals context.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(register_arrival).get(arrivals_on_day))
        .route("/{arrival_id}/evaluate", post(evaluate_arrival))
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::Arc;

    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use chrono::{FixedOffset, TimeZone};
    use earlybird_catalog::BadgeCatalog;
    use earlybird_test_support::{FixedClock, InMemoryArrivalStore};
    use serde_json::Value;
    use tower::ServiceExt;

    fn test_app_state() -> AppState {
        let store = Arc::new(InMemoryArrivalStore::new());
        let catalog = Arc::new(BadgeCatalog::standard(2000).unwrap());
        let clock = Arc::new(FixedClock(
            Utc.with_ymd_and_hms(2026, 1, 15, 8, 0, 0).unwrap(),
        ));
        AppState::new(store, catalog, clock, FixedOffset::east_opt(0).unwrap())
    }

    async fn send_post(app: Router, uri: &str, body: Value) -> (StatusCode, Value) {
        let request = Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_vec(&body).unwrap()))
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let body_bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json: Value = serde_json::from_slice(&body_bytes).unwrap();
        (status, json)
    }

    #[tokio::test]
    async fn test_register_without_timestamp_uses_the_clock() {
        // Arrange
        let app = router().with_state(test_app_state());
        let body = serde_json::json!({ "user_id": "U1" });

        // Act
        let (status, json) = send_post(app, "/", body).await;

        // Assert
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["outcome"], "registered");
        assert_eq!(json["record"]["arrival_rank"], 1);
        // 08:00 is in the early window and takes the rank bonus: 3 + 2.
        assert_eq!(json["record"]["total_score"], 5);
        assert_eq!(json["user"]["current_score"], 5);
    }

    #[tokio::test]
    async fn test_duplicate_registration_returns_200_with_the_soft_outcome() {
        // Arrange
        let state = test_app_state();
        let body = serde_json::json!({ "user_id": "U1" });
        send_post(router().with_state(state.clone()), "/", body.clone()).await;

        // Act
        let (status, json) = send_post(router().with_state(state), "/", body).await;

        // Assert
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["outcome"], "already_registered_today");
        assert_eq!(json["day"], "2026-01-15");
    }

    #[tokio::test]
    async fn test_evaluate_awards_badges_and_rejects_a_second_run() {
        // Arrange
        let state = test_app_state();
        let body = serde_json::json!({ "user_id": "U1" });
        let (_, registered) = send_post(router().with_state(state.clone()), "/", body).await;
        let arrival_id = registered["record"]["id"].as_i64().unwrap();

        // Act
        let (status, json) = send_post(
            router().with_state(state.clone()),
            &format!("/{arrival_id}/evaluate"),
            serde_json::json!({}),
        )
        .await;

        // Assert
        assert_eq!(status, StatusCode::OK);
        let badges = json["badges"].as_array().unwrap();
        let ids: Vec<i64> = badges
            .iter()
            .map(|b| b["badge_id"].as_i64().unwrap())
            .collect();
        assert!(ids.contains(&101));
        assert!(ids.contains(&201));

        // Act again — evaluation is one-shot.
        let (status, json) = send_post(
            router().with_state(state),
            &format!("/{arrival_id}/evaluate"),
            serde_json::json!({}),
        )
        .await;

        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(json["error"], "achievement_already_registered");
    }

    #[tokio::test]
    async fn test_evaluate_missing_arrival_returns_404() {
        // Arrange
        let app = router().with_state(test_app_state());

        // Act
        let (status, json) = send_post(app, "/4242/evaluate", serde_json::json!({})).await;

        // Assert
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(json["error"], "arrival_not_found");
    }

    #[tokio::test]
    async fn test_list_arrivals_defaults_to_today() {
        // Arrange
        let state = test_app_state();
        for user in ["U1", "U2"] {
            let body = serde_json::json!({ "user_id": user });
            send_post(router().with_state(state.clone()), "/", body).await;
        }

        // Act
        let request = Request::builder()
            .method("GET")
            .uri("/")
            .body(Body::empty())
            .unwrap();
        let response = router()
            .with_state(state)
            .oneshot(request)
            .await
            .unwrap();

        // Assert
        assert_eq!(response.status(), StatusCode::OK);
        let body_bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json: Value = serde_json::from_slice(&body_bytes).unwrap();
        let arrivals = json.as_array().unwrap();
        assert_eq!(arrivals.len(), 2);
        assert_eq!(arrivals[0]["arrival_rank"], 1);
        assert_eq!(arrivals[1]["arrival_rank"], 2);
    }
}
