//! Integration tests for the per-user projection endpoints.

mod common;

use axum::http::StatusCode;
use sqlx::PgPool;

#[sqlx::test(migrations = "../../migrations")]
async fn test_unknown_user_returns_404(pool: PgPool) {
    let app = common::build_test_app(pool).await;

    let (status, json) = common::get_json(app, "/api/v1/users/nobody").await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["error"], "user_not_found");
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_user_aggregate_after_registration(pool: PgPool) {
    let app = common::build_test_app(pool.clone()).await;
    common::post_json(
        app,
        "/api/v1/arrivals",
        &serde_json::json!({ "user_id": "U1" }),
    )
    .await;

    let app = common::build_test_app(pool).await;
    let (status, json) = common::get_json(app, "/api/v1/users/U1").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["user_id"], "U1");
    assert_eq!(json["current_score"], 5);
    assert_eq!(json["previous_score"], 0);
    assert_eq!(json["level"], 1);
    assert_eq!(json["level_uped"], false);
    assert_eq!(json["points_to_next_level"], 15);
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_badges_and_achievements_after_evaluation(pool: PgPool) {
    let app = common::build_test_app(pool.clone()).await;
    let (_, json) = common::post_json(
        app,
        "/api/v1/arrivals",
        &serde_json::json!({ "user_id": "U1" }),
    )
    .await;
    let arrival_id = json["record"]["id"].as_i64().unwrap();

    let app = common::build_test_app(pool.clone()).await;
    common::post_json(
        app,
        &format!("/api/v1/arrivals/{arrival_id}/evaluate"),
        &serde_json::json!({}),
    )
    .await;

    let app = common::build_test_app(pool.clone()).await;
    let (status, badges) = common::get_json(app, "/api/v1/users/U1/badges").await;
    assert_eq!(status, StatusCode::OK);
    // Welcome, fastest arrival, morning window, and start dash.
    let badges = badges.as_array().unwrap();
    assert_eq!(badges.len(), 4);
    for badge in badges {
        assert_eq!(badge["count"], 1);
    }

    let app = common::build_test_app(pool).await;
    let (status, achievements) = common::get_json(app, "/api/v1/users/U1/achievements").await;
    assert_eq!(status, StatusCode::OK);
    let achievements = achievements.as_array().unwrap();
    assert_eq!(achievements.len(), 4);
    for achievement in achievements {
        assert_eq!(achievement["arrival_id"], arrival_id);
    }
}
