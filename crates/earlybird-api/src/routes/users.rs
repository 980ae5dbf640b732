//! Routes for per-user projections: score aggregate, badges, and
//! achievement history.

use axum::extract::{Path, State};
use axum::{Json, Router, routing::get};

use earlybird_core::error::DomainError;
use earlybird_core::model::{Achievement, UserAggregate, UserBadge};

use crate::error::ApiError;
use crate::state::AppState;

/// GET /{user_id}
async fn get_user(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<UserAggregate>, ApiError> {
    let user = state
        .store
        .user_aggregate(&user_id)
        .await?
        .ok_or(DomainError::UserNotFound(user_id))?;
    Ok(Json(user))
}

/// GET /{user_id}/badges
async fn get_user_badges(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<Vec<UserBadge>>, ApiError> {
    let badges = state.store.user_badges(&user_id).await?;
    Ok(Json(badges))
}

/// GET /{user_id}/achievements
async fn get_user_achievements(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<Vec<Achievement>>, ApiError> {
    let achievements = state.store.user_achievements(&user_id).await?;
    Ok(Json(achievements))
}

/// Returns the router for the users context.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/{user_id}", get(get_user))
        .route("/{user_id}/badges", get(get_user_badges))
        .route("/{user_id}/achievements", get(get_user_achievements))
}
