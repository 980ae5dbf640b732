//! API error types.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use thiserror::Error;

use earlybird_core::error::DomainError;

/// Startup and runtime errors for the API server.
#[derive(Debug, Error)]
pub enum AppError {
    /// A required environment variable is missing or invalid.
    #[error("configuration error: {0}")]
    Config(String),

    /// Database connection or pool error.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Network binding or I/O error.
    #[error("server error: {0}")]
    Server(#[from] std::io::Error),
}

/// JSON body returned for error responses.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    /// Machine-readable error code.
    pub error: &'static str,
    /// Human-readable error message.
    pub message: String,
}

/// HTTP-layer wrapper around `DomainError` that implements `IntoResponse`.
#[derive(Debug)]
pub struct ApiError(pub DomainError);

impl From<DomainError> for ApiError {
    fn from(err: DomainError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code) = match &self.0 {
            DomainError::ArrivalNotFound(_) => (StatusCode::NOT_FOUND, "arrival_not_found"),
            DomainError::UserNotFound(_) => (StatusCode::NOT_FOUND, "user_not_found"),
            DomainError::AchievementAlreadyRegistered(_) => {
                (StatusCode::CONFLICT, "achievement_already_registered")
            }
            DomainError::UnknownBadge(_) => (StatusCode::INTERNAL_SERVER_ERROR, "unknown_badge"),
            DomainError::InvalidCatalog(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "invalid_catalog")
            }
            DomainError::Infrastructure(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "infrastructure_error")
            }
        };

        let body = ErrorBody {
            error: error_code,
            message: self.0.to_string(),
        };

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    fn status_of(err: DomainError) -> StatusCode {
        let response = ApiError(err).into_response();
        response.status()
    }

    #[test]
    fn test_arrival_not_found_maps_to_404() {
        assert_eq!(
            status_of(DomainError::ArrivalNotFound(42)),
            StatusCode::NOT_FOUND
        );
    }

    #[test]
    fn test_user_not_found_maps_to_404() {
        assert_eq!(
            status_of(DomainError::UserNotFound("U1".into())),
            StatusCode::NOT_FOUND
        );
    }

    #[test]
    fn test_achievement_already_registered_maps_to_409() {
        assert_eq!(
            status_of(DomainError::AchievementAlreadyRegistered(42)),
            StatusCode::CONFLICT
        );
    }

    #[test]
    fn test_unknown_badge_maps_to_500() {
        assert_eq!(
            status_of(DomainError::UnknownBadge(9999)),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_infrastructure_maps_to_500() {
        assert_eq!(
            status_of(DomainError::Infrastructure("db down".into())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
