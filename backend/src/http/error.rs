//! HTTP error handling and response types.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::db::repository::RepositoryError;
use crate::services::AvailabilityError;

/// API error response body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiError {
    /// Error code for programmatic handling
    pub code: String,
    /// Human-readable error message
    pub message: String,
}

impl ApiError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }
}

/// Application error type for HTTP handlers.
#[derive(Debug)]
pub enum AppError {
    /// Invalid request (validation error)
    BadRequest(String),
    /// No usable identity on the request
    Unauthorized(String),
    /// Repository error
    Repository(RepositoryError),
}

impl AppError {
    fn status_and_body(self) -> (StatusCode, ApiError) {
        match self {
            AppError::BadRequest(msg) => {
                (StatusCode::BAD_REQUEST, ApiError::new("BAD_REQUEST", msg))
            }
            AppError::Unauthorized(msg) => {
                (StatusCode::UNAUTHORIZED, ApiError::new("UNAUTHORIZED", msg))
            }
            AppError::Repository(e) => repository_status(e),
        }
    }
}

fn repository_status(err: RepositoryError) -> (StatusCode, ApiError) {
    let message = err.message().to_string();
    match err {
        RepositoryError::NotFound { .. } => {
            (StatusCode::NOT_FOUND, ApiError::new("NOT_FOUND", message))
        }
        RepositoryError::PermissionDenied { .. } => {
            (StatusCode::FORBIDDEN, ApiError::new("FORBIDDEN", message))
        }
        RepositoryError::Conflict { .. } => {
            (StatusCode::CONFLICT, ApiError::new("CONFLICT", message))
        }
        RepositoryError::ValidationError { .. } => {
            (StatusCode::BAD_REQUEST, ApiError::new("BAD_REQUEST", message))
        }
        // Context stays in the log; clients only see the message.
        other => {
            tracing::error!("Repository failure: {}", other);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                ApiError::new("REPOSITORY_ERROR", message),
            )
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error) = self.status_and_body();
        (status, Json(error)).into_response()
    }
}

impl From<RepositoryError> for AppError {
    fn from(err: RepositoryError) -> Self {
        AppError::Repository(err)
    }
}

impl From<AvailabilityError> for AppError {
    fn from(err: AvailabilityError) -> Self {
        AppError::BadRequest(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repository::ErrorContext;

    fn status_of(err: AppError) -> StatusCode {
        err.into_response().status()
    }

    #[test]
    fn test_repository_errors_map_to_status_codes() {
        assert_eq!(
            status_of(RepositoryError::not_found("gone").into()),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status_of(RepositoryError::permission_denied("Access denied").into()),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            status_of(RepositoryError::conflict("dup").into()),
            StatusCode::CONFLICT
        );
        assert_eq!(
            status_of(RepositoryError::validation("bad").into()),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_of(RepositoryError::connection("down").into()),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_invalid_date_is_bad_request() {
        let err = AvailabilityError::InvalidDate {
            index: 2,
            field: "start",
            value: "soon".into(),
        };
        assert_eq!(status_of(err.into()), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_server_errors_hide_context() {
        let err = RepositoryError::connection_with_context(
            "pool exhausted",
            ErrorContext::new("list_trips")
                .with_entity("group")
                .with_entity_id(7),
        );
        let (status, body) = AppError::from(err).status_and_body();
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body.message, "pool exhausted");
        let json = serde_json::to_value(&body).unwrap();
        assert!(json.get("details").is_none());
        assert!(!json.to_string().contains("list_trips"));
    }

    #[test]
    fn test_unauthorized_body_shape() {
        let (_, body) = AppError::Unauthorized("Login required".into()).status_and_body();
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["code"], "UNAUTHORIZED");
        assert_eq!(json["message"], "Login required");
    }
}
