use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::Utc;
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Authentication error: {0}")]
    AuthenticationFailure(String),

    #[error("Access denied: {0}")]
    AuthorizationFailure(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid transition: {0}")]
    InvalidTransition(String),

    #[error("Rejection message is required")]
    MissingReason,

    #[error("All documents must be verified before approving customer")]
    AggregateIncomplete,

    #[error("Customer service error: {0}")]
    RemoteCallFailure(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Internal error: {0}")]
    InternalError(String),
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::AuthenticationFailure(_) => StatusCode::UNAUTHORIZED,
            AppError::AuthorizationFailure(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::InvalidTransition(_) => StatusCode::CONFLICT,
            AppError::MissingReason => StatusCode::BAD_REQUEST,
            AppError::AggregateIncomplete => StatusCode::BAD_REQUEST,
            AppError::ValidationError(_) => StatusCode::BAD_REQUEST,
            AppError::RemoteCallFailure(_) => StatusCode::BAD_GATEWAY,
            AppError::DatabaseError(_) | AppError::InternalError(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            AppError::AuthenticationFailure(_) => "AUTH_ERROR",
            AppError::AuthorizationFailure(_) => "FORBIDDEN",
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::InvalidTransition(_) => "INVALID_TRANSITION",
            AppError::MissingReason => "MISSING_REASON",
            AppError::AggregateIncomplete => "AGGREGATE_INCOMPLETE",
            AppError::ValidationError(_) => "VALIDATION_FAILED",
            AppError::RemoteCallFailure(_) => "REMOTE_CALL_FAILED",
            AppError::DatabaseError(_) | AppError::InternalError(_) => "INTERNAL_ERROR",
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = json!({
            "error": {
                "code": self.error_code(),
                "message": self.to_string(),
                "timestamp": Utc::now().to_rfc3339(),
            }
        });
        (status, Json(body)).into_response()
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => AppError::NotFound("record not found".to_string()),
            other => AppError::DatabaseError(other.to_string()),
        }
    }
}

impl From<jsonwebtoken::errors::Error> for AppError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        AppError::AuthenticationFailure(format!("Invalid token: {}", err))
    }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        AppError::RemoteCallFailure(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn domain_errors_map_to_client_facing_statuses() {
        assert_eq!(
            AppError::MissingReason.status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::AggregateIncomplete.status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::InvalidTransition("x".into()).status_code(),
            StatusCode::CONFLICT
        );
    }

    #[test]
    fn authentication_and_authorization_are_distinct() {
        let authn = AppError::AuthenticationFailure("no token".into());
        let authz = AppError::AuthorizationFailure("wrong role".into());
        assert_eq!(authn.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(authz.status_code(), StatusCode::FORBIDDEN);
        assert_ne!(authn.error_code(), authz.error_code());
    }

    #[test]
    fn remote_failure_is_not_masked_as_internal() {
        let err = AppError::RemoteCallFailure("connection refused".into());
        assert_eq!(err.status_code(), StatusCode::BAD_GATEWAY);
        assert_eq!(err.error_code(), "REMOTE_CALL_FAILED");
    }
}
