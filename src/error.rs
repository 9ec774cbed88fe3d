//! API error taxonomy shared by every route handler.
//!
//! Handlers return `Result<_, ApiError>`; the `IntoResponse` impl maps each
//! variant to its HTTP status and the `{message, error?}` JSON body the
//! frontend expects.

use axum::{http::StatusCode, response::IntoResponse, Json};
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    /// Client supplied incomplete or invalid input.
    #[error("{0}")]
    Validation(String),

    /// Bad credentials or missing/invalid token.
    #[error("{0}")]
    Auth(String),

    /// Authenticated but not allowed (e.g. registration already closed).
    #[error("{0}")]
    Forbidden(String),

    /// No record matches the given identifier.
    #[error("{0}")]
    NotFound(String),

    /// Unexpected persistence or runtime failure.
    #[error("{0}")]
    Internal(String),
}

/// Wire shape for error responses.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub message: String,
    /// Underlying diagnostic detail, omitted in production.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

fn is_production() -> bool {
    std::env::var("ENVIRONMENT").is_ok_and(|e| e == "production")
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::Auth(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = self.status();
        let body = match self {
            ApiError::Internal(detail) => {
                tracing::error!("internal error: {}", detail);
                ErrorBody {
                    message: "Server Error".to_string(),
                    error: if is_production() { None } else { Some(detail) },
                }
            }
            other => ErrorBody {
                message: other.to_string(),
                error: None,
            },
        };
        (status, Json(body)).into_response()
    }
}

impl From<sqlx::Error> for ApiError {
    fn from(e: sqlx::Error) -> Self {
        match e {
            sqlx::Error::RowNotFound => ApiError::NotFound("Not found".to_string()),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            ApiError::Validation("x".into()).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(ApiError::Auth("x".into()).status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            ApiError::NotFound("x".into()).status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ApiError::Internal("x".into()).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_row_not_found_maps_to_404() {
        let err: ApiError = sqlx::Error::RowNotFound.into();
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_validation_body_carries_message() {
        let body = ErrorBody {
            message: "Please fill in all required fields".to_string(),
            error: None,
        };
        let json = serde_json::to_string(&body).unwrap();
        assert_eq!(json, r#"{"message":"Please fill in all required fields"}"#);
    }
}
