//! API error types and responses.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use rcn_core::EngineError;
use rcn_store::StoreError;

/// API error type.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Unauthorized - missing or invalid credentials, or acting on a
    /// resource owned by someone else.
    #[error("unauthorized")]
    Unauthorized,

    /// Resource not found.
    #[error("not found: {0}")]
    NotFound(String),

    /// Bad request - invalid input.
    #[error("bad request: {0}")]
    BadRequest(String),

    /// Conflict - duplicate resource or invalid state transition.
    #[error("conflict: {0}")]
    Conflict(String),

    /// The target session or code has expired.
    #[error("gone: {0}")]
    Gone(String),

    /// An earning or redemption cap blocks the operation.
    #[error("limit exceeded: requested={requested}, remaining={remaining}")]
    LimitExceeded {
        /// The cap in force.
        limit: i64,
        /// The requested amount.
        requested: i64,
        /// How much of the cap remains.
        remaining: i64,
    },

    /// Internal server error.
    #[error("internal error: {0}")]
    Internal(String),

    /// External service error.
    #[error("external service error: {0}")]
    ExternalService(String),
}

/// JSON error response body.
#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: ErrorBody,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    code: String,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<serde_json::Value>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message, details) = match &self {
            Self::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                "unauthorized",
                self.to_string(),
                None,
            ),
            Self::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", msg.clone(), None),
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request", msg.clone(), None),
            Self::Conflict(msg) => (StatusCode::CONFLICT, "conflict", msg.clone(), None),
            Self::Gone(msg) => (StatusCode::GONE, "expired", msg.clone(), None),
            Self::LimitExceeded {
                limit,
                requested,
                remaining,
            } => (
                StatusCode::PAYMENT_REQUIRED,
                "limit_exceeded",
                self.to_string(),
                Some(serde_json::json!({
                    "limit": limit,
                    "requested": requested,
                    "remaining": remaining
                })),
            ),
            Self::Internal(msg) => {
                tracing::error!(error = %msg, "Internal server error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "An internal error occurred".to_string(),
                    None,
                )
            }
            Self::ExternalService(msg) => (
                StatusCode::BAD_GATEWAY,
                "external_service_error",
                msg.clone(),
                None,
            ),
        };

        let body = ErrorResponse {
            error: ErrorBody {
                code: code.to_string(),
                message,
                details,
            },
        };

        (status, Json(body)).into_response()
    }
}

impl From<EngineError> for ApiError {
    fn from(err: EngineError) -> Self {
        match err {
            EngineError::NotFound { entity, id } => Self::NotFound(format!("{entity} {id}")),
            EngineError::Validation(msg) => Self::BadRequest(msg),
            EngineError::LimitExceeded {
                limit,
                requested,
                remaining,
            } => Self::LimitExceeded {
                limit,
                requested,
                remaining,
            },
            EngineError::Conflict(msg) => Self::Conflict(msg),
            EngineError::Expired(msg) => Self::Gone(msg),
            EngineError::Unauthorized => Self::Unauthorized,
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Engine(engine) => engine.into(),
            StoreError::Database(msg) | StoreError::Serialization(msg) => Self::Internal(msg),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn engine_errors_map_to_statuses() {
        let cases = [
            (
                ApiError::from(EngineError::customer_not_found("0xabc")),
                StatusCode::NOT_FOUND,
            ),
            (
                ApiError::from(EngineError::Validation("bad".into())),
                StatusCode::BAD_REQUEST,
            ),
            (
                ApiError::from(EngineError::LimitExceeded {
                    limit: 50,
                    requested: 60,
                    remaining: 15,
                }),
                StatusCode::PAYMENT_REQUIRED,
            ),
            (
                ApiError::from(EngineError::Conflict("dup".into())),
                StatusCode::CONFLICT,
            ),
            (
                ApiError::from(EngineError::Expired("late".into())),
                StatusCode::GONE,
            ),
            (
                ApiError::from(EngineError::Unauthorized),
                StatusCode::UNAUTHORIZED,
            ),
        ];

        for (err, expected) in cases {
            assert_eq!(err.into_response().status(), expected);
        }
    }
}
