use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use thiserror::Error;

use super::MsgResponse;

/// API error taxonomy
///
/// Wire mapping is frozen for client compatibility: client-caused failures
/// are 400 with the exact per-predicate message, everything server-side is a
/// generic 500. Auth failures are deliberately indistinguishable from
/// validation failures at the wire level.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Malformed or missing client input; carries the exact wire message.
    #[error("{0}")]
    Validation(String),

    /// Keyed-signature mismatch on the notify route.
    #[error("Invalid client key")]
    Auth,

    /// Device id outside the registry range on the notify route.
    #[error("Invalid device id")]
    InvalidDeviceId,

    /// Inference endpoint unreachable or erroring. Single attempt, no retry.
    #[error("upstream inference request failed: {0}")]
    Upstream(String),

    /// Anything unexpected in the handler chain. Detail stays in the server
    /// log; the client sees a generic message.
    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    pub fn upstream(message: impl Into<String>) -> Self {
        Self::Upstream(message.into())
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) | ApiError::Auth | ApiError::InvalidDeviceId => {
                StatusCode::BAD_REQUEST
            }
            ApiError::Upstream(_) | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn wire_message(&self) -> String {
        match self {
            ApiError::Validation(message) => message.clone(),
            ApiError::Auth => "Invalid client key".to_string(),
            ApiError::InvalidDeviceId => "Invalid device id".to_string(),
            ApiError::Upstream(_) | ApiError::Internal(_) => "Internal Server Error".to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status_code().is_server_error() {
            tracing::error!(target: "nirso-api", "❌ {}", self);
        }
        (
            self.status_code(),
            Json(MsgResponse::new(self.wire_message())),
        )
            .into_response()
    }
}
