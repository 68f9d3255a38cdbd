use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;
use tracing::error;

use todotag_data::ServiceError;
use todotag_relations::ProtocolError;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error(transparent)]
    Protocol(#[from] ProtocolError),
}

impl From<ServiceError> for ApiError {
    fn from(err: ServiceError) -> Self {
        Self::Protocol(ProtocolError::Service(err))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            // A cancelled prompt is a no-op, not a failure
            ApiError::Protocol(ProtocolError::UserCancelled) => {
                return StatusCode::NO_CONTENT.into_response();
            }
            ApiError::Protocol(ProtocolError::Service(err)) => match err {
                ServiceError::NotFound { .. } => StatusCode::NOT_FOUND,
                ServiceError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
                ServiceError::Validation(_) => StatusCode::BAD_REQUEST,
                ServiceError::Backend(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            ApiError::Protocol(
                ProtocolError::JoinListFailed { .. } | ProtocolError::JoinDeleteFailed { .. },
            ) => StatusCode::BAD_GATEWAY,
        };

        if status.is_server_error() {
            error!("Request failed: {}", self);
        }

        (status, Json(serde_json::json!({ "error": self.to_string() }))).into_response()
    }
}
