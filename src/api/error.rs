use axum::Json;
use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use crate::engine::EngineError;

use super::dto::{ErrorDto, format_wire_time};

/// Error returned by every handler. Engine errors keep their own variant so
/// the status mapping lives in one place.
#[derive(Debug)]
pub enum ApiError {
    Engine(EngineError),
    BadRequest(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Engine(e) => match e {
                EngineError::NotFound(..) => StatusCode::NOT_FOUND,
                EngineError::InvalidArgument(_)
                | EngineError::LimitExceeded(_)
                | EngineError::AlreadyCancelled(_) => StatusCode::BAD_REQUEST,
                EngineError::Overlap { .. }
                | EngineError::AlreadyBooked(_)
                | EngineError::VenueHasSlots(_) => StatusCode::CONFLICT,
                EngineError::LockTimeout(_) => StatusCode::SERVICE_UNAVAILABLE,
                EngineError::WalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }

    /// Client-facing message. Storage failures are not described to callers.
    fn message(&self) -> String {
        match self {
            ApiError::BadRequest(msg) => msg.clone(),
            ApiError::Engine(EngineError::WalError(_)) => "Internal server error".into(),
            ApiError::Engine(e) => e.to_string(),
        }
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ApiError::Engine(e) => write!(f, "{e}"),
            ApiError::BadRequest(msg) => write!(f, "bad request: {msg}"),
        }
    }
}

impl std::error::Error for ApiError {}

impl From<EngineError> for ApiError {
    fn from(e: EngineError) -> Self {
        ApiError::Engine(e)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!("request failed: {self}");
        } else {
            tracing::debug!("request rejected ({status}): {self}");
        }
        let body = ErrorDto {
            timestamp: format_wire_time(crate::engine::now_ms()),
            status: status.as_u16(),
            error: status.canonical_reason().unwrap_or("Error").to_string(),
            message: self.message(),
        };
        (status, Json(body)).into_response()
    }
}
