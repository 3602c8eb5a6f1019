pub mod artifacts;
pub mod results;
pub mod runs;
pub mod sweep;
pub mod values;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};

use crate::error::{Error, UsageError};

// ─── Unified error type ──────────────────────────────────────────

#[derive(Debug)]
pub enum AppError {
    /// Malformed or invalid input from the driver.
    BadRequest(String),
    /// Call not valid in the sweep's current state.
    Conflict(String),
    /// Histogram dicts that could not be interpreted.
    Unprocessable(String),
    /// Remote artifact storage failed.
    Storage(String),
    Internal(String),
}

impl From<Error> for AppError {
    fn from(err: Error) -> Self {
        let msg = err.to_string();
        match err {
            Error::Usage(usage) => match usage {
                UsageError::ReservedValueName
                | UsageError::UnitMismatch { .. }
                | UsageError::SummaryValueHasStory { .. }
                | UsageError::PageValueWithoutStory { .. }
                | UsageError::InterruptIndexOutOfRange { .. } => Self::BadRequest(msg),
                _ => Self::Conflict(msg),
            },
            Error::HistogramDicts(_) | Error::Json(_) => Self::Unprocessable(msg),
            Error::Storage(_) => Self::Storage(msg),
            Error::Io(_) | Error::Platform(_) => Self::Internal(msg),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            Self::Conflict(msg) => (StatusCode::CONFLICT, msg),
            Self::Unprocessable(msg) => (StatusCode::UNPROCESSABLE_ENTITY, msg),
            Self::Storage(msg) => (StatusCode::BAD_GATEWAY, msg),
            Self::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };

        if status.is_server_error() {
            tracing::error!(%status, %message, "request failed");
        }

        let body = serde_json::json!({
            "error":  message,
            "status": status.as_u16(),
        });

        (status, Json(body)).into_response()
    }
}
