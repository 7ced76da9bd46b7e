//! Request failures and their HTTP shape.
//!
//! Every failure is answered with `{"error": "<message>"}`. Client
//! faults (no upload, undecodable upload, malformed multipart body) are
//! 4xx; everything that goes wrong after the upload was accepted is 500.

use axum::Json;
use axum::extract::multipart::MultipartError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use lineart_pipeline::{ErrorKind, PipelineError};

/// Errors surfaced by the HTTP handlers.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// No file in the `image` field, or a file with an empty name.
    #[error("{0}")]
    MissingInput(&'static str),

    /// The upload is not a usable image.
    #[error("Invalid image format: {0}")]
    Decode(#[source] PipelineError),

    /// A pipeline stage failed or the parameters were rejected.
    #[error("{0}")]
    Processing(#[source] PipelineError),

    /// A numeric form field did not parse as an integer.
    #[error("invalid literal for integer field `{field}`: {value:?}")]
    BadField {
        /// Form field name.
        field: String,
        /// Raw value as received.
        value: String,
    },

    /// The request body is not valid `multipart/form-data`.
    #[error("malformed multipart body: {0}")]
    Multipart(#[from] MultipartError),

    /// The blocking worker running the pipeline did not finish.
    #[error("pipeline task failed: {0}")]
    Worker(String),
}

impl ApiError {
    /// HTTP status for this error.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::MissingInput(_) | Self::Decode(_) => StatusCode::BAD_REQUEST,
            Self::Multipart(e) => e.status(),
            Self::Processing(_) | Self::BadField { .. } | Self::Worker(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl From<PipelineError> for ApiError {
    fn from(err: PipelineError) -> Self {
        match err.kind() {
            ErrorKind::Decode => Self::Decode(err),
            ErrorKind::Processing => Self::Processing(err),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = self.to_string();
        if status.is_server_error() {
            tracing::error!(%status, error = %message, "request failed");
        } else {
            tracing::info!(%status, error = %message, "request rejected");
        }
        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}
