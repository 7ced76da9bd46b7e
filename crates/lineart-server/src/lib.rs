//! lineart-server: HTTP endpoints exposing the line-art pipeline.
//!
//! Each upload endpoint takes a `multipart/form-data` body with the
//! image in the `image` field and optional integer/boolean parameters,
//! and answers with `image/png` or a JSON error object. The pipeline
//! runs on the blocking thread pool; nothing is shared between requests.

pub mod config;
pub mod error;
pub mod form;
pub mod routes;

use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};

pub use config::ServerConfig;
pub use error::ApiError;

/// Build the application router.
///
/// Request bodies larger than `max_upload_bytes` are rejected.
pub fn router(max_upload_bytes: usize) -> Router {
    Router::new()
        .route("/", get(routes::index))
        .route("/outline", post(routes::outline))
        .route("/coloring_xdog", post(routes::coloring_xdog))
        .route("/coloring_hf", post(routes::coloring_hf))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
}
