//! HTTP route handlers.

pub mod export;
pub mod health;
pub mod summary;

use axum::Router;
use axum::http::{HeaderValue, header};
use axum::response::{IntoResponse, Response};

use crate::export::ExportFormat;
use crate::state::AppState;

/// Every route the service exposes.
pub fn router() -> Router<AppState> {
    Router::new()
        .merge(health::router())
        .merge(summary::router())
        .merge(export::router())
}

/// A file download response with the right content type and filename.
pub(crate) fn download(body: String, name: &str, format: ExportFormat) -> Response {
    let disposition = format!("attachment; filename=\"{name}.{}\"", format.extension());
    let disposition = HeaderValue::from_str(&disposition)
        .unwrap_or_else(|_| HeaderValue::from_static("attachment"));

    (
        [
            (
                header::CONTENT_TYPE,
                HeaderValue::from_static(format.content_type()),
            ),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        body,
    )
        .into_response()
}
