//! Forum discussion export.

use axum::Router;
use axum::extract::{Path, Query, State};
use axum::response::Response;
use axum::routing::get;
use serde::Deserialize;

use crate::error::AppResult;
use crate::export::ExportFormat;
use crate::state::AppState;
use crate::summary::DISCUSSION_EXPORT_NAME;

/// Create the export router.
pub fn router() -> Router<AppState> {
    Router::new().route("/forum/{forum_id}/export", get(export_discussion))
}

#[derive(Deserialize)]
struct ExportParams {
    #[serde(default)]
    format: Option<String>,
}

/// Download the posts of the forum's latest discussion.
async fn export_discussion(
    State(state): State<AppState>,
    Path(forum_id): Path<i64>,
    Query(params): Query<ExportParams>,
) -> AppResult<Response> {
    let format = match params.format.as_deref() {
        Some(f) if !f.is_empty() => f.parse::<ExportFormat>()?,
        _ => ExportFormat::default(),
    };

    let dataset = state.summary().export_discussion(forum_id).await?;
    let body = dataset.render(format)?;

    Ok(super::download(body, DISCUSSION_EXPORT_NAME, format))
}
