//! Forum summary report routes.

use axum::extract::{Query, State};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;

use crate::error::AppResult;
use crate::export::{Dataset, ExportFormat};
use crate::state::AppState;
use crate::summary::dates::{self, DateRange, Timestamps};
use crate::summary::{
    ReportError, SUMMARY_EXPORT_NAME, SortColumn, SortDirection, SummaryRequest,
};

/// Create the summary report router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/forum/report/summary", get(summary_report))
        .route("/forum/report/summary/timestamps", post(convert_dates))
}

// -------------------------------------------------------------------------
// Request types
// -------------------------------------------------------------------------

#[derive(Debug, Default, Deserialize)]
struct SummaryParams {
    #[serde(default)]
    courseid: i64,
    #[serde(default)]
    forumid: i64,
    #[serde(default)]
    perpage: Option<u32>,
    #[serde(default = "default_page")]
    page: u32,
    #[serde(default)]
    tsort: Option<String>,
    #[serde(default)]
    tdir: Option<String>,
    /// Comma-separated group ids.
    #[serde(default)]
    groups: Option<String>,
    #[serde(default)]
    datefrom: Option<i64>,
    #[serde(default)]
    dateto: Option<i64>,
    #[serde(default)]
    download: Option<String>,
}

fn default_page() -> u32 {
    1
}

impl SummaryParams {
    fn into_request(self) -> Result<(SummaryRequest, Option<ExportFormat>), ReportError> {
        let sort_column = match non_empty(self.tsort.as_deref()) {
            Some(s) => s.parse::<SortColumn>()?,
            None => SortColumn::default(),
        };
        let sort_direction = match non_empty(self.tdir.as_deref()) {
            Some(s) => s.parse::<SortDirection>()?,
            None => SortDirection::default(),
        };
        let groups = match non_empty(self.groups.as_deref()) {
            Some(s) => parse_group_list(s)?,
            None => Vec::new(),
        };
        let download = non_empty(self.download.as_deref())
            .map(str::parse::<ExportFormat>)
            .transpose()?;

        let request = SummaryRequest {
            course_id: self.courseid,
            forum_id: self.forumid,
            groups,
            date_from: self.datefrom,
            date_to: self.dateto,
            page: self.page,
            per_page: self.perpage,
            sort_column,
            sort_direction,
        };

        Ok((request, download))
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|s| !s.is_empty())
}

/// Parse `"1,2, 3"` into group ids.
fn parse_group_list(value: &str) -> Result<Vec<i64>, ReportError> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<i64>()
                .map_err(|_| ReportError::InvalidGroupList(value.to_string()))
        })
        .collect()
}

// -------------------------------------------------------------------------
// Handlers
// -------------------------------------------------------------------------

/// Render one page of the report as JSON, or the whole report as a download.
async fn summary_report(
    State(state): State<AppState>,
    Query(params): Query<SummaryParams>,
) -> AppResult<Response> {
    let (request, download) = params.into_request()?;

    if let Some(format) = download {
        let rows = state.summary().export_rows(&request).await?;
        let body = Dataset::from_report_rows(&rows).render(format)?;
        return Ok(super::download(body, SUMMARY_EXPORT_NAME, format));
    }

    let view = state.summary().report(&request).await?;
    Ok(Json(view).into_response())
}

/// Convert date selector values to filter timestamps.
async fn convert_dates(Json(range): Json<DateRange>) -> Json<Timestamps> {
    Json(dates::convert(&range))
}
