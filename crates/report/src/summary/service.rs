//! Summary report service.
//!
//! Turns a caller's request into a [`ReportQuery`]:
//! - scope resolution (forum or whole course)
//! - group selection against the course's groups
//! - date bounds and page window
//!
//! and runs it through the shared [`QueryExecutor`].

use std::sync::Arc;

use serde::Serialize;
use sqlx::PgPool;

use super::error::ReportError;
use super::executor::QueryExecutor;
use super::filter_options::{GroupFilterOptions, GroupOption};
use super::query::ReportQuery;
use super::report::SummaryReport;
use super::scope::ReportScope;
use super::types::{FilterKind, PageRequest, ReportRow, SortColumn, SortDirection, SummaryPage};
use crate::export::Dataset;
use crate::models::{CourseGroup, Discussion, Forum, Post};

/// Upper bound on rows per page (default).
pub const MAX_PAGE_SIZE: u32 = 500;

/// Base name of summary report downloads.
pub const SUMMARY_EXPORT_NAME: &str = "forum_summary_report";

/// Base name of discussion downloads.
pub const DISCUSSION_EXPORT_NAME: &str = "discussion";

/// What the caller asked to see.
#[derive(Debug, Clone, Default)]
pub struct SummaryRequest {
    pub course_id: i64,

    /// Positive to narrow the report to one forum.
    pub forum_id: i64,

    /// Requested group ids. Empty or containing 0 means all groups.
    pub groups: Vec<i64>,

    /// Count posts created at or after this timestamp, when positive.
    pub date_from: Option<i64>,

    /// Count posts created at or before this timestamp, when positive.
    pub date_to: Option<i64>,

    /// 1-indexed page number.
    pub page: u32,

    /// Rows per page. Falls back to the configured default.
    pub per_page: Option<u32>,

    pub sort_column: SortColumn,

    pub sort_direction: SortDirection,
}

/// Filter state echoed back with the report.
#[derive(Debug, Clone, Serialize)]
pub struct FilterState {
    pub groups: Vec<GroupOption>,

    /// Effective group selection.
    pub selected_groups: Vec<i64>,

    pub datefrom: Option<i64>,

    pub dateto: Option<i64>,
}

/// A rendered summary report page.
#[derive(Debug, Clone, Serialize)]
pub struct SummaryView {
    pub title: String,
    pub course_id: i64,
    pub forum_id: Option<i64>,
    pub filters: FilterState,

    #[serde(flatten)]
    pub page: SummaryPage,
}

/// A request resolved against the database and ready to execute.
#[derive(Debug, Clone)]
pub struct PreparedReport {
    pub scope: ReportScope,
    pub groups: GroupFilterOptions,
    pub query: ReportQuery,
}

/// Service for building and running summary reports.
pub struct SummaryService {
    executor: QueryExecutor,
    default_per_page: u32,
    max_per_page: u32,
}

impl SummaryService {
    pub fn new(executor: QueryExecutor, default_per_page: u32, max_per_page: u32) -> Arc<Self> {
        Arc::new(Self {
            executor,
            default_per_page: default_per_page.max(1),
            max_per_page: max_per_page.max(1),
        })
    }

    pub fn pool(&self) -> &PgPool {
        self.executor.pool()
    }

    pub fn executor(&self) -> &QueryExecutor {
        &self.executor
    }

    /// Resolve scope and filters and assemble the report query.
    pub async fn prepare(&self, request: &SummaryRequest) -> Result<PreparedReport, ReportError> {
        let scope = ReportScope::resolve(self.pool(), request.course_id, request.forum_id).await?;
        let course_groups = CourseGroup::list_for_course(self.pool(), scope.course_id).await?;
        let groups = GroupFilterOptions::prepare(&course_groups, &request.groups);

        let mut query = ReportQuery::new(scope.course_id);
        if let Some(forum_id) = scope.forum_id() {
            query.add_filter(FilterKind::Forum, &[forum_id])?;
        }
        query.add_filter(FilterKind::Groups, groups.selected())?;
        if let Some(from) = request.date_from.filter(|ts| *ts > 0) {
            query.add_filter(FilterKind::DateFrom, &[from])?;
        }
        if let Some(to) = request.date_to.filter(|ts| *ts > 0) {
            query.add_filter(FilterKind::DateTo, &[to])?;
        }

        tracing::debug!(
            course_id = scope.course_id,
            forum_id = ?scope.forum_id(),
            params = ?query.params(),
            "prepared summary report"
        );

        Ok(PreparedReport {
            scope,
            groups,
            query,
        })
    }

    /// One page of the report.
    pub async fn report(&self, request: &SummaryRequest) -> Result<SummaryView, ReportError> {
        let prepared = self.prepare(request).await?;
        let page_request = self.page_request(request);

        let report = SummaryReport::new(prepared.query.clone(), &self.executor);
        let page = report.page(&page_request).await?;

        tracing::info!(
            course_id = prepared.scope.course_id,
            forum_id = ?prepared.scope.forum_id(),
            total = page.total,
            page = page.page,
            "summary report generated"
        );

        Ok(SummaryView {
            title: prepared.scope.title,
            course_id: prepared.scope.course_id,
            forum_id: prepared.scope.forum.map(|f| f.id),
            filters: FilterState {
                groups: prepared.groups.options().to_vec(),
                selected_groups: prepared.groups.selected().to_vec(),
                datefrom: request.date_from.filter(|ts| *ts > 0),
                dateto: request.date_to.filter(|ts| *ts > 0),
            },
            page,
        })
    }

    /// Every row of the report, for download.
    pub async fn export_rows(&self, request: &SummaryRequest) -> Result<Vec<ReportRow>, ReportError> {
        let prepared = self.prepare(request).await?;
        let report = SummaryReport::new(prepared.query, &self.executor);
        let rows = report
            .fetch_all(request.sort_column, request.sort_direction)
            .await?;

        tracing::info!(
            course_id = prepared.scope.course_id,
            rows = rows.len(),
            "summary report exported"
        );

        Ok(rows)
    }

    /// Posts of a forum's most recently modified discussion.
    pub async fn export_discussion(&self, forum_id: i64) -> Result<Dataset, ReportError> {
        let forum = Forum::find_by_id(self.pool(), forum_id)
            .await?
            .ok_or(ReportError::ForumNotFound(forum_id))?;
        let discussion = Discussion::latest_for_forum(self.pool(), forum.id)
            .await?
            .ok_or(ReportError::DiscussionNotFound(forum.id))?;
        let posts = Post::list_for_discussion(self.pool(), discussion.id).await?;

        tracing::info!(
            forum_id = forum.id,
            discussion_id = discussion.id,
            posts = posts.len(),
            "discussion exported"
        );

        Ok(Dataset::from_posts(&posts))
    }

    /// Page window for a request.
    pub fn page_request(&self, request: &SummaryRequest) -> PageRequest {
        page_window(request, self.default_per_page, self.max_per_page)
    }
}

/// Page window for a request, with the page size defaulted and capped.
fn page_window(request: &SummaryRequest, default_per_page: u32, max_per_page: u32) -> PageRequest {
    let requested = request
        .per_page
        .filter(|n| *n > 0)
        .unwrap_or(default_per_page);
    let per_page = if requested > max_per_page {
        tracing::warn!(
            requested,
            capped = max_per_page,
            "per_page exceeds maximum, capping"
        );
        max_per_page
    } else {
        requested
    };

    PageRequest::for_page(request.page.max(1), per_page)
        .sorted_by(request.sort_column, request.sort_direction)
}
