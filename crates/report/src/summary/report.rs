//! The filtered summary report: a [`ReportQuery`] executed through a
//! [`QueryExecutor`].
//!
//! SeaQuery statements are not `Send`, so each one is rendered to a
//! [`BoundStatement`] in a plain function before anything is awaited.

use anyhow::Result;

use super::executor::{BoundStatement, QueryExecutor};
use super::query::ReportQuery;
use super::query_builder::SummaryQueryBuilder;
use super::types::{PageRequest, ReportRow, SortColumn, SortDirection, SummaryPage};

/// A report query bound to an executor.
pub struct SummaryReport<'a> {
    query: ReportQuery,
    executor: &'a QueryExecutor,
}

impl<'a> SummaryReport<'a> {
    pub fn new(query: ReportQuery, executor: &'a QueryExecutor) -> Self {
        Self { query, executor }
    }

    pub fn query(&self) -> &ReportQuery {
        &self.query
    }

    /// Number of distinct enrolled users matching the filters.
    pub async fn count_rows(&self) -> Result<u64> {
        let statement = self.count_statement()?;
        self.executor.count(statement).await
    }

    /// One page of rows, sorted as requested.
    pub async fn fetch_page(&self, page: &PageRequest) -> Result<Vec<ReportRow>> {
        let statement = self.page_statement(page)?;
        tracing::debug!(
            course_id = self.query.course_id(),
            params = ?self.query.params(),
            page_size = page.page_size,
            page_start = page.page_start,
            "fetching summary page"
        );
        self.executor.fetch(statement).await
    }

    /// Every row, sorted as requested.
    pub async fn fetch_all(
        &self,
        sort_column: SortColumn,
        sort_direction: SortDirection,
    ) -> Result<Vec<ReportRow>> {
        let statement = BoundStatement::new(
            &SummaryQueryBuilder::new(&self.query).build_unbounded(sort_column, sort_direction),
        )?;
        self.executor.fetch(statement).await
    }

    /// Count and fetch one page in a single transaction.
    pub async fn page(&self, page: &PageRequest) -> Result<SummaryPage> {
        let count = self.count_statement()?;
        let rows = self.page_statement(page)?;
        let (total, rows) = self.executor.count_and_fetch(count, rows).await?;

        tracing::debug!(
            course_id = self.query.course_id(),
            total,
            returned = rows.len(),
            "summary page loaded"
        );

        Ok(SummaryPage::new(rows, total, page))
    }

    fn count_statement(&self) -> Result<BoundStatement> {
        BoundStatement::new(&SummaryQueryBuilder::new(&self.query).build_count())
    }

    fn page_statement(&self, page: &PageRequest) -> Result<BoundStatement> {
        BoundStatement::new(&SummaryQueryBuilder::new(&self.query).build(page))
    }
}
