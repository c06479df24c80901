//! Forum summary report module.
//!
//! This module provides:
//! - ReportQuery / Filter: the report's base scope plus keyed filters
//! - SummaryQueryBuilder: SeaQuery-based SQL generation
//! - QueryExecutor: count and page execution with a statement timeout
//! - SummaryService: request handling, scope and filter resolution
//! - Date conversion and group filter options for the filter widgets

pub mod dates;
mod error;
mod executor;
mod filter;
mod filter_options;
mod query;
mod query_builder;
mod report;
mod scope;
mod service;
pub mod types;

pub use error::ReportError;
pub use executor::{BoundStatement, DEFAULT_STATEMENT_TIMEOUT, QueryExecutor};
pub use filter::{ALL_GROUPS, Filter, FilterContribution};
pub use filter_options::{ALL_GROUPS_LABEL, GroupFilterOptions, GroupOption};
pub use query::ReportQuery;
pub use query_builder::{SummaryQueryBuilder, to_sql};
pub use report::SummaryReport;
pub use scope::ReportScope;
pub use service::{
    DISCUSSION_EXPORT_NAME, FilterState, MAX_PAGE_SIZE, PreparedReport, SUMMARY_EXPORT_NAME,
    SummaryRequest, SummaryService, SummaryView,
};
pub use types::{
    DEFAULT_PAGE_SIZE, FilterKind, PageRequest, ReportRow, SortColumn, SortDirection, SummaryPage,
};
