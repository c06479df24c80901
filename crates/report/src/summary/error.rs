//! Summary report error types.
//!
//! Contract violations (unknown filter kinds, wrong filter arity) indicate a
//! programming error in the caller. Not-found and invalid-input variants are
//! user-visible and abort the request.

use thiserror::Error;

use super::types::FilterKind;

/// Errors raised while building or running a summary report.
#[derive(Debug, Error)]
pub enum ReportError {
    /// A filter kind name did not match any known filter.
    #[error("unknown filter kind '{0}'")]
    UnknownFilterKind(String),

    /// A filter was given the wrong number of values.
    #[error("filter '{kind}' expects {expected} value(s), got {actual}")]
    InvalidFilterArity {
        kind: FilterKind,
        expected: &'static str,
        actual: usize,
    },

    /// A filter was stored under another kind's key.
    #[error("filter '{filter}' stored under key '{key}'")]
    MismatchedFilterKey { key: FilterKind, filter: FilterKind },

    /// The requested sort column is not sortable.
    #[error("unknown sort column '{0}'")]
    InvalidSortColumn(String),

    /// The requested sort direction is neither `asc` nor `desc`.
    #[error("unknown sort direction '{0}'")]
    InvalidSortDirection(String),

    /// The requested download format is not supported.
    #[error("unsupported export format '{0}'")]
    InvalidExportFormat(String),

    /// A group id list could not be parsed.
    #[error("invalid group list '{0}'")]
    InvalidGroupList(String),

    /// A date selector did not describe a real calendar day.
    #[error("invalid date {year:04}-{month:02}-{day:02}")]
    InvalidDate { year: i32, month: u32, day: u32 },

    #[error("unable to find forum with id {0}")]
    ForumNotFound(i64),

    #[error("unable to find course with id {0}")]
    CourseNotFound(i64),

    #[error("forum {0} has no discussions to export")]
    DiscussionNotFound(i64),

    /// Neither a forum nor a course was given.
    #[error("forum id or course id must be provided to generate a forum summary report")]
    MissingScope,

    /// Datastore or other infrastructure failure.
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl ReportError {
    /// Whether this error signals a programming error rather than bad input.
    pub fn is_contract_violation(&self) -> bool {
        matches!(
            self,
            ReportError::UnknownFilterKind(_)
                | ReportError::InvalidFilterArity { .. }
                | ReportError::MismatchedFilterKey { .. }
        )
    }

    /// Whether this error means a requested record does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            ReportError::ForumNotFound(_)
                | ReportError::CourseNotFound(_)
                | ReportError::DiscussionNotFound(_)
        )
    }
}
