//! Summary report types.
//!
//! Provides the value types shared by the query builder and the executor:
//! - FilterKind: the orthogonal predicates a report can be narrowed by
//! - PageRequest: page window plus sort order
//! - ReportRow / SummaryPage: query results with paging calculations

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::error::ReportError;

/// Default number of rows per page.
pub const DEFAULT_PAGE_SIZE: u32 = 25;

/// Filter kinds a report can be narrowed by.
///
/// Ordering is used for deterministic SQL assembly.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "lowercase")]
pub enum FilterKind {
    /// Restrict counted posts to one forum.
    Forum,
    /// Count posts created at or after a timestamp; users without one are
    /// not listed.
    DateFrom,
    /// Count posts created at or before a timestamp; users without one are
    /// not listed.
    DateTo,
    /// Restrict users to members of any of the given groups.
    Groups,
}

impl FilterKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FilterKind::Forum => "forum",
            FilterKind::DateFrom => "datefrom",
            FilterKind::DateTo => "dateto",
            FilterKind::Groups => "groups",
        }
    }
}

impl fmt::Display for FilterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FilterKind {
    type Err = ReportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "forum" => Ok(FilterKind::Forum),
            "datefrom" => Ok(FilterKind::DateFrom),
            "dateto" => Ok(FilterKind::DateTo),
            "groups" => Ok(FilterKind::Groups),
            other => Err(ReportError::UnknownFilterKind(other.to_string())),
        }
    }
}

/// Columns a report can be sorted by.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SortColumn {
    /// First name, then last name.
    #[default]
    Fullname,
    Firstname,
    Lastname,
    Username,
    PostCount,
    ReplyCount,
}

impl FromStr for SortColumn {
    type Err = ReportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "fullname" => Ok(SortColumn::Fullname),
            "firstname" => Ok(SortColumn::Firstname),
            "lastname" => Ok(SortColumn::Lastname),
            "username" => Ok(SortColumn::Username),
            "postcount" => Ok(SortColumn::PostCount),
            "replycount" => Ok(SortColumn::ReplyCount),
            other => Err(ReportError::InvalidSortColumn(other.to_string())),
        }
    }
}

/// Sort direction.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl FromStr for SortDirection {
    type Err = ReportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "asc" => Ok(SortDirection::Asc),
            "desc" => Ok(SortDirection::Desc),
            _ => Err(ReportError::InvalidSortDirection(s.to_string())),
        }
    }
}

/// A window into the report plus its sort order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRequest {
    /// Maximum rows returned.
    pub page_size: u32,

    /// Zero-based row offset.
    pub page_start: u64,

    pub sort_column: SortColumn,

    pub sort_direction: SortDirection,
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::new(DEFAULT_PAGE_SIZE, 0)
    }
}

impl PageRequest {
    /// Create a request for `page_size` rows starting at `page_start`,
    /// sorted by display name ascending.
    pub fn new(page_size: u32, page_start: u64) -> Self {
        Self {
            page_size,
            page_start,
            sort_column: SortColumn::default(),
            sort_direction: SortDirection::default(),
        }
    }

    /// Create a request for a 1-indexed page number.
    pub fn for_page(page: u32, per_page: u32) -> Self {
        let page_start = u64::from(page.saturating_sub(1)) * u64::from(per_page);
        Self::new(per_page, page_start)
    }

    /// Set the sort order.
    pub fn sorted_by(mut self, column: SortColumn, direction: SortDirection) -> Self {
        self.sort_column = column;
        self.sort_direction = direction;
        self
    }

    /// The 1-indexed page number this window starts on.
    pub fn page_number(&self) -> u32 {
        if self.page_size == 0 {
            return 1;
        }
        u32::try_from(self.page_start / u64::from(self.page_size))
            .unwrap_or(u32::MAX)
            .saturating_add(1)
    }
}

/// One user's aggregated post and reply counts.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, sqlx::FromRow)]
pub struct ReportRow {
    /// Enrolled user's id.
    pub user_id: i64,

    pub username: String,

    pub firstname: String,

    pub lastname: String,

    /// The forum the counts are scoped to, or `None` for all forums.
    pub forum_id: Option<i64>,

    /// Discussions started (posts without a parent).
    pub post_count: i64,

    /// Replies written (posts with a parent).
    pub reply_count: i64,
}

impl ReportRow {
    /// Display name: first name followed by last name.
    pub fn fullname(&self) -> String {
        format!("{} {}", self.firstname, self.lastname)
            .trim()
            .to_string()
    }
}

/// One page of report rows with paging metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummaryPage {
    pub rows: Vec<ReportRow>,

    /// Total count (before paging).
    pub total: u64,

    /// Current page number (1-indexed).
    pub page: u32,

    pub per_page: u32,

    pub total_pages: u32,

    pub has_next: bool,

    pub has_prev: bool,
}

impl SummaryPage {
    /// Create a page with paging calculations.
    pub fn new(rows: Vec<ReportRow>, total: u64, request: &PageRequest) -> Self {
        let per_page = request.page_size;
        let page = request.page_number();
        let total_pages = if per_page > 0 {
            u32::try_from(total.div_ceil(u64::from(per_page))).unwrap_or(u32::MAX)
        } else {
            1
        };

        Self {
            rows,
            total,
            page,
            per_page,
            total_pages,
            has_next: page < total_pages,
            has_prev: page > 1,
        }
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filter_kind_parses_known_names() {
        assert_eq!("forum".parse::<FilterKind>().unwrap(), FilterKind::Forum);
        assert_eq!(
            "datefrom".parse::<FilterKind>().unwrap(),
            FilterKind::DateFrom
        );
        assert_eq!("dateto".parse::<FilterKind>().unwrap(), FilterKind::DateTo);
        assert_eq!("groups".parse::<FilterKind>().unwrap(), FilterKind::Groups);
    }

    #[test]
    fn filter_kind_rejects_unknown_name() {
        let err = "author".parse::<FilterKind>().unwrap_err();
        assert!(matches!(err, ReportError::UnknownFilterKind(ref k) if k == "author"));
        assert!(err.is_contract_violation());
    }

    #[test]
    fn sort_direction_is_case_insensitive() {
        assert_eq!(
            "DESC".parse::<SortDirection>().unwrap(),
            SortDirection::Desc
        );
        assert!("sideways".parse::<SortDirection>().is_err());
    }

    #[test]
    fn page_request_defaults_to_display_name() {
        let request = PageRequest::default();
        assert_eq!(request.page_size, 25);
        assert_eq!(request.page_start, 0);
        assert_eq!(request.sort_column, SortColumn::Fullname);
        assert_eq!(request.sort_direction, SortDirection::Asc);
    }

    #[test]
    fn page_request_for_page_offsets() {
        assert_eq!(PageRequest::for_page(1, 25).page_start, 0);
        assert_eq!(PageRequest::for_page(2, 25).page_start, 25);
        assert_eq!(PageRequest::for_page(0, 25).page_start, 0);
        assert_eq!(PageRequest::for_page(3, 10).page_number(), 3);
    }

    #[test]
    fn summary_page_paging() {
        let request = PageRequest::new(25, 25);
        let page = SummaryPage::new(vec![], 30, &request);

        assert_eq!(page.page, 2);
        assert_eq!(page.total_pages, 2);
        assert!(!page.has_next);
        assert!(page.has_prev);
    }

    #[test]
    fn summary_page_first_of_many() {
        let page = SummaryPage::new(vec![], 30, &PageRequest::default());

        assert_eq!(page.page, 1);
        assert!(page.has_next);
        assert!(!page.has_prev);
    }

    #[test]
    fn fullname_joins_name_fields() {
        let row = ReportRow {
            user_id: 1,
            username: "ada".to_string(),
            firstname: "Ada".to_string(),
            lastname: "Lovelace".to_string(),
            forum_id: None,
            post_count: 0,
            reply_count: 0,
        };
        assert_eq!(row.fullname(), "Ada Lovelace");
    }
}
