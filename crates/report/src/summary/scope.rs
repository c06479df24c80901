//! Resolve which course and forum a report covers.

use sqlx::PgPool;

use super::error::ReportError;
use crate::models::{Course, Forum};

/// The course and optional forum a summary report is generated for.
#[derive(Debug, Clone)]
pub struct ReportScope {
    pub course_id: i64,

    /// Set when the report is narrowed to one forum.
    pub forum: Option<Forum>,

    /// Heading shown above the report.
    pub title: String,
}

impl ReportScope {
    /// Resolve the scope from request ids.
    ///
    /// A positive forum id wins and fixes the course. Otherwise a positive
    /// course id reports on every forum in that course.
    pub async fn resolve(pool: &PgPool, course_id: i64, forum_id: i64) -> Result<Self, ReportError> {
        if forum_id > 0 {
            let forum = Forum::find_by_id(pool, forum_id)
                .await?
                .ok_or(ReportError::ForumNotFound(forum_id))?;
            return Ok(Self::for_forum(forum));
        }

        if course_id > 0 {
            let course = Course::find_by_id(pool, course_id)
                .await?
                .ok_or(ReportError::CourseNotFound(course_id))?;
            return Ok(Self::for_course(course.id));
        }

        Err(ReportError::MissingScope)
    }

    pub fn for_forum(forum: Forum) -> Self {
        Self {
            course_id: forum.course_id,
            title: format!("Summary report - {}", forum.name),
            forum: Some(forum),
        }
    }

    pub fn for_course(course_id: i64) -> Self {
        Self {
            course_id,
            forum: None,
            title: "Summary report - All forums".to_string(),
        }
    }

    pub fn forum_id(&self) -> Option<i64> {
        self.forum.as_ref().map(|f| f.id)
    }
}
