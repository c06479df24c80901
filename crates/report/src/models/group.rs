//! Course group model.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

/// A group of users within a course.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, sqlx::FromRow)]
pub struct CourseGroup {
    pub id: i64,

    pub course_id: i64,

    pub name: String,
}

impl CourseGroup {
    /// List a course's groups ordered by name.
    pub async fn list_for_course(pool: &PgPool, course_id: i64) -> Result<Vec<Self>> {
        let groups = sqlx::query_as::<_, CourseGroup>(
            "SELECT id, course_id, name FROM course_group WHERE course_id = $1 ORDER BY name, id",
        )
        .bind(course_id)
        .fetch_all(pool)
        .await
        .context("failed to list course groups")?;

        Ok(groups)
    }
}
