//! Course model.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

/// Course record.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Course {
    pub id: i64,

    /// Full display name.
    pub fullname: String,

    pub shortname: String,
}

impl Course {
    /// Find a course by ID.
    pub async fn find_by_id(pool: &PgPool, id: i64) -> Result<Option<Self>> {
        let course = sqlx::query_as::<_, Course>(
            "SELECT id, fullname, shortname FROM course WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("failed to fetch course by id")?;

        Ok(course)
    }
}
