//! Forum, discussion and post models.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

/// Forum record.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Forum {
    pub id: i64,

    /// Owning course.
    pub course_id: i64,

    pub name: String,
}

/// Discussion (thread) within a forum.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Discussion {
    pub id: i64,

    pub forum_id: i64,

    /// User who started the discussion.
    pub user_id: i64,

    pub name: String,

    /// Unix timestamp of the last change to the discussion.
    pub timemodified: i64,
}

/// A single forum post.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Post {
    pub id: i64,

    pub discussion_id: i64,

    /// Parent post (NULL for the post that started the discussion).
    pub parent_id: Option<i64>,

    pub user_id: i64,

    pub subject: String,

    pub message: String,

    /// Unix timestamp when created.
    pub created: i64,
}

impl Forum {
    /// Find a forum by ID.
    pub async fn find_by_id(pool: &PgPool, id: i64) -> Result<Option<Self>> {
        let forum =
            sqlx::query_as::<_, Forum>("SELECT id, course_id, name FROM forum WHERE id = $1")
                .bind(id)
                .fetch_optional(pool)
                .await
                .context("failed to fetch forum by id")?;

        Ok(forum)
    }
}

impl Discussion {
    /// The forum's most recently modified discussion.
    pub async fn latest_for_forum(pool: &PgPool, forum_id: i64) -> Result<Option<Self>> {
        let discussion = sqlx::query_as::<_, Discussion>(
            r#"
            SELECT id, forum_id, user_id, name, timemodified
            FROM forum_discussion
            WHERE forum_id = $1
            ORDER BY timemodified DESC, id DESC
            LIMIT 1
            "#,
        )
        .bind(forum_id)
        .fetch_optional(pool)
        .await
        .context("failed to fetch latest discussion")?;

        Ok(discussion)
    }
}

impl Post {
    /// List a discussion's posts in creation order.
    pub async fn list_for_discussion(pool: &PgPool, discussion_id: i64) -> Result<Vec<Self>> {
        let posts = sqlx::query_as::<_, Post>(
            r#"
            SELECT id, discussion_id, parent_id, user_id, subject, message, created
            FROM forum_post
            WHERE discussion_id = $1
            ORDER BY created, id
            "#,
        )
        .bind(discussion_id)
        .fetch_all(pool)
        .await
        .context("failed to list discussion posts")?;

        Ok(posts)
    }
}
