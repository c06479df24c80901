//! Forum report test utilities.
//!
//! Helpers for integration testing: database seeding for courses, users,
//! groups and forum activity, plus assertion utilities for JSON responses.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use sqlx::PgPool;

static COUNTER: AtomicU64 = AtomicU64::new(0);

/// A name that will not collide with other tests sharing the database.
pub fn unique_name(prefix: &str) -> String {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or_default();
    let n = COUNTER.fetch_add(1, Ordering::Relaxed);
    format!("{prefix}_{}_{nanos}_{n}", std::process::id())
}

/// A user to enrol, before it is written.
#[derive(Debug, Clone)]
pub struct TestUser {
    pub username: String,
    pub firstname: String,
    pub lastname: String,
}

/// Create a test user with a unique username.
pub fn test_user(firstname: &str, lastname: &str) -> TestUser {
    TestUser {
        username: unique_name(&firstname.to_lowercase()),
        firstname: firstname.to_string(),
        lastname: lastname.to_string(),
    }
}

impl TestUser {
    /// Set a custom username.
    pub fn with_username(mut self, username: &str) -> Self {
        self.username = username.to_string();
        self
    }
}

/// A seeded course. Every row created through it is removed by
/// [`cleanup`](Self::cleanup).
#[derive(Debug, Clone)]
pub struct TestCourse {
    pub id: i64,
    pool: PgPool,
    users: Vec<i64>,
}

impl TestCourse {
    /// Insert a course with a unique name.
    pub async fn create(pool: &PgPool) -> sqlx::Result<Self> {
        let name = unique_name("course");
        let id: i64 = sqlx::query_scalar(
            "INSERT INTO course (fullname, shortname) VALUES ($1, $1) RETURNING id",
        )
        .bind(&name)
        .fetch_one(pool)
        .await?;

        Ok(Self {
            id,
            pool: pool.clone(),
            users: Vec::new(),
        })
    }

    /// Insert a user and enrol it in the course.
    pub async fn enrol(&mut self, user: TestUser) -> sqlx::Result<i64> {
        let user_id = self.create_user(user).await?;
        sqlx::query("INSERT INTO enrolment (course_id, user_id) VALUES ($1, $2)")
            .bind(self.id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(user_id)
    }

    /// Insert a user that is not enrolled in the course.
    pub async fn create_user(&mut self, user: TestUser) -> sqlx::Result<i64> {
        let user_id: i64 = sqlx::query_scalar(
            "INSERT INTO users (username, firstname, lastname) VALUES ($1, $2, $3) RETURNING id",
        )
        .bind(&user.username)
        .bind(&user.firstname)
        .bind(&user.lastname)
        .fetch_one(&self.pool)
        .await?;
        self.users.push(user_id);
        Ok(user_id)
    }

    /// Insert a group with the given members.
    pub async fn group(&self, name: &str, members: &[i64]) -> sqlx::Result<i64> {
        let group_id: i64 = sqlx::query_scalar(
            "INSERT INTO course_group (course_id, name) VALUES ($1, $2) RETURNING id",
        )
        .bind(self.id)
        .bind(name)
        .fetch_one(&self.pool)
        .await?;

        for user_id in members {
            sqlx::query("INSERT INTO group_member (group_id, user_id) VALUES ($1, $2)")
                .bind(group_id)
                .bind(user_id)
                .execute(&self.pool)
                .await?;
        }
        Ok(group_id)
    }

    /// Insert a forum in the course.
    pub async fn forum(&self, name: &str) -> sqlx::Result<i64> {
        sqlx::query_scalar("INSERT INTO forum (course_id, name) VALUES ($1, $2) RETURNING id")
            .bind(self.id)
            .bind(name)
            .fetch_one(&self.pool)
            .await
    }

    /// Start a discussion: the discussion row plus its first post.
    ///
    /// Returns `(discussion_id, post_id)`.
    pub async fn discussion(
        &self,
        forum_id: i64,
        user_id: i64,
        subject: &str,
        created: i64,
    ) -> sqlx::Result<(i64, i64)> {
        let discussion_id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO forum_discussion (forum_id, user_id, name, timemodified)
            VALUES ($1, $2, $3, $4)
            RETURNING id
            "#,
        )
        .bind(forum_id)
        .bind(user_id)
        .bind(subject)
        .bind(created)
        .fetch_one(&self.pool)
        .await?;

        let post_id = self
            .post(discussion_id, None, user_id, subject, created)
            .await?;
        Ok((discussion_id, post_id))
    }

    /// Reply to a post.
    pub async fn reply(
        &self,
        discussion_id: i64,
        parent_id: i64,
        user_id: i64,
        created: i64,
    ) -> sqlx::Result<i64> {
        let post_id = self
            .post(discussion_id, Some(parent_id), user_id, "Re:", created)
            .await?;

        sqlx::query(
            "UPDATE forum_discussion SET timemodified = GREATEST(timemodified, $2) WHERE id = $1",
        )
        .bind(discussion_id)
        .bind(created)
        .execute(&self.pool)
        .await?;

        Ok(post_id)
    }

    async fn post(
        &self,
        discussion_id: i64,
        parent_id: Option<i64>,
        user_id: i64,
        subject: &str,
        created: i64,
    ) -> sqlx::Result<i64> {
        sqlx::query_scalar(
            r#"
            INSERT INTO forum_post (discussion_id, parent_id, user_id, subject, message, created)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id
            "#,
        )
        .bind(discussion_id)
        .bind(parent_id)
        .bind(user_id)
        .bind(subject)
        .bind(format!("<p>{subject}</p>"))
        .bind(created)
        .fetch_one(&self.pool)
        .await
    }

    /// Remove the course (cascading to its forums, groups and enrolments)
    /// and every user created through it.
    pub async fn cleanup(&self) -> sqlx::Result<()> {
        sqlx::query(
            r#"
            DELETE FROM forum_post WHERE discussion_id IN (
                SELECT d.id FROM forum_discussion d
                JOIN forum f ON f.id = d.forum_id
                WHERE f.course_id = $1
            )
            "#,
        )
        .bind(self.id)
        .execute(&self.pool)
        .await?;

        sqlx::query("DELETE FROM course WHERE id = $1")
            .bind(self.id)
            .execute(&self.pool)
            .await?;

        sqlx::query("DELETE FROM users WHERE id = ANY($1)")
            .bind(&self.users)
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}

/// Assertion helpers for JSON content.
pub mod assert {
    use serde_json::Value;

    /// Assert that a JSON value has a specific key.
    pub fn has_key(value: &Value, key: &str) {
        assert!(
            value.get(key).is_some(),
            "Expected JSON to have key '{}', got: {}",
            key,
            value
        );
    }

    /// Assert that a string contains a substring.
    pub fn contains(haystack: &str, needle: &str) {
        assert!(
            haystack.contains(needle),
            "Expected string to contain '{}'\nActual: {}",
            needle,
            haystack
        );
    }

    /// Assert that a string does not contain a substring.
    pub fn not_contains(haystack: &str, needle: &str) {
        assert!(
            !haystack.contains(needle),
            "Expected string to NOT contain '{}'\nActual: {}",
            needle,
            haystack
        );
    }
}
