/// Post model with optimistic concurrency
///
/// Every post carries a `version` that starts at 1 and grows by exactly one per
/// successful update. [`Post::update`] is a single conditional `UPDATE`
/// guarded by the caller's expected version; a stale version never
/// overwrites newer content.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE posts (
///     id BIGSERIAL PRIMARY KEY,
///     title VARCHAR(100) NOT NULL,
///     content TEXT NOT NULL,
///     user_id BIGINT NOT NULL REFERENCES users (id) ON DELETE CASCADE,
///     tags TEXT[] NOT NULL DEFAULT '{}',
///     version INTEGER NOT NULL DEFAULT 1,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```
///
/// # Example
///
/// ```no_run
/// use dusky_shared::db::Database;
/// use dusky_shared::models::post::{CreatePost, Post, UpdatePost};
///
/// # async fn example(db: Database) -> Result<(), Box<dyn std::error::Error>> {
/// let post = Post::create(&db, CreatePost {
///     title: "hello".to_string(),
///     content: "first post".to_string(),
///     author_id: 1,
///     tags: vec!["intro".to_string()],
/// }).await?;
///
/// let (version, _updated_at) = Post::update(&db, post.id, post.version, UpdatePost {
///     title: Some("hello again".to_string()),
///     ..Default::default()
/// }).await?;
/// assert_eq!(version, post.version + 1);
/// # Ok(())
/// # }
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::db::Database;
use crate::error::{DomainError, DomainResult};

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Post {
    pub id: i64,
    pub title: String,
    pub content: String,

    #[sqlx(rename = "user_id")]
    pub author_id: i64,

    pub tags: Vec<String>,

    /// Optimistic-lock version
    pub version: i32,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a post
#[derive(Debug, Clone)]
pub struct CreatePost {
    pub title: String,
    pub content: String,
    pub author_id: i64,
    pub tags: Vec<String>,
}

/// Partial update; `None` keeps the stored value
#[derive(Debug, Clone, Default)]
pub struct UpdatePost {
    pub title: Option<String>,
    pub content: Option<String>,
    pub tags: Option<Vec<String>>,
}

impl Post {
    /// Inserts a post at version 1
    ///
    /// # Errors
    ///
    /// `NotFound` if the author does not exist, `Internal` on storage failure.
    pub async fn create(db: &Database, data: CreatePost) -> DomainResult<Self> {
        db.run(
            sqlx::query_as::<_, Post>(
                r#"
                INSERT INTO posts (title, content, user_id, tags)
                VALUES ($1, $2, $3, $4)
                RETURNING id, title, content, user_id, tags, version, created_at, updated_at
                "#,
            )
            .bind(data.title)
            .bind(data.content)
            .bind(data.author_id)
            .bind(data.tags)
            .fetch_one(db.pool()),
        )
        .await
    }

    /// Finds a post by ID
    pub async fn find_by_id(db: &Database, id: i64) -> DomainResult<Option<Self>> {
        db.run(
            sqlx::query_as::<_, Post>(
                r#"
                SELECT id, title, content, user_id, tags, version, created_at, updated_at
                FROM posts
                WHERE id = $1
                "#,
            )
            .bind(id)
            .fetch_optional(db.pool()),
        )
        .await
    }

    /// Applies `changes` if the stored version still equals `expected_version`
    ///
    /// Returns the new `(version, updated_at)`.
    ///
    /// # Errors
    ///
    /// - `NotFound`: no post with this ID
    /// - `VersionConflict`: the post exists but its version moved on
    ///
    /// The two are told apart by a follow-up existence check that only runs
    /// after the conditional write matched no row. A post deleted between the
    /// two statements reports `NotFound`, which is still accurate.
    pub async fn update(
        db: &Database,
        id: i64,
        expected_version: i32,
        changes: UpdatePost,
    ) -> DomainResult<(i32, DateTime<Utc>)> {
        let updated: Option<(i32, DateTime<Utc>)> = db
            .run(
                sqlx::query_as(
                    r#"
                    UPDATE posts
                    SET title = COALESCE($3, title),
                        content = COALESCE($4, content),
                        tags = COALESCE($5, tags),
                        version = version + 1,
                        updated_at = NOW()
                    WHERE id = $1 AND version = $2
                    RETURNING version, updated_at
                    "#,
                )
                .bind(id)
                .bind(expected_version)
                .bind(changes.title)
                .bind(changes.content)
                .bind(changes.tags)
                .fetch_optional(db.pool()),
            )
            .await?;

        if let Some(row) = updated {
            return Ok(row);
        }

        let exists: bool = db
            .run(
                sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM posts WHERE id = $1)")
                    .bind(id)
                    .fetch_one(db.pool()),
            )
            .await?;

        if exists {
            tracing::debug!(post_id = id, expected_version, "Stale post version");
            Err(DomainError::VersionConflict {
                expected: expected_version,
            })
        } else {
            Err(DomainError::not_found("Post not found"))
        }
    }

    /// Deletes a post unconditionally
    ///
    /// # Errors
    ///
    /// `NotFound` if no row was deleted.
    pub async fn delete(db: &Database, id: i64) -> DomainResult<()> {
        let result = db
            .run(
                sqlx::query("DELETE FROM posts WHERE id = $1")
                    .bind(id)
                    .execute(db.pool()),
            )
            .await?;

        if result.rows_affected() == 0 {
            return Err(DomainError::not_found("Post not found"));
        }

        Ok(())
    }
}
