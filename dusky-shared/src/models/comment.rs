/// Comments on posts
///
/// Comments are append-only and returned oldest-first alongside their post,
/// each carrying its author's username.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::db::Database;
use crate::error::DomainResult;

/// Comment with its author's username
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Comment {
    pub id: i64,
    pub post_id: i64,
    pub user_id: i64,
    pub username: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

impl Comment {
    /// Adds a comment to a post
    ///
    /// # Errors
    ///
    /// `NotFound` if the post or author does not exist (foreign key violation).
    pub async fn create(
        db: &Database,
        post_id: i64,
        user_id: i64,
        content: String,
    ) -> DomainResult<Self> {
        db.run(
            sqlx::query_as::<_, Comment>(
                r#"
                WITH inserted AS (
                    INSERT INTO comments (post_id, user_id, content)
                    VALUES ($1, $2, $3)
                    RETURNING id, post_id, user_id, content, created_at
                )
                SELECT i.id, i.post_id, i.user_id, u.username, i.content, i.created_at
                FROM inserted i
                JOIN users u ON u.id = i.user_id
                "#,
            )
            .bind(post_id)
            .bind(user_id)
            .bind(content)
            .fetch_one(db.pool()),
        )
        .await
    }

    /// Lists a post's comments, oldest first
    pub async fn list_for_post(db: &Database, post_id: i64) -> DomainResult<Vec<Self>> {
        db.run(
            sqlx::query_as::<_, Comment>(
                r#"
                SELECT c.id, c.post_id, c.user_id, u.username, c.content, c.created_at
                FROM comments c
                JOIN users u ON u.id = c.user_id
                WHERE c.post_id = $1
                ORDER BY c.created_at ASC, c.id ASC
                "#,
            )
            .bind(post_id)
            .fetch_all(db.pool()),
        )
        .await
    }
}
