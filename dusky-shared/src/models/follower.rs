/// Follow relationships
///
/// A row `(user_id, follower_id)` means `follower_id` follows `user_id`.
/// Self-follows are rejected by a CHECK constraint; duplicate follows by the
/// primary key.

use crate::db::Database;
use crate::error::{DomainError, DomainResult};

/// Marker type grouping follow operations
pub struct Follower;

impl Follower {
    /// Records that `follower_id` follows `user_id`
    ///
    /// # Errors
    ///
    /// - `Conflict`: already following
    /// - `Validation`: `follower_id == user_id`
    /// - `NotFound`: either user does not exist
    pub async fn follow(db: &Database, user_id: i64, follower_id: i64) -> DomainResult<()> {
        if user_id == follower_id {
            return Err(DomainError::Validation("Cannot follow yourself".to_string()));
        }

        db.run(
            sqlx::query("INSERT INTO user_followers (user_id, follower_id) VALUES ($1, $2)")
                .bind(user_id)
                .bind(follower_id)
                .execute(db.pool()),
        )
        .await?;

        Ok(())
    }

    /// Removes a follow relationship
    ///
    /// Unfollowing someone you do not follow is a no-op.
    pub async fn unfollow(db: &Database, user_id: i64, follower_id: i64) -> DomainResult<()> {
        db.run(
            sqlx::query("DELETE FROM user_followers WHERE user_id = $1 AND follower_id = $2")
                .bind(user_id)
                .bind(follower_id)
                .execute(db.pool()),
        )
        .await?;

        Ok(())
    }

    /// Whether `follower_id` follows `user_id`
    pub async fn is_following(db: &Database, user_id: i64, follower_id: i64) -> DomainResult<bool> {
        db.run(
            sqlx::query_scalar(
                "SELECT EXISTS (SELECT 1 FROM user_followers WHERE user_id = $1 AND follower_id = $2)",
            )
            .bind(user_id)
            .bind(follower_id)
            .fetch_one(db.pool()),
        )
        .await
    }
}
