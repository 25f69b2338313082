/// Invitation model and database operations
///
/// An invitation links the SHA-256 hash of a one-time activation token to a
/// not-yet-active user. At most one invitation exists per user (`user_id` is
/// the primary key); it is created with the user, replaced on re-invite and
/// deleted on activation.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE user_invitations (
///     user_id BIGINT PRIMARY KEY REFERENCES users (id) ON DELETE CASCADE,
///     token_hash TEXT NOT NULL UNIQUE,
///     expires_at TIMESTAMPTZ NOT NULL,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```

use chrono::{DateTime, Utc};
use sqlx::PgExecutor;

use crate::auth::token::TokenHash;

/// Pending invitation row
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Invitation {
    pub user_id: i64,
    pub token_hash: TokenHash,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl Invitation {
    /// Stores the invitation for a freshly inserted user
    ///
    /// # Errors
    ///
    /// Fails with a unique violation if the user already has an invitation.
    pub async fn create<'e, E>(
        executor: E,
        user_id: i64,
        token_hash: &TokenHash,
        expires_at: DateTime<Utc>,
    ) -> Result<Self, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_as::<_, Invitation>(
            r#"
            INSERT INTO user_invitations (user_id, token_hash, expires_at)
            VALUES ($1, $2, $3)
            RETURNING user_id, token_hash, expires_at, created_at
            "#,
        )
        .bind(user_id)
        .bind(token_hash)
        .bind(expires_at)
        .fetch_one(executor)
        .await
    }

    /// Replaces any existing invitation for `user_id`
    ///
    /// The previous token stops working as soon as this commits.
    pub async fn replace<'e, E>(
        executor: E,
        user_id: i64,
        token_hash: &TokenHash,
        expires_at: DateTime<Utc>,
    ) -> Result<Self, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_as::<_, Invitation>(
            r#"
            INSERT INTO user_invitations (user_id, token_hash, expires_at)
            VALUES ($1, $2, $3)
            ON CONFLICT (user_id) DO UPDATE
            SET token_hash = EXCLUDED.token_hash,
                expires_at = EXCLUDED.expires_at,
                created_at = NOW()
            RETURNING user_id, token_hash, expires_at, created_at
            "#,
        )
        .bind(user_id)
        .bind(token_hash)
        .bind(expires_at)
        .fetch_one(executor)
        .await
    }

    /// Finds the unexpired invitation matching `token_hash` without locking it
    pub async fn find_valid<'e, E>(
        executor: E,
        token_hash: &TokenHash,
    ) -> Result<Option<Self>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_as::<_, Invitation>(
            r#"
            SELECT user_id, token_hash, expires_at, created_at
            FROM user_invitations
            WHERE token_hash = $1 AND expires_at > NOW()
            "#,
        )
        .bind(token_hash)
        .fetch_optional(executor)
        .await
    }

    /// Locks the unexpired invitation matching `token_hash`
    ///
    /// Must run inside a transaction, after the owning user row is locked
    /// with [`User::lock`](crate::models::user::User::lock). Once the holder of
    /// that lock deletes or replaces the row and commits, this sees `None`.
    pub async fn find_valid_for_update<'e, E>(
        executor: E,
        token_hash: &TokenHash,
    ) -> Result<Option<Self>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_as::<_, Invitation>(
            r#"
            SELECT user_id, token_hash, expires_at, created_at
            FROM user_invitations
            WHERE token_hash = $1 AND expires_at > NOW()
            FOR UPDATE
            "#,
        )
        .bind(token_hash)
        .fetch_optional(executor)
        .await
    }

    /// Finds the invitation for a user, expired or not
    pub async fn find_by_user<'e, E>(executor: E, user_id: i64) -> Result<Option<Self>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_as::<_, Invitation>(
            r#"
            SELECT user_id, token_hash, expires_at, created_at
            FROM user_invitations
            WHERE user_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_optional(executor)
        .await
    }

    /// Deletes the invitation for a user
    ///
    /// Returns true if a row was deleted.
    pub async fn delete_for_user<'e, E>(executor: E, user_id: i64) -> Result<bool, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let result = sqlx::query("DELETE FROM user_invitations WHERE user_id = $1")
            .bind(user_id)
            .execute(executor)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
