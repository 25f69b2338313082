/// User model and database operations
///
/// Users are created inactive by registration and flipped to active exactly
/// once, when their invitation is redeemed. The password column is mapped to a
/// [`Credential`] and is never serialized.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE users (
///     id BIGSERIAL PRIMARY KEY,
///     username VARCHAR(120) NOT NULL UNIQUE,
///     email CITEXT NOT NULL UNIQUE,
///     password_hash TEXT NOT NULL,
///     is_active BOOLEAN NOT NULL DEFAULT FALSE,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```
///
/// Queries accept any `PgExecutor`, so the same function runs against the pool
/// or inside an open transaction (`&mut *tx`).

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::PgExecutor;

use crate::auth::password::Credential;

/// User account
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct User {
    pub id: i64,

    /// Unique, case-sensitive handle
    pub username: String,

    /// Unique, case-insensitive (CITEXT)
    pub email: String,

    /// Argon2id hash; never leaves the server
    #[serde(skip)]
    #[sqlx(rename = "password_hash")]
    pub password: Credential,

    /// False until the invitation is redeemed
    pub is_active: bool,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for inserting a user
#[derive(Debug, Clone)]
pub struct CreateUser {
    pub username: String,
    pub email: String,
    pub password: Credential,
}

impl User {
    /// Inserts a new, inactive user
    ///
    /// # Errors
    ///
    /// Unique violations on `username` or `email` surface as
    /// `sqlx::Error::Database` with SQLSTATE 23505.
    pub async fn create<'e, E>(executor: E, data: CreateUser) -> Result<Self, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (username, email, password_hash)
            VALUES ($1, $2, $3)
            RETURNING id, username, email, password_hash, is_active, created_at, updated_at
            "#,
        )
        .bind(data.username)
        .bind(data.email)
        .bind(data.password)
        .fetch_one(executor)
        .await
    }

    /// Finds a user by ID
    pub async fn find_by_id<'e, E>(executor: E, id: i64) -> Result<Option<Self>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_as::<_, User>(
            r#"
            SELECT id, username, email, password_hash, is_active, created_at, updated_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(executor)
        .await
    }

    /// Finds a user by email (case-insensitive)
    pub async fn find_by_email<'e, E>(executor: E, email: &str) -> Result<Option<Self>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_as::<_, User>(
            r#"
            SELECT id, username, email, password_hash, is_active, created_at, updated_at
            FROM users
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(executor)
        .await
    }

    /// Locks a user row for the rest of the transaction
    ///
    /// Account transitions lock the user before touching its invitation, so
    /// activation and re-invitation of one account serialize without
    /// deadlocking.
    pub async fn lock<'e, E>(executor: E, id: i64) -> Result<Option<Self>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_as::<_, User>(
            r#"
            SELECT id, username, email, password_hash, is_active, created_at, updated_at
            FROM users
            WHERE id = $1
            FOR UPDATE
            "#,
        )
        .bind(id)
        .fetch_optional(executor)
        .await
    }

    /// Locks a user row by email (case-insensitive)
    pub async fn lock_by_email<'e, E>(executor: E, email: &str) -> Result<Option<Self>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_as::<_, User>(
            r#"
            SELECT id, username, email, password_hash, is_active, created_at, updated_at
            FROM users
            WHERE email = $1
            FOR UPDATE
            "#,
        )
        .bind(email)
        .fetch_optional(executor)
        .await
    }

    /// Marks an inactive user active and returns the updated row
    ///
    /// Returns `None` if the user does not exist or is already active.
    pub async fn activate<'e, E>(executor: E, id: i64) -> Result<Option<Self>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_as::<_, User>(
            r#"
            UPDATE users
            SET is_active = TRUE, updated_at = NOW()
            WHERE id = $1 AND NOT is_active
            RETURNING id, username, email, password_hash, is_active, created_at, updated_at
            "#,
        )
        .bind(id)
        .fetch_optional(executor)
        .await
    }
}
