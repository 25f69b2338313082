/// Domain error taxonomy
///
/// Every fallible core operation (account lifecycle, content store, social
/// models) returns [`DomainError`]. Raw `sqlx::Error` values are translated
/// exactly once, in the `From<sqlx::Error>` impl below, so callers above the
/// storage layer never inspect database error types.
///
/// | Variant           | Meaning                                              |
/// |-------------------|------------------------------------------------------|
/// | `Validation`      | Malformed or missing input, client-correctable       |
/// | `Conflict`        | Unique constraint violation (duplicate email, ...)   |
/// | `NotFound`        | Missing entity, or invalid/expired invitation token  |
/// | `VersionConflict` | Stale optimistic-lock version                        |
/// | `Unauthorized`    | Identity could not be established                    |
/// | `Forbidden`       | Identity established but not allowed                 |
/// | `Internal`        | Storage/transport failure, never shown to callers    |

use crate::auth::password::PasswordError;

/// Postgres SQLSTATE for unique_violation
const UNIQUE_VIOLATION: &str = "23505";

/// Postgres SQLSTATE for foreign_key_violation
const FOREIGN_KEY_VIOLATION: &str = "23503";

/// Postgres SQLSTATE for check_violation
const CHECK_VIOLATION: &str = "23514";

/// Result alias for core operations
pub type DomainResult<T> = Result<T, DomainError>;

#[derive(Debug, thiserror::Error)]
pub enum DomainError {
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Version conflict: expected version {expected} is stale")]
    VersionConflict { expected: i32 },

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl DomainError {
    pub fn not_found(what: impl Into<String>) -> Self {
        DomainError::NotFound(what.into())
    }

    pub fn internal(cause: impl std::fmt::Display) -> Self {
        DomainError::Internal(cause.to_string())
    }
}

/// Client-facing message for a unique violation
///
/// Constraint names stay server-side; unrecognized ones get a generic message.
fn unique_violation_message(constraint: Option<&str>) -> &'static str {
    match constraint {
        Some(c) if c.contains("email") => "Email already exists",
        Some(c) if c.contains("username") => "Username already exists",
        Some(c) if c.contains("followers") => "Already following this user",
        _ => "Resource already exists",
    }
}

impl From<sqlx::Error> for DomainError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => DomainError::NotFound("Resource not found".to_string()),
            sqlx::Error::Database(db_err) => match db_err.code().as_deref() {
                Some(UNIQUE_VIOLATION) => {
                    DomainError::Conflict(unique_violation_message(db_err.constraint()).to_string())
                }
                Some(FOREIGN_KEY_VIOLATION) => {
                    DomainError::NotFound("Referenced resource not found".to_string())
                }
                Some(CHECK_VIOLATION) => DomainError::Validation("Invalid value".to_string()),
                _ => DomainError::Internal(format!("Database error: {}", db_err)),
            },
            other => DomainError::Internal(format!("Database error: {}", other)),
        }
    }
}

impl From<PasswordError> for DomainError {
    fn from(err: PasswordError) -> Self {
        DomainError::Internal(format!("Password operation failed: {}", err))
    }
}

impl From<tokio::time::error::Elapsed> for DomainError {
    fn from(_: tokio::time::error::Elapsed) -> Self {
        DomainError::Internal("Database operation timed out".to_string())
    }
}
