/// Authentication middleware for Axum
///
/// # Middleware
///
/// - [`require_auth`]: verifies the access token in the `Authorization`
///   header (`Bearer <jwt>` or a bare `<jwt>`), loads the subject user and
///   attaches an [`AuthenticatedIdentity`] to the request
/// - [`resolve_path_user`]: loads the user named by the `:id` path segment
///   and attaches it as [`super::identity::PathUser`]
///
/// Every credential failure in [`require_auth`] produces the same
/// `401 {"error":"unauthorized"}` body; the precise reason is only logged.
/// A storage failure while loading the user is a server fault and yields 500.
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use axum::{middleware, routing::get, Router};
/// use dusky_shared::auth::jwt::JwtAuthenticator;
/// use dusky_shared::auth::middleware::{require_auth, AuthState};
/// use dusky_shared::db::Database;
///
/// # fn example(db: Database) -> Router {
/// let state = AuthState {
///     authenticator: Arc::new(JwtAuthenticator::new(
///         "0123456789abcdef0123456789abcdef",
///         "dusky",
///         "dusky",
///         chrono::Duration::hours(72),
///     )),
///     db,
/// };
///
/// Router::new()
///     .route("/protected", get(|| async { "OK" }))
///     .route_layer(middleware::from_fn_with_state(state, require_auth))
/// # }
/// ```

use axum::{
    extract::{Path, Request, State},
    http::{header, HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;

use super::identity::{attach_identity, attach_path_user, AuthenticatedIdentity};
use super::jwt::{JwtAuthenticator, JwtError};
use crate::db::Database;
use crate::error::DomainError;
use crate::models::user::User;

/// Shared state for [`require_auth`]
#[derive(Debug, Clone)]
pub struct AuthState {
    pub authenticator: Arc<JwtAuthenticator>,
    pub db: Database,
}

/// Error type for authentication middleware
///
/// The variants exist for logging; all but `Storage` render identically.
#[derive(Debug)]
pub enum AuthError {
    /// No usable `Authorization` header
    MissingCredentials,

    /// Token failed verification
    InvalidToken(JwtError),

    /// Token subject does not exist
    UnknownUser(i64),

    /// Token subject has not activated their account
    InactiveUser(i64),

    /// User lookup failed
    Storage(DomainError),
}

impl AuthError {
    fn log(&self) {
        match self {
            AuthError::MissingCredentials => {
                tracing::warn!("Rejected request without credentials")
            }
            AuthError::InvalidToken(e) => {
                tracing::warn!(reason = %e, "Rejected request with invalid token")
            }
            AuthError::UnknownUser(id) => {
                tracing::warn!(user_id = id, "Rejected token for unknown user")
            }
            AuthError::InactiveUser(id) => {
                tracing::warn!(user_id = id, "Rejected token for inactive user")
            }
            AuthError::Storage(e) => {
                tracing::error!(error = %e, "User lookup failed during authentication")
            }
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        match self {
            AuthError::Storage(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": "internal_error" })),
            )
                .into_response(),
            _ => (
                StatusCode::UNAUTHORIZED,
                Json(json!({ "error": "unauthorized" })),
            )
                .into_response(),
        }
    }
}

/// Reads the access token from the `Authorization` header
///
/// Accepts `Bearer <token>` (scheme case-insensitive) or the bare token.
pub fn extract_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?.trim();

    let token = match value.split_once(' ') {
        Some((scheme, rest)) if scheme.eq_ignore_ascii_case("bearer") => rest.trim(),
        Some(_) => return None,
        // Scheme with no credential
        None if value.eq_ignore_ascii_case("bearer") => return None,
        None => value,
    };

    if token.is_empty() {
        None
    } else {
        Some(token)
    }
}

/// Resolves the caller identity from request headers
pub async fn authenticate_request(
    state: &AuthState,
    headers: &HeaderMap,
) -> Result<AuthenticatedIdentity, AuthError> {
    let token = extract_token(headers).ok_or(AuthError::MissingCredentials)?;

    let claims = state
        .authenticator
        .validate(token)
        .map_err(AuthError::InvalidToken)?;

    let user = state
        .db
        .run(User::find_by_id(state.db.pool(), claims.sub))
        .await
        .map_err(AuthError::Storage)?
        .ok_or(AuthError::UnknownUser(claims.sub))?;

    if !user.is_active {
        return Err(AuthError::InactiveUser(user.id));
    }

    Ok(AuthenticatedIdentity::from(&user))
}

/// Authentication middleware
///
/// # Errors
///
/// 401 for any credential problem, 500 if the user lookup fails.
pub async fn require_auth(
    State(state): State<AuthState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let identity = authenticate_request(&state, req.headers())
        .await
        .inspect_err(AuthError::log)?;

    tracing::debug!(user_id = identity.user_id, "Authenticated request");
    attach_identity(req.extensions_mut(), identity);

    Ok(next.run(req).await)
}

/// Error type for [`resolve_path_user`]
#[derive(Debug)]
pub enum PathUserError {
    /// `:id` is missing or not an integer
    InvalidId,

    /// No such user
    NotFound,

    /// User lookup failed
    Storage(DomainError),
}

impl IntoResponse for PathUserError {
    fn into_response(self) -> Response {
        match self {
            PathUserError::InvalidId => (
                StatusCode::BAD_REQUEST,
                Json(json!({ "error": "validation_error", "message": "Invalid user id" })),
            )
                .into_response(),
            PathUserError::NotFound => (
                StatusCode::NOT_FOUND,
                Json(json!({ "error": "not_found", "message": "User not found" })),
            )
                .into_response(),
            PathUserError::Storage(e) => {
                tracing::error!(error = %e, "User lookup failed while resolving path user");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "error": "internal_error" })),
                )
                    .into_response()
            }
        }
    }
}

/// Loads the user named by the `:id` path parameter
///
/// Must be installed with `route_layer` so path parameters are available.
pub async fn resolve_path_user(
    State(db): State<Database>,
    Path(params): Path<HashMap<String, String>>,
    mut req: Request,
    next: Next,
) -> Result<Response, PathUserError> {
    let user_id: i64 = params
        .get("id")
        .and_then(|raw| raw.parse().ok())
        .ok_or(PathUserError::InvalidId)?;

    let user = db
        .run(User::find_by_id(db.pool(), user_id))
        .await
        .map_err(PathUserError::Storage)?
        .ok_or(PathUserError::NotFound)?;

    attach_path_user(req.extensions_mut(), user);

    Ok(next.run(req).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn test_extract_bearer_token() {
        assert_eq!(extract_token(&headers("Bearer abc.def.ghi")), Some("abc.def.ghi"));
        assert_eq!(extract_token(&headers("bearer abc.def.ghi")), Some("abc.def.ghi"));
    }

    #[test]
    fn test_extract_raw_token() {
        assert_eq!(extract_token(&headers("abc.def.ghi")), Some("abc.def.ghi"));
    }

    #[test]
    fn test_extract_rejects_other_schemes_and_empty() {
        assert_eq!(extract_token(&headers("Basic dXNlcjpwYXNz")), None);
        assert_eq!(extract_token(&headers("Bearer ")), None);
        assert_eq!(extract_token(&headers("Bearer")), None);
        assert_eq!(extract_token(&headers("bearer   ")), None);
        assert_eq!(extract_token(&headers("")), None);
        assert_eq!(extract_token(&HeaderMap::new()), None);
    }

    #[tokio::test]
    async fn test_credential_failures_render_identically() {
        let errors = vec![
            AuthError::MissingCredentials,
            AuthError::InvalidToken(JwtError::Expired),
            AuthError::InvalidToken(JwtError::InvalidSignature),
            AuthError::UnknownUser(7),
            AuthError::InactiveUser(7),
        ];

        for err in errors {
            let response = err.into_response();
            assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

            let body = axum::body::to_bytes(response.into_body(), usize::MAX)
                .await
                .unwrap();
            assert_eq!(&body[..], br#"{"error":"unauthorized"}"#);
        }
    }

    #[test]
    fn test_storage_failure_is_server_error() {
        let response = AuthError::Storage(DomainError::internal("db down")).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_path_user_errors() {
        assert_eq!(
            PathUserError::InvalidId.into_response().status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            PathUserError::NotFound.into_response().status(),
            StatusCode::NOT_FOUND
        );
    }
}
