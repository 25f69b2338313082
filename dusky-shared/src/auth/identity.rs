/// Request-scoped identity propagation
///
/// Two narrowly typed request-extension slots, each set by exactly one
/// middleware and read by handlers:
///
/// - [`AuthenticatedIdentity`]: the caller, established from a verified
///   bearer token by [`super::middleware::require_auth`]
/// - [`PathUser`]: the user named by a `/users/:id` path segment, resolved by
///   [`super::middleware::resolve_path_user`] on public per-user routes
///
/// They are distinct types so a handler that requires an authenticated caller
/// can never be satisfied by a user that was merely looked up from the URL.
/// Neither value is ever persisted.
///
/// # Example
///
/// ```
/// use axum::http::Extensions;
/// use dusky_shared::auth::identity::{attach_identity, resolve_identity, AuthenticatedIdentity};
///
/// let mut extensions = Extensions::new();
/// assert!(resolve_identity(&extensions).is_none());
///
/// attach_identity(&mut extensions, AuthenticatedIdentity {
///     user_id: 1,
///     username: "alice".to_string(),
///     email: "alice@x.com".to_string(),
/// });
/// assert_eq!(resolve_identity(&extensions).unwrap().user_id, 1);
/// ```

use axum::http::Extensions;
use serde::Serialize;

use crate::models::user::User;

/// Caller identity derived from a verified access token
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuthenticatedIdentity {
    pub user_id: i64,
    pub username: String,
    pub email: String,
}

impl From<&User> for AuthenticatedIdentity {
    fn from(user: &User) -> Self {
        Self {
            user_id: user.id,
            username: user.username.clone(),
            email: user.email.clone(),
        }
    }
}

/// User addressed by the request path
#[derive(Debug, Clone)]
pub struct PathUser(pub User);

/// Stores the caller identity for downstream handlers
///
/// Called once per request by the authentication middleware; a second call
/// replaces the first.
pub fn attach_identity(extensions: &mut Extensions, identity: AuthenticatedIdentity) {
    extensions.insert(identity);
}

/// Reads the caller identity, if authentication ran for this request
pub fn resolve_identity(extensions: &Extensions) -> Option<&AuthenticatedIdentity> {
    extensions.get::<AuthenticatedIdentity>()
}

/// Stores the user resolved from the request path
pub fn attach_path_user(extensions: &mut Extensions, user: User) {
    extensions.insert(PathUser(user));
}

/// Reads the user resolved from the request path
pub fn resolve_path_user(extensions: &Extensions) -> Option<&User> {
    extensions.get::<PathUser>().map(|p| &p.0)
}
