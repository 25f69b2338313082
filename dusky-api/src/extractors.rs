/// Typed access to request-scoped identities
///
/// `CurrentUser` reads the caller identity stored by `require_auth`;
/// `ProfileUser` reads the user resolved from `/users/:id` by
/// `resolve_path_user`. Both are only valid on routes behind the matching
/// middleware. A missing value means the route is wired wrong, so it is a
/// 500, never an anonymous caller.

use axum::{extract::FromRequestParts, http::request::Parts};
use dusky_shared::{
    auth::identity::{self, AuthenticatedIdentity},
    models::user::User,
};

use crate::error::ApiError;

/// Caller identity established by the authentication middleware
#[derive(Debug, Clone)]
pub struct CurrentUser(pub AuthenticatedIdentity);

/// User addressed by the request path
#[derive(Debug, Clone)]
pub struct ProfileUser(pub User);

#[axum::async_trait]
impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        identity::resolve_identity(&parts.extensions)
            .cloned()
            .map(CurrentUser)
            .ok_or_else(|| {
                ApiError::InternalError(format!(
                    "No authenticated identity on {} {}",
                    parts.method, parts.uri
                ))
            })
    }
}

#[axum::async_trait]
impl<S> FromRequestParts<S> for ProfileUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        identity::resolve_path_user(&parts.extensions)
            .cloned()
            .map(ProfileUser)
            .ok_or_else(|| {
                ApiError::InternalError(format!(
                    "No path user on {} {}",
                    parts.method, parts.uri
                ))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{Request, StatusCode};
    use axum::response::IntoResponse;
    use chrono::Utc;
    use dusky_shared::auth::password::Credential;

    fn parts() -> Parts {
        Request::builder()
            .uri("/v1/posts")
            .body(())
            .unwrap()
            .into_parts()
            .0
    }

    #[tokio::test]
    async fn test_current_user_reads_identity() {
        let mut parts = parts();
        let identity = AuthenticatedIdentity {
            user_id: 7,
            username: "alice".to_string(),
            email: "alice@example.com".to_string(),
        };
        identity::attach_identity(&mut parts.extensions, identity.clone());

        let CurrentUser(found) = CurrentUser::from_request_parts(&mut parts, &())
            .await
            .unwrap();
        assert_eq!(found, identity);
    }

    #[tokio::test]
    async fn test_missing_identity_is_internal_error() {
        let mut parts = parts();

        let rejection = CurrentUser::from_request_parts(&mut parts, &())
            .await
            .unwrap_err();
        assert_eq!(
            rejection.into_response().status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[tokio::test]
    async fn test_profile_user_reads_path_user() {
        let mut parts = parts();
        let now = Utc::now();
        identity::attach_path_user(
            &mut parts.extensions,
            User {
                id: 3,
                username: "bob".to_string(),
                email: "bob@example.com".to_string(),
                password: Credential::from_hash("$argon2id$stub"),
                is_active: true,
                created_at: now,
                updated_at: now,
            },
        );

        let ProfileUser(user) = ProfileUser::from_request_parts(&mut parts, &())
            .await
            .unwrap();
        assert_eq!(user.id, 3);

        let mut empty = self::parts();
        assert!(ProfileUser::from_request_parts(&mut empty, &()).await.is_err());
    }
}
