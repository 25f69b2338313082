/// User endpoints
///
/// # Endpoints
///
/// - `PUT /v1/users/activate/:token` - Redeem an invitation (public)
/// - `GET /v1/users/:id` - Public profile
/// - `PUT /v1/users/:id/follow` - Follow the user (authenticated)
/// - `PUT /v1/users/:id/unfollow` - Stop following the user (authenticated)
/// - `GET /v1/users/feed` - Caller's feed (authenticated)

use crate::{
    app::AppState,
    error::{ApiError, ApiResult, ValidationErrorDetail},
    extractors::{CurrentUser, ProfileUser},
};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use dusky_shared::{
    accounts,
    models::{
        feed::{FeedPost, FeedQuery, SortDirection},
        follower::Follower,
        user::User,
    },
};
use serde::Deserialize;
use std::str::FromStr;
use validator::Validate;

/// Activate an account
///
/// # Endpoint
///
/// ```text
/// PUT /v1/users/activate/:token
/// ```
///
/// # Response
///
/// `204 No Content`
///
/// # Errors
///
/// - `404 Not Found`: Unknown, expired or already used token
pub async fn activate(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> ApiResult<StatusCode> {
    accounts::activate(&state.db, &token).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Public profile of the path user
pub async fn get_user(ProfileUser(user): ProfileUser) -> Json<User> {
    Json(user)
}

/// Follow the path user
///
/// # Errors
///
/// - `400 Bad Request`: Following yourself
/// - `409 Conflict`: Already following
pub async fn follow(
    State(state): State<AppState>,
    CurrentUser(caller): CurrentUser,
    ProfileUser(target): ProfileUser,
) -> ApiResult<StatusCode> {
    Follower::follow(&state.db, target.id, caller.user_id).await?;

    tracing::info!(user_id = target.id, follower_id = caller.user_id, "Followed user");
    Ok(StatusCode::NO_CONTENT)
}

/// Stop following the path user (no-op if not following)
pub async fn unfollow(
    State(state): State<AppState>,
    CurrentUser(caller): CurrentUser,
    ProfileUser(target): ProfileUser,
) -> ApiResult<StatusCode> {
    Follower::unfollow(&state.db, target.id, caller.user_id).await?;

    tracing::info!(user_id = target.id, follower_id = caller.user_id, "Unfollowed user");
    Ok(StatusCode::NO_CONTENT)
}

/// Raw feed query string
///
/// Everything arrives as text so a bad value yields a field-level
/// validation error instead of an extractor rejection.
#[derive(Debug, Default, Deserialize)]
pub struct FeedParams {
    pub limit: Option<String>,
    pub offset: Option<String>,
    pub sort: Option<String>,
    pub search: Option<String>,
    /// Comma-separated
    pub tags: Option<String>,
    /// RFC 3339
    pub since: Option<String>,
    /// RFC 3339
    pub until: Option<String>,
}

impl FeedParams {
    /// Parses and validates into a [`FeedQuery`]
    pub fn into_query(self) -> ApiResult<FeedQuery> {
        let mut details = Vec::new();
        let defaults = FeedQuery::default();

        let limit = parse_field(&mut details, "limit", self.limit).unwrap_or(defaults.limit);
        let offset = parse_field(&mut details, "offset", self.offset).unwrap_or(defaults.offset);

        let sort = match self.sort.as_deref().map(str::trim) {
            None | Some("") => defaults.sort,
            Some(s) if s.eq_ignore_ascii_case("asc") => SortDirection::Asc,
            Some(s) if s.eq_ignore_ascii_case("desc") => SortDirection::Desc,
            Some(_) => {
                details.push(detail("sort", "sort must be asc or desc"));
                defaults.sort
            }
        };

        let tags = self
            .tags
            .map(|raw| {
                raw.split(',')
                    .map(|t| t.trim().to_string())
                    .filter(|t| !t.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        let since: Option<DateTime<Utc>> = parse_field(&mut details, "since", self.since);
        let until: Option<DateTime<Utc>> = parse_field(&mut details, "until", self.until);

        if !details.is_empty() {
            return Err(ApiError::ValidationError(details));
        }

        let query = FeedQuery {
            limit,
            offset,
            sort,
            search: self.search.map(|s| s.trim().to_string()).unwrap_or_default(),
            tags,
            since,
            until,
        };
        query.validate()?;

        Ok(query)
    }
}

fn parse_field<T: FromStr>(
    details: &mut Vec<ValidationErrorDetail>,
    field: &str,
    raw: Option<String>,
) -> Option<T> {
    let raw = raw?;
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    match raw.parse() {
        Ok(value) => Some(value),
        Err(_) => {
            details.push(detail(field, &format!("{} is not a valid value", field)));
            None
        }
    }
}

fn detail(field: &str, message: &str) -> ValidationErrorDetail {
    ValidationErrorDetail {
        field: field.to_string(),
        message: message.to_string(),
    }
}

/// Caller's feed
///
/// # Endpoint
///
/// ```text
/// GET /v1/users/feed?limit=20&offset=0&sort=desc&search=rust&tags=a,b&since=2025-01-01T00:00:00Z
/// ```
///
/// # Errors
///
/// - `422 Unprocessable Entity`: Invalid query parameters
pub async fn feed(
    State(state): State<AppState>,
    CurrentUser(caller): CurrentUser,
    Query(params): Query<FeedParams>,
) -> ApiResult<Json<Vec<FeedPost>>> {
    let query = params.into_query()?;
    let posts = FeedPost::for_user(&state.db, caller.user_id, &query).await?;
    Ok(Json(posts))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fields(err: ApiError) -> Vec<String> {
        match err {
            ApiError::ValidationError(details) => details.into_iter().map(|d| d.field).collect(),
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn test_defaults() {
        let query = FeedParams::default().into_query().unwrap();
        assert_eq!(query.limit, 20);
        assert_eq!(query.offset, 0);
        assert_eq!(query.sort, SortDirection::Desc);
        assert!(query.tags.is_empty());
        assert!(query.search.is_empty());
    }

    #[test]
    fn test_parses_all_fields() {
        let query = FeedParams {
            limit: Some("5".to_string()),
            offset: Some("10".to_string()),
            sort: Some("ASC".to_string()),
            search: Some(" rust ".to_string()),
            tags: Some("a, b,,c".to_string()),
            since: Some("2025-01-01T00:00:00Z".to_string()),
            until: None,
        }
        .into_query()
        .unwrap();

        assert_eq!(query.limit, 5);
        assert_eq!(query.offset, 10);
        assert_eq!(query.sort, SortDirection::Asc);
        assert_eq!(query.search, "rust");
        assert_eq!(query.tags, vec!["a", "b", "c"]);
        assert!(query.since.is_some());
        assert!(query.until.is_none());
    }

    #[test]
    fn test_unparseable_values_are_reported_together() {
        let err = FeedParams {
            limit: Some("ten".to_string()),
            sort: Some("sideways".to_string()),
            since: Some("yesterday".to_string()),
            ..Default::default()
        }
        .into_query()
        .unwrap_err();

        assert_eq!(fields(err), vec!["limit", "sort", "since"]);
    }

    #[test]
    fn test_out_of_range_values_fail_validation() {
        let err = FeedParams {
            limit: Some("21".to_string()),
            tags: Some("a,b,c,d,e".to_string()),
            ..Default::default()
        }
        .into_query()
        .unwrap_err();

        assert_eq!(fields(err), vec!["limit", "tags"]);
    }
}
