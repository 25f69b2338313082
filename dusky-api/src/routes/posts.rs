/// Post and comment endpoints
///
/// All routes here sit behind `require_auth`. Only a post's author may
/// update or delete it; updates carry the version the client last saw.
///
/// # Endpoints
///
/// - `POST /v1/posts` - Create a post
/// - `GET /v1/posts/:id` - Post with its comments
/// - `PATCH /v1/posts/:id` - Versioned partial update
/// - `DELETE /v1/posts/:id` - Delete a post
/// - `POST /v1/posts/:id/comments` - Add a comment

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    extractors::CurrentUser,
};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use dusky_shared::{
    auth::identity::AuthenticatedIdentity,
    db::Database,
    models::{
        comment::Comment,
        post::{CreatePost, Post, UpdatePost},
    },
};
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

/// Create post request
#[derive(Debug, Deserialize, Validate)]
pub struct CreatePostRequest {
    #[validate(length(min = 1, max = 100, message = "Title must be 1 to 100 characters"))]
    pub title: String,

    #[validate(length(min = 1, max = 5000, message = "Content must be 1 to 5000 characters"))]
    pub content: String,

    #[serde(default)]
    #[validate(custom(function = "validate_tags"))]
    pub tags: Vec<String>,
}

/// Update post request
///
/// Omitted fields keep their stored value. `version` is required.
#[derive(Debug, Deserialize, Validate)]
pub struct UpdatePostRequest {
    #[validate(length(min = 1, max = 100, message = "Title must be 1 to 100 characters"))]
    pub title: Option<String>,

    #[validate(length(min = 1, max = 5000, message = "Content must be 1 to 5000 characters"))]
    pub content: Option<String>,

    #[validate(custom(function = "validate_tags"))]
    pub tags: Option<Vec<String>>,

    /// Version the client last observed
    #[validate(range(min = 1, message = "Version must be positive"))]
    pub version: i32,
}

/// Result of a successful update
#[derive(Debug, Serialize)]
pub struct UpdatePostResponse {
    pub id: i64,
    pub version: i32,
    pub updated_at: DateTime<Utc>,
}

/// Post with its comments
#[derive(Debug, Serialize)]
pub struct PostDetails {
    #[serde(flatten)]
    pub post: Post,
    pub comments: Vec<Comment>,
}

/// Create comment request
#[derive(Debug, Deserialize, Validate)]
pub struct CreateCommentRequest {
    #[validate(length(min = 1, max = 1000, message = "Comment must be 1 to 1000 characters"))]
    pub content: String,
}

fn validate_tags(tags: &[String]) -> Result<(), ValidationError> {
    if tags.iter().any(|t| t.trim().is_empty()) {
        let mut error = ValidationError::new("empty_tag");
        error.message = Some("Tags must not be empty".into());
        return Err(error);
    }
    Ok(())
}

/// Loads a post and checks that `caller` wrote it
async fn owned_post(db: &Database, id: i64, caller: &AuthenticatedIdentity) -> ApiResult<Post> {
    let post = Post::find_by_id(db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Post not found".to_string()))?;

    if post.author_id != caller.user_id {
        tracing::warn!(post_id = id, user_id = caller.user_id, "Non-author tried to modify post");
        return Err(ApiError::Forbidden("Only the author can modify this post".to_string()));
    }

    Ok(post)
}

/// Create a post authored by the caller
///
/// # Endpoint
///
/// ```text
/// POST /v1/posts
/// Authorization: Bearer <token>
///
/// { "title": "hello", "content": "first post", "tags": ["intro"] }
/// ```
///
/// # Response
///
/// `201 Created` with the post (`version` = 1)
pub async fn create_post(
    State(state): State<AppState>,
    CurrentUser(caller): CurrentUser,
    Json(req): Json<CreatePostRequest>,
) -> ApiResult<(StatusCode, Json<Post>)> {
    req.validate()?;

    let post = Post::create(
        &state.db,
        CreatePost {
            title: req.title,
            content: req.content,
            author_id: caller.user_id,
            tags: req.tags.into_iter().map(|t| t.trim().to_string()).collect(),
        },
    )
    .await?;

    tracing::info!(post_id = post.id, user_id = caller.user_id, "Created post");
    Ok((StatusCode::CREATED, Json(post)))
}

/// Get a post with its comments
///
/// # Errors
///
/// - `404 Not Found`: No such post
pub async fn get_post(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<PostDetails>> {
    let post = Post::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Post not found".to_string()))?;
    let comments = Comment::list_for_post(&state.db, id).await?;

    Ok(Json(PostDetails { post, comments }))
}

/// Versioned partial update
///
/// # Endpoint
///
/// ```text
/// PATCH /v1/posts/:id
/// Authorization: Bearer <token>
///
/// { "title": "edited", "version": 1 }
/// ```
///
/// # Response
///
/// ```json
/// { "id": 1, "version": 2, "updated_at": "..." }
/// ```
///
/// # Errors
///
/// - `403 Forbidden`: Caller is not the author
/// - `404 Not Found`: No such post
/// - `409 Conflict`: `version` is stale; reload and retry
pub async fn update_post(
    State(state): State<AppState>,
    CurrentUser(caller): CurrentUser,
    Path(id): Path<i64>,
    Json(req): Json<UpdatePostRequest>,
) -> ApiResult<Json<UpdatePostResponse>> {
    req.validate()?;
    owned_post(&state.db, id, &caller).await?;

    let (version, updated_at) = Post::update(
        &state.db,
        id,
        req.version,
        UpdatePost {
            title: req.title,
            content: req.content,
            tags: req
                .tags
                .map(|tags| tags.into_iter().map(|t| t.trim().to_string()).collect()),
        },
    )
    .await?;

    tracing::info!(post_id = id, version, "Updated post");
    Ok(Json(UpdatePostResponse {
        id,
        version,
        updated_at,
    }))
}

/// Delete a post
///
/// # Errors
///
/// - `403 Forbidden`: Caller is not the author
/// - `404 Not Found`: No such post
pub async fn delete_post(
    State(state): State<AppState>,
    CurrentUser(caller): CurrentUser,
    Path(id): Path<i64>,
) -> ApiResult<StatusCode> {
    owned_post(&state.db, id, &caller).await?;
    Post::delete(&state.db, id).await?;

    tracing::info!(post_id = id, user_id = caller.user_id, "Deleted post");
    Ok(StatusCode::NO_CONTENT)
}

/// Add a comment to a post
///
/// # Errors
///
/// - `404 Not Found`: No such post
pub async fn create_comment(
    State(state): State<AppState>,
    CurrentUser(caller): CurrentUser,
    Path(post_id): Path<i64>,
    Json(req): Json<CreateCommentRequest>,
) -> ApiResult<(StatusCode, Json<Comment>)> {
    req.validate()?;

    let comment = Comment::create(&state.db, post_id, caller.user_id, req.content).await?;
    Ok((StatusCode::CREATED, Json(comment)))
}
