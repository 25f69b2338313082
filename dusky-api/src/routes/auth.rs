/// Authentication endpoints
///
/// This module provides the account entry points:
/// - Registration (creates an inactive account and an invitation)
/// - Login (exchanges credentials for an access token)
/// - Invitation resend
///
/// Activation lives with the user routes (`PUT /v1/users/activate/:token`).
///
/// # Endpoints
///
/// - `POST /v1/auth/register` - Register new user
/// - `POST /v1/auth/token` - Login and get an access token
/// - `POST /v1/auth/invitations` - Resend the invitation email

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
};
use axum::{extract::State, http::StatusCode, Json};
use dusky_shared::{
    accounts::{self, NewAccount},
    auth::token::PlaintextToken,
    mailer::templates,
    models::user::User,
};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Register request
#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(length(min = 3, max = 120, message = "Username must be 3 to 120 characters"))]
    pub username: String,

    #[validate(email(message = "Invalid email format"))]
    #[validate(length(max = 120, message = "Email must be at most 120 characters"))]
    pub email: String,

    #[validate(length(min = 8, max = 255, message = "Password must be 8 to 255 characters"))]
    pub password: String,

    #[validate(must_match(other = "password", message = "Passwords do not match"))]
    pub confirm_password: String,
}

/// Register response
///
/// `token` is only present when `EXPOSE_INVITATION_TOKEN` is enabled.
#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    pub user: User,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

/// Login request
#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    #[validate(length(min = 1, max = 255, message = "Password is required"))]
    pub password: String,
}

/// Login response
#[derive(Debug, Serialize)]
pub struct TokenResponse {
    /// Access token
    pub token: String,
}

/// Invitation resend request
#[derive(Debug, Deserialize, Validate)]
pub struct ResendInvitationRequest {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,
}

/// Generic acknowledgement
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

/// Register a new user
///
/// Creates an inactive account plus its invitation in one transaction, then
/// queues the invitation email. Mail delivery never fails the request.
///
/// # Endpoint
///
/// ```text
/// POST /v1/auth/register
/// Content-Type: application/json
///
/// {
///   "username": "alice",
///   "email": "alice@example.com",
///   "password": "secret123",
///   "confirm_password": "secret123"
/// }
/// ```
///
/// # Response
///
/// `201 Created`
///
/// ```json
/// {
///   "user": { "id": 1, "username": "alice", "email": "alice@example.com", "is_active": false, ... },
///   "token": "9f86d081..."
/// }
/// ```
///
/// # Errors
///
/// - `409 Conflict`: Username or email already taken
/// - `422 Unprocessable Entity`: Validation failed
pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> ApiResult<(StatusCode, Json<RegisterResponse>)> {
    req.validate()?;

    let account = NewAccount {
        username: req.username,
        email: req.email,
        password: req.password,
    };

    let (user, token) = accounts::register_and_invite(
        &state.db,
        account,
        state.invitation_ttl(),
        &state.password_params,
    )
    .await?;

    queue_invitation(&state, &user, &token);

    let token = state
        .config
        .api
        .expose_invitation_token
        .then(|| token.expose().to_string());

    Ok((StatusCode::CREATED, Json(RegisterResponse { user, token })))
}

/// Login
///
/// # Endpoint
///
/// ```text
/// POST /v1/auth/token
/// Content-Type: application/json
///
/// { "email": "alice@example.com", "password": "secret123" }
/// ```
///
/// # Response
///
/// `201 Created` with `{ "token": "eyJ..." }`
///
/// # Errors
///
/// - `401 Unauthorized`: Unknown email, wrong password or inactive account
/// - `422 Unprocessable Entity`: Validation failed
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> ApiResult<(StatusCode, Json<TokenResponse>)> {
    req.validate()?;

    let user = accounts::authenticate(&state.db, &req.email, &req.password).await?;
    let token = state.authenticator.issue(user.id)?;

    tracing::info!(user_id = user.id, "Issued access token");

    Ok((StatusCode::CREATED, Json(TokenResponse { token })))
}

/// Resend the invitation for an inactive account
///
/// Always answers `202 Accepted` with the same body, whether or not the email
/// belongs to a pending account.
///
/// # Endpoint
///
/// ```text
/// POST /v1/auth/invitations
/// Content-Type: application/json
///
/// { "email": "alice@example.com" }
/// ```
pub async fn resend_invitation(
    State(state): State<AppState>,
    Json(req): Json<ResendInvitationRequest>,
) -> ApiResult<(StatusCode, Json<MessageResponse>)> {
    req.validate()?;

    if let Some((user, token)) =
        accounts::reinvite(&state.db, &req.email, state.invitation_ttl()).await?
    {
        queue_invitation(&state, &user, &token);
    }

    Ok((
        StatusCode::ACCEPTED,
        Json(MessageResponse {
            message: "If a pending account exists for this email, a new invitation is on its way"
                .to_string(),
        }),
    ))
}

fn queue_invitation(state: &AppState, user: &User, token: &PlaintextToken) {
    let url = templates::activation_url(&state.config.api.frontend_url, token.expose());
    let message = templates::invitation(&user.username, &user.email, &url);

    if let Err(e) = state.mail.enqueue(message) {
        // The account exists either way; the user can ask for a resend
        tracing::error!(user_id = user.id, error = %e, "Failed to queue invitation email");
    }
}
