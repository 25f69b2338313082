/// Application state and router builder
///
/// This module defines the shared application state and provides
/// a function to build the Axum router with all routes and middleware.
///
/// # Example
///
/// ```no_run
/// use dusky_api::{app::AppState, config::Config};
/// use dusky_shared::db::pool;
/// use dusky_shared::mailer::{dispatcher::MailDispatcher, LogMailer};
/// use std::sync::Arc;
/// use tokio_util::sync::CancellationToken;
///
/// # async fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// let db = pool::connect(&config.database).await?;
/// let (mail, _worker) = MailDispatcher::spawn(Arc::new(LogMailer), true, 16, CancellationToken::new());
/// let state = AppState::new(db, config, mail);
/// let app = dusky_api::app::build_router(state);
/// # Ok(())
/// # }
/// ```

use crate::{config::Config, middleware::security::SecurityHeadersLayer};
use axum::{
    http::{header, HeaderValue, Method},
    middleware::from_fn_with_state,
    routing::{get, post, put},
    Router,
};
use dusky_shared::{
    auth::{
        jwt::JwtAuthenticator,
        middleware::{require_auth, resolve_path_user, AuthState},
        password::PasswordParams,
    },
    db::Database,
    mailer::dispatcher::MailDispatcher,
};
use std::sync::Arc;
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

/// Shared application state
///
/// This is cloned for each request handler via Axum's `State` extractor.
/// Everything here is immutable after startup or internally shared.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Database handle with per-operation timeout
    pub db: Database,

    /// Application configuration
    pub config: Arc<Config>,

    /// Access token issuer/validator
    pub authenticator: Arc<JwtAuthenticator>,

    /// Outbound mail queue
    pub mail: MailDispatcher,

    /// Argon2 cost for new credentials
    pub password_params: PasswordParams,
}

impl AppState {
    /// Creates new application state
    pub fn new(db: Database, config: Config, mail: MailDispatcher) -> Self {
        let authenticator = JwtAuthenticator::new(
            &config.jwt.secret,
            config.jwt.audience.clone(),
            config.jwt.issuer.clone(),
            chrono::Duration::hours(config.jwt.ttl_hours),
        );

        Self {
            db,
            config: Arc::new(config),
            authenticator: Arc::new(authenticator),
            mail,
            password_params: PasswordParams::default(),
        }
    }

    /// Overrides the Argon2 cost (tests use cheap parameters)
    pub fn with_password_params(mut self, params: PasswordParams) -> Self {
        self.password_params = params;
        self
    }

    /// State for the authentication middleware
    pub fn auth_state(&self) -> AuthState {
        AuthState {
            authenticator: self.authenticator.clone(),
            db: self.db.clone(),
        }
    }

    /// Lifetime of newly issued invitations
    pub fn invitation_ttl(&self) -> chrono::Duration {
        chrono::Duration::hours(self.config.invitation.ttl_hours)
    }
}

/// Builds the complete Axum router with all routes and middleware
///
/// # Architecture
///
/// ```text
/// /
/// ├── /health                     # Health check (public)
/// └── /v1/
///     ├── /auth/
///     │   ├── POST /register        # Create inactive account + invitation
///     │   ├── POST /token           # Login, returns access token
///     │   └── POST /invitations     # Resend invitation
///     ├── /users/
///     │   ├── PUT  /activate/:token # Redeem invitation
///     │   ├── GET  /feed            # (auth)
///     │   ├── GET  /:id             # (path user)
///     │   ├── PUT  /:id/follow      # (auth + path user)
///     │   └── PUT  /:id/unfollow    # (auth + path user)
///     └── /posts/                   # (auth)
///         ├── POST   /
///         ├── GET    /:id
///         ├── PATCH  /:id
///         ├── DELETE /:id
///         └── POST   /:id/comments
/// ```
///
/// # Middleware Stack
///
/// Applied in order (bottom to top):
/// 1. Logging (tower-http TraceLayer)
/// 2. CORS (tower-http CorsLayer)
/// 3. Security headers
/// 4. Authentication / path user resolution (per-route basis)
pub fn build_router(state: AppState) -> Router {
    use crate::routes;

    // Health check (public, no auth)
    let health_routes = Router::new().route("/health", get(routes::health::health_check));

    // Auth routes (public, no auth required)
    let auth_routes = Router::new()
        .route("/register", post(routes::auth::register))
        .route("/token", post(routes::auth::login))
        .route("/invitations", post(routes::auth::resend_invitation));

    let activation_routes =
        Router::new().route("/activate/:token", put(routes::users::activate));

    let profile_routes = Router::new()
        .route("/:id", get(routes::users::get_user))
        .route_layer(from_fn_with_state(state.db.clone(), resolve_path_user));

    let feed_routes = Router::new()
        .route("/feed", get(routes::users::feed))
        .route_layer(from_fn_with_state(state.auth_state(), require_auth));

    // Authentication runs first, then the path user lookup
    let follow_routes = Router::new()
        .route("/:id/follow", put(routes::users::follow))
        .route("/:id/unfollow", put(routes::users::unfollow))
        .route_layer(from_fn_with_state(state.db.clone(), resolve_path_user))
        .route_layer(from_fn_with_state(state.auth_state(), require_auth));

    let user_routes = Router::new()
        .merge(activation_routes)
        .merge(profile_routes)
        .merge(feed_routes)
        .merge(follow_routes);

    let post_routes = Router::new()
        .route("/", post(routes::posts::create_post))
        .route(
            "/:id",
            get(routes::posts::get_post)
                .patch(routes::posts::update_post)
                .delete(routes::posts::delete_post),
        )
        .route("/:id/comments", post(routes::posts::create_comment))
        .route_layer(from_fn_with_state(state.auth_state(), require_auth));

    let v1_routes = Router::new()
        .nest("/auth", auth_routes)
        .nest("/users", user_routes)
        .nest("/posts", post_routes);

    // Configure CORS based on environment
    let cors = if state.config.api.cors_origins.iter().any(|o| o == "*") {
        // Development mode: permissive CORS
        CorsLayer::permissive()
    } else {
        let origins: Vec<HeaderValue> = state
            .config
            .api
            .cors_origins
            .iter()
            .filter_map(|origin| origin.parse().ok())
            .collect();

        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods([
                Method::GET,
                Method::POST,
                Method::PUT,
                Method::PATCH,
                Method::DELETE,
                Method::OPTIONS,
            ])
            .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
            .allow_credentials(true)
            .max_age(std::time::Duration::from_secs(3600))
    };

    let production = state.config.api.production;

    Router::new()
        .merge(health_routes)
        .nest("/v1", v1_routes)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors)
        .layer(SecurityHeadersLayer::new(production))
        .with_state(state)
}
