/// Account lifecycle: registration, invitation, activation and login
///
/// ```text
/// register_and_invite ──► Registered (is_active = false, invitation row)
///                              │
///                 activate(token), before expires_at
///                              ▼
///                         Activated (is_active = true, no invitation row)
/// ```
///
/// Registration and activation each run as one transaction, so a reader never
/// observes a user without its invitation, nor an active user whose invitation
/// still exists. The plaintext invitation token is handed back to the caller
/// exactly once and only its SHA-256 hash is stored.
///
/// # Example
///
/// ```no_run
/// use chrono::Duration;
/// use dusky_shared::accounts::{activate, register_and_invite, NewAccount};
/// use dusky_shared::auth::password::PasswordParams;
/// use dusky_shared::db::Database;
///
/// # async fn example(db: Database) -> Result<(), Box<dyn std::error::Error>> {
/// let (user, token) = register_and_invite(
///     &db,
///     NewAccount {
///         username: "alice".to_string(),
///         email: "alice@x.com".to_string(),
///         password: "correct horse".to_string(),
///     },
///     Duration::hours(24),
///     &PasswordParams::default(),
/// )
/// .await?;
/// assert!(!user.is_active);
///
/// let user = activate(&db, token.expose()).await?;
/// assert!(user.is_active);
/// # Ok(())
/// # }
/// ```

use chrono::{Duration, Utc};
use std::fmt;
use tracing::{debug, info, warn};

use crate::auth::password::{Credential, PasswordParams};
use crate::auth::token::{self, generate_token, PlaintextToken};
use crate::db::Database;
use crate::error::{DomainError, DomainResult};
use crate::models::invitation::Invitation;
use crate::models::user::{CreateUser, User};

/// Registration input
///
/// Expected to be validated by the caller. `Debug` omits the password.
#[derive(Clone)]
pub struct NewAccount {
    pub username: String,
    pub email: String,
    pub password: String,
}

impl fmt::Debug for NewAccount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NewAccount")
            .field("username", &self.username)
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Creates an inactive user and its invitation atomically
///
/// The password is hashed before the transaction opens so no row lock is
/// held during the expensive Argon2 computation.
///
/// # Errors
///
/// - `Conflict`: username or email already taken
/// - `Internal`: hashing or storage failure, or timeout
///
/// On any error nothing is persisted.
pub async fn register_and_invite(
    db: &Database,
    account: NewAccount,
    invitation_ttl: Duration,
    params: &PasswordParams,
) -> DomainResult<(User, PlaintextToken)> {
    let NewAccount {
        username,
        email,
        password,
    } = account;

    let params = *params;
    let credential = tokio::task::spawn_blocking(move || Credential::set(&password, &params))
        .await
        .map_err(DomainError::internal)??;

    let invitation_token = generate_token();
    let token_hash = invitation_token.hash();
    let expires_at = Utc::now() + invitation_ttl;

    let user = db
        .run(async {
            let mut tx = db.pool().begin().await?;

            let user = User::create(
                &mut *tx,
                CreateUser {
                    username,
                    email,
                    password: credential,
                },
            )
            .await?;

            Invitation::create(&mut *tx, user.id, &token_hash, expires_at).await?;

            tx.commit().await?;
            Ok::<_, sqlx::Error>(user)
        })
        .await?;

    info!(user_id = user.id, expires_at = %expires_at, "Registered user with pending invitation");

    Ok((user, invitation_token))
}

/// Redeems an invitation token and activates its user
///
/// The user row and then the invitation row are locked with
/// `SELECT ... FOR UPDATE`, so concurrent redemptions of one token serialize
/// with each other and with [`reinvite`]. The first commits and deletes the
/// invitation; every later one finds nothing.
///
/// # Errors
///
/// - `NotFound`: unknown, malformed, expired or already-used token (the user
///   is left untouched)
/// - `Internal`: storage failure or timeout
pub async fn activate(db: &Database, plaintext_token: &str) -> DomainResult<User> {
    if !token::is_well_formed(plaintext_token) {
        debug!("Rejected malformed invitation token");
        return Err(DomainError::not_found("Invitation not found or expired"));
    }

    let token_hash = token::hash_token(plaintext_token);

    let activated = db
        .run(async {
            let mut tx = db.pool().begin().await?;

            let Some(pending) = Invitation::find_valid(&mut *tx, &token_hash).await? else {
                return Ok::<_, sqlx::Error>(None);
            };

            // User first, then invitation: the same order reinvite takes
            if User::lock(&mut *tx, pending.user_id).await?.is_none() {
                return Ok(None);
            }
            let Some(invitation) = Invitation::find_valid_for_update(&mut *tx, &token_hash).await? else {
                return Ok(None);
            };
            let Some(user) = User::activate(&mut *tx, invitation.user_id).await? else {
                return Ok(None);
            };
            Invitation::delete_for_user(&mut *tx, invitation.user_id).await?;

            tx.commit().await?;
            Ok(Some(user))
        })
        .await?;

    match activated {
        Some(user) => {
            info!(user_id = user.id, "Activated user");
            Ok(user)
        }
        None => {
            debug!("Invitation token did not match a pending invitation");
            Err(DomainError::not_found("Invitation not found or expired"))
        }
    }
}

/// Issues a fresh invitation for a registered but inactive user
///
/// Any previous token for the user stops working. Returns `None` when the
/// email is unknown or the account is already active, so callers can answer
/// uniformly without revealing which.
///
/// The user row is locked before the invitation is written, so an activation
/// committing first is seen here as an active account.
pub async fn reinvite(
    db: &Database,
    email: &str,
    invitation_ttl: Duration,
) -> DomainResult<Option<(User, PlaintextToken)>> {
    let invitation_token = generate_token();
    let token_hash = invitation_token.hash();
    let expires_at = Utc::now() + invitation_ttl;

    let user = db
        .run(async {
            let mut tx = db.pool().begin().await?;

            let user = match User::lock_by_email(&mut *tx, email).await? {
                Some(user) if !user.is_active => user,
                _ => return Ok::<_, sqlx::Error>(None),
            };

            Invitation::replace(&mut *tx, user.id, &token_hash, expires_at).await?;

            tx.commit().await?;
            Ok(Some(user))
        })
        .await?;

    match user {
        Some(user) => {
            info!(user_id = user.id, expires_at = %expires_at, "Reissued invitation");
            Ok(Some((user, invitation_token)))
        }
        None => {
            debug!("Skipped reinvite for unknown or active account");
            Ok(None)
        }
    }
}

/// Checks login credentials
///
/// # Errors
///
/// `Unauthorized` for an unknown email, an inactive account or a wrong
/// password, without distinguishing between them.
pub async fn authenticate(db: &Database, email: &str, password: &str) -> DomainResult<User> {
    let user = db.run(User::find_by_email(db.pool(), email)).await?;

    let Some(user) = user else {
        warn!("Login attempt for unknown email");
        return Err(DomainError::Unauthorized);
    };

    if !user.is_active {
        warn!(user_id = user.id, "Login attempt for inactive account");
        return Err(DomainError::Unauthorized);
    }

    let credential = user.password.clone();
    let password = password.to_owned();
    let verified = tokio::task::spawn_blocking(move || credential.verify(&password))
        .await
        .map_err(DomainError::internal)?;

    if !verified {
        warn!(user_id = user.id, "Login attempt with wrong password");
        return Err(DomainError::Unauthorized);
    }

    debug!(user_id = user.id, "Credentials verified");
    Ok(user)
}
