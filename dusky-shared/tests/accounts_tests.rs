/// Integration tests for the account lifecycle
///
/// Run with: cargo test --test accounts_tests

mod common;

use chrono::Duration;
use common::{fast_params, invitation_count, new_account, unique, PASSWORD};
use dusky_shared::accounts::{activate, authenticate, register_and_invite, reinvite};
use dusky_shared::auth::token::{hash_token, TOKEN_LENGTH};
use dusky_shared::error::DomainError;
use dusky_shared::models::invitation::Invitation;
use dusky_shared::models::user::User;

#[tokio::test]
async fn test_registration_then_activation() {
    let db = common::setup().await;
    let name = unique("alice");

    let (user, token) = register_and_invite(&db, new_account(&name), Duration::hours(24), &fast_params())
        .await
        .expect("Registration failed");

    assert!(!user.is_active);
    assert_eq!(user.username, name);
    assert_eq!(token.expose().len(), TOKEN_LENGTH);
    assert!(user.password.verify(PASSWORD));
    assert!(!user.password.as_hash().contains(PASSWORD));

    let invitation = Invitation::find_by_user(db.pool(), user.id)
        .await
        .unwrap()
        .expect("Invitation should exist");
    assert_eq!(invitation.token_hash, hash_token(token.expose()));
    assert_ne!(invitation.token_hash.as_str(), token.expose());
    assert!(invitation.expires_at > chrono::Utc::now() + Duration::hours(23));

    let activated = activate(&db, token.expose()).await.expect("Activation failed");
    assert_eq!(activated.id, user.id);
    assert!(activated.is_active);
    assert_eq!(invitation_count(&db, user.id).await, 0);

    let again = activate(&db, token.expose()).await;
    assert!(matches!(again, Err(DomainError::NotFound(_))));
}

#[tokio::test]
async fn test_duplicate_email_conflicts_and_persists_nothing() {
    let db = common::setup().await;
    let (first, _) = common::register(&db).await;

    let mut duplicate = new_account(&unique("bob"));
    duplicate.email = first.email.to_uppercase();

    let result = register_and_invite(&db, duplicate.clone(), Duration::hours(24), &fast_params()).await;
    assert!(matches!(result, Err(DomainError::Conflict(ref m)) if m.contains("Email")));

    let leaked: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE username = $1")
        .bind(&duplicate.username)
        .fetch_one(db.pool())
        .await
        .unwrap();
    assert_eq!(leaked, 0);
}

#[tokio::test]
async fn test_duplicate_username_conflicts() {
    let db = common::setup().await;
    let (first, _) = common::register(&db).await;

    let mut duplicate = new_account(&unique("carol"));
    duplicate.username = first.username.clone();

    let result = register_and_invite(&db, duplicate, Duration::hours(24), &fast_params()).await;
    assert!(matches!(result, Err(DomainError::Conflict(ref m)) if m.contains("Username")));
}

#[tokio::test]
async fn test_unknown_and_malformed_tokens_are_not_found() {
    let db = common::setup().await;
    let (user, _) = common::register(&db).await;

    let zeros = "0".repeat(TOKEN_LENGTH);
    for token in ["", "not-a-token", zeros.as_str()] {
        let result = activate(&db, token).await;
        assert!(matches!(result, Err(DomainError::NotFound(_))), "token {:?}", token);
    }

    let unchanged = User::find_by_id(db.pool(), user.id).await.unwrap().unwrap();
    assert!(!unchanged.is_active);
    assert_eq!(invitation_count(&db, user.id).await, 1);
}

#[tokio::test]
async fn test_expired_token_is_not_found() {
    let db = common::setup().await;
    let (user, token) = register_and_invite(
        &db,
        new_account(&unique("late")),
        Duration::seconds(-1),
        &fast_params(),
    )
    .await
    .unwrap();

    let result = activate(&db, token.expose()).await;
    assert!(matches!(result, Err(DomainError::NotFound(_))));

    let unchanged = User::find_by_id(db.pool(), user.id).await.unwrap().unwrap();
    assert!(!unchanged.is_active);
    assert_eq!(invitation_count(&db, user.id).await, 1);
}

#[tokio::test]
async fn test_concurrent_activation_succeeds_once() {
    let db = common::setup().await;
    let (user, token) = common::register(&db).await;

    let attempts = (0..4).map(|_| {
        let db = db.clone();
        let token = token.expose().to_string();
        tokio::spawn(async move { activate(&db, &token).await })
    });

    let results = futures::future::join_all(attempts).await;
    let outcomes: Vec<_> = results.into_iter().map(|r| r.unwrap()).collect();

    let successes = outcomes.iter().filter(|r| r.is_ok()).count();
    let not_found = outcomes
        .iter()
        .filter(|r| matches!(r, Err(DomainError::NotFound(_))))
        .count();

    assert_eq!(successes, 1);
    assert_eq!(not_found, outcomes.len() - 1);
    assert_eq!(invitation_count(&db, user.id).await, 0);
}

#[tokio::test]
async fn test_reinvite_replaces_token() {
    let db = common::setup().await;
    let (user, old_token) = common::register(&db).await;

    let (reinvited, new_token) = reinvite(&db, &user.email, Duration::hours(24))
        .await
        .unwrap()
        .expect("Inactive user should be reinvited");
    assert_eq!(reinvited.id, user.id);
    assert_ne!(new_token.expose(), old_token.expose());
    assert_eq!(invitation_count(&db, user.id).await, 1);

    assert!(matches!(
        activate(&db, old_token.expose()).await,
        Err(DomainError::NotFound(_))
    ));
    assert!(activate(&db, new_token.expose()).await.is_ok());

    let after_activation = reinvite(&db, &user.email, Duration::hours(24)).await.unwrap();
    assert!(after_activation.is_none());

    let unknown = reinvite(&db, "nobody@example.invalid", Duration::hours(24)).await.unwrap();
    assert!(unknown.is_none());
}

#[tokio::test]
async fn test_reinvite_waits_for_in_flight_activation() {
    let db = common::setup().await;
    let (user, token) = common::register(&db).await;

    // Hold the activation locks the way `activate` takes them
    let mut tx = db.pool().begin().await.unwrap();
    User::lock(&mut *tx, user.id).await.unwrap().expect("User should exist");
    let invitation = Invitation::find_valid_for_update(&mut *tx, &hash_token(token.expose()))
        .await
        .unwrap()
        .expect("Invitation should be pending");

    let pending = tokio::spawn({
        let db = db.clone();
        let email = user.email.clone();
        async move { reinvite(&db, &email, Duration::hours(24)).await }
    });
    tokio::time::sleep(std::time::Duration::from_millis(300)).await;
    assert!(!pending.is_finished(), "reinvite should block on the user row");

    User::activate(&mut *tx, invitation.user_id)
        .await
        .unwrap()
        .expect("Inactive user should activate");
    Invitation::delete_for_user(&mut *tx, invitation.user_id).await.unwrap();
    tx.commit().await.unwrap();

    let reinvited = pending.await.unwrap().unwrap();
    assert!(reinvited.is_none());

    let stored = User::find_by_id(db.pool(), user.id).await.unwrap().unwrap();
    assert!(stored.is_active);
    assert_eq!(invitation_count(&db, user.id).await, 0);
}

#[tokio::test]
async fn test_activation_waits_for_in_flight_reinvite() {
    let db = common::setup().await;
    let (user, old_token) = common::register(&db).await;

    let mut tx = db.pool().begin().await.unwrap();
    User::lock_by_email(&mut *tx, &user.email)
        .await
        .unwrap()
        .expect("User should exist");
    let fresh = dusky_shared::auth::token::generate_token();
    Invitation::replace(&mut *tx, user.id, &fresh.hash(), chrono::Utc::now() + Duration::hours(24))
        .await
        .unwrap();

    let pending = tokio::spawn({
        let db = db.clone();
        let token = old_token.expose().to_string();
        async move { activate(&db, &token).await }
    });
    tokio::time::sleep(std::time::Duration::from_millis(300)).await;
    assert!(!pending.is_finished(), "activation should block on the user row");
    tx.commit().await.unwrap();

    let result = pending.await.unwrap();
    assert!(matches!(result, Err(DomainError::NotFound(_))));

    let stored = User::find_by_id(db.pool(), user.id).await.unwrap().unwrap();
    assert!(!stored.is_active);
    assert_eq!(invitation_count(&db, user.id).await, 1);

    activate(&db, fresh.expose()).await.expect("Fresh token should activate");
}

#[tokio::test]
async fn test_active_user_cannot_be_activated_again() {
    let db = common::setup().await;
    let user = common::active_user(&db).await;

    let again = User::activate(db.pool(), user.id).await.unwrap();
    assert!(again.is_none());

    // A stray invitation for an active user still cannot activate it
    let stray = dusky_shared::auth::token::generate_token();
    Invitation::create(db.pool(), user.id, &stray.hash(), chrono::Utc::now() + Duration::hours(1))
        .await
        .unwrap();
    assert!(matches!(
        activate(&db, stray.expose()).await,
        Err(DomainError::NotFound(_))
    ));
    assert_eq!(invitation_count(&db, user.id).await, 1);
}

#[tokio::test]
async fn test_failed_invitation_insert_rolls_back_user() {
    let db = common::setup().await;

    // Rejects invitations only for users whose name carries the marker
    sqlx::query(
        r#"
        CREATE OR REPLACE FUNCTION reject_marked_invitation() RETURNS trigger AS $$
        BEGIN
            IF EXISTS (SELECT 1 FROM users WHERE id = NEW.user_id AND username LIKE 'noinvite\_%') THEN
                RAISE EXCEPTION 'invitation rejected';
            END IF;
            RETURN NEW;
        END
        $$ LANGUAGE plpgsql
        "#,
    )
    .execute(db.pool())
    .await
    .unwrap();

    // Installed once per database; the trigger only matches marked names
    let installed: bool = sqlx::query_scalar(
        "SELECT EXISTS (SELECT 1 FROM pg_trigger WHERE tgname = 'reject_marked_invitation')",
    )
    .fetch_one(db.pool())
    .await
    .unwrap();
    if !installed {
        sqlx::query(
            "CREATE TRIGGER reject_marked_invitation BEFORE INSERT ON user_invitations \
             FOR EACH ROW EXECUTE FUNCTION reject_marked_invitation()",
        )
        .execute(db.pool())
        .await
        .unwrap();
    }

    let account = new_account(&unique("noinvite"));
    let result = register_and_invite(&db, account.clone(), Duration::hours(24), &fast_params()).await;
    assert!(matches!(result, Err(DomainError::Internal(_))));

    let leaked: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE username = $1")
        .bind(&account.username)
        .fetch_one(db.pool())
        .await
        .unwrap();
    assert_eq!(leaked, 0);

    let unaffected = register_and_invite(
        &db,
        new_account(&unique("invited")),
        Duration::hours(24),
        &fast_params(),
    )
    .await;
    assert!(unaffected.is_ok());
}

#[tokio::test]
async fn test_authenticate() {
    let db = common::setup().await;
    let (user, token) = common::register(&db).await;

    assert!(matches!(
        authenticate(&db, &user.email, PASSWORD).await,
        Err(DomainError::Unauthorized)
    ));

    activate(&db, token.expose()).await.unwrap();

    let logged_in = authenticate(&db, &user.email, PASSWORD).await.unwrap();
    assert_eq!(logged_in.id, user.id);

    assert!(matches!(
        authenticate(&db, &user.email, "wrong password").await,
        Err(DomainError::Unauthorized)
    ));
    assert!(matches!(
        authenticate(&db, "nobody@example.invalid", PASSWORD).await,
        Err(DomainError::Unauthorized)
    ));
}
