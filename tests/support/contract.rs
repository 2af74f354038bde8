//! Behavior every `Store` backend must share.
//!
//! Each check creates its own users and session hashes so the checks can run
//! one after another against a single database.

use anyhow::{Result, ensure};
use session_auth::store::{Store, StoreError};
use uuid::Uuid;

fn unique_email(prefix: &str) -> String {
    format!("{prefix}-{}@example.com", Uuid::new_v4().simple())
}

fn unique_hash() -> Vec<u8> {
    Uuid::new_v4().as_bytes().to_vec()
}

pub async fn ping_succeeds(store: &dyn Store) -> Result<()> {
    store.ping().await?;
    Ok(())
}

pub async fn duplicate_email_conflicts(store: &dyn Store) -> Result<()> {
    let email = unique_email("dup");
    store.create_user(&email, "hash").await?;

    let result = store.create_user(&email, "other").await;
    ensure!(
        matches!(result, Err(StoreError::Conflict)),
        "second user with {email} was not rejected: {result:?}"
    );
    Ok(())
}

pub async fn users_found_by_email_and_id(store: &dyn Store) -> Result<()> {
    let email = unique_email("find");
    let user = store.create_user(&email, "hash").await?;
    assert_eq!(user.email, email);
    assert_eq!(user.password_hash, "hash");
    assert_eq!(user.reset_token_hash, None);

    assert_eq!(store.find_user_by_email(&email).await?, Some(user.clone()));
    assert_eq!(store.find_user_by_id(user.id).await?, Some(user));
    assert_eq!(
        store.find_user_by_email(&unique_email("missing")).await?,
        None
    );
    assert_eq!(store.find_user_by_id(Uuid::new_v4()).await?, None);
    Ok(())
}

pub async fn reset_token_is_single_use(store: &dyn Store) -> Result<()> {
    let user = store.create_user(&unique_email("reset"), "old").await?;
    let first = unique_hash();
    let second = unique_hash();

    store.set_reset_token(user.id, &first).await?;
    let pending = store.find_user_by_id(user.id).await?;
    assert_eq!(
        pending.and_then(|u| u.reset_token_hash),
        Some(first.clone())
    );

    // A new token replaces the pending one.
    store.set_reset_token(user.id, &second).await?;
    assert!(!store.consume_reset_token(user.id, &first, "new").await?);
    assert!(!store.consume_reset_token(Uuid::new_v4(), &second, "new").await?);

    assert!(store.consume_reset_token(user.id, &second, "new").await?);
    assert!(!store.consume_reset_token(user.id, &second, "newer").await?);

    let updated = store.find_user_by_id(user.id).await?;
    assert_eq!(
        updated.as_ref().map(|u| u.password_hash.as_str()),
        Some("new")
    );
    assert_eq!(updated.and_then(|u| u.reset_token_hash), None);

    ensure!(
        store.set_reset_token(Uuid::new_v4(), &first).await.is_err(),
        "reset token stored for an unknown user"
    );
    Ok(())
}

pub async fn sessions_join_their_user(store: &dyn Store) -> Result<()> {
    let email = unique_email("session");
    let user = store.create_user(&email, "hash").await?;
    let hash = unique_hash();

    store.insert_session(&hash, user.id).await?;
    let result = store.insert_session(&hash, user.id).await;
    ensure!(
        matches!(result, Err(StoreError::Conflict)),
        "duplicate session hash was not rejected: {result:?}"
    );

    let record = store.lookup_session(&hash).await?;
    assert_eq!(record.as_ref().map(|r| r.user_id), Some(user.id));
    assert_eq!(record.map(|r| r.email), Some(email));
    assert_eq!(store.lookup_session(&unique_hash()).await?, None);

    assert!(store.delete_session(&hash).await?);
    assert!(!store.delete_session(&hash).await?);
    assert_eq!(store.lookup_session(&hash).await?, None);
    Ok(())
}

pub async fn user_sessions_revoked_per_user(store: &dyn Store) -> Result<()> {
    let alice = store.create_user(&unique_email("alice"), "hash").await?;
    let bob = store.create_user(&unique_email("bob"), "hash").await?;
    let bob_session = unique_hash();

    store.insert_session(&unique_hash(), alice.id).await?;
    store.insert_session(&unique_hash(), alice.id).await?;
    store.insert_session(&bob_session, bob.id).await?;

    assert_eq!(store.delete_user_sessions(alice.id).await?, 2);
    assert_eq!(store.delete_user_sessions(alice.id).await?, 0);

    let record = store.lookup_session(&bob_session).await?;
    assert_eq!(record.map(|r| r.user_id), Some(bob.id));
    Ok(())
}

/// Run every check in order against one store.
pub async fn run_all(store: &dyn Store) -> Result<()> {
    ping_succeeds(store).await?;
    duplicate_email_conflicts(store).await?;
    users_found_by_email_and_id(store).await?;
    reset_token_is_single_use(store).await?;
    sessions_join_their_user(store).await?;
    user_sessions_revoked_per_user(store).await?;
    Ok(())
}
