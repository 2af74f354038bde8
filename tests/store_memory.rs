//! `MemoryStore` against the shared store checks.

#[path = "support/contract.rs"]
mod contract;

use anyhow::Result;
use session_auth::store::{MemoryStore, Store};

#[tokio::test]
async fn ping_succeeds() -> Result<()> {
    contract::ping_succeeds(&MemoryStore::new()).await
}

#[tokio::test]
async fn duplicate_email_conflicts() -> Result<()> {
    contract::duplicate_email_conflicts(&MemoryStore::new()).await
}

#[tokio::test]
async fn users_found_by_email_and_id() -> Result<()> {
    contract::users_found_by_email_and_id(&MemoryStore::new()).await
}

#[tokio::test]
async fn reset_token_is_single_use() -> Result<()> {
    contract::reset_token_is_single_use(&MemoryStore::new()).await
}

#[tokio::test]
async fn sessions_join_their_user() -> Result<()> {
    contract::sessions_join_their_user(&MemoryStore::new()).await
}

#[tokio::test]
async fn user_sessions_revoked_per_user() -> Result<()> {
    contract::user_sessions_revoked_per_user(&MemoryStore::new()).await
}

#[tokio::test]
async fn all_checks_share_one_store() -> Result<()> {
    let store = MemoryStore::new();
    assert_eq!(store.backend(), "memory");
    contract::run_all(&store).await
}
