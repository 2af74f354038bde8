//! Persistence for users and sessions.
//!
//! Handlers only talk to the [`Store`] trait. [`MemoryStore`] keeps everything
//! in process and is the default; [`PgStore`] backs the same operations with
//! Postgres when a DSN is configured.
//!
//! Raw session ids and reset tokens never reach a store: callers pass the
//! SHA-256 hash and keep the raw value for the client.

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: Uuid,
    /// Normalized (trimmed, lowercased) email.
    pub email: String,
    /// Argon2id PHC string.
    pub password_hash: String,
    pub reset_token_hash: Option<Vec<u8>>,
    pub created_at: DateTime<Utc>,
}

/// A stored session joined with the user it belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionRecord {
    pub user_id: Uuid,
    pub email: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Unique key already taken (email or session hash).
    #[error("record already exists")]
    Conflict,
    #[error(transparent)]
    Unavailable(#[from] anyhow::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

#[async_trait]
pub trait Store: Send + Sync {
    /// Short backend name reported by `/health`.
    fn backend(&self) -> &'static str;

    async fn ping(&self) -> StoreResult<()>;

    async fn create_user(&self, email: &str, password_hash: &str) -> StoreResult<User>;

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>>;

    async fn find_user_by_id(&self, id: Uuid) -> StoreResult<Option<User>>;

    /// Replace the pending reset token of a user.
    async fn set_reset_token(&self, user_id: Uuid, token_hash: &[u8]) -> StoreResult<()>;

    /// Swap the password hash if `token_hash` matches the pending reset token,
    /// clearing the token in the same step.
    ///
    /// Returns `false` when no matching token is pending.
    async fn consume_reset_token(
        &self,
        user_id: Uuid,
        token_hash: &[u8],
        password_hash: &str,
    ) -> StoreResult<bool>;

    async fn insert_session(&self, token_hash: &[u8], user_id: Uuid) -> StoreResult<()>;

    async fn lookup_session(&self, token_hash: &[u8]) -> StoreResult<Option<SessionRecord>>;

    /// Returns `true` if a session was removed.
    async fn delete_session(&self, token_hash: &[u8]) -> StoreResult<bool>;

    /// Revoke every session of a user, returning how many were removed.
    async fn delete_user_sessions(&self, user_id: Uuid) -> StoreResult<u64>;
}
