//! In-process store backed by hash maps behind a single `RwLock`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{SessionRecord, Store, StoreError, StoreResult, User};

#[derive(Debug)]
struct StoredSession {
    user_id: Uuid,
    created_at: DateTime<Utc>,
}

#[derive(Debug, Default)]
struct Inner {
    users: HashMap<Uuid, User>,
    // email -> user id
    emails: HashMap<String, Uuid>,
    sessions: HashMap<Vec<u8>, StoredSession>,
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Overwrite the creation time of a session.
    #[cfg(test)]
    pub(crate) async fn backdate_session(&self, token_hash: &[u8], created_at: DateTime<Utc>) {
        if let Some(session) = self.inner.write().await.sessions.get_mut(token_hash) {
            session.created_at = created_at;
        }
    }

    #[cfg(test)]
    pub(crate) async fn session_count(&self) -> usize {
        self.inner.read().await.sessions.len()
    }
}

#[async_trait]
impl Store for MemoryStore {
    fn backend(&self) -> &'static str {
        "memory"
    }

    async fn ping(&self) -> StoreResult<()> {
        Ok(())
    }

    async fn create_user(&self, email: &str, password_hash: &str) -> StoreResult<User> {
        let mut inner = self.inner.write().await;
        if inner.emails.contains_key(email) {
            return Err(StoreError::Conflict);
        }
        let user = User {
            id: Uuid::new_v4(),
            email: email.to_string(),
            password_hash: password_hash.to_string(),
            reset_token_hash: None,
            created_at: Utc::now(),
        };
        inner.emails.insert(user.email.clone(), user.id);
        inner.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let inner = self.inner.read().await;
        Ok(inner
            .emails
            .get(email)
            .and_then(|id| inner.users.get(id))
            .cloned())
    }

    async fn find_user_by_id(&self, id: Uuid) -> StoreResult<Option<User>> {
        Ok(self.inner.read().await.users.get(&id).cloned())
    }

    async fn set_reset_token(&self, user_id: Uuid, token_hash: &[u8]) -> StoreResult<()> {
        let mut inner = self.inner.write().await;
        let user = inner
            .users
            .get_mut(&user_id)
            .ok_or_else(|| anyhow::anyhow!("user {user_id} not found"))?;
        user.reset_token_hash = Some(token_hash.to_vec());
        Ok(())
    }

    async fn consume_reset_token(
        &self,
        user_id: Uuid,
        token_hash: &[u8],
        password_hash: &str,
    ) -> StoreResult<bool> {
        let mut inner = self.inner.write().await;
        let Some(user) = inner.users.get_mut(&user_id) else {
            return Ok(false);
        };
        if user.reset_token_hash.as_deref() != Some(token_hash) {
            return Ok(false);
        }
        user.password_hash = password_hash.to_string();
        user.reset_token_hash = None;
        Ok(true)
    }

    async fn insert_session(&self, token_hash: &[u8], user_id: Uuid) -> StoreResult<()> {
        let mut inner = self.inner.write().await;
        if inner.sessions.contains_key(token_hash) {
            return Err(StoreError::Conflict);
        }
        inner.sessions.insert(
            token_hash.to_vec(),
            StoredSession {
                user_id,
                created_at: Utc::now(),
            },
        );
        Ok(())
    }

    async fn lookup_session(&self, token_hash: &[u8]) -> StoreResult<Option<SessionRecord>> {
        let inner = self.inner.read().await;
        Ok(inner.sessions.get(token_hash).and_then(|session| {
            inner.users.get(&session.user_id).map(|user| SessionRecord {
                user_id: user.id,
                email: user.email.clone(),
                created_at: session.created_at,
            })
        }))
    }

    async fn delete_session(&self, token_hash: &[u8]) -> StoreResult<bool> {
        Ok(self.inner.write().await.sessions.remove(token_hash).is_some())
    }

    async fn delete_user_sessions(&self, user_id: Uuid) -> StoreResult<u64> {
        let mut inner = self.inner.write().await;
        let before = inner.sessions.len();
        inner.sessions.retain(|_, session| session.user_id != user_id);
        Ok((before - inner.sessions.len()) as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn backdate_session_moves_creation_time() -> anyhow::Result<()> {
        let store = MemoryStore::new();
        let user = store.create_user("a@example.com", "hash").await?;
        store.insert_session(b"s1", user.id).await?;
        assert_eq!(store.session_count().await, 1);

        let created_at = Utc::now() - chrono::Duration::days(2);
        store.backdate_session(b"s1", created_at).await;
        let record = store.lookup_session(b"s1").await?;
        assert_eq!(record.map(|r| r.created_at), Some(created_at));

        // Unknown hashes are ignored.
        store.backdate_session(b"missing", created_at).await;
        assert_eq!(store.session_count().await, 1);
        Ok(())
    }
}
