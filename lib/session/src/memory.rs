//! In-process session store.
//!
//! Records are kept as encoded payloads, so this store goes through the same
//! versioned encoding as the PostgreSQL store. Sessions do not survive a
//! restart; use it for tests and throwaway local runs.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use gatehouse_core::SessionId;
use rootcause::prelude::Report;
use serde_json::Value;
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::warn;

use crate::error::StoreError;
use crate::record::{SessionData, SessionRecord};
use crate::store::SessionStore;

struct StoredSession {
    payload: Value,
    expires_at: DateTime<Utc>,
}

/// Session store backed by a map in process memory.
#[derive(Default)]
pub struct MemorySessionStore {
    sessions: RwLock<HashMap<SessionId, StoredSession>>,
}

impl MemorySessionStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of stored sessions, expired ones included.
    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Returns true if no sessions are stored.
    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }

    /// Stores a raw payload as-is, bypassing encoding.
    ///
    /// Lets callers seed records written by another version of the payload format.
    pub async fn insert_raw(&self, id: &SessionId, payload: Value, expires_at: DateTime<Utc>) {
        self.sessions.write().await.insert(
            id.clone(),
            StoredSession {
                payload,
                expires_at,
            },
        );
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn get(&self, id: &SessionId) -> Result<Option<SessionRecord>, Report<StoreError>> {
        let sessions = self.sessions.read().await;
        let Some(stored) = sessions.get(id) else {
            return Ok(None);
        };

        if Utc::now() >= stored.expires_at {
            return Ok(None);
        }

        match SessionData::from_payload(stored.payload.clone()) {
            Ok(data) => Ok(Some(SessionRecord {
                data,
                expires_at: stored.expires_at,
            })),
            Err(e) => {
                warn!(error = %e, "Ignoring undecodable session payload");
                Ok(None)
            }
        }
    }

    async fn set(
        &self,
        id: &SessionId,
        data: &SessionData,
        ttl: Duration,
    ) -> Result<(), Report<StoreError>> {
        let payload = data.to_payload()?;
        self.sessions.write().await.insert(
            id.clone(),
            StoredSession {
                payload,
                expires_at: Utc::now() + ttl,
            },
        );
        Ok(())
    }

    async fn touch(&self, id: &SessionId, ttl: Duration) -> Result<(), Report<StoreError>> {
        if let Some(stored) = self.sessions.write().await.get_mut(id) {
            stored.expires_at = Utc::now() + ttl;
        }
        Ok(())
    }

    async fn destroy(&self, id: &SessionId) -> Result<(), Report<StoreError>> {
        self.sessions.write().await.remove(id);
        Ok(())
    }

    async fn delete_expired(&self) -> Result<u64, Report<StoreError>> {
        let now = Utc::now();
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, stored| stored.expires_at > now);
        Ok((before - sessions.len()) as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn id(s: &str) -> SessionId {
        SessionId::from(s)
    }

    fn data_with(key: &str, value: &str) -> SessionData {
        let mut data = SessionData::new();
        data.insert(key, &value).expect("insert");
        data
    }

    #[tokio::test]
    async fn get_unknown_is_none() {
        let store = MemorySessionStore::new();
        assert!(store.get(&id("missing")).await.expect("get").is_none());
    }

    #[tokio::test]
    async fn set_then_get_returns_data() {
        let store = MemorySessionStore::new();
        let data = data_with("auth.next", "/x");

        store
            .set(&id("a"), &data, Duration::hours(1))
            .await
            .expect("set");

        let record = store.get(&id("a")).await.expect("get").expect("present");
        assert_eq!(record.data, data);
        assert!(record.expires_at > Utc::now());
    }

    #[tokio::test]
    async fn expired_sessions_read_as_absent() {
        let store = MemorySessionStore::new();
        store
            .set(&id("a"), &data_with("k", "v"), Duration::seconds(-1))
            .await
            .expect("set");

        assert!(store.get(&id("a")).await.expect("get").is_none());
    }

    #[tokio::test]
    async fn set_refreshes_expiry() {
        let store = MemorySessionStore::new();
        store
            .set(&id("a"), &data_with("k", "v"), Duration::seconds(-1))
            .await
            .expect("set");
        store
            .set(&id("a"), &data_with("k", "v"), Duration::hours(1))
            .await
            .expect("set");

        assert!(store.get(&id("a")).await.expect("get").is_some());
    }

    #[tokio::test]
    async fn touch_extends_without_rewriting() {
        let store = MemorySessionStore::new();
        let data = data_with("k", "v");
        store
            .set(&id("a"), &data, Duration::minutes(1))
            .await
            .expect("set");
        let before = store.get(&id("a")).await.expect("get").expect("present");

        store
            .touch(&id("a"), Duration::days(30))
            .await
            .expect("touch");

        let after = store.get(&id("a")).await.expect("get").expect("present");
        assert!(after.expires_at > before.expires_at);
        assert_eq!(after.data, data);
    }

    #[tokio::test]
    async fn touch_unknown_is_noop() {
        let store = MemorySessionStore::new();
        store
            .touch(&id("ghost"), Duration::days(1))
            .await
            .expect("touch");
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn destroy_is_idempotent() {
        let store = MemorySessionStore::new();
        store
            .set(&id("a"), &data_with("k", "v"), Duration::hours(1))
            .await
            .expect("set");

        store.destroy(&id("a")).await.expect("first destroy");
        store.destroy(&id("a")).await.expect("second destroy");
        assert!(store.get(&id("a")).await.expect("get").is_none());
    }

    #[tokio::test]
    async fn unknown_payload_version_reads_as_absent() {
        let store = MemorySessionStore::new();
        store
            .insert_raw(
                &id("old"),
                json!({ "version": 0, "data": { "auth.user": "{\"id\":\"x\"}" } }),
                Utc::now() + Duration::hours(1),
            )
            .await;

        assert!(store.get(&id("old")).await.expect("get").is_none());
    }

    #[tokio::test]
    async fn delete_expired_prunes_only_expired() {
        let store = MemorySessionStore::new();
        store
            .set(&id("live"), &data_with("k", "v"), Duration::hours(1))
            .await
            .expect("set");
        store
            .set(&id("dead"), &data_with("k", "v"), Duration::seconds(-5))
            .await
            .expect("set");

        let removed = store.delete_expired().await.expect("prune");
        assert_eq!(removed, 1);
        assert_eq!(store.len().await, 1);
        assert!(store.get(&id("live")).await.expect("get").is_some());
    }
}
