//! The session store contract.

use async_trait::async_trait;
use chrono::Duration;
use gatehouse_core::SessionId;
use rootcause::prelude::Report;

use crate::error::StoreError;
use crate::record::{SessionData, SessionRecord};

/// Durable key-value persistence for session records.
///
/// Implementations must be safe to share across concurrent requests. Writes
/// to the same session ID from concurrent requests are last-write-wins.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Loads a live session.
    ///
    /// Unknown, expired and undecodable sessions are `Ok(None)`; only a
    /// failure to reach the backing store is an error.
    async fn get(&self, id: &SessionId) -> Result<Option<SessionRecord>, Report<StoreError>>;

    /// Writes a session, setting its expiry to `ttl` from now.
    async fn set(
        &self,
        id: &SessionId,
        data: &SessionData,
        ttl: Duration,
    ) -> Result<(), Report<StoreError>>;

    /// Extends the expiry of an existing session without rewriting its data.
    async fn touch(&self, id: &SessionId, ttl: Duration) -> Result<(), Report<StoreError>>;

    /// Deletes a session. Deleting an unknown session succeeds.
    async fn destroy(&self, id: &SessionId) -> Result<(), Report<StoreError>>;

    /// Deletes every expired session, returning how many were removed.
    async fn delete_expired(&self) -> Result<u64, Report<StoreError>>;
}
