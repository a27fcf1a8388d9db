//! Periodic removal of expired sessions.

use gatehouse_session::SessionStore;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

/// Spawns a task deleting expired sessions every `interval`, starting
/// immediately.
///
/// Failures are logged and retried on the next tick.
pub fn spawn_session_cleanup(store: Arc<dyn SessionStore>, interval: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(interval);
        let mut first_run = true;
        loop {
            interval.tick().await;
            match store.delete_expired().await {
                Ok(count) if count > 0 => {
                    if first_run {
                        tracing::info!(
                            deleted_sessions = count,
                            "Cleaned up expired sessions on startup"
                        );
                    } else {
                        tracing::debug!(deleted_sessions = count, "Periodic session cleanup");
                    }
                }
                Ok(_) => {}
                Err(e) => {
                    tracing::warn!(error = %e, "Failed to cleanup expired sessions");
                }
            }
            first_run = false;
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use gatehouse_core::SessionId;
    use gatehouse_session::{MemorySessionStore, SessionData};

    #[tokio::test(start_paused = true)]
    async fn removes_expired_sessions_on_start() {
        let store = Arc::new(MemorySessionStore::new());
        store
            .insert_raw(
                &SessionId::from("expired"),
                SessionData::new().to_payload().expect("encode"),
                chrono::Utc::now() - chrono::Duration::minutes(1),
            )
            .await;
        store
            .set(
                &SessionId::from("live"),
                &SessionData::new(),
                chrono::Duration::days(1),
            )
            .await
            .expect("set");

        let handle = spawn_session_cleanup(store.clone(), Duration::from_secs(900));
        tokio::time::sleep(Duration::from_millis(10)).await;

        assert_eq!(store.len().await, 1);
        handle.abort();
    }
}
