//! PostgreSQL-backed session store.
//!
//! Sessions live in a single table keyed by session ID:
//!
//! | Column | Type        | Description                         |
//! |--------|-------------|-------------------------------------|
//! | sid    | TEXT (PK)   | Session ID                          |
//! | sess   | JSONB       | Versioned session payload           |
//! | expire | TIMESTAMPTZ | When the session stops being valid  |
//!
//! The schema is created by the server's migrations.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use gatehouse_core::SessionId;
use rootcause::prelude::Report;
use sqlx::{FromRow, PgPool};
use tracing::warn;

use crate::error::StoreError;
use crate::record::{SessionData, SessionRecord};
use crate::store::SessionStore;

/// Row type for session queries.
#[derive(FromRow)]
struct SessionRow {
    sess: serde_json::Value,
    expire: DateTime<Utc>,
}

impl SessionRow {
    /// Decodes the row, treating payloads from unknown formats as absent.
    fn into_record(self) -> Option<SessionRecord> {
        match SessionData::from_payload(self.sess) {
            Ok(data) => Some(SessionRecord {
                data,
                expires_at: self.expire,
            }),
            Err(e) => {
                warn!(error = %e, "Ignoring undecodable session payload");
                None
            }
        }
    }
}

fn unavailable(e: sqlx::Error) -> StoreError {
    StoreError::Unavailable {
        details: e.to_string(),
    }
}

/// Session store backed by a PostgreSQL connection pool.
#[derive(Clone)]
pub struct PgSessionStore {
    pool: PgPool,
}

impl PgSessionStore {
    /// Creates a session store over the given pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SessionStore for PgSessionStore {
    async fn get(&self, id: &SessionId) -> Result<Option<SessionRecord>, Report<StoreError>> {
        let row: Option<SessionRow> = sqlx::query_as(
            r#"
            SELECT sess, expire
            FROM session
            WHERE sid = $1 AND expire > NOW()
            "#,
        )
        .bind(id.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(unavailable)?;

        Ok(row.and_then(SessionRow::into_record))
    }

    async fn set(
        &self,
        id: &SessionId,
        data: &SessionData,
        ttl: Duration,
    ) -> Result<(), Report<StoreError>> {
        let payload = data.to_payload()?;
        sqlx::query(
            r#"
            INSERT INTO session (sid, sess, expire)
            VALUES ($1, $2, $3)
            ON CONFLICT (sid) DO UPDATE
            SET sess = EXCLUDED.sess, expire = EXCLUDED.expire
            "#,
        )
        .bind(id.as_str())
        .bind(payload)
        .bind(Utc::now() + ttl)
        .execute(&self.pool)
        .await
        .map_err(unavailable)?;

        Ok(())
    }

    async fn touch(&self, id: &SessionId, ttl: Duration) -> Result<(), Report<StoreError>> {
        sqlx::query(
            r#"
            UPDATE session
            SET expire = $2
            WHERE sid = $1
            "#,
        )
        .bind(id.as_str())
        .bind(Utc::now() + ttl)
        .execute(&self.pool)
        .await
        .map_err(unavailable)?;

        Ok(())
    }

    async fn destroy(&self, id: &SessionId) -> Result<(), Report<StoreError>> {
        sqlx::query(
            r#"
            DELETE FROM session
            WHERE sid = $1
            "#,
        )
        .bind(id.as_str())
        .execute(&self.pool)
        .await
        .map_err(unavailable)?;

        Ok(())
    }

    async fn delete_expired(&self) -> Result<u64, Report<StoreError>> {
        let result = sqlx::query(
            r#"
            DELETE FROM session
            WHERE expire < NOW()
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(unavailable)?;

        Ok(result.rows_affected())
    }
}
