//! Session data and its persisted representation.
//!
//! Session data is a free-form map of string keys to JSON values. When it is
//! written to a store it is wrapped in a versioned envelope:
//!
//! ```json
//! { "version": 1, "data": { "auth.user": { "id": "..." } } }
//! ```
//!
//! Payloads with a version this build does not understand are rejected
//! rather than guessed at, so a format change cannot silently corrupt
//! sessions written by another deployment.

use chrono::{DateTime, Utc};
use rootcause::prelude::Report;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::StoreError;

/// Current version of the persisted session payload.
pub const PAYLOAD_VERSION: u32 = 1;

/// The stored envelope; `D` is borrowed when encoding and owned when decoding.
#[derive(Serialize, Deserialize)]
struct Payload<D> {
    version: u32,
    data: D,
}

/// Key-value state attached to a session.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionData(Map<String, Value>);

impl SessionData {
    /// Creates empty session data.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the value stored under `key`, deserialized as `T`.
    ///
    /// A value that does not deserialize as `T` reads as absent.
    #[must_use]
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let value = self.0.get(key)?;
        serde_json::from_value(value.clone()).ok()
    }

    /// Returns true if a value is stored under `key`.
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    /// Stores `value` under `key`, replacing any previous value.
    ///
    /// # Errors
    ///
    /// Returns an error if `value` cannot be represented as JSON.
    pub fn insert<T: Serialize>(&mut self, key: &str, value: &T) -> Result<(), serde_json::Error> {
        let value = serde_json::to_value(value)?;
        self.0.insert(key.to_string(), value);
        Ok(())
    }

    /// Removes the value under `key`, returning it deserialized as `T`.
    ///
    /// The entry is removed even if it does not deserialize as `T`.
    pub fn remove<T: DeserializeOwned>(&mut self, key: &str) -> Option<T> {
        let value = self.0.remove(key)?;
        serde_json::from_value(value).ok()
    }

    /// Removes every entry.
    pub fn clear(&mut self) {
        self.0.clear();
    }

    /// Returns true if no entries are stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Encodes the data as a versioned payload.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Encoding` if serialization fails.
    pub fn to_payload(&self) -> Result<Value, Report<StoreError>> {
        let payload = Payload {
            version: PAYLOAD_VERSION,
            data: &self.0,
        };
        let value = serde_json::to_value(payload).map_err(|e| StoreError::Encoding {
            details: e.to_string(),
        })?;
        Ok(value)
    }

    /// Decodes a versioned payload.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::UnsupportedPayload` for an unknown version and
    /// `StoreError::Encoding` if the value is not a payload envelope at all.
    pub fn from_payload(value: Value) -> Result<Self, Report<StoreError>> {
        let payload: Payload<Map<String, Value>> =
            serde_json::from_value(value).map_err(|e| StoreError::Encoding {
                details: e.to_string(),
            })?;

        if payload.version != PAYLOAD_VERSION {
            return Err(StoreError::UnsupportedPayload {
                version: payload.version,
            }
            .into());
        }

        Ok(Self(payload.data))
    }
}

/// Session data as loaded from a store, with its expiry.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionRecord {
    /// The session's key-value state.
    pub data: SessionData,
    /// When the store will stop returning this record.
    pub expires_at: DateTime<Utc>,
}

impl SessionRecord {
    /// Returns true if the record has expired.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        Utc::now() >= self.expires_at
    }
}
