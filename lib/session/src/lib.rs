//! Session state for the gatehouse gateway.
//!
//! This crate provides:
//! - The `User` representation mapped from identity provider claims
//! - `SessionData` and `SessionRecord`, the key-value bag kept per session
//! - The versioned payload envelope that records are persisted as
//! - The `SessionStore` contract with PostgreSQL and in-memory implementations
//!
//! # Example
//!
//! ```
//! use gatehouse_session::{SessionData, User};
//!
//! let user = User::new("sub-123", Some("Alice".to_string()), vec!["alice@example.com".to_string()])
//!     .expect("subject is present");
//!
//! let mut data = SessionData::new();
//! data.insert("auth.user", &user).expect("user serializes");
//!
//! let restored: User = data.get("auth.user").expect("user present");
//! assert_eq!(restored.id(), "sub-123");
//! ```

pub mod error;
pub mod memory;
pub mod postgres;
pub mod record;
pub mod store;
pub mod user;

pub use error::StoreError;
pub use memory::MemorySessionStore;
pub use postgres::PgSessionStore;
pub use record::{PAYLOAD_VERSION, SessionData, SessionRecord};
pub use store::SessionStore;
pub use user::User;
