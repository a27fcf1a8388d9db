//! Authentication module for the gatehouse gateway.
//!
//! This module provides:
//! - The session middleware bridging the signed cookie and the session store
//! - Extractors for reading the session and the signed-in user
//! - The auth flow controller: login, password reset, callback and logout
//!
//! # Session keys
//!
//! The gateway keeps its own state in reserved session keys:
//! - [`AUTH_USER_KEY`]: the signed-in [`User`](gatehouse_session::User); a
//!   session without it is anonymous
//! - [`NEXT_KEY`]: where to send the browser after a successful callback
//! - [`PENDING_KEY`]: the in-flight
//!   [`PendingAuthorization`](gatehouse_identity::PendingAuthorization)
//!
//! This module decides only whether a session carries a user. Whether that
//! user may see a given page is the application's concern.

pub mod cookie;
pub mod middleware;
pub mod redirect;
pub mod routes;
pub mod session;

use gatehouse_identity::IdentityProvider;
use gatehouse_session::SessionStore;
use std::sync::Arc;

pub use cookie::{CookieSettings, SESSION_COOKIE};
pub use middleware::{AuthRejection, CurrentUser, RequireUser};
pub use routes::{FAILED_PATH, callback, login, logout, reset_password};
pub use session::{Session, session_layer};

/// Session key holding the signed-in user.
pub const AUTH_USER_KEY: &str = "auth.user";

/// Session key holding the post-login redirect target.
pub const NEXT_KEY: &str = "auth.next";

/// Session key holding the in-flight authorization.
pub const PENDING_KEY: &str = "auth.pending";

/// Shared application state.
pub struct AppState {
    /// Session persistence.
    pub store: Arc<dyn SessionStore>,
    /// Identity provider client.
    pub provider: Arc<dyn IdentityProvider>,
    /// Session cookie signing key and attributes.
    pub cookies: CookieSettings,
    /// Session lifetime in the store.
    pub session_ttl: chrono::Duration,
    /// Upper bound on the code exchange during a callback.
    pub provider_timeout: std::time::Duration,
}

impl AppState {
    /// Creates a new application state.
    pub fn new(
        store: Arc<dyn SessionStore>,
        provider: Arc<dyn IdentityProvider>,
        cookies: CookieSettings,
        session_ttl: chrono::Duration,
        provider_timeout: std::time::Duration,
    ) -> Self {
        Self {
            store,
            provider,
            cookies,
            session_ttl,
            provider_timeout,
        }
    }
}
