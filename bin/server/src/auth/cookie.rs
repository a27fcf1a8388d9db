//! Session cookie attributes and signing key.

use axum_extra::extract::cookie::{Cookie, Key, SameSite};
use gatehouse_core::SessionId;
use rootcause::prelude::Report;

use crate::config::MIN_COOKIE_SECRET_BYTES;
use crate::error::ConfigurationError;

/// Session cookie name.
pub const SESSION_COOKIE: &str = "gatehouse.sid";

/// How session cookies are signed and which attributes they carry.
///
/// Every session cookie is `HttpOnly`, `SameSite=Lax` and scoped to `/`.
/// `Secure` is set unless the gateway runs in dev mode.
#[derive(Clone)]
pub struct CookieSettings {
    key: Key,
    secure: bool,
    max_age: time::Duration,
}

impl CookieSettings {
    /// Derives the signing key from `secret`.
    ///
    /// # Errors
    ///
    /// Returns an error if the secret is shorter than
    /// [`MIN_COOKIE_SECRET_BYTES`].
    pub fn new(
        secret: &str,
        secure: bool,
        max_age: time::Duration,
    ) -> Result<Self, Report<ConfigurationError>> {
        if secret.len() < MIN_COOKIE_SECRET_BYTES {
            return Err(ConfigurationError::Invalid {
                field: "cookie_secret",
                reason: format!("must be at least {MIN_COOKIE_SECRET_BYTES} bytes"),
            }
            .into());
        }

        Ok(Self {
            key: Key::derive_from(secret.as_bytes()),
            secure,
            max_age,
        })
    }

    /// Returns the signing key.
    pub fn key(&self) -> &Key {
        &self.key
    }

    /// Builds the cookie carrying `id`.
    pub fn session_cookie(&self, id: &SessionId) -> Cookie<'static> {
        let mut cookie = self.base(id.as_str().to_string());
        cookie.set_max_age(self.max_age);
        cookie
    }

    /// Builds a cookie telling the browser to drop the session cookie.
    ///
    /// The value is empty and unsigned; it is sent through a plain jar.
    pub fn removal_cookie(&self) -> Cookie<'static> {
        let mut cookie = self.base(String::new());
        cookie.make_removal();
        cookie
    }

    fn base(&self, value: String) -> Cookie<'static> {
        let mut cookie = Cookie::new(SESSION_COOKIE, value);
        cookie.set_path("/");
        cookie.set_http_only(true);
        cookie.set_secure(self.secure);
        cookie.set_same_site(SameSite::Lax);
        cookie
    }
}

impl std::fmt::Debug for CookieSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CookieSettings")
            .field("secure", &self.secure)
            .field("max_age", &self.max_age)
            .finish_non_exhaustive()
    }
}
