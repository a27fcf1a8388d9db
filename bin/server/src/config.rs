//! Centralized server configuration.
//!
//! This module provides strongly-typed configuration for the gateway,
//! loaded via the `config` crate from environment variables. Nested values
//! use `__` as separator, e.g. `OIDC__CLIENT_ID` or `SESSION__MAX_AGE_DAYS`.
//!
//! See [`OidcConfig`](gatehouse_identity::OidcConfig) for identity provider
//! configuration.

use gatehouse_identity::OidcConfig;
use rootcause::prelude::Report;
use serde::Deserialize;

use crate::error::ConfigurationError;

/// Minimum length of the cookie signing secret, in bytes.
pub const MIN_COOKIE_SECRET_BYTES: usize = 32;

/// Longest accepted session lifetime, in days.
pub const MAX_SESSION_AGE_DAYS: i64 = 3650;

/// Gateway configuration composed from library configs.
#[derive(Deserialize)]
pub struct ServerConfig {
    /// PostgreSQL connection URL for the session store.
    pub database_url: String,

    /// Size of the session store connection pool.
    #[serde(default = "default_database_max_connections")]
    pub database_max_connections: u32,

    /// External origin of the gateway (e.g. "https://app.example.com"),
    /// used to build the provider callback URL.
    pub origin: String,

    /// Secret the session cookie is signed with.
    pub cookie_secret: String,

    /// Port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Local development mode: allows plain-HTTP origins and drops the
    /// Secure flag from cookies.
    #[serde(default)]
    pub dev_mode: bool,

    /// Base URL of the application every non-auth request is forwarded to.
    #[serde(default = "default_upstream_url")]
    pub upstream_url: String,

    /// Session configuration.
    #[serde(default)]
    pub session: SessionConfig,

    /// OIDC authentication configuration.
    pub oidc: OidcConfig,
}

/// Session-related configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    /// Session lifetime in days, used for both cookie max-age and store expiry.
    #[serde(default = "default_max_age_days")]
    pub max_age_days: i64,

    /// Interval between expired-session cleanup runs, in seconds.
    #[serde(default = "default_cleanup_interval_seconds")]
    pub cleanup_interval_seconds: u64,
}

fn default_database_max_connections() -> u32 {
    5
}

fn default_port() -> u16 {
    3000
}

fn default_upstream_url() -> String {
    "http://127.0.0.1:3001".to_string()
}

fn default_max_age_days() -> i64 {
    30
}

fn default_cleanup_interval_seconds() -> u64 {
    900
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            max_age_days: default_max_age_days(),
            cleanup_interval_seconds: default_cleanup_interval_seconds(),
        }
    }
}

impl std::fmt::Debug for ServerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerConfig")
            .field("database_url", &"<redacted>")
            .field("database_max_connections", &self.database_max_connections)
            .field("origin", &self.origin)
            .field("cookie_secret", &"<redacted>")
            .field("port", &self.port)
            .field("dev_mode", &self.dev_mode)
            .field("upstream_url", &self.upstream_url)
            .field("session", &self.session)
            .field("oidc", &self.oidc)
            .finish()
    }
}

impl ServerConfig {
    /// Loads and validates configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if required configuration is missing or invalid.
    pub fn from_env() -> Result<Self, Report<ConfigurationError>> {
        let source = config::Config::builder()
            .add_source(
                config::Environment::default()
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| ConfigurationError::Load {
                details: e.to_string(),
            })?;

        Self::from_config(source)
    }

    /// Deserializes and validates an already-built configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if required configuration is missing or invalid.
    pub fn from_config(source: config::Config) -> Result<Self, Report<ConfigurationError>> {
        let config: Self = source
            .try_deserialize()
            .map_err(|e| ConfigurationError::Load {
                details: e.to_string(),
            })?;
        config.validate()?;
        Ok(config)
    }

    /// Checks values that deserialize fine but cannot be used.
    ///
    /// # Errors
    ///
    /// Returns the first invalid value found.
    pub fn validate(&self) -> Result<(), Report<ConfigurationError>> {
        if self.cookie_secret.len() < MIN_COOKIE_SECRET_BYTES {
            return Err(ConfigurationError::Invalid {
                field: "cookie_secret",
                reason: format!("must be at least {MIN_COOKIE_SECRET_BYTES} bytes"),
            }
            .into());
        }

        let origin =
            reqwest::Url::parse(&self.origin).map_err(|e| ConfigurationError::Invalid {
                field: "origin",
                reason: e.to_string(),
            })?;
        match origin.scheme() {
            "https" => {}
            "http" if self.dev_mode => {}
            scheme => {
                return Err(ConfigurationError::Invalid {
                    field: "origin",
                    reason: format!("scheme '{scheme}' is not allowed outside dev mode"),
                }
                .into());
            }
        }

        reqwest::Url::parse(&self.upstream_url).map_err(|e| ConfigurationError::Invalid {
            field: "upstream_url",
            reason: e.to_string(),
        })?;

        if !(1..=MAX_SESSION_AGE_DAYS).contains(&self.session.max_age_days) {
            return Err(ConfigurationError::Invalid {
                field: "session.max_age_days",
                reason: format!("must be between 1 and {MAX_SESSION_AGE_DAYS}"),
            }
            .into());
        }

        Ok(())
    }

    /// Returns the provider callback URL for this origin.
    #[must_use]
    pub fn callback_url(&self) -> String {
        format!("{}/auth/callback", self.origin.trim_end_matches('/'))
    }

    /// Returns the session lifetime.
    #[must_use]
    pub fn session_ttl(&self) -> chrono::Duration {
        chrono::Duration::days(self.session.max_age_days)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "0123456789abcdef0123456789abcdef";

    fn base_builder() -> config::ConfigBuilder<config::builder::DefaultState> {
        config::Config::builder()
            .set_override("database_url", "postgres://localhost/gatehouse")
            .expect("override")
            .set_override("origin", "https://app.example.com/")
            .expect("override")
            .set_override("cookie_secret", SECRET)
            .expect("override")
            .set_override("oidc.client_id", "client-id")
            .expect("override")
            .set_override("oidc.client_secret", "client-secret")
            .expect("override")
    }

    fn load(
        builder: config::ConfigBuilder<config::builder::DefaultState>,
    ) -> Result<ServerConfig, Report<ConfigurationError>> {
        ServerConfig::from_config(builder.build().expect("build"))
    }

    #[test]
    fn session_config_has_correct_defaults() {
        let config = SessionConfig::default();
        assert_eq!(config.max_age_days, 30);
        assert_eq!(config.cleanup_interval_seconds, 900);
    }

    #[test]
    fn loads_with_defaults() {
        let config = load(base_builder()).expect("valid config");

        assert_eq!(config.port, 3000);
        assert!(!config.dev_mode);
        assert_eq!(config.database_max_connections, 5);
        assert_eq!(config.upstream_url, "http://127.0.0.1:3001");
        assert_eq!(config.session_ttl(), chrono::Duration::days(30));
        assert_eq!(config.oidc.client_id(), "client-id");
        assert_eq!(config.callback_url(), "https://app.example.com/auth/callback");
    }

    #[test]
    fn missing_required_value_fails() {
        let builder = config::Config::builder()
            .set_override("database_url", "postgres://localhost/gatehouse")
            .expect("override")
            .set_override("origin", "https://app.example.com")
            .expect("override");

        assert!(load(builder).is_err());
    }

    #[test]
    fn short_cookie_secret_fails() {
        let builder = base_builder()
            .set_override("cookie_secret", "short")
            .expect("override");

        assert!(load(builder).is_err());
    }

    #[test]
    fn http_origin_requires_dev_mode() {
        let builder = base_builder()
            .set_override("origin", "http://localhost:3000")
            .expect("override");
        assert!(load(builder).is_err());

        let builder = base_builder()
            .set_override("origin", "http://localhost:3000")
            .expect("override")
            .set_override("dev_mode", true)
            .expect("override");
        let config = load(builder).expect("dev mode allows http");
        assert_eq!(config.callback_url(), "http://localhost:3000/auth/callback");
    }

    #[test]
    fn session_max_age_is_bounded() {
        for days in [0_i64, -1, MAX_SESSION_AGE_DAYS + 1, 100_000_000_000_000] {
            let builder = base_builder()
                .set_override("session.max_age_days", days)
                .expect("override");
            assert!(load(builder).is_err(), "max_age_days={days}");
        }

        let builder = base_builder()
            .set_override("session.max_age_days", MAX_SESSION_AGE_DAYS)
            .expect("override");
        let config = load(builder).expect("upper bound is allowed");
        assert_eq!(
            config.session_ttl(),
            chrono::Duration::days(MAX_SESSION_AGE_DAYS)
        );
    }

    #[test]
    fn debug_redacts_secrets() {
        let config = load(base_builder()).expect("valid config");
        let debug = format!("{config:?}");
        assert!(!debug.contains(SECRET));
        assert!(!debug.contains("client-secret"));
        assert!(!debug.contains("postgres://"));
    }
}
