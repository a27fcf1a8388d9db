//! Identity provider configuration.
//!
//! The callback URL is not configured here: it is derived from the gateway's
//! external origin and handed to [`OidcClient::discover`](crate::OidcClient::discover).

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::policy::FlowPolicy;

/// Configuration for the OIDC identity provider.
///
/// Fields with defaults can be omitted when loading from environment variables.
#[derive(Clone, Serialize, Deserialize)]
pub struct OidcConfig {
    /// Metadata document URL, without the policy parameter.
    /// The policy is appended as `?p=<policy>` when discovering.
    #[serde(default = "default_metadata_url")]
    metadata_url: String,
    /// The OAuth2 client ID registered with the provider.
    client_id: String,
    /// The OAuth2 client secret.
    client_secret: String,
    /// Policy id for the sign-in journey.
    #[serde(default = "default_signin_policy")]
    signin_policy: String,
    /// Policy id for the password reset journey.
    #[serde(default = "default_password_reset_policy")]
    password_reset_policy: String,
    /// OAuth2 scopes to request as a comma-separated string.
    /// `openid` is always requested.
    #[serde(default = "default_scopes")]
    scopes: String,
    /// Upper bound on each provider HTTP request, in seconds.
    #[serde(default = "default_request_timeout_seconds")]
    request_timeout_seconds: u64,
}

fn default_metadata_url() -> String {
    "https://futurenhsplatform.b2clogin.com/futurenhsplatform.onmicrosoft.com/v2.0/.well-known/openid-configuration".to_string()
}

fn default_signin_policy() -> String {
    "b2c_1_signin".to_string()
}

fn default_password_reset_policy() -> String {
    "b2c_1_passwordreset".to_string()
}

fn default_scopes() -> String {
    "openid,profile".to_string()
}

fn default_request_timeout_seconds() -> u64 {
    10
}

impl std::fmt::Debug for OidcConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OidcConfig")
            .field("metadata_url", &self.metadata_url)
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("signin_policy", &self.signin_policy)
            .field("password_reset_policy", &self.password_reset_policy)
            .field("scopes", &self.scopes)
            .field("request_timeout_seconds", &self.request_timeout_seconds)
            .finish()
    }
}

impl OidcConfig {
    /// Creates a new OIDC configuration with defaults for optional fields.
    #[must_use]
    pub fn new(client_id: String, client_secret: String) -> Self {
        Self {
            metadata_url: default_metadata_url(),
            client_id,
            client_secret,
            signin_policy: default_signin_policy(),
            password_reset_policy: default_password_reset_policy(),
            scopes: default_scopes(),
            request_timeout_seconds: default_request_timeout_seconds(),
        }
    }

    /// Creates a configuration builder for more customization.
    #[must_use]
    pub fn builder(client_id: String, client_secret: String) -> OidcConfigBuilder {
        OidcConfigBuilder {
            config: Self::new(client_id, client_secret),
        }
    }

    /// Returns the metadata document URL (without policy).
    #[must_use]
    pub fn metadata_url(&self) -> &str {
        &self.metadata_url
    }

    /// Returns the OAuth2 client ID.
    #[must_use]
    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    /// Returns the OAuth2 client secret.
    #[must_use]
    pub fn client_secret(&self) -> &str {
        &self.client_secret
    }

    /// Returns the provider policy id for a flow.
    #[must_use]
    pub fn policy_id(&self, policy: FlowPolicy) -> &str {
        match policy {
            FlowPolicy::SignIn => &self.signin_policy,
            FlowPolicy::PasswordReset => &self.password_reset_policy,
        }
    }

    /// Returns the OAuth2 scopes to request, parsed from the comma-separated string.
    #[must_use]
    pub fn scopes(&self) -> Vec<&str> {
        self.scopes
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .collect()
    }

    /// Returns the per-request timeout for provider calls.
    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds)
    }
}

/// Builder for `OidcConfig`.
#[derive(Debug)]
pub struct OidcConfigBuilder {
    config: OidcConfig,
}

impl OidcConfigBuilder {
    /// Sets the metadata document URL.
    #[must_use]
    pub fn metadata_url(mut self, url: String) -> Self {
        self.config.metadata_url = url;
        self
    }

    /// Sets the policy id used for a flow.
    #[must_use]
    pub fn policy(mut self, policy: FlowPolicy, id: String) -> Self {
        match policy {
            FlowPolicy::SignIn => self.config.signin_policy = id,
            FlowPolicy::PasswordReset => self.config.password_reset_policy = id,
        }
        self
    }

    /// Sets the OAuth2 scopes to request.
    #[must_use]
    pub fn scopes(mut self, scopes: &[&str]) -> Self {
        self.config.scopes = scopes.join(",");
        self
    }

    /// Sets the provider request timeout.
    #[must_use]
    pub fn request_timeout_seconds(mut self, seconds: u64) -> Self {
        self.config.request_timeout_seconds = seconds;
        self
    }

    /// Builds the `OidcConfig`.
    #[must_use]
    pub fn build(self) -> OidcConfig {
        self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_config_has_defaults() {
        let config = OidcConfig::new("client-id".to_string(), "client-secret".to_string());

        assert_eq!(config.client_id(), "client-id");
        assert_eq!(config.client_secret(), "client-secret");
        assert!(config.metadata_url().ends_with("/.well-known/openid-configuration"));
        assert_eq!(config.policy_id(FlowPolicy::SignIn), "b2c_1_signin");
        assert_eq!(
            config.policy_id(FlowPolicy::PasswordReset),
            "b2c_1_passwordreset"
        );
        assert_eq!(config.scopes(), vec!["openid", "profile"]);
        assert_eq!(config.request_timeout(), Duration::from_secs(10));
    }

    #[test]
    fn builder_allows_customization() {
        let config = OidcConfig::builder("client-id".to_string(), "secret".to_string())
            .metadata_url("https://idp.example/.well-known/openid-configuration".to_string())
            .policy(FlowPolicy::SignIn, "B2C_1_SUSI".to_string())
            .scopes(&["openid", "offline_access"])
            .request_timeout_seconds(3)
            .build();

        assert_eq!(
            config.metadata_url(),
            "https://idp.example/.well-known/openid-configuration"
        );
        assert_eq!(config.policy_id(FlowPolicy::SignIn), "B2C_1_SUSI");
        assert_eq!(
            config.policy_id(FlowPolicy::PasswordReset),
            "b2c_1_passwordreset"
        );
        assert_eq!(config.scopes(), vec!["openid", "offline_access"]);
        assert_eq!(config.request_timeout(), Duration::from_secs(3));
    }

    #[test]
    fn config_deserializes_with_defaults() {
        let json = r#"{
            "client_id": "my-client",
            "client_secret": "secret"
        }"#;

        let config: OidcConfig = serde_json::from_str(json).expect("deserialize");

        assert_eq!(config.client_id(), "my-client");
        assert_eq!(config.policy_id(FlowPolicy::SignIn), "b2c_1_signin");
        assert_eq!(config.scopes(), vec!["openid", "profile"]);
    }

    #[test]
    fn scopes_parses_comma_separated() {
        let json = r#"{
            "client_id": "my-client",
            "client_secret": "secret",
            "scopes": "openid, profile, , offline_access"
        }"#;

        let config: OidcConfig = serde_json::from_str(json).expect("deserialize");

        assert_eq!(config.scopes(), vec!["openid", "profile", "offline_access"]);
    }

    #[test]
    fn debug_redacts_secret() {
        let config = OidcConfig::new("client-id".to_string(), "hunter2".to_string());
        let debug = format!("{config:?}");
        assert!(!debug.contains("hunter2"));
    }
}
