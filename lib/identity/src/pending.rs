//! In-flight authorization state and callback verification.
//!
//! When a login starts, the values needed to complete it (CSRF state, nonce,
//! PKCE verifier, policy) are kept server-side in the user's session. The
//! callback consumes them exactly once, so a replayed callback finds nothing
//! to complete.

use chrono::{DateTime, Duration, Utc};
use rootcause::prelude::Report;
use serde::{Deserialize, Serialize};

use crate::error::ProviderError;
use crate::policy::FlowPolicy;

/// How long a started login may take before its callback is refused.
pub const PENDING_MAX_AGE_MINUTES: i64 = 10;

/// Authorization state kept in the session between login and callback.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingAuthorization {
    /// The flow the login was started with.
    pub policy: FlowPolicy,
    /// The `state` value sent to the provider.
    pub csrf_state: String,
    /// The `nonce` value sent to the provider.
    pub nonce: String,
    /// The PKCE code verifier.
    pub pkce_verifier: String,
    /// When the login was started.
    pub issued_at: DateTime<Utc>,
}

impl std::fmt::Debug for PendingAuthorization {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PendingAuthorization")
            .field("policy", &self.policy)
            .field("issued_at", &self.issued_at)
            .finish_non_exhaustive()
    }
}

/// Query parameters the provider sends to the callback URL.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CallbackParams {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
    pub error_description: Option<String>,
}

impl PendingAuthorization {
    /// Starts tracking a new authorization.
    #[must_use]
    pub fn new(policy: FlowPolicy, csrf_state: String, nonce: String, pkce_verifier: String) -> Self {
        Self {
            policy,
            csrf_state,
            nonce,
            pkce_verifier,
            issued_at: Utc::now(),
        }
    }

    /// Returns true if the authorization is too old to complete.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        Utc::now() - self.issued_at > Duration::minutes(PENDING_MAX_AGE_MINUTES)
    }

    /// Checks the callback against this authorization and returns the code.
    ///
    /// # Errors
    ///
    /// Fails if the provider reported an error, the state does not match,
    /// the authorization expired, or no code was supplied.
    pub fn verify(&self, params: &CallbackParams) -> Result<String, Report<ProviderError>> {
        if let Some(error) = &params.error {
            return Err(ProviderError::Denied {
                error: error.clone(),
                description: params.error_description.clone(),
            }
            .into());
        }

        match &params.state {
            Some(state) if *state == self.csrf_state => {}
            _ => return Err(ProviderError::StateMismatch.into()),
        }

        if self.is_expired() {
            return Err(ProviderError::Expired.into());
        }

        match &params.code {
            Some(code) if !code.is_empty() => Ok(code.clone()),
            _ => Err(ProviderError::MissingCode.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pending() -> PendingAuthorization {
        PendingAuthorization::new(
            FlowPolicy::SignIn,
            "state-123".to_string(),
            "nonce-456".to_string(),
            "verifier-789".to_string(),
        )
    }

    fn params(code: Option<&str>, state: Option<&str>) -> CallbackParams {
        CallbackParams {
            code: code.map(str::to_string),
            state: state.map(str::to_string),
            ..CallbackParams::default()
        }
    }

    #[test]
    fn matching_callback_yields_code() {
        let code = pending()
            .verify(&params(Some("code-abc"), Some("state-123")))
            .expect("verifies");
        assert_eq!(code, "code-abc");
    }

    #[test]
    fn mismatched_state_is_rejected() {
        assert!(
            pending()
                .verify(&params(Some("code-abc"), Some("state-999")))
                .is_err()
        );
    }

    #[test]
    fn missing_state_is_rejected() {
        assert!(pending().verify(&params(Some("code-abc"), None)).is_err());
    }

    #[test]
    fn missing_code_is_rejected() {
        assert!(pending().verify(&params(None, Some("state-123"))).is_err());
        assert!(pending().verify(&params(Some(""), Some("state-123"))).is_err());
    }

    #[test]
    fn provider_error_is_rejected() {
        let params = CallbackParams {
            state: Some("state-123".to_string()),
            error: Some("access_denied".to_string()),
            error_description: Some("user cancelled".to_string()),
            ..CallbackParams::default()
        };
        assert!(pending().verify(&params).is_err());
    }

    #[test]
    fn stale_authorization_is_rejected() {
        let mut stale = pending();
        stale.issued_at = Utc::now() - Duration::minutes(PENDING_MAX_AGE_MINUTES + 1);
        assert!(stale.is_expired());
        assert!(
            stale
                .verify(&params(Some("code-abc"), Some("state-123")))
                .is_err()
        );
    }

    #[test]
    fn debug_hides_secrets() {
        let debug = format!("{:?}", pending());
        assert!(!debug.contains("verifier-789"));
        assert!(!debug.contains("nonce-456"));
        assert!(!debug.contains("state-123"));
    }
}
