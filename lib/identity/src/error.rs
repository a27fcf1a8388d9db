//! Error types for the identity crate.
//!
//! Every variant ends the sign-in attempt. The messages are for logs only;
//! browsers get a fixed failure page.

use std::fmt;

/// Errors from identity provider interactions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderError {
    /// Invalid client configuration (URLs, policy ids).
    Configuration { details: String },
    /// Provider metadata or signing keys could not be fetched.
    Discovery { policy: String, details: String },
    /// The provider redirected back with an error instead of a code.
    Denied {
        error: String,
        description: Option<String>,
    },
    /// The callback's state does not match the pending authorization.
    StateMismatch,
    /// The callback carries no authorization code.
    MissingCode,
    /// The pending authorization is too old to complete.
    Expired,
    /// The token endpoint rejected the code or could not be reached.
    TokenExchange { details: String },
    /// The ID token failed verification.
    TokenValidation { details: String },
    /// The provider did not answer in time.
    Timeout,
    /// A required claim is missing from the ID token.
    MissingClaim { claim: String },
}

impl fmt::Display for ProviderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Configuration { details } => {
                write!(f, "identity provider configuration error: {details}")
            }
            Self::Discovery { policy, details } => {
                write!(f, "failed to discover provider policy '{policy}': {details}")
            }
            Self::Denied { error, description } => match description {
                Some(description) => write!(f, "provider returned '{error}': {description}"),
                None => write!(f, "provider returned '{error}'"),
            },
            Self::StateMismatch => write!(f, "callback state does not match"),
            Self::MissingCode => write!(f, "callback has no authorization code"),
            Self::Expired => write!(f, "pending authorization has expired"),
            Self::TokenExchange { details } => {
                write!(f, "token exchange failed: {details}")
            }
            Self::TokenValidation { details } => {
                write!(f, "ID token validation failed: {details}")
            }
            Self::Timeout => write!(f, "identity provider timed out"),
            Self::MissingClaim { claim } => {
                write!(f, "missing required claim: {claim}")
            }
        }
    }
}

impl std::error::Error for ProviderError {}
