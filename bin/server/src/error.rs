//! Error types for the gateway process.
//!
//! Request-time failures never reach the browser as text: store failures
//! become a fixed 500 body and provider failures become a redirect to the
//! sign-in failed page. These types cover configuration, startup and the
//! session layer's internal failures.

use std::fmt;

/// Invalid or missing startup configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigurationError {
    /// The configuration could not be loaded or deserialized.
    Load { details: String },
    /// A value is present but unusable.
    Invalid { field: &'static str, reason: String },
}

impl fmt::Display for ConfigurationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Load { details } => write!(f, "failed to load configuration: {details}"),
            Self::Invalid { field, reason } => {
                write!(f, "invalid configuration value '{field}': {reason}")
            }
        }
    }
}

impl std::error::Error for ConfigurationError {}

/// Failures while bringing the gateway up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StartupError {
    /// Configuration is missing or invalid.
    Configuration { details: String },
    /// The session database could not be reached or migrated.
    Database { details: String },
    /// The identity provider could not be discovered.
    IdentityProvider { details: String },
    /// The listener could not be bound or the server failed.
    Server { details: String },
}

impl fmt::Display for StartupError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Configuration { details } => write!(f, "configuration error: {details}"),
            Self::Database { details } => write!(f, "database error: {details}"),
            Self::IdentityProvider { details } => {
                write!(f, "identity provider error: {details}")
            }
            Self::Server { details } => write!(f, "server error: {details}"),
        }
    }
}

impl std::error::Error for StartupError {}

/// Failures while loading or committing a request's session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// The session store failed.
    Store { details: String },
    /// No session ID could be generated.
    IdGeneration { details: String },
}

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Store { details } => write!(f, "session store error: {details}"),
            Self::IdGeneration { details } => {
                write!(f, "failed to generate session ID: {details}")
            }
        }
    }
}

impl std::error::Error for SessionError {}
