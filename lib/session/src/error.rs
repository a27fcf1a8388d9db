//! Error types for the session crate.

use std::fmt;

/// Errors from session storage operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The backing store could not be reached or a query failed.
    Unavailable { details: String },
    /// A session payload could not be encoded or decoded.
    Encoding { details: String },
    /// A persisted payload was written with a format this build does not know.
    UnsupportedPayload { version: u32 },
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unavailable { details } => {
                write!(f, "session store unavailable: {details}")
            }
            Self::Encoding { details } => {
                write!(f, "session payload encoding error: {details}")
            }
            Self::UnsupportedPayload { version } => {
                write!(f, "unsupported session payload version: {version}")
            }
        }
    }
}

impl std::error::Error for StoreError {}
