//! Provider-side user journeys.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The provider flow a login is started with.
///
/// Each flow maps to a distinct provider policy id (see
/// [`OidcConfig::policy_id`](crate::OidcConfig::policy_id)).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FlowPolicy {
    /// Regular sign-in.
    SignIn,
    /// Password reset, which signs the user in when it completes.
    PasswordReset,
}

impl FlowPolicy {
    /// All flows, in discovery order.
    pub const ALL: [FlowPolicy; 2] = [FlowPolicy::SignIn, FlowPolicy::PasswordReset];

    /// Returns the flow's stable name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::SignIn => "sign-in",
            Self::PasswordReset => "password-reset",
        }
    }
}

impl fmt::Display for FlowPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
