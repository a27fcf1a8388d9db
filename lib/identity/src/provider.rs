//! The seam between the auth flow and a concrete identity provider.

use async_trait::async_trait;
use rootcause::prelude::Report;

use crate::claims::IdentityClaims;
use crate::error::ProviderError;
use crate::pending::PendingAuthorization;
use crate::policy::FlowPolicy;

/// A provider redirect together with the state needed to complete it.
#[derive(Debug, Clone)]
pub struct AuthorizationRequest {
    /// Where to send the browser.
    pub url: String,
    /// State to keep in the session until the callback.
    pub pending: PendingAuthorization,
}

/// An OpenID Connect provider the gateway can sign users in with.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Builds the authorization redirect for a flow.
    fn authorization_request(
        &self,
        policy: FlowPolicy,
    ) -> Result<AuthorizationRequest, Report<ProviderError>>;

    /// Exchanges an authorization code for verified claims.
    ///
    /// `code` must already have been checked against `pending` with
    /// [`PendingAuthorization::verify`].
    async fn exchange(
        &self,
        pending: &PendingAuthorization,
        code: &str,
    ) -> Result<IdentityClaims, Report<ProviderError>>;
}
