//! OIDC client implementation using the openidconnect crate.

use async_trait::async_trait;
use openidconnect::core::{
    CoreAuthPrompt, CoreAuthenticationFlow, CoreClient, CoreJsonWebKeySet, CoreProviderMetadata,
};
use openidconnect::{
    AuthorizationCode, ClientId, ClientSecret, CsrfToken, Nonce, PkceCodeChallenge,
    PkceCodeVerifier, RedirectUrl, Scope, TokenResponse,
};
use rootcause::prelude::Report;
use std::collections::HashMap;
use tracing::{debug, info};

use crate::claims::{IdentityClaims, string_list_claim};
use crate::config::OidcConfig;
use crate::error::ProviderError;
use crate::pending::PendingAuthorization;
use crate::policy::FlowPolicy;
use crate::provider::{AuthorizationRequest, IdentityProvider};

/// B2C puts verified addresses in a non-standard array claim.
const EMAILS_CLAIM: &str = "emails";

/// OIDC client for authenticating users against a policy-based provider.
pub struct OidcClient {
    metadata: HashMap<FlowPolicy, CoreProviderMetadata>,
    client_id: ClientId,
    client_secret: ClientSecret,
    redirect_url: RedirectUrl,
    http_client: reqwest::Client,
    config: OidcConfig,
}

impl OidcClient {
    /// Creates a new OIDC client by discovering the metadata of every policy.
    ///
    /// `redirect_uri` is the gateway's callback URL.
    pub async fn discover(
        config: OidcConfig,
        redirect_uri: String,
    ) -> Result<Self, Report<ProviderError>> {
        let redirect_url =
            RedirectUrl::new(redirect_uri).map_err(|e| ProviderError::Configuration {
                details: format!("invalid redirect URI: {e}"),
            })?;

        let http_client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| ProviderError::Configuration {
                details: format!("failed to create HTTP client: {e}"),
            })?;

        let mut metadata = HashMap::new();
        for policy in FlowPolicy::ALL {
            let provider_metadata = fetch_metadata(&http_client, &config, policy).await?;
            info!(
                policy = %policy,
                issuer = %provider_metadata.issuer().url(),
                "Discovered provider policy"
            );
            metadata.insert(policy, provider_metadata);
        }

        Ok(Self {
            metadata,
            client_id: ClientId::new(config.client_id().to_string()),
            client_secret: ClientSecret::new(config.client_secret().to_string()),
            redirect_url,
            http_client,
            config,
        })
    }

    fn metadata_for(
        &self,
        policy: FlowPolicy,
    ) -> Result<&CoreProviderMetadata, Report<ProviderError>> {
        self.metadata.get(&policy).ok_or_else(|| {
            ProviderError::Configuration {
                details: format!("no metadata discovered for policy '{policy}'"),
            }
            .into()
        })
    }
}

/// Fetches a policy's metadata document and signing keys.
async fn fetch_metadata(
    http_client: &reqwest::Client,
    config: &OidcConfig,
    policy: FlowPolicy,
) -> Result<CoreProviderMetadata, Report<ProviderError>> {
    let policy_id = config.policy_id(policy);
    let discovery_error = |details: String| ProviderError::Discovery {
        policy: policy_id.to_string(),
        details,
    };

    let mut url = reqwest::Url::parse(config.metadata_url())
        .map_err(|e| discovery_error(format!("invalid metadata URL: {e}")))?;
    url.query_pairs_mut().append_pair("p", policy_id);

    let provider_metadata: CoreProviderMetadata = http_client
        .get(url)
        .send()
        .await
        .and_then(reqwest::Response::error_for_status)
        .map_err(|e| discovery_error(format!("failed to fetch metadata: {e}")))?
        .json()
        .await
        .map_err(|e| discovery_error(format!("invalid metadata document: {e}")))?;

    let jwks: CoreJsonWebKeySet = http_client
        .get(provider_metadata.jwks_uri().url().as_str())
        .send()
        .await
        .and_then(reqwest::Response::error_for_status)
        .map_err(|e| discovery_error(format!("failed to fetch signing keys: {e}")))?
        .json()
        .await
        .map_err(|e| discovery_error(format!("invalid signing key set: {e}")))?;

    Ok(provider_metadata.set_jwks(jwks))
}

#[async_trait]
impl IdentityProvider for OidcClient {
    fn authorization_request(
        &self,
        policy: FlowPolicy,
    ) -> Result<AuthorizationRequest, Report<ProviderError>> {
        let client = CoreClient::from_provider_metadata(
            self.metadata_for(policy)?.clone(),
            self.client_id.clone(),
            Some(self.client_secret.clone()),
        )
        .set_redirect_uri(self.redirect_url.clone());

        let (pkce_challenge, pkce_verifier) = PkceCodeChallenge::new_random_sha256();

        let mut auth_request = client
            .authorize_url(
                CoreAuthenticationFlow::AuthorizationCode,
                CsrfToken::new_random,
                Nonce::new_random,
            )
            .set_pkce_challenge(pkce_challenge)
            .add_prompt(CoreAuthPrompt::Login)
            .add_extra_param("response_mode", "query")
            .add_extra_param("p", self.config.policy_id(policy).to_string());

        // openid is always requested by the flow itself
        for scope in self.config.scopes() {
            if scope != "openid" {
                auth_request = auth_request.add_scope(Scope::new(scope.to_string()));
            }
        }

        let (auth_url, csrf_token, nonce) = auth_request.url();

        Ok(AuthorizationRequest {
            url: auth_url.to_string(),
            pending: PendingAuthorization::new(
                policy,
                csrf_token.secret().clone(),
                nonce.secret().clone(),
                pkce_verifier.secret().clone(),
            ),
        })
    }

    async fn exchange(
        &self,
        pending: &PendingAuthorization,
        code: &str,
    ) -> Result<IdentityClaims, Report<ProviderError>> {
        let client = CoreClient::from_provider_metadata(
            self.metadata_for(pending.policy)?.clone(),
            self.client_id.clone(),
            Some(self.client_secret.clone()),
        )
        .set_redirect_uri(self.redirect_url.clone());

        let token_request = client
            .exchange_code(AuthorizationCode::new(code.to_string()))
            .map_err(|e| ProviderError::TokenExchange {
                details: format!("token endpoint error: {e}"),
            })?;

        let token_response = token_request
            .set_pkce_verifier(PkceCodeVerifier::new(pending.pkce_verifier.clone()))
            .request_async(&self.http_client)
            .await
            .map_err(|e| ProviderError::TokenExchange {
                details: e.to_string(),
            })?;

        let id_token = token_response
            .id_token()
            .ok_or_else(|| ProviderError::TokenValidation {
                details: "no ID token in response".to_string(),
            })?;

        let nonce = Nonce::new(pending.nonce.clone());
        let claims = id_token
            .claims(&client.id_token_verifier(), &nonce)
            .map_err(|e| ProviderError::TokenValidation {
                details: e.to_string(),
            })?;

        let display_name: Option<String> = claims
            .name()
            .and_then(|n| n.get(None))
            .map(|n| n.as_str().to_string())
            .or_else(|| claims.preferred_username().map(|u| u.as_str().to_string()));

        let mut emails: Vec<String> = claims
            .email()
            .map(|e| vec![e.as_str().to_string()])
            .unwrap_or_default();

        // Signature is verified above; the raw payload is only read for the
        // non-standard claim.
        let response_json =
            serde_json::to_value(&token_response).map_err(|e| ProviderError::TokenValidation {
                details: format!("failed to serialize token response: {e}"),
            })?;
        if let Some(raw_id_token) = response_json.get("id_token").and_then(|v| v.as_str()) {
            emails.extend(string_list_claim(raw_id_token, EMAILS_CLAIM)?);
        }

        debug!(policy = %pending.policy, "Exchanged authorization code");

        Ok(IdentityClaims {
            subject: Some(claims.subject().to_string()),
            display_name,
            emails,
        })
    }
}
