//! Test doubles and request helpers shared by the server's tests.

use async_trait::async_trait;
use axum::{
    Router,
    body::Body,
    http::{Request, header},
    response::Response,
    routing::get,
};
use gatehouse_core::SessionId;
use gatehouse_identity::{
    AuthorizationRequest, FlowPolicy, IdentityClaims, IdentityProvider, PendingAuthorization,
    ProviderError,
};
use gatehouse_session::{MemorySessionStore, SessionData, SessionRecord, SessionStore, StoreError};
use parking_lot::Mutex;
use rootcause::prelude::Report;
use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tower::ServiceExt;

use crate::auth::{AppState, CookieSettings, CurrentUser, SESSION_COOKIE};
use crate::router::router;

pub(crate) const TEST_SECRET: &str = "0123456789abcdef0123456789abcdef";
pub(crate) const STATE: &str = "fixed-state";

/// Identity provider that accepts codes starting with `good` exactly once.
///
/// The code `slow` never completes and `no-subject` yields claims without a
/// subject.
#[derive(Default)]
pub(crate) struct FakeProvider {
    redeemed: Mutex<HashSet<String>>,
}

#[async_trait]
impl IdentityProvider for FakeProvider {
    fn authorization_request(
        &self,
        policy: FlowPolicy,
    ) -> Result<AuthorizationRequest, Report<ProviderError>> {
        Ok(AuthorizationRequest {
            url: format!("https://idp.example/authorize?p={policy}&state={STATE}"),
            pending: PendingAuthorization::new(
                policy,
                STATE.to_string(),
                "nonce".to_string(),
                "verifier".to_string(),
            ),
        })
    }

    async fn exchange(
        &self,
        _pending: &PendingAuthorization,
        code: &str,
    ) -> Result<IdentityClaims, Report<ProviderError>> {
        match code {
            "slow" => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Err(ProviderError::Timeout.into())
            }
            "no-subject" => Ok(IdentityClaims {
                display_name: Some("Nobody".to_string()),
                ..IdentityClaims::default()
            }),
            code if code.starts_with("good") => {
                if !self.redeemed.lock().insert(code.to_string()) {
                    return Err(ProviderError::TokenExchange {
                        details: "invalid_grant".to_string(),
                    }
                    .into());
                }
                Ok(IdentityClaims {
                    subject: Some("sub-123".to_string()),
                    display_name: Some("Alice".to_string()),
                    emails: vec!["alice@example.com".to_string()],
                })
            }
            _ => Err(ProviderError::TokenExchange {
                details: "invalid_grant".to_string(),
            }
            .into()),
        }
    }
}

/// Memory store that can be switched to fail every call.
#[derive(Default)]
pub(crate) struct FlakyStore {
    inner: MemorySessionStore,
    failing: AtomicBool,
}

impl FlakyStore {
    pub(crate) fn fail(&self) {
        self.failing.store(true, Ordering::SeqCst);
    }

    fn check(&self) -> Result<(), Report<StoreError>> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable {
                details: "connection refused".to_string(),
            }
            .into());
        }
        Ok(())
    }
}

#[async_trait]
impl SessionStore for FlakyStore {
    async fn get(&self, id: &SessionId) -> Result<Option<SessionRecord>, Report<StoreError>> {
        self.check()?;
        self.inner.get(id).await
    }

    async fn set(
        &self,
        id: &SessionId,
        data: &SessionData,
        ttl: chrono::Duration,
    ) -> Result<(), Report<StoreError>> {
        self.check()?;
        self.inner.set(id, data, ttl).await
    }

    async fn touch(&self, id: &SessionId, ttl: chrono::Duration) -> Result<(), Report<StoreError>> {
        self.check()?;
        self.inner.touch(id, ttl).await
    }

    async fn destroy(&self, id: &SessionId) -> Result<(), Report<StoreError>> {
        self.check()?;
        self.inner.destroy(id).await
    }

    async fn delete_expired(&self) -> Result<u64, Report<StoreError>> {
        self.check()?;
        self.inner.delete_expired().await
    }
}

/// Builds application state around `store` with a [`FakeProvider`].
pub(crate) fn state_with(store: Arc<dyn SessionStore>, secure: bool) -> Arc<AppState> {
    let cookies =
        CookieSettings::new(TEST_SECRET, secure, time::Duration::days(30)).expect("valid secret");
    Arc::new(AppState::new(
        store,
        Arc::new(FakeProvider::default()),
        cookies,
        chrono::Duration::days(30),
        Duration::from_secs(5),
    ))
}

/// The gateway in front of a tiny application reporting the signed-in user.
pub(crate) fn app(state: Arc<AppState>) -> Router {
    let application = Router::new()
        .route("/whoami", get(whoami))
        .route("/auth/failed", get(|| async { "sign-in failed" }))
        .fallback(|| async { "application" });
    router(state, application)
}

async fn whoami(CurrentUser(user): CurrentUser) -> String {
    user.map_or_else(|| "anonymous".to_string(), |u| u.id().to_string())
}

/// Sends a request with an optional `name=value` cookie.
pub(crate) async fn send(app: &Router, method: &str, uri: &str, cookie: Option<&str>) -> Response {
    let mut request = Request::builder().method(method).uri(uri);
    if let Some(cookie) = cookie {
        request = request.header(header::COOKIE, cookie);
    }
    app.clone()
        .oneshot(request.body(Body::empty()).expect("request"))
        .await
        .expect("infallible")
}

/// Returns the `Set-Cookie` headers of a response.
pub(crate) fn set_cookies(response: &Response) -> Vec<String> {
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .map(|v| v.to_str().expect("ascii").to_string())
        .collect()
}

/// Returns the session cookie set by a response as `name=value`.
pub(crate) fn session_cookie(response: &Response) -> Option<String> {
    set_cookies(response).into_iter().find_map(|header| {
        let pair = header.split(';').next()?.trim().to_string();
        let value = pair.strip_prefix(&format!("{SESSION_COOKIE}="))?;
        (!value.is_empty()).then_some(pair)
    })
}

/// Returns the `Location` header of a redirect.
pub(crate) fn location(response: &Response) -> String {
    response.headers()[header::LOCATION]
        .to_str()
        .expect("ascii")
        .to_string()
}

pub(crate) async fn body_text(response: Response) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    String::from_utf8(bytes.to_vec()).expect("utf-8")
}
