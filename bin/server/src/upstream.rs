//! Forwarding of non-auth requests to the rendering application.
//!
//! The application sits behind the gateway and never sees the session
//! cookie. Instead, each forwarded request carries the signed-in user, if
//! any, in the [`USER_HEADER`] header as base64url-encoded JSON. Any copy of
//! that header sent by the browser is dropped.

use axum::{
    Router,
    body::{Body, Bytes},
    extract::{Request, State},
    http::{HeaderMap, HeaderName, HeaderValue, StatusCode, Uri, header},
    response::{IntoResponse, Response},
};
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use gatehouse_session::User;
use rootcause::prelude::Report;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::auth::{CurrentUser, SESSION_COOKIE};
use crate::error::StartupError;

/// Header carrying the signed-in user to the application.
pub const USER_HEADER: &str = "x-gatehouse-user";

/// Largest request body forwarded to the application.
const MAX_BODY_BYTES: usize = 10 * 1024 * 1024;

/// Headers that describe a single connection and must not be forwarded.
static HOP_BY_HOP: [HeaderName; 8] = [
    header::CONNECTION,
    HeaderName::from_static("keep-alive"),
    header::PROXY_AUTHENTICATE,
    header::PROXY_AUTHORIZATION,
    header::TE,
    header::TRAILER,
    header::TRANSFER_ENCODING,
    header::UPGRADE,
];

/// HTTP client for the rendering application.
pub struct Upstream {
    client: reqwest::Client,
    base: reqwest::Url,
}

impl Upstream {
    /// Creates a client forwarding to `base_url`.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is invalid or the client cannot be built.
    pub fn new(base_url: &str) -> Result<Self, Report<StartupError>> {
        let base = reqwest::Url::parse(base_url).map_err(|e| StartupError::Configuration {
            details: format!("invalid upstream URL: {e}"),
        })?;

        // Redirects from the application are the browser's to follow
        let client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(|e| StartupError::Server {
                details: format!("failed to create upstream HTTP client: {e}"),
            })?;

        Ok(Self { client, base })
    }

    /// Returns a router forwarding every request to the application.
    pub fn into_router(self) -> Router {
        Router::new().fallback(forward).with_state(Arc::new(self))
    }

    fn target_url(&self, uri: &Uri) -> reqwest::Url {
        let mut url = self.base.clone();
        let path = format!("{}{}", self.base.path().trim_end_matches('/'), uri.path());
        url.set_path(&path);
        url.set_query(uri.query());
        url
    }
}

async fn forward(
    State(upstream): State<Arc<Upstream>>,
    CurrentUser(user): CurrentUser,
    request: Request,
) -> Response {
    let (parts, body) = request.into_parts();

    let body = match axum::body::to_bytes(body, MAX_BODY_BYTES).await {
        Ok(body) => body,
        Err(e) => {
            debug!(error = %e, "Rejected request body");
            return (StatusCode::PAYLOAD_TOO_LARGE, "Payload too large").into_response();
        }
    };

    let url = upstream.target_url(&parts.uri);
    let headers = forwarded_headers(&parts.headers, user.as_ref());

    let result = upstream
        .client
        .request(parts.method, url)
        .headers(headers)
        .body(body)
        .send()
        .await;

    let upstream_response = match result {
        Ok(response) => response,
        Err(e) => {
            warn!(error = %e, "Upstream request failed");
            return bad_gateway();
        }
    };

    let status = upstream_response.status();
    let headers = response_headers(upstream_response.headers());
    let body: Bytes = match upstream_response.bytes().await {
        Ok(body) => body,
        Err(e) => {
            warn!(error = %e, "Failed to read upstream response");
            return bad_gateway();
        }
    };

    let mut response = Response::new(Body::from(body));
    *response.status_mut() = status;
    *response.headers_mut() = headers;
    response
}

fn bad_gateway() -> Response {
    (StatusCode::BAD_GATEWAY, "Bad gateway").into_response()
}

/// Builds the headers sent to the application.
fn forwarded_headers(incoming: &HeaderMap, user: Option<&User>) -> HeaderMap {
    let mut headers = HeaderMap::new();

    for (name, value) in incoming {
        if HOP_BY_HOP.contains(name)
            || name == header::HOST
            || name == header::CONTENT_LENGTH
            || name == header::COOKIE
            || name.as_str() == USER_HEADER
        {
            continue;
        }
        headers.append(name.clone(), value.clone());
    }

    if let Some(cookies) = without_session_cookie(incoming)
        && let Ok(value) = HeaderValue::from_str(&cookies)
    {
        headers.insert(header::COOKIE, value);
    }

    if let Some(host) = incoming.get(header::HOST) {
        headers.insert(HeaderName::from_static("x-forwarded-host"), host.clone());
    }

    if let Some(value) = user.and_then(user_header_value) {
        headers.insert(HeaderName::from_static(USER_HEADER), value);
    }

    headers
}

/// Returns the request's cookies minus the session cookie, if any remain.
fn without_session_cookie(incoming: &HeaderMap) -> Option<String> {
    let kept: Vec<&str> = incoming
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .map(str::trim)
        .filter(|pair| {
            !pair.is_empty() && pair.split('=').next().map(str::trim) != Some(SESSION_COOKIE)
        })
        .collect();

    if kept.is_empty() {
        None
    } else {
        Some(kept.join("; "))
    }
}

fn user_header_value(user: &User) -> Option<HeaderValue> {
    let json = serde_json::to_vec(user).ok()?;
    HeaderValue::from_str(&URL_SAFE_NO_PAD.encode(json)).ok()
}

/// Copies the application's response headers, dropping hop-by-hop ones and
/// any attempt to set the gateway's session cookie.
fn response_headers(upstream: &HeaderMap) -> HeaderMap {
    let mut headers = HeaderMap::new();
    for (name, value) in upstream {
        if HOP_BY_HOP.contains(name) || name == header::CONTENT_LENGTH {
            continue;
        }
        if name == header::SET_COOKIE && sets_session_cookie(value) {
            warn!("Dropped application attempt to set the session cookie");
            continue;
        }
        headers.append(name.clone(), value.clone());
    }
    headers
}

fn sets_session_cookie(value: &HeaderValue) -> bool {
    value
        .to_str()
        .ok()
        .and_then(|value| value.split(['=', ';']).next())
        .is_some_and(|name| name.trim() == SESSION_COOKIE)
}
