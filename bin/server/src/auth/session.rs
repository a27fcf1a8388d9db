//! Per-request session handle and the middleware that loads and commits it.
//!
//! The middleware resolves the signed session cookie to a stored record
//! before the handler runs, hands the handler a [`Session`] through request
//! extensions, and persists whatever the handler did once the response is
//! ready:
//!
//! | Handler outcome          | Store                         | Cookie         |
//! |--------------------------|-------------------------------|----------------|
//! | destroyed                | delete the loaded ID          | cleared        |
//! | renewed                  | delete loaded ID, save new    | new ID         |
//! | modified, new session    | save under a fresh ID         | new ID         |
//! | modified, loaded session | save under the same ID        | refreshed      |
//! | untouched, loaded        | extend expiry                 | unchanged      |
//! | untouched, new           | nothing                       | none           |
//!
//! A brand new session whose data ends up empty is never saved. Any store
//! failure turns the response into a 500.

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{StatusCode, request::Parts},
    middleware::Next,
    response::{IntoResponse, Response},
};
use axum_extra::extract::cookie::{CookieJar, SignedCookieJar};
use gatehouse_core::SessionId;
use gatehouse_session::{SessionData, User};
use parking_lot::Mutex;
use rootcause::prelude::Report;
use serde::{Serialize, de::DeserializeOwned};
use std::sync::Arc;
use tracing::{debug, error};

use super::{AUTH_USER_KEY, AppState, SESSION_COOKIE};
use crate::error::SessionError;

/// The current request's session.
///
/// Cloning is cheap; every clone refers to the same session.
#[derive(Clone, Default)]
pub struct Session {
    inner: Arc<Mutex<SessionState>>,
}

#[derive(Default)]
struct SessionState {
    data: SessionData,
    modified: bool,
    renewed: bool,
    destroyed: bool,
}

impl Session {
    fn from_data(data: SessionData) -> Self {
        Self {
            inner: Arc::new(Mutex::new(SessionState {
                data,
                ..SessionState::default()
            })),
        }
    }

    /// Reads a value.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.inner.lock().data.get(key)
    }

    /// Stores a value, marking the session modified.
    ///
    /// # Errors
    ///
    /// Returns an error if the value cannot be serialized; the session is
    /// left unchanged.
    pub fn insert<T: Serialize>(&self, key: &str, value: &T) -> Result<(), serde_json::Error> {
        let mut state = self.inner.lock();
        state.data.insert(key, value)?;
        state.modified = true;
        Ok(())
    }

    /// Removes and returns a value. Removing a key that is not present does
    /// not mark the session modified.
    pub fn remove<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let mut state = self.inner.lock();
        if !state.data.contains(key) {
            return None;
        }
        state.modified = true;
        state.data.remove(key)
    }

    /// Moves the session's data to a fresh ID when the response is committed.
    ///
    /// Call this whenever the session's privilege changes so an ID known
    /// before sign-in is worthless after it.
    pub fn renew(&self) {
        self.inner.lock().renewed = true;
    }

    /// Drops all data; the stored session is deleted and the cookie cleared.
    pub fn destroy(&self) {
        let mut state = self.inner.lock();
        state.data.clear();
        state.destroyed = true;
    }

    /// Returns the signed-in user, if any.
    pub fn user(&self) -> Option<User> {
        self.get(AUTH_USER_KEY)
    }

    /// Returns true if a user is signed in.
    pub fn is_authenticated(&self) -> bool {
        self.inner.lock().data.contains(AUTH_USER_KEY)
    }

    fn take(&self) -> SessionState {
        std::mem::take(&mut *self.inner.lock())
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.inner.lock();
        f.debug_struct("Session")
            .field("modified", &state.modified)
            .field("renewed", &state.renewed)
            .field("destroyed", &state.destroyed)
            .finish_non_exhaustive()
    }
}

impl<S> FromRequestParts<S> for Session
where
    S: Send + Sync,
{
    type Rejection = (StatusCode, &'static str);

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts.extensions.get::<Session>().cloned().ok_or_else(|| {
            error!("Session extractor used on a route without the session layer");
            (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
        })
    }
}

/// Loads the request's session before the handler and commits it after.
///
/// Install with `axum::middleware::from_fn_with_state`.
pub async fn session_layer(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Response {
    let jar = SignedCookieJar::from_headers(request.headers(), state.cookies.key().clone());

    let loaded = match jar.get(SESSION_COOKIE) {
        Some(cookie) => {
            let id = SessionId::from(cookie.value());
            match state.store.get(&id).await {
                Ok(Some(record)) => Some((id, record.data)),
                Ok(None) => {
                    debug!("Session cookie refers to no live session");
                    None
                }
                Err(e) => {
                    error!(error = %e, "Failed to load session");
                    return internal_error();
                }
            }
        }
        None => None,
    };

    let (known_id, session) = match loaded {
        Some((id, data)) => (Some(id), Session::from_data(data)),
        None => (None, Session::default()),
    };

    request.extensions_mut().insert(session.clone());
    let response = next.run(request).await;

    match commit(&state, known_id, session.take()).await {
        Ok(CookieUpdate::Keep) => response,
        Ok(CookieUpdate::Set(jar)) => (jar, response).into_response(),
        Ok(CookieUpdate::Clear(jar)) => (jar, response).into_response(),
        Err(e) => {
            error!(error = %e, "Failed to save session");
            internal_error()
        }
    }
}

/// What the response says about the session cookie.
enum CookieUpdate {
    Keep,
    Set(SignedCookieJar),
    Clear(CookieJar),
}

/// Persists the handler's changes.
async fn commit(
    state: &AppState,
    known_id: Option<SessionId>,
    outcome: SessionState,
) -> Result<CookieUpdate, Report<SessionError>> {
    let store_error = |e: Report<gatehouse_session::StoreError>| SessionError::Store {
        details: e.to_string(),
    };

    if outcome.destroyed {
        if let Some(id) = &known_id {
            state.store.destroy(id).await.map_err(store_error)?;
        }
        return Ok(CookieUpdate::Clear(
            CookieJar::new().add(state.cookies.removal_cookie()),
        ));
    }

    if !outcome.modified && !outcome.renewed {
        if let Some(id) = &known_id {
            state
                .store
                .touch(id, state.session_ttl)
                .await
                .map_err(store_error)?;
        }
        return Ok(CookieUpdate::Keep);
    }

    let id = match known_id {
        Some(id) if !outcome.renewed => id,
        previous => {
            if let Some(old) = previous {
                state.store.destroy(&old).await.map_err(store_error)?;
            }
            if outcome.data.is_empty() {
                return Ok(CookieUpdate::Keep);
            }
            SessionId::generate().map_err(|e| SessionError::IdGeneration {
                details: e.to_string(),
            })?
        }
    };

    state
        .store
        .set(&id, &outcome.data, state.session_ttl)
        .await
        .map_err(store_error)?;

    let jar = SignedCookieJar::new(state.cookies.key().clone());
    Ok(CookieUpdate::Set(jar.add(state.cookies.session_cookie(&id))))
}

fn internal_error() -> Response {
    (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error").into_response()
}
