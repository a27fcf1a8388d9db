//! Authentication extractors for Axum.
//!
//! Both extractors read the user from the session loaded by
//! [`session_layer`](super::session_layer). Outside that layer every
//! request is anonymous.

use axum::{
    extract::FromRequestParts,
    http::request::Parts,
    response::{IntoResponse, Redirect, Response},
};
use gatehouse_session::User;
use std::convert::Infallible;

use super::session::Session;

/// Extractor for optionally getting the signed-in user.
pub struct CurrentUser(pub Option<User>);

impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(CurrentUser(
            parts.extensions.get::<Session>().and_then(Session::user),
        ))
    }
}

/// Extractor for requiring a signed-in user.
///
/// If nobody is signed in, the browser is sent to the login page and comes
/// back to the requested URL afterwards.
pub struct RequireUser(pub User);

impl<S> FromRequestParts<S> for RequireUser
where
    S: Send + Sync,
{
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let CurrentUser(user) = CurrentUser::from_request_parts(parts, state)
            .await
            .unwrap_or(CurrentUser(None));

        user.map(RequireUser).ok_or_else(|| AuthRejection::NotAuthenticated {
            next: parts
                .uri
                .path_and_query()
                .map_or_else(|| "/".to_string(), |pq| pq.as_str().to_string()),
        })
    }
}

/// Rejection type for authentication extractors.
#[derive(Debug)]
pub enum AuthRejection {
    NotAuthenticated { next: String },
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        match self {
            Self::NotAuthenticated { next } => Redirect::to(&login_url(&next)).into_response(),
        }
    }
}

fn login_url(next: &str) -> String {
    match serde_urlencoded::to_string([("next", next)]) {
        Ok(query) => format!("/auth/login?{query}"),
        Err(_) => "/auth/login".to_string(),
    }
}
