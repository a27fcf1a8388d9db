//! Authentication routes for login, password reset, callback, and logout.
//!
//! Every route answers with a redirect. Failures are never shown to the
//! browser as error bodies: they are logged and the browser is sent to
//! [`FAILED_PATH`], which the application renders.

use axum::{
    extract::{Query, State, rejection::QueryRejection},
    response::Redirect,
};
use gatehouse_identity::{CallbackParams, FlowPolicy, PendingAuthorization, ProviderError, map_claims};
use gatehouse_session::User;
use rootcause::prelude::Report;
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use super::{AUTH_USER_KEY, AppState, NEXT_KEY, PENDING_KEY, redirect, session::Session};

/// Where the browser lands after a failed sign-in.
pub const FAILED_PATH: &str = "/auth/failed";

/// Query parameters for starting a flow.
#[derive(Debug, Default, Deserialize)]
pub struct LoginQuery {
    /// Local path to return to after sign-in.
    next: Option<String>,
}

impl LoginQuery {
    /// An unparsable query is treated as carrying no target.
    fn or_default(query: Result<Query<Self>, QueryRejection>) -> Self {
        query.map_or_else(
            |e| {
                debug!(error = %e, "Ignoring unparsable login query");
                Self::default()
            },
            |Query(query)| query,
        )
    }
}

/// Starts the sign-in flow by redirecting to the identity provider.
pub async fn login(
    State(state): State<Arc<AppState>>,
    session: Session,
    query: Result<Query<LoginQuery>, QueryRejection>,
) -> Redirect {
    let query = LoginQuery::or_default(query);
    begin(&state, &session, FlowPolicy::SignIn, query.next.as_deref())
}

/// Starts the password reset flow by redirecting to the identity provider.
///
/// A completed reset signs the user in, exactly like a sign-in.
pub async fn reset_password(
    State(state): State<Arc<AppState>>,
    session: Session,
    query: Result<Query<LoginQuery>, QueryRejection>,
) -> Redirect {
    let query = LoginQuery::or_default(query);
    begin(
        &state,
        &session,
        FlowPolicy::PasswordReset,
        query.next.as_deref(),
    )
}

fn begin(state: &AppState, session: &Session, policy: FlowPolicy, next: Option<&str>) -> Redirect {
    let request = match state.provider.authorization_request(policy) {
        Ok(request) => request,
        Err(e) => {
            error!(policy = %policy, error = %e, "Failed to build authorization request");
            return Redirect::to(FAILED_PATH);
        }
    };

    let target = next.and_then(|raw| {
        let target = redirect::local_target(raw);
        if target.is_none() {
            debug!("Ignoring non-local redirect target");
        }
        target
    });

    // A login without a target must not inherit one from an abandoned flow
    let saved = match target {
        Some(target) => session.insert(NEXT_KEY, &target),
        None => {
            session.remove::<String>(NEXT_KEY);
            Ok(())
        }
    }
    .and_then(|()| session.insert(PENDING_KEY, &request.pending));

    if let Err(e) = saved {
        error!(error = %e, "Failed to save pending authorization");
        return Redirect::to(FAILED_PATH);
    }

    debug!(policy = %policy, "Redirecting to identity provider");
    Redirect::to(&request.url)
}

/// Handles the identity provider's redirect back to the gateway.
///
/// The pending authorization is consumed whatever the outcome, so a
/// callback URL can complete at most one sign-in.
pub async fn callback(
    State(state): State<Arc<AppState>>,
    session: Session,
    params: Result<Query<CallbackParams>, QueryRejection>,
) -> Redirect {
    let Some(pending) = session.remove::<PendingAuthorization>(PENDING_KEY) else {
        warn!("Callback without a pending authorization");
        return Redirect::to(FAILED_PATH);
    };

    let Ok(Query(params)) = params.inspect_err(|e| {
        warn!(policy = %pending.policy, error = %e, "Malformed callback query");
    }) else {
        return Redirect::to(FAILED_PATH);
    };

    let user = match complete(&state, &pending, &params).await {
        Ok(user) => user,
        Err(e) => {
            warn!(policy = %pending.policy, error = %e, "Sign-in failed");
            return Redirect::to(FAILED_PATH);
        }
    };

    session.renew();
    if let Err(e) = session.insert(AUTH_USER_KEY, &user) {
        error!(error = %e, "Failed to save signed-in user");
        return Redirect::to(FAILED_PATH);
    }

    let target = session
        .remove::<String>(NEXT_KEY)
        .filter(|target| redirect::local_target(target).is_some())
        .unwrap_or_else(|| "/".to_string());

    info!(policy = %pending.policy, subject = %user.id(), "User signed in");
    Redirect::to(&target)
}

async fn complete(
    state: &AppState,
    pending: &PendingAuthorization,
    params: &CallbackParams,
) -> Result<User, Report<ProviderError>> {
    let code = pending.verify(params)?;

    let claims = tokio::time::timeout(
        state.provider_timeout,
        state.provider.exchange(pending, &code),
    )
    .await
    .map_err(|_| ProviderError::Timeout)??;

    map_claims(claims)
}

/// Signs the user out by destroying their session.
///
/// Safe to call without a session or more than once.
pub async fn logout(session: Session) -> Redirect {
    if session.is_authenticated() {
        info!("User signed out");
    }
    session.destroy();
    Redirect::to("/")
}
