//! Request routing for the gateway.
//!
//! `GET` requests to the four auth paths are answered by the auth flow
//! controller. Everything else, including other methods on those paths and
//! `/auth/failed`, goes to the application. The session layer wraps both, so
//! application handlers see the same session the controller does.

use axum::{Router, middleware, routing::get};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::auth::{self, AppState, session_layer};

/// Builds the gateway router in front of `application`.
pub fn router(state: Arc<AppState>, application: Router) -> Router {
    Router::new()
        .route(
            "/auth/login",
            get(auth::login).fallback_service(application.clone()),
        )
        .route(
            "/auth/resetpassword",
            get(auth::reset_password).fallback_service(application.clone()),
        )
        .route(
            "/auth/callback",
            get(auth::callback).fallback_service(application.clone()),
        )
        .route(
            "/auth/logout",
            get(auth::logout).fallback_service(application.clone()),
        )
        .with_state(state.clone())
        .fallback_service(application)
        .layer(middleware::from_fn_with_state(state, session_layer))
        .layer(TraceLayer::new_for_http())
}
