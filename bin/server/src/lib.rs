//! gatehouse authentication and session gateway.
//!
//! This crate provides the HTTP front of the gateway: the session middleware,
//! the OIDC auth flow routes, and forwarding of everything else to the
//! rendering application behind it.

pub mod auth;
pub mod cleanup;
pub mod config;
pub mod error;
pub mod router;
pub mod upstream;

#[cfg(test)]
mod testing;
