//! Core types and utilities for the gatehouse session gateway.
//!
//! This crate provides the error handling foundation and the opaque
//! session identifier shared by the store, the identity client and the server.

pub mod error;
pub mod id;

pub use error::Result;
pub use id::SessionId;
