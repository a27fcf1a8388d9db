//! Identity provider integration for gatehouse.
//!
//! This crate wraps the three interactions the gateway has with its OpenID
//! Connect provider:
//! - building the authorization redirect for a flow policy
//! - validating the callback and exchanging the code for verified claims
//! - mapping those claims to a session `User`
//!
//! The provider is Azure AD B2C shaped: each user journey (sign-in, password
//! reset) is a separate policy selected with the `p` parameter, and each
//! policy publishes its own metadata document.
//!
//! # Example
//!
//! ```
//! use gatehouse_identity::{IdentityClaims, map_claims};
//!
//! let claims = IdentityClaims {
//!     subject: Some("c0ffee".to_string()),
//!     display_name: Some("Alice".to_string()),
//!     emails: vec!["alice@example.com".to_string()],
//! };
//!
//! let user = map_claims(claims).expect("subject present");
//! assert_eq!(user.id(), "c0ffee");
//! ```

pub mod claims;
pub mod config;
pub mod error;
pub mod oidc;
pub mod pending;
pub mod policy;
pub mod provider;

pub use claims::{IdentityClaims, map_claims};
pub use config::{OidcConfig, OidcConfigBuilder};
pub use error::ProviderError;
pub use oidc::OidcClient;
pub use pending::{CallbackParams, PENDING_MAX_AGE_MINUTES, PendingAuthorization};
pub use policy::FlowPolicy;
pub use provider::{AuthorizationRequest, IdentityProvider};
