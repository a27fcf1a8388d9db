//! Verified identity claims and their mapping to a session user.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use gatehouse_session::User;
use rootcause::prelude::Report;

use crate::error::ProviderError;

/// The claims the gateway reads from a verified ID token.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IdentityClaims {
    /// The `sub` claim.
    pub subject: Option<String>,
    /// The `name` claim, or `preferred_username` when no name is present.
    pub display_name: Option<String>,
    /// Addresses from the `email` claim and the B2C `emails` claim.
    pub emails: Vec<String>,
}

/// Maps verified claims to the session's user representation.
///
/// # Errors
///
/// Returns `ProviderError::MissingClaim` if the subject is missing or empty.
pub fn map_claims(claims: IdentityClaims) -> Result<User, Report<ProviderError>> {
    let subject = claims.subject.unwrap_or_default();
    User::new(subject, claims.display_name, claims.emails).ok_or_else(|| {
        ProviderError::MissingClaim {
            claim: "sub".to_string(),
        }
        .into()
    })
}

/// Reads a string-array claim from the payload of a compact JWT.
///
/// The token must already have been verified; this only decodes the payload
/// to reach claims outside the standard set. A missing claim yields an
/// empty list.
pub(crate) fn string_list_claim(
    id_token: &str,
    claim: &str,
) -> Result<Vec<String>, Report<ProviderError>> {
    // JWT is base64url(header).base64url(payload).signature
    let parts: Vec<&str> = id_token.split('.').collect();
    if parts.len() != 3 {
        return Err(ProviderError::TokenValidation {
            details: "invalid JWT format".to_string(),
        }
        .into());
    }

    let payload_bytes =
        URL_SAFE_NO_PAD
            .decode(parts[1])
            .map_err(|e| ProviderError::TokenValidation {
                details: format!("failed to decode JWT payload: {e}"),
            })?;

    let payload: serde_json::Value =
        serde_json::from_slice(&payload_bytes).map_err(|e| ProviderError::TokenValidation {
            details: format!("failed to parse JWT payload: {e}"),
        })?;

    let values = payload
        .get(claim)
        .and_then(|v| v.as_array())
        .map(|arr| {
            arr.iter()
                .filter_map(|v| v.as_str().map(|s| s.to_string()))
                .collect()
        })
        .unwrap_or_default();

    Ok(values)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn jwt_with_payload(payload: &serde_json::Value) -> String {
        let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"RS256","typ":"JWT"}"#);
        let body = URL_SAFE_NO_PAD.encode(payload.to_string());
        format!("{header}.{body}.c2lnbmF0dXJl")
    }

    #[test]
    fn maps_complete_claims() {
        let user = map_claims(IdentityClaims {
            subject: Some("0a1b".to_string()),
            display_name: Some("Alice".to_string()),
            emails: vec!["alice@example.com".to_string()],
        })
        .expect("maps");

        assert_eq!(user.id(), "0a1b");
        assert_eq!(user.name(), Some("Alice"));
        assert_eq!(user.emails(), ["alice@example.com".to_string()]);
    }

    #[test]
    fn missing_subject_fails() {
        let result = map_claims(IdentityClaims {
            subject: None,
            display_name: Some("Nobody".to_string()),
            emails: Vec::new(),
        });
        assert!(result.is_err());
    }

    #[test]
    fn empty_subject_fails() {
        let result = map_claims(IdentityClaims {
            subject: Some(String::new()),
            ..IdentityClaims::default()
        });
        assert!(result.is_err());
    }

    #[test]
    fn reads_emails_array_claim() {
        let token = jwt_with_payload(&serde_json::json!({
            "sub": "abc",
            "emails": ["a@example.com", "b@example.com", 42]
        }));

        let emails = string_list_claim(&token, "emails").expect("decodes");
        assert_eq!(emails, vec!["a@example.com", "b@example.com"]);
    }

    #[test]
    fn absent_claim_is_empty() {
        let token = jwt_with_payload(&serde_json::json!({ "sub": "abc" }));
        let emails = string_list_claim(&token, "emails").expect("decodes");
        assert!(emails.is_empty());
    }

    #[test]
    fn malformed_token_is_rejected() {
        assert!(string_list_claim("not-a-jwt", "emails").is_err());
        assert!(string_list_claim("a.%%%.c", "emails").is_err());
    }
}
