//! Session identity and token claims
//!
//! Two identity schemes exist in the wild: a signed token (JWT-shaped, with
//! an embedded expiry claim) and an opaque user identifier from the older
//! backend revision. [`SessionIdentity`] unifies them; the identifier case is
//! the degenerate one with no expiry.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use chrono::{DateTime, Utc};
use medicopilot_core::{decode_error, ErrorContext, MediError, MediResult};
use serde::{Deserialize, Serialize};

/// A stored session identity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionIdentity {
    /// Signed token carrying claims, including an expiry
    Token(String),
    /// Opaque user identifier, valid for as long as it is present
    UserId(String),
}

impl SessionIdentity {
    /// Classify a raw stored value by shape.
    ///
    /// A token is three non-empty dot-separated segments; everything else is
    /// treated as an opaque identifier.
    pub fn classify(raw: &str) -> Self {
        let mut segments = raw.split('.');
        let looks_like_token = segments.clone().count() == 3 && segments.all(|s| !s.is_empty());
        if looks_like_token {
            SessionIdentity::Token(raw.to_string())
        } else {
            SessionIdentity::UserId(raw.to_string())
        }
    }

    /// The raw value as handed to the backend
    pub fn as_str(&self) -> &str {
        match self {
            SessionIdentity::Token(raw) => raw,
            SessionIdentity::UserId(raw) => raw,
        }
    }

    /// Decode embedded claims. Fails for identifier-shaped identities, which
    /// carry none.
    pub fn claims(&self) -> MediResult<TokenClaims> {
        match self {
            SessionIdentity::Token(raw) => decode_claims(raw),
            SessionIdentity::UserId(_) => Err(decode_error!(
                "Identity is an opaque identifier, not a token",
                "identity"
            )),
        }
    }

    /// Whether this identity is still valid at `now`.
    ///
    /// Identifiers are valid by presence alone. Tokens are valid while their
    /// expiry claim lies in the future; a malformed token is never valid.
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        match self {
            SessionIdentity::UserId(_) => true,
            SessionIdentity::Token(raw) => match decode_claims(raw) {
                Ok(claims) => !claims.is_expired_at(now),
                Err(_) => false,
            },
        }
    }
}

/// Claims embedded in a signed token
///
/// The backend issues tokens with a `phone` subject and a 24-hour `exp`;
/// every field is optional so foreign tokens still decode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenClaims {
    /// Subject (user ID), when present
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub: Option<String>,
    /// Phone number subject used by the backend
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    /// Issued at (seconds since epoch)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iat: Option<i64>,
    /// Expiration time (seconds since epoch). Absent means no expiry.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exp: Option<i64>,
}

impl TokenClaims {
    /// Check expiry against the current time
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }

    /// A token is expired once `now` reaches its `exp` claim. Tokens without
    /// an `exp` claim never expire.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        matches!(self.exp, Some(exp) if now.timestamp() >= exp)
    }
}

/// Parse the claims segment of a token without verifying its signature.
///
/// The client never holds the signing secret; authenticity is the backend's
/// concern. This only answers "what does the token say about itself", which
/// is all the expiry check needs.
pub fn decode_claims(token: &str) -> MediResult<TokenClaims> {
    let segments: Vec<&str> = token.split('.').collect();
    if segments.len() != 3 || segments.iter().any(|s| s.is_empty()) {
        return Err(decode_error!(
            "Token is not in header.payload.signature form",
            "identity"
        ));
    }

    let payload = URL_SAFE_NO_PAD
        .decode(segments[1])
        .map_err(|e| MediError::Decode {
            message: format!("Token payload is not valid base64: {}", e),
            context: ErrorContext::new("identity").with_operation("decode_claims"),
        })?;

    serde_json::from_slice(&payload).map_err(|e| MediError::Decode {
        message: format!("Token payload is not valid JSON: {}", e),
        context: ErrorContext::new("identity").with_operation("decode_claims"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn encode_token(claims: &TokenClaims) -> String {
        let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
        let payload = URL_SAFE_NO_PAD.encode(serde_json::to_vec(claims).unwrap());
        format!("{}.{}.sig", header, payload)
    }

    #[test]
    fn classifies_token_shape() {
        let token = encode_token(&TokenClaims {
            sub: None,
            phone: Some("5550100".to_string()),
            iat: None,
            exp: Some(4_102_444_800),
        });
        assert!(matches!(
            SessionIdentity::classify(&token),
            SessionIdentity::Token(_)
        ));
    }

    #[test]
    fn classifies_identifier_shape() {
        assert!(matches!(
            SessionIdentity::classify("67c9deadbeef5ca0"),
            SessionIdentity::UserId(_)
        ));
        // Two dots but an empty segment is not a token
        assert!(matches!(
            SessionIdentity::classify("a..b"),
            SessionIdentity::UserId(_)
        ));
    }

    #[test]
    fn decodes_backend_claims() {
        let token = encode_token(&TokenClaims {
            sub: None,
            phone: Some("5550100".to_string()),
            iat: Some(1_700_000_000),
            exp: Some(1_700_086_400),
        });
        let claims = decode_claims(&token).unwrap();
        assert_eq!(claims.phone.as_deref(), Some("5550100"));
        assert_eq!(claims.exp, Some(1_700_086_400));
    }

    #[test]
    fn malformed_tokens_fail_with_decode_error() {
        for bad in ["not-a-token", "a.b", "a.!!!.c", "a.b.c.d"] {
            match decode_claims(bad) {
                Err(MediError::Decode { .. }) => {}
                other => panic!("expected decode error for {:?}, got {:?}", bad, other.err()),
            }
        }
        // Valid base64 but not JSON
        let junk = format!("h.{}.s", URL_SAFE_NO_PAD.encode(b"hello"));
        assert!(matches!(
            decode_claims(&junk),
            Err(MediError::Decode { .. })
        ));
    }

    #[test]
    fn expiry_is_checked_against_now() {
        let claims = TokenClaims {
            sub: None,
            phone: None,
            iat: None,
            exp: Some(1_000),
        };
        let before = Utc.timestamp_opt(999, 0).unwrap();
        let at = Utc.timestamp_opt(1_000, 0).unwrap();
        assert!(!claims.is_expired_at(before));
        assert!(claims.is_expired_at(at));
    }

    #[test]
    fn token_without_exp_never_expires() {
        let claims = TokenClaims {
            sub: Some("u1".to_string()),
            phone: None,
            iat: None,
            exp: None,
        };
        assert!(!claims.is_expired());
    }

    #[test]
    fn identifier_is_valid_regardless_of_time() {
        let id = SessionIdentity::UserId("67c9deadbeef5ca0".to_string());
        assert!(id.is_valid_at(Utc.timestamp_opt(0, 0).unwrap()));
        assert!(id.is_valid_at(Utc.timestamp_opt(4_102_444_800, 0).unwrap()));
    }
}
