//! Caller identity established from an HS256 ID token.
//!
//! The token travels in the `Authorization: Bearer <token>` header of the
//! inbound request. A missing header and a token that fails verification both
//! resolve to "no identity", which the validator reports as unauthenticated.

use axum::http::{HeaderMap, header::AUTHORIZATION};
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};
use serde::{Deserialize, Serialize};

const MAX_UID_LEN: usize = 128;

/// Verified identity of the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallerIdentity {
    pub uid: String,
}

/// ID token claims. Only `sub` and `exp` are consulted.
#[derive(Debug, Serialize, Deserialize)]
pub struct IdTokenClaims {
    pub sub: String,
    pub exp: i64,
    #[serde(default)]
    pub iat: Option<i64>,
}

#[derive(Clone)]
pub struct IdTokenVerifier {
    key: DecodingKey,
    validation: Validation,
}

impl IdTokenVerifier {
    pub fn new(secret: &str) -> Self {
        Self {
            key: DecodingKey::from_secret(secret.as_bytes()),
            validation: Validation::new(Algorithm::HS256),
        }
    }

    /// Returns the identity carried by `token`, or `None` when the token is
    /// invalid, expired or names a uid that is unsafe as a storage path segment.
    pub fn verify(&self, token: &str) -> Option<CallerIdentity> {
        let data = match decode::<IdTokenClaims>(token, &self.key, &self.validation) {
            Ok(data) => data,
            Err(err) => {
                tracing::debug!(error = %err, "Rejected ID token");
                return None;
            }
        };
        let uid = data.claims.sub;
        if !is_safe_uid(&uid) {
            tracing::warn!("Rejected ID token with unsafe subject");
            return None;
        }
        Some(CallerIdentity { uid })
    }

    pub fn identity_from_headers(&self, headers: &HeaderMap) -> Option<CallerIdentity> {
        let token = headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .map(str::trim)
            .filter(|value| !value.is_empty())?;
        self.verify(token)
    }
}

/// uids become path segments in both stores.
fn is_safe_uid(uid: &str) -> bool {
    !uid.is_empty()
        && uid.len() <= MAX_UID_LEN
        && uid
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use axum::http::HeaderValue;
    use jsonwebtoken::{EncodingKey, Header, encode};

    pub(crate) fn mint_token(secret: &str, sub: &str, exp: i64) -> String {
        let claims = IdTokenClaims {
            sub: sub.to_string(),
            exp,
            iat: None,
        };
        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .unwrap()
    }

    fn in_one_hour() -> i64 {
        chrono::Utc::now().timestamp() + 3600
    }

    #[test]
    fn test_valid_token() {
        let verifier = IdTokenVerifier::new("s3cret");
        let token = mint_token("s3cret", "user_123", in_one_hour());
        assert_eq!(
            verifier.verify(&token),
            Some(CallerIdentity { uid: "user_123".into() })
        );
    }

    #[test]
    fn test_wrong_secret() {
        let verifier = IdTokenVerifier::new("s3cret");
        let token = mint_token("other", "user_123", in_one_hour());
        assert!(verifier.verify(&token).is_none());
    }

    #[test]
    fn test_expired_token() {
        let verifier = IdTokenVerifier::new("s3cret");
        let token = mint_token("s3cret", "user_123", chrono::Utc::now().timestamp() - 3600);
        assert!(verifier.verify(&token).is_none());
    }

    #[test]
    fn test_unsafe_subject() {
        let verifier = IdTokenVerifier::new("s3cret");
        let token = mint_token("s3cret", "../admin", in_one_hour());
        assert!(verifier.verify(&token).is_none());
    }

    #[test]
    fn test_identity_from_headers() {
        let verifier = IdTokenVerifier::new("s3cret");
        let token = mint_token("s3cret", "abc", in_one_hour());
        let mut headers = HeaderMap::new();
        assert!(verifier.identity_from_headers(&headers).is_none());

        headers.insert(AUTHORIZATION, HeaderValue::from_str(&token).unwrap());
        assert!(verifier.identity_from_headers(&headers).is_none());

        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {token}")).unwrap(),
        );
        assert_eq!(verifier.identity_from_headers(&headers).unwrap().uid, "abc");
    }
}
