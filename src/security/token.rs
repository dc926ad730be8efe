//! Signed bearer tokens.
//!
//! Tokens use the JWT compact form with HS256, so any JWT tooling can decode
//! them: `base64url(header).base64url(claims).base64url(hmac_sha256)`.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use chrono::Utc;
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use std::fmt;

type HmacSha256 = Hmac<Sha256>;

const HEADER: &str = r#"{"alg":"HS256","typ":"JWT"}"#;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Claims {
    pub user_id: i64,
    pub email: String,
    /// Issued-at, unix seconds.
    pub iat: i64,
    /// Expiry, unix seconds.
    pub exp: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenError {
    Malformed,
    BadSignature,
    Expired,
}

impl fmt::Display for TokenError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenError::Malformed => f.write_str("malformed token"),
            TokenError::BadSignature => f.write_str("bad token signature"),
            TokenError::Expired => f.write_str("token expired"),
        }
    }
}

impl std::error::Error for TokenError {}

/// Signing key plus token lifetime. Held in Rocket managed state.
pub struct TokenKeys {
    secret: Vec<u8>,
    ttl_secs: i64,
}

impl TokenKeys {
    pub fn new(secret: &str, ttl_days: i64) -> Self {
        TokenKeys {
            secret: secret.as_bytes().to_vec(),
            ttl_secs: ttl_days.max(1) * 24 * 60 * 60,
        }
    }

    /// A random 32-byte hex secret, for when none is configured.
    pub fn random_secret() -> String {
        let bytes: [u8; 32] = rand::random();
        hex::encode(bytes)
    }

    pub fn issue(&self, user_id: i64, email: &str) -> String {
        self.issue_at(user_id, email, Utc::now().timestamp())
    }

    pub fn issue_at(&self, user_id: i64, email: &str, now: i64) -> String {
        let claims = Claims {
            user_id,
            email: email.to_string(),
            iat: now,
            exp: now + self.ttl_secs,
        };
        // Claims holds only strings and integers, serialization cannot fail
        let payload = serde_json::to_vec(&claims).unwrap_or_default();
        let signing_input = format!(
            "{}.{}",
            URL_SAFE_NO_PAD.encode(HEADER),
            URL_SAFE_NO_PAD.encode(payload)
        );
        let sig = URL_SAFE_NO_PAD.encode(self.sign(&signing_input));
        format!("{}.{}", signing_input, sig)
    }

    pub fn verify(&self, token: &str) -> Result<Claims, TokenError> {
        self.verify_at(token, Utc::now().timestamp())
    }

    pub fn verify_at(&self, token: &str, now: i64) -> Result<Claims, TokenError> {
        let mut parts = token.split('.');
        let (header_b64, payload_b64, sig_b64) =
            match (parts.next(), parts.next(), parts.next(), parts.next()) {
                (Some(h), Some(p), Some(s), None) => (h, p, s),
                _ => return Err(TokenError::Malformed),
            };

        let header_json = URL_SAFE_NO_PAD
            .decode(header_b64)
            .map_err(|_| TokenError::Malformed)?;
        let header: serde_json::Value =
            serde_json::from_slice(&header_json).map_err(|_| TokenError::Malformed)?;
        if header.get("alg").and_then(|a| a.as_str()) != Some("HS256") {
            return Err(TokenError::Malformed);
        }

        let sig = URL_SAFE_NO_PAD
            .decode(sig_b64)
            .map_err(|_| TokenError::Malformed)?;
        let expected = self.sign(&format!("{}.{}", header_b64, payload_b64));
        if !super::constant_time_eq(&sig, &expected) {
            return Err(TokenError::BadSignature);
        }

        let claims_json = URL_SAFE_NO_PAD
            .decode(payload_b64)
            .map_err(|_| TokenError::Malformed)?;
        let claims: Claims =
            serde_json::from_slice(&claims_json).map_err(|_| TokenError::Malformed)?;
        if claims.exp <= now {
            return Err(TokenError::Expired);
        }
        Ok(claims)
    }

    fn sign(&self, signing_input: &str) -> Vec<u8> {
        let mut mac =
            HmacSha256::new_from_slice(&self.secret).expect("HMAC can take key of any size");
        mac.update(signing_input.as_bytes());
        mac.finalize().into_bytes().to_vec()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NOW: i64 = 1_715_000_000;

    fn keys() -> TokenKeys {
        TokenKeys::new("test-secret", 7)
    }

    #[test]
    fn issued_token_verifies() {
        let k = keys();
        let t = k.issue_at(42, "a@b.com", NOW);
        assert_eq!(t.split('.').count(), 3);
        let c = k.verify_at(&t, NOW + 60).unwrap();
        assert_eq!(c.user_id, 42);
        assert_eq!(c.email, "a@b.com");
        assert_eq!(c.exp - c.iat, 7 * 24 * 3600);
    }

    #[test]
    fn expired_token_is_rejected() {
        let k = keys();
        let t = k.issue_at(1, "a@b.com", NOW);
        assert_eq!(
            k.verify_at(&t, NOW + 7 * 24 * 3600),
            Err(TokenError::Expired)
        );
    }

    #[test]
    fn other_secret_is_rejected() {
        let t = keys().issue_at(1, "a@b.com", NOW);
        let other = TokenKeys::new("different", 7);
        assert_eq!(other.verify_at(&t, NOW), Err(TokenError::BadSignature));
    }

    #[test]
    fn tampered_claims_are_rejected() {
        let k = keys();
        let t = k.issue_at(1, "a@b.com", NOW);
        let parts: Vec<&str> = t.split('.').collect();
        let forged = URL_SAFE_NO_PAD.encode(
            r#"{"userId":2,"email":"a@b.com","iat":1715000000,"exp":1915000000}"#,
        );
        let t2 = format!("{}.{}.{}", parts[0], forged, parts[2]);
        assert_eq!(k.verify_at(&t2, NOW), Err(TokenError::BadSignature));
    }

    #[test]
    fn garbage_is_malformed() {
        let k = keys();
        assert_eq!(k.verify_at("", NOW), Err(TokenError::Malformed));
        assert_eq!(k.verify_at("a.b", NOW), Err(TokenError::Malformed));
        assert_eq!(k.verify_at("a.b.c.d", NOW), Err(TokenError::Malformed));
        assert_eq!(k.verify_at("!!.??.**", NOW), Err(TokenError::Malformed));
    }

    #[test]
    fn alg_none_is_refused() {
        let k = keys();
        let header = URL_SAFE_NO_PAD.encode(r#"{"alg":"none","typ":"JWT"}"#);
        let t = k.issue_at(1, "a@b.com", NOW);
        let parts: Vec<&str> = t.split('.').collect();
        let t2 = format!("{}.{}.{}", header, parts[1], parts[2]);
        assert_eq!(k.verify_at(&t2, NOW), Err(TokenError::Malformed));
    }

    #[test]
    fn random_secrets_differ() {
        let a = TokenKeys::random_secret();
        assert_eq!(a.len(), 64);
        assert_ne!(a, TokenKeys::random_secret());
    }
}
