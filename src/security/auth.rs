use rocket::http::Status;
use rocket::request::{FromRequest, Outcome, Request};
use rocket::State;
use sha2::{Digest, Sha256};
use std::sync::Arc;

use crate::models::user::User;
use crate::security::token::TokenKeys;
use crate::store::Store;

// ── Client IP request guard ──

/// Extracts the real client IP from the request.
/// Checks headers in priority order:
///   1. X-Real-IP (nginx proxy_set_header)
///   2. X-Forwarded-For (first IP in the chain = original client)
///   3. Rocket's client_ip() (socket peer address)
pub struct ClientIp(pub String);

#[rocket::async_trait]
impl<'r> FromRequest<'r> for ClientIp {
    type Error = ();

    async fn from_request(request: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        let headers = request.headers();

        if let Some(ip) = headers.get_one("X-Real-IP") {
            let ip = ip.trim();
            if !ip.is_empty() {
                return Outcome::Success(ClientIp(ip.to_string()));
            }
        }

        // X-Forwarded-For: client, proxy1, proxy2; take the leftmost
        if let Some(forwarded) = headers.get_one("X-Forwarded-For") {
            if let Some(ip) = forwarded.split(',').next() {
                let ip = ip.trim();
                if !ip.is_empty() {
                    return Outcome::Success(ClientIp(ip.to_string()));
                }
            }
        }

        let ip = request
            .client_ip()
            .map(|ip| ip.to_string())
            .unwrap_or_else(|| "unknown".to_string());
        Outcome::Success(ClientIp(ip))
    }
}

// ── Bearer token guard ──

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthError {
    /// No `Authorization: Bearer` header. Answered with 401.
    MissingToken,
    /// Bad signature, expired, or the user is gone. Answered with 403.
    InvalidToken,
}

/// Guard: a request carrying a valid bearer token for an existing user.
pub struct AuthUser {
    pub user: User,
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for AuthUser {
    type Error = AuthError;

    async fn from_request(request: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        let token = match bearer_token(request.headers().get_one("Authorization")) {
            Some(t) => t,
            None => return Outcome::Error((Status::Unauthorized, AuthError::MissingToken)),
        };

        let (store, keys) = match (
            request.guard::<&State<Arc<dyn Store>>>().await.succeeded(),
            request.guard::<&State<TokenKeys>>().await.succeeded(),
        ) {
            (Some(s), Some(k)) => (s, k),
            _ => return Outcome::Error((Status::InternalServerError, AuthError::InvalidToken)),
        };

        let claims = match keys.verify(token) {
            Ok(c) => c,
            Err(e) => {
                log::debug!("Rejected bearer token: {}", e);
                return Outcome::Error((Status::Forbidden, AuthError::InvalidToken));
            }
        };

        match store.user_get_by_id(claims.user_id) {
            Some(user) => Outcome::Success(AuthUser { user }),
            None => Outcome::Error((Status::Forbidden, AuthError::InvalidToken)),
        }
    }
}

/// Pull the token out of an `Authorization` header value.
///
/// The token is the second word whatever the scheme, so `Basic x` yields
/// `x` and fails verification with 403 rather than counting as missing.
pub fn bearer_token(header: Option<&str>) -> Option<&str> {
    header?.split_whitespace().nth(1)
}

// ── Password utilities ──

pub fn hash_password(password: &str, cost: u32) -> Result<String, String> {
    bcrypt::hash(password, cost).map_err(|e| e.to_string())
}

pub fn verify_password(password: &str, hash: &str) -> bool {
    bcrypt::verify(password, hash).unwrap_or(false)
}

pub const MIN_PASSWORD_LEN: usize = 6;

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

pub fn is_plausible_email(email: &str) -> bool {
    match email.split_once('@') {
        Some((local, domain)) => !local.is_empty() && !domain.is_empty() && !email.contains(' '),
        None => false,
    }
}

/// Rate limiter keys hash the IP so raw addresses are not kept in memory.
pub fn hash_ip(ip: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(ip.as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bearer_header_parsing() {
        assert_eq!(bearer_token(Some("Bearer abc.def.ghi")), Some("abc.def.ghi"));
        assert_eq!(bearer_token(Some("bearer  tok ")), Some("tok"));
        assert_eq!(bearer_token(Some("Basic dXNlcjpwYXNz")), Some("dXNlcjpwYXNz"));
        assert_eq!(bearer_token(Some("Bearer ")), None);
        assert_eq!(bearer_token(Some("Bearer")), None);
        assert_eq!(bearer_token(None), None);
    }

    #[test]
    fn password_roundtrip() {
        let hash = hash_password("hunter22", 4).unwrap();
        assert_ne!(hash, "hunter22");
        assert!(verify_password("hunter22", &hash));
        assert!(!verify_password("hunter23", &hash));
        assert!(!verify_password("hunter22", "not-a-bcrypt-hash"));
    }

    #[test]
    fn email_normalization() {
        assert_eq!(normalize_email("  Ada@Example.COM "), "ada@example.com");
        assert!(is_plausible_email("a@b.co"));
        assert!(!is_plausible_email("ab.co"));
        assert!(!is_plausible_email("@b.co"));
        assert!(!is_plausible_email("a@"));
        assert!(!is_plausible_email("a b@c.d"));
    }

    #[test]
    fn ip_hash_is_stable_hex() {
        let h = hash_ip("127.0.0.1");
        assert_eq!(h.len(), 64);
        assert_eq!(h, hash_ip("127.0.0.1"));
        assert_ne!(h, hash_ip("127.0.0.2"));
    }
}
