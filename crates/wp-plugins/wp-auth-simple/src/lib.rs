//! # wp-auth-simple
//!
//! Argon2-based implementation of `AuthProvider`.
//! Handles password hashing and stateless, signed session tokens.

use async_trait::async_trait;
use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use chrono::Utc;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use uuid::Uuid;
use wp_core::traits::AuthProvider;

type HmacSha256 = Hmac<Sha256>;

/// Sessions older than this are rejected (30 days).
pub const SESSION_MAX_AGE_SECS: i64 = 30 * 24 * 60 * 60;

/// Tolerated clock drift for tokens stamped slightly in the future.
const CLOCK_SKEW_SECS: i64 = 60;

pub struct SimpleAuthProvider {
    /// HMAC keyed with the session secret; cloned per signature.
    mac: HmacSha256,
    max_age_secs: i64,
}

impl SimpleAuthProvider {
    /// Accepts a secret string (e.g., from an environment variable).
    /// Rotating the secret logs everyone out.
    pub fn new(secret: &str) -> anyhow::Result<Self> {
        let mac = HmacSha256::new_from_slice(secret.as_bytes())
            .map_err(|e| anyhow::anyhow!("invalid session secret: {e}"))?;
        Ok(Self {
            mac,
            max_age_secs: SESSION_MAX_AGE_SECS,
        })
    }

    pub fn with_max_age(mut self, secs: i64) -> Self {
        self.max_age_secs = secs;
        self
    }

    fn keyed(&self, payload: &str) -> HmacSha256 {
        let mut mac = self.mac.clone();
        mac.update(payload.as_bytes());
        mac
    }

    fn issue_session_at(&self, user_id: Uuid, issued_at: i64) -> String {
        let payload = format!("{}.{}", user_id.simple(), issued_at);
        let signature = hex::encode(self.keyed(&payload).finalize().into_bytes());
        format!("{payload}.{signature}")
    }

    fn verify_session_at(&self, token: &str, now: i64) -> Option<Uuid> {
        let (payload, signature) = token.rsplit_once('.')?;
        let signature = hex::decode(signature).ok()?;
        self.keyed(payload).verify_slice(&signature).ok()?;

        let (id, issued_at) = payload.split_once('.')?;
        let issued_at: i64 = issued_at.parse().ok()?;
        if issued_at > now + CLOCK_SKEW_SECS || now - issued_at > self.max_age_secs {
            return None;
        }
        Uuid::parse_str(id).ok()
    }
}

#[async_trait]
impl AuthProvider for SimpleAuthProvider {
    async fn hash_password(&self, password: &str) -> anyhow::Result<String> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| anyhow::anyhow!("password hashing failed: {e}"))?;
        Ok(hash.to_string())
    }

    /// Verifies if a provided password matches a stored Argon2 hash.
    async fn verify_password(&self, password: &str, hash: &str) -> bool {
        let parsed_hash = match PasswordHash::new(hash) {
            Ok(p) => p,
            Err(_) => return false,
        };
        Argon2::default()
            .verify_password(password.as_bytes(), &parsed_hash)
            .is_ok()
    }

    /// Result format: `{user id, simple}.{issued at, unix secs}.{hex hmac-sha256}`
    fn issue_session(&self, user_id: Uuid) -> String {
        self.issue_session_at(user_id, Utc::now().timestamp())
    }

    fn verify_session(&self, token: &str) -> Option<Uuid> {
        self.verify_session_at(token, Utc::now().timestamp())
    }
}
