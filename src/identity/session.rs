//! Stateless session tokens.
//!
//! A token is `header.payload.signature`, each segment base64url without padding, signed
//! with HMAC-SHA256 (the HS256 JWT layout). The payload carries the claim plus `iat` and
//! `exp` in unix seconds. Nothing is kept server side: revoking a token before it expires
//! requires rotating the secret.

use anyhow::{anyhow, Result};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;
use crate::tprintln;

use super::claims::SessionClaim;

pub type SignedToken = String;

type HmacSha256 = Hmac<Sha256>;

/// Seven days, shared by the token expiry and the cookie max-age.
pub const SESSION_MAX_AGE: i64 = 60 * 60 * 24 * 7;

const TOKEN_HEADER: &str = r#"{"alg":"HS256","typ":"JWT"}"#;

#[derive(Deserialize)]
struct Header {
    alg: String,
}

#[derive(Deserialize)]
struct Payload {
    #[serde(flatten)]
    claim: SessionClaim,
    exp: i64,
}

#[derive(Clone)]
pub struct SessionCodec {
    mac: HmacSha256,
    ttl_secs: i64,
}

impl std::fmt::Debug for SessionCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionCodec").field("ttl_secs", &self.ttl_secs).finish_non_exhaustive()
    }
}

impl SessionCodec {
    /// Build a codec from the server secret. An empty secret is a startup error.
    pub fn new(secret: &str) -> Result<Self> {
        if secret.is_empty() {
            return Err(anyhow!("JWT_SECRET is not set"));
        }
        let mac = HmacSha256::new_from_slice(secret.as_bytes()).map_err(|e| anyhow!(e.to_string()))?;
        Ok(Self { mac, ttl_secs: SESSION_MAX_AGE })
    }

    pub fn from_secret(secret: Option<&str>) -> Result<Self> {
        Self::new(secret.unwrap_or_default())
    }

    pub fn ttl_secs(&self) -> i64 { self.ttl_secs }

    pub fn sign(&self, claim: &SessionClaim) -> SignedToken {
        self.sign_at(claim, chrono::Utc::now().timestamp())
    }

    pub fn sign_at(&self, claim: &SessionClaim, now: i64) -> SignedToken {
        let exp = now + self.ttl_secs;
        let body = serde_json::json!({
            "userId": claim.user_id,
            "role": claim.role.as_str(),
            "iat": now,
            "exp": exp,
        });
        let signing_input = format!(
            "{}.{}",
            URL_SAFE_NO_PAD.encode(TOKEN_HEADER),
            URL_SAFE_NO_PAD.encode(body.to_string())
        );
        let signature = self.signature(&signing_input);
        tprintln!("session.sign user={} exp={}", claim.user_id, exp);
        format!("{}.{}", signing_input, URL_SAFE_NO_PAD.encode(signature))
    }

    pub fn verify(&self, token: &str) -> Option<SessionClaim> {
        self.verify_at(token, chrono::Utc::now().timestamp())
    }

    /// All-or-nothing: malformed, tampered and expired tokens all yield `None`.
    pub fn verify_at(&self, token: &str, now: i64) -> Option<SessionClaim> {
        let mut parts = token.split('.');
        let (Some(h), Some(p), Some(s), None) = (parts.next(), parts.next(), parts.next(), parts.next()) else {
            return None;
        };

        let header: Header = serde_json::from_slice(&URL_SAFE_NO_PAD.decode(h).ok()?).ok()?;
        if header.alg != "HS256" {
            return None;
        }

        let signature = URL_SAFE_NO_PAD.decode(s).ok()?;
        let mut mac = self.mac.clone();
        mac.update(h.as_bytes());
        mac.update(b".");
        mac.update(p.as_bytes());
        mac.verify_slice(&signature).ok()?;

        let payload: Payload = serde_json::from_slice(&URL_SAFE_NO_PAD.decode(p).ok()?).ok()?;
        if now >= payload.exp {
            return None;
        }
        Some(payload.claim)
    }

    fn signature(&self, signing_input: &str) -> Vec<u8> {
        let mut mac = self.mac.clone();
        mac.update(signing_input.as_bytes());
        mac.finalize().into_bytes().to_vec()
    }
}

#[cfg(test)]
#[path = "session_tests.rs"]
mod session_tests;
