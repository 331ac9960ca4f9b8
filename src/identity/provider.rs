use anyhow::{anyhow, Result};
use std::sync::Arc;
use crate::tprintln;

use super::claims::SessionClaim;
use super::session::{SessionCodec, SignedToken};
use crate::security;
use crate::storage::UserStore;

#[derive(Debug, Clone)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone)]
pub struct LoginResponse {
    pub user_id: String,
    pub token: SignedToken,
}

/// Email + password login against the user store, issuing a signed session token.
#[derive(Clone)]
pub struct LocalAuthProvider {
    users: Arc<dyn UserStore>,
    codec: SessionCodec,
}

impl LocalAuthProvider {
    pub fn new(users: Arc<dyn UserStore>, codec: SessionCodec) -> Self { Self { users, codec } }

    /// Every failure (bad form input, unknown email, wrong password) is `invalid_credentials`.
    pub async fn login(&self, req: &LoginRequest) -> Result<LoginResponse> {
        let email = req.email.trim();
        if !security::is_valid_email(email) || req.password.is_empty() {
            return Err(anyhow!("invalid_credentials"));
        }
        let Some(user) = self.users.find_by_email(email).await? else {
            return Err(anyhow!("invalid_credentials"));
        };
        let hash = user.password_hash.clone();
        let password = req.password.clone();
        // Argon2 verification blocks; run it off the async workers
        let ok = tokio::task::spawn_blocking(move || security::verify_password(&hash, &password)).await?;
        if !ok {
            return Err(anyhow!("invalid_credentials"));
        }
        let claim = SessionClaim { user_id: user.id.clone(), role: user.role };
        let token = self.codec.sign(&claim);
        tprintln!("auth.login user={}", user.id);
        Ok(LoginResponse { user_id: user.id, token })
    }
}
