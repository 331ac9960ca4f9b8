use anyhow::{anyhow, Result};
use argon2::{Argon2, PasswordHasher, PasswordVerifier};
use once_cell::sync::Lazy;
use password_hash::{PasswordHash, SaltString};
use regex::Regex;
use tracing::info;

use crate::error::{AppError, AppResult};
use crate::identity::Role;
use crate::storage::{new_id, User, UserStore};

pub const MIN_ADMIN_PASSWORD_LEN: usize = 8;

static EMAIL_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern"));

/// Argon2 PHC string with a fresh 16-byte salt.
pub fn hash_password(password: &str) -> Result<String> {
    let mut seed = [0u8; 16];
    getrandom::getrandom(&mut seed).map_err(|e| anyhow!("salt generation failed: {}", e))?;
    let salt = SaltString::encode_b64(&seed).map_err(|e| anyhow!("salt encoding failed: {}", e))?;
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|phc| phc.to_string())
        .map_err(|e| anyhow!("password hashing failed: {}", e))
}

/// False for a wrong password and for a stored hash that is not a valid PHC string.
pub fn verify_password(phc: &str, password: &str) -> bool {
    PasswordHash::new(phc).is_ok_and(|parsed| Argon2::default().verify_password(password.as_bytes(), &parsed).is_ok())
}

pub fn is_valid_email(email: &str) -> bool {
    EMAIL_RE.is_match(email)
}

/// Create the owner admin from bootstrap credentials unless that email already exists.
/// Returns true when a user was created.
pub async fn ensure_owner_admin(users: &dyn UserStore, email: &str, password: &str) -> Result<bool> {
    let email = email.trim();
    if email.is_empty() || password.is_empty() {
        return Err(anyhow!("OWNER_EMAIL and OWNER_PASSWORD must be set"));
    }
    if users.find_by_email(email).await?.is_some() {
        return Ok(false);
    }
    let user = User {
        id: new_id(),
        email: email.to_string(),
        password_hash: hash_password(password)?,
        role: Role::Admin,
        created_at: chrono::Utc::now(),
    };
    users.insert_user(user).await?;
    info!(target: "auth", "owner admin created: {}", email);
    Ok(true)
}

#[derive(Debug, Clone, Default)]
pub struct AdminInput {
    pub email: String,
    pub password: String,
}

/// Validate and create a further admin account.
pub async fn create_admin(users: &dyn UserStore, input: &AdminInput) -> AppResult<User> {
    let email = input.email.trim();
    if !is_valid_email(email) || input.password.chars().count() < MIN_ADMIN_PASSWORD_LEN {
        return Err(AppError::user(
            "invalid_admin",
            "Please enter valid data (password at least 8 characters).",
        ));
    }
    if users.find_by_email(email).await?.is_some() {
        return Err(AppError::conflict("email_taken", "E-mail address is already in use."));
    }
    let user = User {
        id: new_id(),
        email: email.to_string(),
        password_hash: hash_password(&input.password)?,
        role: Role::Admin,
        created_at: chrono::Utc::now(),
    };
    users.insert_user(user.clone()).await?;
    info!(target: "auth", "admin created: {}", email);
    Ok(user)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::JsonStore;

    #[test]
    fn argon2_hash_roundtrip_positive_and_negative() {
        let phc = hash_password("correct horse").unwrap();
        assert!(phc.starts_with("$argon2"));
        assert!(verify_password(&phc, "correct horse"));
        assert!(!verify_password(&phc, "wrong horse"));
        assert!(!verify_password("not-a-phc", "correct horse"));
    }

    #[test]
    fn fresh_salt_per_hash_and_malformed_hashes_never_verify() {
        let a = hash_password("same secret").unwrap();
        let b = hash_password("same secret").unwrap();
        assert_ne!(a, b);
        assert!(verify_password(&a, "same secret") && verify_password(&b, "same secret"));
        for stored in ["", "$argon2id$", "$argon2id$v=19$m=19456,t=2,p=1$c2FsdA$", "plaintext"] {
            assert!(!verify_password(stored, "same secret"), "{:?}", stored);
        }
    }

    #[test]
    fn email_shape() {
        assert!(is_valid_email("sv@schule.de"));
        assert!(!is_valid_email("sv@schule"));
        assert!(!is_valid_email("no at sign.de"));
        assert!(!is_valid_email(""));
    }

    #[tokio::test]
    async fn owner_bootstrap_is_idempotent() {
        let store = JsonStore::in_memory();
        assert!(ensure_owner_admin(&store, " owner@example.org ", "pw").await.unwrap());
        assert!(!ensure_owner_admin(&store, "owner@example.org", "other").await.unwrap());
        let owner = store.find_by_email("owner@example.org").await.unwrap().unwrap();
        assert!(verify_password(&owner.password_hash, "pw"));
        assert!(ensure_owner_admin(&store, "", "pw").await.is_err());
    }

    #[tokio::test]
    async fn create_admin_validates_and_rejects_duplicates() {
        let store = JsonStore::in_memory();
        let short = AdminInput { email: "a@example.org".into(), password: "short".into() };
        assert_eq!(create_admin(&store, &short).await.unwrap_err().http_status(), 400);

        let ok = AdminInput { email: "a@example.org".into(), password: "long-enough".into() };
        let user = create_admin(&store, &ok).await.unwrap();
        assert_eq!(user.role, Role::Admin);
        assert_eq!(create_admin(&store, &ok).await.unwrap_err().http_status(), 409);
    }
}
