use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Account;

/// Full overwrite of the cached entitlement on a profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PremiumUpdate {
    pub is_premium: bool,
    pub stripe_customer_id: Option<String>,
    pub stripe_subscription_id: Option<String>,
    pub premium_updated_at: DateTime<Utc>,
}

impl PremiumUpdate {
    pub fn new(is_premium: bool, customer_id: Option<String>, subscription_id: Option<String>) -> Self {
        Self {
            is_premium,
            stripe_customer_id: customer_id,
            stripe_subscription_id: subscription_id,
            premium_updated_at: Utc::now(),
        }
    }
}

#[async_trait]
pub trait ProfileStore: Send + Sync {
    async fn write_premium(&self, user_id: &str, update: &PremiumUpdate) -> Result<()>;
}

/// Resolves the caller of the check endpoint.
#[async_trait]
pub trait AccountDirectory: Send + Sync {
    async fn user_from_token(&self, access_token: &str) -> Result<Account>;
    async fn user_by_email(&self, email: &str) -> Result<Account>;
}

#[derive(Deserialize)]
struct AuthUser {
    id: String,
    #[serde(default)]
    email: Option<String>,
}

#[derive(Deserialize)]
struct AuthUserList {
    #[serde(default)]
    users: Vec<AuthUser>,
}

impl AuthUser {
    fn into_account(self) -> Result<Account> {
        let email = self.email.filter(|e| !e.is_empty()).ok_or_else(|| anyhow!("User email not available"))?;
        Ok(Account { id: self.id, email })
    }
}

/// Supabase auth + PostgREST client using the service-role key.
pub struct SupabaseClient {
    client: reqwest::Client,
    url: String,
    service_key: String,
}

impl SupabaseClient {
    pub fn new(url: &str, service_key: String) -> Result<Self> {
        let client = reqwest::Client::builder().build()?;
        Ok(Self { client, url: url.trim_end_matches('/').to_string(), service_key })
    }
}

#[async_trait]
impl ProfileStore for SupabaseClient {
    async fn write_premium(&self, user_id: &str, update: &PremiumUpdate) -> Result<()> {
        let resp = self.client
            .patch(format!("{}/rest/v1/profiles", self.url))
            .query(&[("user_id", format!("eq.{}", user_id))])
            .header("apikey", &self.service_key)
            .bearer_auth(&self.service_key)
            .header("Prefer", "return=minimal")
            .json(update)
            .send()
            .await?;
        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(anyhow!("profile update failed: HTTP {}: {}", status, body));
        }
        Ok(())
    }
}

#[async_trait]
impl AccountDirectory for SupabaseClient {
    async fn user_from_token(&self, access_token: &str) -> Result<Account> {
        let resp = self.client
            .get(format!("{}/auth/v1/user", self.url))
            .header("apikey", &self.service_key)
            .bearer_auth(access_token)
            .send()
            .await?;
        if !resp.status().is_success() {
            return Err(anyhow!("Authentication error: HTTP {}", resp.status()));
        }
        resp.json::<AuthUser>().await?.into_account()
    }

    async fn user_by_email(&self, email: &str) -> Result<Account> {
        let resp = self.client
            .get(format!("{}/auth/v1/admin/users", self.url))
            .query(&[("filter", email)])
            .header("apikey", &self.service_key)
            .bearer_auth(&self.service_key)
            .send()
            .await?;
        if !resp.status().is_success() {
            return Err(anyhow!("User lookup failed: HTTP {}", resp.status()));
        }
        let list: AuthUserList = resp.json().await?;
        let user = list.users
            .into_iter()
            .find(|u| u.email.as_deref().is_some_and(|e| e.eq_ignore_ascii_case(email)))
            .ok_or_else(|| anyhow!("User lookup failed: No user found"))?;
        user.into_account()
    }
}
