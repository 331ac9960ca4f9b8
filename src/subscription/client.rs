use anyhow::{anyhow, Result};
use std::time::Duration;
use tracing::warn;

use super::PremiumStatus;

/// Client-side abort for the subscription check.
pub const CHECK_TIMEOUT: Duration = Duration::from_secs(15);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckOutcome {
    Resolved(PremiumStatus),
    /// The check did not complete; send the user to the static payment link instead.
    Fallback { payment_link: String },
}

/// Caller of the check endpoint. One attempt per call, no retries.
pub struct PremiumClient {
    http: reqwest::Client,
    endpoint: String,
    payment_link: String,
}

impl PremiumClient {
    pub fn new(endpoint: &str, payment_link: &str) -> Result<Self> {
        Self::with_timeout(endpoint, payment_link, CHECK_TIMEOUT)
    }

    pub fn with_timeout(endpoint: &str, payment_link: &str, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { http, endpoint: endpoint.to_string(), payment_link: payment_link.to_string() })
    }

    pub async fn check(&self, email: &str, access_token: Option<&str>) -> CheckOutcome {
        match self.request(email, access_token).await {
            Ok(status) => CheckOutcome::Resolved(status),
            Err(e) => {
                warn!(target: "subscription", "subscription check fell back to payment link: {}", e);
                CheckOutcome::Fallback { payment_link: self.payment_link.clone() }
            }
        }
    }

    async fn request(&self, email: &str, access_token: Option<&str>) -> Result<PremiumStatus> {
        let mut req = self.http.post(&self.endpoint).json(&serde_json::json!({"email": email}));
        if let Some(token) = access_token {
            req = req.bearer_auth(token);
        }
        let resp = req.send().await?;
        if !resp.status().is_success() {
            return Err(anyhow!("check endpoint returned HTTP {}", resp.status()));
        }
        Ok(resp.json::<PremiumStatus>().await?)
    }
}
