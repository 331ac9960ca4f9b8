use anyhow::{anyhow, Result};
use async_trait::async_trait;
use serde::Deserialize;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Customer {
    pub id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Subscription {
    pub id: String,
    pub status: String,
    /// Unix seconds; absent on some API versions.
    #[serde(default)]
    pub current_period_end: Option<i64>,
}

#[async_trait]
pub trait PaymentProvider: Send + Sync {
    async fn find_customer_by_email(&self, email: &str) -> Result<Option<Customer>>;
    async fn list_subscriptions(&self, customer_id: &str, status: &str) -> Result<Vec<Subscription>>;
}

#[derive(Deserialize)]
struct ListResponse<T> {
    data: Vec<T>,
}

/// Stripe REST client (customers and subscriptions list endpoints only).
pub struct StripeClient {
    client: reqwest::Client,
    secret_key: String,
    api_base: String,
}

impl StripeClient {
    pub fn new(secret_key: String, api_base: &str) -> Result<Self> {
        let client = reqwest::Client::builder().build()?;
        Ok(Self { client, secret_key, api_base: api_base.trim_end_matches('/').to_string() })
    }

    async fn list<T: serde::de::DeserializeOwned>(&self, path: &str, query: &[(&str, &str)]) -> Result<Vec<T>> {
        let resp = self.client
            .get(format!("{}{}", self.api_base, path))
            .bearer_auth(&self.secret_key)
            .query(query)
            .send()
            .await?;
        let status = resp.status();
        if !status.is_success() {
            let body: serde_json::Value = resp.json().await.unwrap_or(serde_json::json!({}));
            let msg = body.pointer("/error/message").and_then(|m| m.as_str()).unwrap_or("no message");
            return Err(anyhow!("stripe {} failed: HTTP {}: {}", path, status, msg));
        }
        let list: ListResponse<T> = resp.json().await?;
        Ok(list.data)
    }
}

#[async_trait]
impl PaymentProvider for StripeClient {
    async fn find_customer_by_email(&self, email: &str) -> Result<Option<Customer>> {
        let customers: Vec<Customer> = self.list("/v1/customers", &[("email", email), ("limit", "1")]).await?;
        Ok(customers.into_iter().next())
    }

    async fn list_subscriptions(&self, customer_id: &str, status: &str) -> Result<Vec<Subscription>> {
        self.list("/v1/subscriptions", &[("customer", customer_id), ("status", status), ("limit", "10")]).await
    }
}
