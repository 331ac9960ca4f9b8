//! Premium subscription reconciliation.
//!
//! The payment provider is the source of truth; the profile's `is_premium` flag is a cached
//! copy that every check overwrites in full. Failures never grant premium: they surface as
//! `premium: false` with status `unknown`.

use anyhow::Result;
use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

pub mod client;
pub mod payments;
pub mod profiles;
pub mod service;

pub use client::{CheckOutcome, PremiumClient, CHECK_TIMEOUT};
pub use payments::{Customer, PaymentProvider, StripeClient, Subscription};
pub use profiles::{AccountDirectory, PremiumUpdate, ProfileStore, SupabaseClient};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubscriptionStatus {
    Active,
    Trialing,
    Inactive,
    Unknown,
}

impl SubscriptionStatus {
    /// Stripe statuses that count as premium.
    pub const ENTITLED: [&'static str; 2] = ["active", "trialing"];

    pub fn as_str(&self) -> &'static str {
        match self {
            SubscriptionStatus::Active => "active",
            SubscriptionStatus::Trialing => "trialing",
            SubscriptionStatus::Inactive => "inactive",
            SubscriptionStatus::Unknown => "unknown",
        }
    }
}

/// Result of a check, as returned to the client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PremiumStatus {
    pub premium: bool,
    pub status: SubscriptionStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subscription_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subscription_end: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl PremiumStatus {
    pub fn inactive() -> Self {
        Self { premium: false, status: SubscriptionStatus::Inactive, subscription_id: None, subscription_end: None, message: None }
    }

    /// Fail-closed answer for any lookup error.
    pub fn unknown() -> Self {
        Self { status: SubscriptionStatus::Unknown, ..Self::inactive() }
    }
}

/// The user whose entitlement is being checked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Account {
    pub id: String,
    pub email: String,
}

pub struct Reconciler {
    payments: Arc<dyn PaymentProvider>,
    profiles: Arc<dyn ProfileStore>,
}

impl Reconciler {
    pub fn new(payments: Arc<dyn PaymentProvider>, profiles: Arc<dyn ProfileStore>) -> Self {
        Self { payments, profiles }
    }

    /// Re-derive premium status from the payment provider and overwrite the profile.
    /// Errors from the provider propagate; a failed profile write is logged only.
    pub async fn reconcile(&self, account: &Account) -> Result<PremiumStatus> {
        let Some(customer) = self.payments.find_customer_by_email(&account.email).await? else {
            info!(target: "subscription", user = %account.id, "no payment customer found");
            self.write_profile(account, PremiumUpdate::new(false, None, None)).await;
            return Ok(PremiumStatus { message: Some("No payment customer found".into()), ..PremiumStatus::inactive() });
        };

        let mut subscriptions = Vec::new();
        for status in SubscriptionStatus::ENTITLED {
            subscriptions.extend(self.payments.list_subscriptions(&customer.id, status).await?);
        }

        let result = match subscriptions.into_iter().next() {
            Some(sub) => {
                let status = if sub.status == "trialing" { SubscriptionStatus::Trialing } else { SubscriptionStatus::Active };
                let subscription_end = sub.current_period_end.and_then(|secs| Utc.timestamp_opt(secs, 0).single());
                if sub.current_period_end.is_some() && subscription_end.is_none() {
                    warn!(target: "subscription", value = ?sub.current_period_end, "could not parse subscription end");
                }
                info!(target: "subscription", user = %account.id, subscription = %sub.id, status = status.as_str(), "active subscription found");
                PremiumStatus { premium: true, status, subscription_id: Some(sub.id), subscription_end, message: None }
            }
            None => {
                info!(target: "subscription", user = %account.id, "no active subscription found");
                PremiumStatus::inactive()
            }
        };

        let update = PremiumUpdate::new(result.premium, Some(customer.id), result.subscription_id.clone());
        self.write_profile(account, update).await;
        Ok(result)
    }

    async fn write_profile(&self, account: &Account, update: PremiumUpdate) {
        match self.profiles.write_premium(&account.id, &update).await {
            Ok(()) => info!(target: "subscription", user = %account.id, premium = update.is_premium, "profile updated"),
            Err(e) => warn!(target: "subscription", user = %account.id, "error updating profile: {}", e),
        }
    }
}
