//!
//! check_subscription binary
//! -------------------------
//! Serves `POST /check-subscription` for the premium app. With `--check EMAIL` it instead
//! acts as the client: one check against `--endpoint`, falling back to the payment link.

use anyhow::{anyhow, Result};
use tracing::info;

use svboard::config::{flag_value, has_flag, init_tracing, premium_payment_link, SubscriptionConfig};
use svboard::subscription::{service, CheckOutcome, PremiumClient};

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing()?;

    let args: Vec<String> = std::env::args().collect();
    if has_flag(&args, "--help") || has_flag(&args, "-h") {
        println!("check_subscription\n\nUSAGE:\n  check_subscription [--http-port N]\n  check_subscription --check EMAIL --endpoint URL [--token ACCESS_TOKEN]\n\nENV:\n  STRIPE_SECRET_KEY, SUPABASE_URL, SUPABASE_SERVICE_ROLE_KEY (server mode)\n  SUBSCRIPTION_HTTP_PORT (default 8787), PREMIUM_PAYMENT_LINK (client mode)\n");
        return Ok(());
    }

    if let Some(email) = flag_value(&args, "--check") {
        let endpoint = flag_value(&args, "--endpoint").ok_or_else(|| anyhow!("--endpoint is required with --check"))?;
        let link = premium_payment_link().unwrap_or_default();
        let client = PremiumClient::new(&endpoint, &link)?;
        match client.check(&email, flag_value(&args, "--token").as_deref()).await {
            CheckOutcome::Resolved(status) => println!("{}", serde_json::to_string_pretty(&status)?),
            CheckOutcome::Fallback { payment_link } => println!("check unavailable; payment link: {}", payment_link),
        }
        return Ok(());
    }

    let mut cfg = SubscriptionConfig::from_env()?;
    if let Some(port) = flag_value(&args, "--http-port").and_then(|v| v.parse::<u16>().ok()) {
        cfg.http_port = port;
    }
    info!(target: "startup", "check_subscription starting: http_port={}, stripe_api={}", cfg.http_port, cfg.stripe_api_base);
    service::run(cfg).await
}
