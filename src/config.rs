//!
//! svboard configuration
//! ---------------------
//! Environment-driven settings for the council site and the subscription service.
//! Binaries may override individual values from CLI flags before starting.

use anyhow::{anyhow, Result};
use std::env;
use tracing_subscriber::EnvFilter;

pub const DEFAULT_HTTP_PORT: u16 = 3000;
pub const DEFAULT_DATA_FOLDER: &str = "data";
pub const DEFAULT_SUBSCRIPTION_PORT: u16 = 8787;

fn non_empty_env(name: &str) -> Option<String> {
    env::var(name).ok().map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

pub fn parse_port_env(name: &str) -> Option<u16> {
    env::var(name).ok().and_then(|v| v.parse::<u16>().ok())
}

pub fn parse_bool_env(name: &str) -> Option<bool> {
    match env::var(name) {
        Ok(v) => match v.to_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Some(true),
            "0" | "false" | "no" | "off" => Some(false),
            _ => None,
        },
        Err(_) => None,
    }
}

/// Value following `flag` on the command line, e.g. `--http-port 8080`.
pub fn flag_value(args: &[String], flag: &str) -> Option<String> {
    let mut i = 0;
    while i < args.len() {
        if args[i] == flag && i + 1 < args.len() {
            return Some(args[i + 1].clone());
        }
        i += 1;
    }
    None
}

pub fn has_flag(args: &[String], flag: &str) -> bool {
    args.iter().any(|a| a == flag)
}

/// Install the fmt subscriber for a binary: `RUST_LOG` when set, otherwise `info`.
pub fn init_tracing() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new("info"))?;
    tracing_subscriber::fmt().with_env_filter(filter).try_init().map_err(|e| anyhow!("tracing init failed: {}", e))?;
    Ok(())
}

/// Settings for the council site (`svboard` binary).
#[derive(Debug, Clone)]
pub struct Config {
    pub http_port: u16,
    /// Root folder for `store.json` and local blobs.
    pub data_folder: String,
    /// HMAC secret for session tokens. Required to start.
    pub jwt_secret: Option<String>,
    pub owner_email: Option<String>,
    pub owner_password: Option<String>,
    /// When set, uploads go to Vercel Blob instead of the local blob folder.
    pub blob_token: Option<String>,
    /// Marks session cookies `Secure`.
    pub production: bool,
}

impl Config {
    pub fn from_env() -> Self {
        let production = env::var("SV_ENV").map(|v| v.eq_ignore_ascii_case("production")).unwrap_or(false)
            || parse_bool_env("SV_PRODUCTION").unwrap_or(false);
        Self {
            http_port: parse_port_env("SV_HTTP_PORT").unwrap_or(DEFAULT_HTTP_PORT),
            data_folder: non_empty_env("SV_DATA_FOLDER").unwrap_or_else(|| DEFAULT_DATA_FOLDER.to_string()),
            jwt_secret: non_empty_env("JWT_SECRET"),
            owner_email: non_empty_env("OWNER_EMAIL"),
            // Passwords are taken verbatim; only emptiness is rejected
            owner_password: env::var("OWNER_PASSWORD").ok().filter(|v| !v.is_empty()),
            blob_token: non_empty_env("BLOB_READ_WRITE_TOKEN"),
            production,
        }
    }

    /// Owner bootstrap credentials, if both halves are configured.
    pub fn owner_credentials(&self) -> Option<(&str, &str)> {
        match (&self.owner_email, &self.owner_password) {
            (Some(e), Some(p)) => Some((e.as_str(), p.as_str())),
            _ => None,
        }
    }
}

/// Settings for the subscription check service (`check_subscription` binary).
#[derive(Debug, Clone)]
pub struct SubscriptionConfig {
    pub http_port: u16,
    pub stripe_secret_key: String,
    pub stripe_api_base: String,
    pub supabase_url: String,
    pub supabase_service_key: String,
}

impl SubscriptionConfig {
    /// Missing Stripe or Supabase settings abort startup.
    pub fn from_env() -> Result<Self> {
        let stripe_secret_key = non_empty_env("STRIPE_SECRET_KEY").ok_or_else(|| anyhow!("STRIPE_SECRET_KEY is not set"))?;
        let supabase_url = non_empty_env("SUPABASE_URL");
        let supabase_service_key = non_empty_env("SUPABASE_SERVICE_ROLE_KEY");
        let (Some(supabase_url), Some(supabase_service_key)) = (supabase_url, supabase_service_key) else {
            return Err(anyhow!("Supabase environment variables not set"));
        };
        Ok(Self {
            http_port: parse_port_env("SUBSCRIPTION_HTTP_PORT").unwrap_or(DEFAULT_SUBSCRIPTION_PORT),
            stripe_secret_key,
            stripe_api_base: non_empty_env("STRIPE_API_BASE").unwrap_or_else(|| "https://api.stripe.com".to_string()),
            supabase_url: supabase_url.trim_end_matches('/').to_string(),
            supabase_service_key,
        })
    }
}

/// Fallback payment link shown when the subscription check cannot complete.
pub fn premium_payment_link() -> Option<String> {
    non_empty_env("PREMIUM_PAYMENT_LINK")
}
