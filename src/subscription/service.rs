//! HTTP front for the subscription check, called from the browser with CORS.

use axum::body::Bytes;
use axum::extract::State;
use axum::http::header::{AUTHORIZATION, CONTENT_TYPE};
use axum::http::{HeaderMap, HeaderName, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use serde::Deserialize;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info};

use super::{Account, AccountDirectory, PremiumStatus, Reconciler, StripeClient, SupabaseClient};
use crate::config::SubscriptionConfig;

#[derive(Clone)]
pub struct SubscriptionState {
    pub reconciler: Arc<Reconciler>,
    pub accounts: Arc<dyn AccountDirectory>,
}

#[derive(Debug, Default, Deserialize)]
struct CheckBody {
    #[serde(default)]
    email: Option<String>,
}

/// Browser callers from any origin; preflight requests are answered by the layer.
fn cors() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::POST, Method::OPTIONS])
        .allow_headers([
            AUTHORIZATION,
            HeaderName::from_static("x-client-info"),
            HeaderName::from_static("apikey"),
            CONTENT_TYPE,
        ])
}

pub fn router(state: SubscriptionState) -> Router {
    Router::new()
        .route("/check-subscription", post(check_subscription))
        .layer(cors())
        .with_state(state)
}

/// Bearer token wins; without one the JSON body must name the email.
async fn resolve_account(accounts: &dyn AccountDirectory, headers: &HeaderMap, body: &Bytes) -> anyhow::Result<Account> {
    if let Some(auth) = headers.get(AUTHORIZATION).and_then(|v| v.to_str().ok()) {
        info!(target: "subscription", "authorization header found");
        let token = auth.strip_prefix("Bearer ").unwrap_or(auth);
        return accounts.user_from_token(token).await;
    }
    let parsed: CheckBody = serde_json::from_slice(body).unwrap_or_default();
    let Some(email) = parsed.email.filter(|e| !e.trim().is_empty()) else {
        return Err(anyhow::anyhow!("No authorization or email provided"));
    };
    accounts.user_by_email(email.trim()).await
}

async fn check_subscription(State(state): State<SubscriptionState>, headers: HeaderMap, body: Bytes) -> Response {
    info!(target: "subscription", "check started");
    let outcome = match resolve_account(state.accounts.as_ref(), &headers, &body).await {
        Ok(account) => {
            info!(target: "subscription", user = %account.id, "user resolved");
            state.reconciler.reconcile(&account).await
        }
        Err(e) => Err(e),
    };
    match outcome {
        Ok(status) => (StatusCode::OK, Json(status)).into_response(),
        Err(e) => {
            error!(target: "subscription", "check failed: {}", e);
            let unknown = PremiumStatus::unknown();
            let body = serde_json::json!({"error": e.to_string(), "premium": unknown.premium, "status": unknown.status});
            (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
        }
    }
}

/// Build the Stripe/Supabase clients from config and serve the check endpoint.
pub async fn run(cfg: SubscriptionConfig) -> anyhow::Result<()> {
    let stripe = Arc::new(StripeClient::new(cfg.stripe_secret_key.clone(), &cfg.stripe_api_base)?);
    let supabase = Arc::new(SupabaseClient::new(&cfg.supabase_url, cfg.supabase_service_key.clone())?);
    let state = SubscriptionState {
        reconciler: Arc::new(Reconciler::new(stripe, supabase.clone())),
        accounts: supabase,
    };
    let addr: SocketAddr = format!("0.0.0.0:{}", cfg.http_port).parse()?;
    info!(target: "startup", "subscription service on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router(state)).await?;
    Ok(())
}
