//! Subscription reconciliation tests: the reconciler against fake providers, the check
//! endpoint, the premium client fallback and the Stripe client against a local mock.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use axum::body::Body;
use axum::extract::Query;
use axum::http::header::{AUTHORIZATION, CONTENT_TYPE, ORIGIN};
use axum::http::{HeaderMap, Request, StatusCode};
use axum::routing::{get, post};
use axum::{Json, Router};
use http_body_util::BodyExt;
use parking_lot::Mutex;
use tower::ServiceExt;

use svboard::subscription::service::{router, SubscriptionState};
use svboard::subscription::{
    Account, AccountDirectory, CheckOutcome, Customer, PaymentProvider, PremiumClient, PremiumStatus, PremiumUpdate,
    ProfileStore, Reconciler, StripeClient, Subscription, SubscriptionStatus,
};

#[derive(Default)]
struct FakePayments {
    customer: Option<Customer>,
    active: Vec<Subscription>,
    trialing: Vec<Subscription>,
    fail: bool,
}

#[async_trait]
impl PaymentProvider for FakePayments {
    async fn find_customer_by_email(&self, _email: &str) -> Result<Option<Customer>> {
        if self.fail {
            return Err(anyhow!("stripe unavailable"));
        }
        Ok(self.customer.clone())
    }

    async fn list_subscriptions(&self, _customer_id: &str, status: &str) -> Result<Vec<Subscription>> {
        Ok(match status {
            "active" => self.active.clone(),
            "trialing" => self.trialing.clone(),
            _ => Vec::new(),
        })
    }
}

#[derive(Default)]
struct RecordingProfiles {
    writes: Mutex<Vec<(String, PremiumUpdate)>>,
    fail: bool,
}

#[async_trait]
impl ProfileStore for RecordingProfiles {
    async fn write_premium(&self, user_id: &str, update: &PremiumUpdate) -> Result<()> {
        if self.fail {
            return Err(anyhow!("profiles table unavailable"));
        }
        self.writes.lock().push((user_id.to_string(), update.clone()));
        Ok(())
    }
}

struct FixedAccounts;

#[async_trait]
impl AccountDirectory for FixedAccounts {
    async fn user_from_token(&self, access_token: &str) -> Result<Account> {
        if access_token == "good-token" {
            Ok(Account { id: "user-token".into(), email: "token@example.org".into() })
        } else {
            Err(anyhow!("Authentication error: invalid JWT"))
        }
    }

    async fn user_by_email(&self, email: &str) -> Result<Account> {
        if email == "member@example.org" {
            Ok(Account { id: "user-email".into(), email: email.into() })
        } else {
            Err(anyhow!("User lookup failed: No user found"))
        }
    }
}

fn sub(id: &str, status: &str, end: Option<i64>) -> Subscription {
    Subscription { id: id.into(), status: status.into(), current_period_end: end }
}

fn account() -> Account {
    Account { id: "user-1".into(), email: "member@example.org".into() }
}

#[tokio::test]
async fn no_customer_clears_premium() {
    let profiles = Arc::new(RecordingProfiles::default());
    let r = Reconciler::new(Arc::new(FakePayments::default()), profiles.clone());
    let status = r.reconcile(&account()).await.unwrap();
    assert!(!status.premium);
    assert_eq!(status.status, SubscriptionStatus::Inactive);
    assert_eq!(status.message.as_deref(), Some("No payment customer found"));

    let writes = profiles.writes.lock();
    assert_eq!(writes.len(), 1);
    assert_eq!(writes[0].0, "user-1");
    assert!(!writes[0].1.is_premium);
    assert_eq!(writes[0].1.stripe_customer_id, None);
}

#[tokio::test]
async fn active_subscription_wins_over_trialing() {
    let profiles = Arc::new(RecordingProfiles::default());
    let payments = FakePayments {
        customer: Some(Customer { id: "cus_1".into() }),
        active: vec![sub("sub_active", "active", Some(1_900_000_000))],
        trialing: vec![sub("sub_trial", "trialing", None)],
        ..Default::default()
    };
    let r = Reconciler::new(Arc::new(payments), profiles.clone());
    let status = r.reconcile(&account()).await.unwrap();
    assert!(status.premium);
    assert_eq!(status.status, SubscriptionStatus::Active);
    assert_eq!(status.subscription_id.as_deref(), Some("sub_active"));
    assert_eq!(status.subscription_end.map(|d| d.timestamp()), Some(1_900_000_000));

    let writes = profiles.writes.lock();
    assert!(writes[0].1.is_premium);
    assert_eq!(writes[0].1.stripe_customer_id.as_deref(), Some("cus_1"));
    assert_eq!(writes[0].1.stripe_subscription_id.as_deref(), Some("sub_active"));
}

#[tokio::test]
async fn trialing_alone_grants_premium() {
    let payments = FakePayments {
        customer: Some(Customer { id: "cus_2".into() }),
        trialing: vec![sub("sub_trial", "trialing", None)],
        ..Default::default()
    };
    let r = Reconciler::new(Arc::new(payments), Arc::new(RecordingProfiles::default()));
    let status = r.reconcile(&account()).await.unwrap();
    assert!(status.premium);
    assert_eq!(status.status, SubscriptionStatus::Trialing);
    assert_eq!(status.subscription_end, None);
}

#[tokio::test]
async fn lapsed_customer_is_downgraded() {
    let profiles = Arc::new(RecordingProfiles::default());
    let payments = FakePayments { customer: Some(Customer { id: "cus_3".into() }), ..Default::default() };
    let r = Reconciler::new(Arc::new(payments), profiles.clone());
    let status = r.reconcile(&account()).await.unwrap();
    assert_eq!(status, PremiumStatus::inactive());
    let writes = profiles.writes.lock();
    assert!(!writes[0].1.is_premium);
    assert_eq!(writes[0].1.stripe_customer_id.as_deref(), Some("cus_3"));
    assert_eq!(writes[0].1.stripe_subscription_id, None);
}

#[tokio::test]
async fn provider_error_propagates_and_profile_failure_does_not() {
    let failing = FakePayments { fail: true, ..Default::default() };
    let profiles = Arc::new(RecordingProfiles::default());
    let r = Reconciler::new(Arc::new(failing), profiles.clone());
    assert!(r.reconcile(&account()).await.is_err());
    assert!(profiles.writes.lock().is_empty());

    let payments = FakePayments {
        customer: Some(Customer { id: "cus_4".into() }),
        active: vec![sub("sub_a", "active", None)],
        ..Default::default()
    };
    let broken_profiles = Arc::new(RecordingProfiles { fail: true, ..Default::default() });
    let r = Reconciler::new(Arc::new(payments), broken_profiles);
    assert!(r.reconcile(&account()).await.unwrap().premium);
}

fn service(payments: FakePayments) -> Router {
    router(SubscriptionState {
        reconciler: Arc::new(Reconciler::new(Arc::new(payments), Arc::new(RecordingProfiles::default()))),
        accounts: Arc::new(FixedAccounts),
    })
}

async fn json_of(resp: axum::response::Response) -> serde_json::Value {
    let bytes = resp.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

fn check_request(body: &str, bearer: Option<&str>) -> Request<Body> {
    let mut b = Request::post("/check-subscription")
        .header(ORIGIN, "https://premium.example.org")
        .header(CONTENT_TYPE, "application/json");
    if let Some(t) = bearer {
        b = b.header(AUTHORIZATION, format!("Bearer {}", t));
    }
    b.body(Body::from(body.to_string())).unwrap()
}

#[tokio::test]
async fn endpoint_resolves_by_email_and_by_token() {
    let payments = || FakePayments {
        customer: Some(Customer { id: "cus_5".into() }),
        active: vec![sub("sub_5", "active", None)],
        ..Default::default()
    };

    let resp = service(payments()).oneshot(check_request(r#"{"email":"member@example.org"}"#, None)).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.headers().get("access-control-allow-origin").unwrap(), "*");
    let json = json_of(resp).await;
    assert_eq!(json["premium"], true);
    assert_eq!(json["status"], "active");
    assert_eq!(json["subscriptionId"], "sub_5");

    let resp = service(payments()).oneshot(check_request("{}", Some("good-token"))).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
async fn endpoint_errors_fail_closed() {
    for (body, bearer) in [("{}", None), ("not json", None), ("{}", Some("bad-token")), (r#"{"email":"stranger@example.org"}"#, None)] {
        let resp = service(FakePayments::default()).oneshot(check_request(body, bearer)).await.unwrap();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR, "{}", body);
        assert_eq!(resp.headers().get("access-control-allow-origin").unwrap(), "*");
        let json = json_of(resp).await;
        assert_eq!(json["premium"], false);
        assert_eq!(json["status"], "unknown");
        assert!(json["error"].as_str().is_some_and(|e| !e.is_empty()));
    }

    let failing = FakePayments { fail: true, ..Default::default() };
    let resp = service(failing).oneshot(check_request(r#"{"email":"member@example.org"}"#, None)).await.unwrap();
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn preflight_answers_with_cors_headers() {
    let req = Request::options("/check-subscription")
        .header(ORIGIN, "https://premium.example.org")
        .header("access-control-request-method", "POST")
        .header("access-control-request-headers", "authorization, x-client-info, apikey, content-type")
        .body(Body::empty())
        .unwrap();
    let resp = service(FakePayments::default()).oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.headers().get("access-control-allow-origin").unwrap(), "*");
    let allowed = resp.headers().get("access-control-allow-headers").unwrap().to_str().unwrap().to_lowercase();
    for name in ["authorization", "x-client-info", "apikey", "content-type"] {
        assert!(allowed.contains(name), "{} missing from {}", name, allowed);
    }
    let methods = resp.headers().get("access-control-allow-methods").unwrap().to_str().unwrap();
    assert!(methods.contains("POST"));
}

async fn spawn(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    format!("http://{}", addr)
}

#[tokio::test]
async fn premium_client_resolves_and_falls_back() {
    let ok = Router::new().route(
        "/check",
        post(|| async { Json(serde_json::json!({"premium": true, "status": "trialing", "subscriptionId": "sub_9"})) }),
    );
    let base = spawn(ok).await;
    let client = PremiumClient::new(&format!("{}/check", base), "https://pay.example.org/link").unwrap();
    match client.check("member@example.org", None).await {
        CheckOutcome::Resolved(s) => {
            assert!(s.premium);
            assert_eq!(s.status, SubscriptionStatus::Trialing);
        }
        other => panic!("expected resolved, got {:?}", other),
    }

    let failing = Router::new().route("/check", post(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "boom") }));
    let base = spawn(failing).await;
    let client = PremiumClient::new(&format!("{}/check", base), "https://pay.example.org/link").unwrap();
    assert_eq!(
        client.check("member@example.org", None).await,
        CheckOutcome::Fallback { payment_link: "https://pay.example.org/link".into() }
    );
}

#[tokio::test]
async fn premium_client_times_out_to_fallback() {
    let slow = Router::new().route(
        "/check",
        post(|| async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Json(serde_json::json!({"premium": true, "status": "active"}))
        }),
    );
    let base = spawn(slow).await;
    let client =
        PremiumClient::with_timeout(&format!("{}/check", base), "https://pay.example.org/link", Duration::from_millis(200)).unwrap();
    assert!(matches!(client.check("member@example.org", None).await, CheckOutcome::Fallback { .. }));
}

#[tokio::test]
async fn stripe_client_reads_list_endpoints() {
    let mock = Router::new()
        .route(
            "/v1/customers",
            get(|headers: HeaderMap, Query(q): Query<Vec<(String, String)>>| async move {
                assert_eq!(headers.get(AUTHORIZATION).unwrap(), "Bearer sk_test_1");
                let email = q.iter().find(|(k, _)| k == "email").map(|(_, v)| v.clone()).unwrap_or_default();
                if email == "member@example.org" {
                    Json(serde_json::json!({"data": [{"id": "cus_mock", "email": email}]}))
                } else {
                    Json(serde_json::json!({"data": []}))
                }
            }),
        )
        .route(
            "/v1/subscriptions",
            get(|Query(q): Query<Vec<(String, String)>>| async move {
                let status = q.iter().find(|(k, _)| k == "status").map(|(_, v)| v.clone()).unwrap_or_default();
                if status == "active" {
                    Json(serde_json::json!({"data": [{"id": "sub_mock", "status": "active", "current_period_end": 1_800_000_000}]}))
                } else {
                    Json(serde_json::json!({"data": []}))
                }
            }),
        );
    let base = spawn(mock).await;
    let stripe = StripeClient::new("sk_test_1".into(), &base).unwrap();

    let customer = stripe.find_customer_by_email("member@example.org").await.unwrap();
    assert_eq!(customer, Some(Customer { id: "cus_mock".into() }));
    assert_eq!(stripe.find_customer_by_email("nobody@example.org").await.unwrap(), None);

    let subs = stripe.list_subscriptions("cus_mock", "active").await.unwrap();
    assert_eq!(subs, vec![sub("sub_mock", "active", Some(1_800_000_000))]);
    assert!(stripe.list_subscriptions("cus_mock", "trialing").await.unwrap().is_empty());
}
