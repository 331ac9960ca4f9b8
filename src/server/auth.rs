use axum::extract::rejection::FormRejection;
use axum::extract::{Query, State};
use axum::http::HeaderMap;
use axum::response::{Html, IntoResponse, Redirect, Response};
use axum::Form;
use serde::Deserialize;
use tracing::{info, warn};

use super::AppState;
use crate::identity::{LoginRequest, ADMIN_HOME, LOGIN_PATH, SESSION_MAX_AGE};

const LOGIN_FAILED: &str = "/admin/login?error=1";

#[derive(Debug, Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    email: String,
    #[serde(default)]
    password: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginPageQuery {
    error: Option<String>,
}

/// `POST /api/auth/login`: every failure lands on the login page with `?error=1`.
pub async fn login(State(state): State<AppState>, form: Result<Form<LoginForm>, FormRejection>) -> Response {
    let Ok(Form(form)) = form else {
        return Redirect::to(LOGIN_FAILED).into_response();
    };
    let req = LoginRequest { email: form.email, password: form.password };
    let resp = match state.auth.login(&req).await {
        Ok(r) => r,
        Err(e) => {
            warn!(target: "auth", "login rejected for {:?}: {}", req.email.trim(), e);
            return Redirect::to(LOGIN_FAILED).into_response();
        }
    };
    let mut headers = HeaderMap::new();
    if let Err(e) = state.cookies.write_token(&mut headers, &resp.token, SESSION_MAX_AGE) {
        warn!(target: "auth", "session cookie not written: {}", e);
        return Redirect::to(LOGIN_FAILED).into_response();
    }
    info!(target: "auth", "login user={}", resp.user_id);
    (headers, Redirect::to(ADMIN_HOME)).into_response()
}

/// `POST /api/auth/logout`: overwrite the cookie with an empty, already expired value.
pub async fn logout(State(state): State<AppState>) -> Response {
    let mut headers = HeaderMap::new();
    if let Err(e) = state.cookies.clear(&mut headers) {
        warn!(target: "auth", "session cookie not cleared: {}", e);
    }
    (headers, Redirect::to(LOGIN_PATH)).into_response()
}

pub async fn login_page(Query(q): Query<LoginPageQuery>) -> Html<String> {
    let notice = if q.error.as_deref() == Some("1") {
        r#"<p class="error">Login failed. Please check e-mail and password.</p>"#
    } else {
        ""
    };
    Html(format!(
        r#"<!doctype html>
<html><head><meta charset="utf-8"><title>Admin login</title></head>
<body><main><h1>Admin login</h1>{notice}
<form method="post" action="/api/auth/login">
<label>E-mail <input type="email" name="email" required></label>
<label>Password <input type="password" name="password" required></label>
<button type="submit">Log in</button>
</form></main></body></html>"#
    ))
}
