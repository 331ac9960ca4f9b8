//! Access guard for the admin area.
//!
//! One authorization function (`authorize`) backs both call sites: the request
//! interception middleware, which redirects before any handler runs, and
//! `require_admin`, used by handlers that render protected content. Nothing is cached
//! between requests; every request re-verifies its cookie.

use axum::extract::{Request, State};
use axum::http::HeaderMap;
use axum::middleware::Next;
use axum::response::{IntoResponse, Redirect, Response};
use tracing::debug;

use super::claims::SessionClaim;
use super::cookie::CookieGateway;
use super::session::SessionCodec;
use crate::error::{AppError, AppResult};
use crate::server::AppState;
use crate::storage::User;

pub const ADMIN_PREFIX: &str = "/admin";
pub const LOGIN_PATH: &str = "/admin/login";
pub const ADMIN_HOME: &str = "/admin/posts";

/// What the incoming cookie amounts to. Expired and tampered tokens are both `InvalidToken`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenState {
    NoToken,
    InvalidToken,
    ValidToken(SessionClaim),
}

impl TokenState {
    pub fn claim(&self) -> Option<&SessionClaim> {
        match self {
            TokenState::ValidToken(c) => Some(c),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessDecision {
    Proceed,
    Redirect(&'static str),
}

pub fn inspect(codec: &SessionCodec, cookies: &CookieGateway, headers: &HeaderMap) -> TokenState {
    match cookies.read_token(headers) {
        None => TokenState::NoToken,
        Some(token) => match codec.verify(&token) {
            Some(claim) => TokenState::ValidToken(claim),
            None => TokenState::InvalidToken,
        },
    }
}

/// The admin claim carried by a request, if any.
pub fn authorize(state: &TokenState) -> Option<&SessionClaim> {
    state.claim().filter(|c| c.is_admin())
}

pub fn is_protected_area(path: &str) -> bool {
    path == ADMIN_PREFIX || path.starts_with("/admin/")
}

fn is_login_page(path: &str) -> bool {
    path.trim_end_matches('/') == LOGIN_PATH
}

pub fn decide(path: &str, state: &TokenState) -> AccessDecision {
    if !is_protected_area(path) {
        return AccessDecision::Proceed;
    }
    match (authorize(state).is_some(), is_login_page(path)) {
        (true, true) => AccessDecision::Redirect(ADMIN_HOME),
        (true, false) => AccessDecision::Proceed,
        (false, true) => AccessDecision::Proceed,
        (false, false) => AccessDecision::Redirect(LOGIN_PATH),
    }
}

/// Request interception layer: gates `/admin/*` before routing reaches a handler.
pub async fn intercept(State(state): State<AppState>, req: Request, next: Next) -> Response {
    let path = req.uri().path().to_string();
    if !is_protected_area(&path) {
        return next.run(req).await;
    }
    let token = inspect(&state.codec, &state.cookies, req.headers());
    match decide(&path, &token) {
        AccessDecision::Proceed => next.run(req).await,
        AccessDecision::Redirect(to) => {
            debug!(target: "auth", path = %path, to = to, "guard redirect");
            Redirect::to(to).into_response()
        }
    }
}

/// Page-render check: a valid admin claim whose user still exists with the admin role.
pub async fn require_admin(state: &AppState, headers: &HeaderMap) -> AppResult<User> {
    let token = inspect(&state.codec, &state.cookies, headers);
    let Some(claim) = authorize(&token) else {
        return Err(AppError::auth("no_session", "login required"));
    };
    match state.users.find_by_id(&claim.user_id).await? {
        Some(user) if user.role == claim.role => Ok(user),
        _ => Err(AppError::auth("unknown_user", "login required")),
    }
}
