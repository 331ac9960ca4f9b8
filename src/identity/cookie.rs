use anyhow::{anyhow, Result};
use axum::http::header::{COOKIE, SET_COOKIE};
use axum::http::{HeaderMap, HeaderValue};

use super::session::SignedToken;

pub const SESSION_COOKIE: &str = "sv_session";

/// Find a cookie by name across all `Cookie` headers of a request.
pub fn parse_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    for cookie in headers.get_all(COOKIE).iter() {
        let Ok(s) = cookie.to_str() else { continue; };
        for part in s.split(';') {
            let p = part.trim();
            if let Some((k, v)) = p.split_once('=') {
                if k.trim() == name { return Some(v.trim().to_string()); }
            }
        }
    }
    None
}

/// Reads and writes the session token cookie. `secure` is on in production only.
#[derive(Debug, Clone, Copy, Default)]
pub struct CookieGateway {
    pub secure: bool,
}

impl CookieGateway {
    pub fn new(secure: bool) -> Self { Self { secure } }

    /// An empty cookie value (a cleared session) counts as no token.
    pub fn read_token(&self, headers: &HeaderMap) -> Option<SignedToken> {
        parse_cookie(headers, SESSION_COOKIE).filter(|t| !t.is_empty())
    }

    pub fn cookie_value(&self, token: &str, max_age: i64) -> String {
        let mut v = format!("{}={}; Path=/; Max-Age={}; HttpOnly; SameSite=Lax", SESSION_COOKIE, token, max_age.max(0));
        if self.secure {
            v.push_str("; Secure");
        }
        v
    }

    /// Append a `Set-Cookie` for the token; a zero max-age clears it immediately.
    pub fn write_token(&self, headers: &mut HeaderMap, token: &str, max_age: i64) -> Result<()> {
        let value = HeaderValue::from_str(&self.cookie_value(token, max_age))
            .map_err(|e| anyhow!("invalid session cookie value: {}", e))?;
        headers.append(SET_COOKIE, value);
        Ok(())
    }

    pub fn clear(&self, headers: &mut HeaderMap) -> Result<()> {
        self.write_token(headers, "", 0)
    }
}
