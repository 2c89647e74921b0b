//! services/api/src/web/cookie.rs
//!
//! Reading credentials off a request and writing the session cookie.

use crate::auth::PresentedCredentials;
use axum::http::{header, HeaderMap};
use chrono::{DateTime, Duration, Utc};

pub const SESSION_COOKIE: &str = "auth";

/// Pulls the session cookie and bearer token, if any, out of the headers.
pub fn presented_credentials(headers: &HeaderMap) -> PresentedCredentials {
    PresentedCredentials {
        session_secret: session_secret(headers),
        bearer_token: bearer_token(headers),
    }
}

fn session_secret(headers: &HeaderMap) -> Option<String> {
    let prefix = format!("{}=", SESSION_COOKIE);
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .find_map(|c| c.trim().strip_prefix(prefix.as_str()))
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

fn bearer_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
}

fn http_date(at: DateTime<Utc>) -> String {
    at.format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}

/// `Set-Cookie` value carrying a freshly issued session secret.
pub fn session_cookie(secret: &str, expires_at: DateTime<Utc>, max_age: Duration, secure: bool) -> String {
    format!(
        "{}={}; HttpOnly;{} SameSite=Lax; Path=/; Max-Age={}; Expires={}",
        SESSION_COOKIE,
        secret,
        if secure { " Secure;" } else { "" },
        max_age.num_seconds(),
        http_date(expires_at)
    )
}

/// `Set-Cookie` value that makes the browser drop the session cookie.
pub fn cleared_session_cookie(secure: bool) -> String {
    format!(
        "{}=; HttpOnly;{} SameSite=Lax; Path=/; Max-Age=0; Expires=Thu, 01 Jan 1970 00:00:00 GMT",
        SESSION_COOKIE,
        if secure { " Secure;" } else { "" },
    )
}
