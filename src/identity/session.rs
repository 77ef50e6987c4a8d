use std::sync::Arc;

use axum::http::{header, HeaderMap, HeaderValue};
use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::{debug, warn};

use super::principal::Principal;
use super::provider::{IdentityProvider, SessionTokens};
use crate::error::{AppError, BackendError};

/// Cookie names and attributes used to carry the session.
#[derive(Debug, Clone)]
pub struct CookieSettings {
    pub access_cookie: String,
    pub refresh_cookie: String,
    pub secure: bool,
}

impl Default for CookieSettings {
    fn default() -> Self {
        Self {
            access_cookie: "sb-access-token".to_string(),
            refresh_cookie: "sb-refresh-token".to_string(),
            secure: true,
        }
    }
}

impl CookieSettings {
    fn attrs(&self) -> &'static str {
        if self.secure { "HttpOnly; Secure; SameSite=Lax; Path=/" } else { "HttpOnly; SameSite=Lax; Path=/" }
    }

    /// `Set-Cookie` values writing a rotated token pair back to the client.
    pub fn set_cookies(&self, tokens: &SessionTokens) -> Vec<HeaderValue> {
        self.set_cookies_at(tokens, Utc::now())
    }

    /// The access cookie lives as long as the token; a refresh cookie the provider
    /// did not rotate is expired rather than left behind.
    pub fn set_cookies_at(&self, tokens: &SessionTokens, now: DateTime<Utc>) -> Vec<HeaderValue> {
        let mut out = Vec::with_capacity(2);
        let max_age = tokens
            .expires_at
            .map(|exp| format!("; Max-Age={}", (exp - now).num_seconds().max(0)))
            .unwrap_or_default();
        match HeaderValue::from_str(&format!("{}={}; {}{}", self.access_cookie, tokens.access_token, self.attrs(), max_age)) {
            Ok(v) => out.push(v),
            Err(e) => warn!(target: "session", "dropping unencodable cookie {}: {}", self.access_cookie, e),
        }
        let refresh = match tokens.refresh_token.as_deref() {
            Some(rt) => HeaderValue::from_str(&format!("{}={}; {}", self.refresh_cookie, rt, self.attrs())),
            None => HeaderValue::from_str(&self.expired(&self.refresh_cookie)),
        };
        match refresh {
            Ok(v) => out.push(v),
            Err(e) => warn!(target: "session", "dropping unencodable cookie {}: {}", self.refresh_cookie, e),
        }
        out
    }

    fn expired(&self, name: &str) -> String {
        format!("{}=deleted; Expires=Thu, 01 Jan 1970 00:00:00 GMT; Max-Age=0; {}", name, self.attrs())
    }

    /// `Set-Cookie` values expiring both session cookies.
    pub fn clear_cookies(&self) -> Vec<HeaderValue> {
        [&self.access_cookie, &self.refresh_cookie]
            .iter()
            .filter_map(|name| HeaderValue::from_str(&self.expired(name)).ok())
            .collect()
    }
}

fn parse_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    for cookie in headers.get_all(header::COOKIE).iter() {
        let Ok(s) = cookie.to_str() else { continue };
        for part in s.split(';') {
            let p = part.trim();
            if let Some(eq) = p.find('=') {
                let (k, v) = p.split_at(eq);
                let v = &v[1..];
                if k == name && !v.is_empty() { return Some(v.to_string()); }
            }
        }
    }
    None
}

fn bearer_token(headers: &HeaderMap) -> Option<String> {
    let raw = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = raw.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") { return None; }
    let token = token.trim();
    if token.is_empty() { None } else { Some(token.to_string()) }
}

/// Raw session credentials found on an inbound request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionCredentials {
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
}

impl SessionCredentials {
    /// Cookies first; an `Authorization: Bearer` header is accepted for API clients.
    pub fn from_headers(headers: &HeaderMap, cookies: &CookieSettings) -> Self {
        let access_token = parse_cookie(headers, &cookies.access_cookie).or_else(|| bearer_token(headers));
        let refresh_token = parse_cookie(headers, &cookies.refresh_cookie);
        Self { access_token, refresh_token }
    }

    pub fn is_empty(&self) -> bool {
        self.access_token.is_none() && self.refresh_token.is_none()
    }
}

/// The identity provider could not give a trustworthy answer.
#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("identity provider unavailable: {0}")]
    Unavailable(String),
}

impl From<BackendError> for IdentityError {
    fn from(err: BackendError) -> Self {
        IdentityError::Unavailable(err.to_string())
    }
}

impl From<IdentityError> for AppError {
    fn from(err: IdentityError) -> Self {
        match err {
            IdentityError::Unavailable(m) => AppError::Unavailable { code: "identity_unavailable".into(), message: m },
        }
    }
}

/// Outcome of resolving a request's session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Resolution {
    pub principal: Option<Principal>,
    /// New tokens obtained by refreshing; the caller writes them back as cookies.
    pub rotated: Option<SessionTokens>,
    /// Credentials were presented but are dead; the caller should expire them.
    pub clear_cookies: bool,
}

impl Resolution {
    fn anonymous(clear_cookies: bool) -> Self {
        Self { principal: None, rotated: None, clear_cookies }
    }
}

/// Turns request credentials into a principal, or an explicit "no principal".
#[derive(Clone)]
pub struct SessionResolver {
    provider: Arc<dyn IdentityProvider>,
}

impl SessionResolver {
    pub fn new(provider: Arc<dyn IdentityProvider>) -> Self { Self { provider } }

    pub async fn resolve(&self, creds: &SessionCredentials) -> Result<Resolution, IdentityError> {
        self.resolve_at(creds, Utc::now()).await
    }

    pub async fn resolve_at(&self, creds: &SessionCredentials, now: DateTime<Utc>) -> Result<Resolution, IdentityError> {
        if creds.is_empty() {
            return Ok(Resolution::anonymous(false));
        }

        if let Some(access) = creds.access_token.as_deref() {
            match self.provider.user_for_token(access).await? {
                Some(p) if p.is_valid_at(now) => {
                    return Ok(Resolution { principal: Some(p), rotated: None, clear_cookies: false });
                }
                Some(p) => debug!(target: "session", user_id = %p.user_id, "access token past its validity window"),
                None => debug!(target: "session", "access token rejected by provider"),
            }
        }

        let Some(refresh) = creds.refresh_token.as_deref() else {
            return Ok(Resolution::anonymous(true));
        };
        let Some(tokens) = self.provider.refresh(refresh).await? else {
            debug!(target: "session", "refresh token rejected by provider");
            return Ok(Resolution::anonymous(true));
        };
        match self.provider.user_for_token(&tokens.access_token).await? {
            Some(mut p) => {
                if p.expires_at.is_none() { p.expires_at = tokens.expires_at; }
                if !p.is_valid_at(now) {
                    return Ok(Resolution::anonymous(true));
                }
                debug!(target: "session", user_id = %p.user_id, "session refreshed");
                Ok(Resolution { principal: Some(p), rotated: Some(tokens), clear_cookies: false })
            }
            None => Ok(Resolution::anonymous(true)),
        }
    }
}
