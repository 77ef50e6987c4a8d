//! HTTP client for the managed identity/data backend (Supabase-shaped REST API).
//!
//! One `BackendClient` is built at startup and shared behind `Arc`s; it implements
//! every backend-facing trait the gate and handlers depend on.

use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;
use chrono::{DateTime, TimeZone, Utc};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Client, Response, StatusCode};
use serde::Deserialize;
use tracing::debug;

use crate::catalog::{Role, RoleCatalog};
use crate::checkin::RecordStore;
use crate::error::BackendError;
use crate::identity::{IdentityProvider, Principal, SessionTokens};

pub struct BackendClient {
    /// Base URL without a trailing slash.
    base_url: String,
    anon_key: String,
    /// Key used as bearer for table access; falls back to the anon key.
    data_key: String,
    client: Client,
}

#[derive(Debug, Deserialize)]
struct UserBody {
    id: String,
    #[serde(default)]
    email: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TokenBody {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    expires_at: Option<i64>,
    #[serde(default)]
    expires_in: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    message: Option<String>,
    msg: Option<String>,
    error_description: Option<String>,
    error: Option<String>,
}

impl BackendClient {
    pub fn new(
        base_url: &str,
        anon_key: &str,
        service_key: Option<&str>,
        timeout: Duration,
    ) -> Result<Self, BackendError> {
        let client = Client::builder()
            .connect_timeout(timeout)
            .timeout(timeout)
            .build()
            .map_err(|e| BackendError::Unavailable(e.to_string()))?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            anon_key: anon_key.to_string(),
            data_key: service_key.unwrap_or(anon_key).to_string(),
            client,
        })
    }

    fn headers(&self, bearer: &str) -> Result<HeaderMap, BackendError> {
        let mut h = HeaderMap::new();
        let apikey = HeaderValue::from_str(&self.anon_key)
            .map_err(|_| BackendError::Unavailable("backend key is not a valid header value".into()))?;
        // a token that cannot be a header value cannot be a valid session either
        let auth = HeaderValue::from_str(&format!("Bearer {}", bearer))
            .map_err(|_| BackendError::Rejected { status: 401, message: "malformed bearer token".into() })?;
        h.insert("apikey", apikey);
        h.insert(AUTHORIZATION, auth);
        Ok(h)
    }

    async fn send(&self, req: reqwest::RequestBuilder) -> Result<Response, BackendError> {
        req.send().await.map_err(|e| BackendError::Unavailable(e.to_string()))
    }
}

async fn error_from(resp: Response) -> BackendError {
    let status = resp.status();
    let text = resp.text().await.unwrap_or_default();
    let body: ErrorBody = serde_json::from_str(&text).unwrap_or_default();
    let message = body
        .message
        .or(body.msg)
        .or(body.error_description)
        .or(body.error)
        .filter(|m| !m.trim().is_empty())
        .unwrap_or_else(|| if text.trim().is_empty() { format!("backend returned {}", status) } else { text });
    if status.is_server_error() {
        BackendError::Unavailable(message)
    } else {
        BackendError::Rejected { status: status.as_u16(), message }
    }
}

async fn decode<T: for<'de> Deserialize<'de>>(resp: Response) -> Result<T, BackendError> {
    let bytes = resp.bytes().await.map_err(|e| BackendError::Unavailable(e.to_string()))?;
    serde_json::from_slice(&bytes).map_err(|e| BackendError::Decode(e.to_string()))
}

/// Read the `exp` claim of a JWT access token without verifying it.
/// The identity provider has already vouched for the token; this only bounds its validity window.
pub fn token_expiry(access_token: &str) -> Option<DateTime<Utc>> {
    let payload = access_token.split('.').nth(1)?;
    let bytes = base64::engine::general_purpose::URL_SAFE_NO_PAD
        .decode(payload.trim_end_matches('='))
        .ok()?;
    let claims: serde_json::Value = serde_json::from_slice(&bytes).ok()?;
    let exp = claims.get("exp")?.as_i64()?;
    Utc.timestamp_opt(exp, 0).single()
}

fn is_rejection(status: StatusCode) -> bool {
    matches!(status, StatusCode::BAD_REQUEST | StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN)
}

#[async_trait]
impl IdentityProvider for BackendClient {
    async fn user_for_token(&self, access_token: &str) -> Result<Option<Principal>, BackendError> {
        let headers = match self.headers(access_token) {
            Ok(h) => h,
            Err(BackendError::Rejected { .. }) => return Ok(None),
            Err(e) => return Err(e),
        };
        let url = format!("{}/auth/v1/user", self.base_url);
        let resp = self.send(self.client.get(url).headers(headers)).await?;
        if is_rejection(resp.status()) {
            debug!(target: "backend", status = resp.status().as_u16(), "access token rejected");
            return Ok(None);
        }
        if !resp.status().is_success() {
            return Err(error_from(resp).await);
        }
        let user: UserBody = decode(resp).await?;
        Ok(Some(Principal { user_id: user.id, email: user.email, expires_at: token_expiry(access_token) }))
    }

    async fn refresh(&self, refresh_token: &str) -> Result<Option<SessionTokens>, BackendError> {
        let url = format!("{}/auth/v1/token?grant_type=refresh_token", self.base_url);
        let req = self
            .client
            .post(url)
            .header("apikey", &self.anon_key)
            .json(&serde_json::json!({ "refresh_token": refresh_token }));
        let resp = self.send(req).await?;
        if is_rejection(resp.status()) {
            debug!(target: "backend", status = resp.status().as_u16(), "refresh token rejected");
            return Ok(None);
        }
        if !resp.status().is_success() {
            return Err(error_from(resp).await);
        }
        let body: TokenBody = decode(resp).await?;
        let expires_at = body
            .expires_at
            .and_then(|s| Utc.timestamp_opt(s, 0).single())
            .or_else(|| body.expires_in.map(|secs| Utc::now() + chrono::Duration::seconds(secs)))
            .or_else(|| token_expiry(&body.access_token));
        Ok(Some(SessionTokens { access_token: body.access_token, refresh_token: body.refresh_token, expires_at }))
    }
}

#[async_trait]
impl RoleCatalog for BackendClient {
    async fn list_roles(&self, excluded_name: &str) -> Result<Vec<Role>, BackendError> {
        let url = format!(
            "{}/rest/v1/roles?select=id,name&name=neq.{}",
            self.base_url,
            urlencoding::encode(excluded_name)
        );
        let resp = self.send(self.client.get(url).headers(self.headers(&self.data_key)?)).await?;
        if !resp.status().is_success() {
            return Err(error_from(resp).await);
        }
        decode(resp).await
    }
}

#[async_trait]
impl RecordStore for BackendClient {
    async fn insert(&self, table: &str, row: serde_json::Value) -> Result<serde_json::Value, BackendError> {
        let url = format!("{}/rest/v1/{}", self.base_url, urlencoding::encode(table));
        let mut headers = self.headers(&self.data_key)?;
        headers.insert("Prefer", HeaderValue::from_static("return=representation"));
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        let resp = self.send(self.client.post(url).headers(headers).json(&row)).await?;
        if !resp.status().is_success() {
            return Err(error_from(resp).await);
        }
        // PostgREST answers with an array of the inserted rows
        let stored: serde_json::Value = decode(resp).await?;
        Ok(match stored {
            serde_json::Value::Array(mut rows) if !rows.is_empty() => rows.swap_remove(0),
            other => other,
        })
    }
}
