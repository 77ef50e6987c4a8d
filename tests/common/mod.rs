//! In-memory stand-in for the identity/data backend, shared by the integration tests.
#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, Response};
use chrono::{Duration, Utc};
use tower::ServiceExt;

use inventory_gate::catalog::{Role, RoleCatalog};
use inventory_gate::checkin::RecordStore;
use inventory_gate::config::Config;
use inventory_gate::error::BackendError;
use inventory_gate::identity::{IdentityProvider, Principal, SessionTokens};
use inventory_gate::server::{router, AppState};

#[derive(Default)]
pub struct FakeBackend {
    /// access token -> principal
    pub users: HashMap<String, Principal>,
    /// refresh token -> new token pair
    pub refreshes: HashMap<String, SessionTokens>,
    pub identity_down: bool,
    pub roles: Vec<Role>,
    /// message returned as a rejected catalog query
    pub roles_error: Option<String>,
    /// return every row, ignoring the name filter
    pub ignore_filter: bool,
    pub inserted: Mutex<Vec<(String, serde_json::Value)>>,
    pub catalog_calls: Mutex<usize>,
    pub identity_calls: Mutex<usize>,
}

impl FakeBackend {
    pub fn with_user(mut self, token: &str, user_id: &str) -> Self {
        let p = Principal::new(user_id).with_expiry(Utc::now() + Duration::hours(1));
        self.users.insert(token.to_string(), p);
        self
    }

    pub fn with_expired_user(mut self, token: &str, user_id: &str) -> Self {
        let p = Principal::new(user_id).with_expiry(Utc::now() - Duration::minutes(1));
        self.users.insert(token.to_string(), p);
        self
    }

    pub fn with_refresh(mut self, refresh: &str, new_access: &str, new_refresh: &str) -> Self {
        self.refreshes.insert(
            refresh.to_string(),
            SessionTokens {
                access_token: new_access.to_string(),
                refresh_token: Some(new_refresh.to_string()),
                expires_at: Some(Utc::now() + Duration::hours(1)),
            },
        );
        self
    }

    pub fn with_roles(mut self, roles: &[(&str, &str)]) -> Self {
        self.roles = roles.iter().map(|(id, name)| Role::new(*id, *name)).collect();
        self
    }

    pub fn inserted(&self) -> Vec<(String, serde_json::Value)> {
        self.inserted.lock().unwrap().clone()
    }
}

#[async_trait]
impl IdentityProvider for FakeBackend {
    async fn user_for_token(&self, access_token: &str) -> Result<Option<Principal>, BackendError> {
        *self.identity_calls.lock().unwrap() += 1;
        if self.identity_down {
            return Err(BackendError::Unavailable("connection refused".into()));
        }
        Ok(self.users.get(access_token).cloned())
    }

    async fn refresh(&self, refresh_token: &str) -> Result<Option<SessionTokens>, BackendError> {
        *self.identity_calls.lock().unwrap() += 1;
        if self.identity_down {
            return Err(BackendError::Unavailable("connection refused".into()));
        }
        Ok(self.refreshes.get(refresh_token).cloned())
    }
}

#[async_trait]
impl RoleCatalog for FakeBackend {
    async fn list_roles(&self, excluded_name: &str) -> Result<Vec<Role>, BackendError> {
        *self.catalog_calls.lock().unwrap() += 1;
        if let Some(msg) = &self.roles_error {
            return Err(BackendError::Rejected { status: 400, message: msg.clone() });
        }
        Ok(self
            .roles
            .iter()
            .filter(|r| self.ignore_filter || r.name != excluded_name)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl RecordStore for FakeBackend {
    async fn insert(&self, table: &str, row: serde_json::Value) -> Result<serde_json::Value, BackendError> {
        self.inserted.lock().unwrap().push((table.to_string(), row.clone()));
        let mut stored = row;
        stored["id"] = serde_json::json!(self.inserted.lock().unwrap().len());
        Ok(stored)
    }
}

pub fn test_config() -> Config {
    let mut cfg = Config::new("http://backend.invalid", "anon-key");
    cfg.cookies.secure = false;
    cfg
}

pub fn app_with(fake: Arc<FakeBackend>, config: Config) -> axum::Router {
    router(AppState::new(config, fake.clone(), fake.clone(), fake))
}

pub async fn send(app: axum::Router, req: Request<Body>) -> Response<Body> {
    app.oneshot(req).await.unwrap()
}

pub fn get(uri: &str, cookie: Option<&str>) -> Request<Body> {
    let mut b = Request::builder().method("GET").uri(uri);
    if let Some(c) = cookie {
        b = b.header("cookie", c);
    }
    b.body(Body::empty()).unwrap()
}

pub fn post_json(uri: &str, cookie: Option<&str>, body: serde_json::Value) -> Request<Body> {
    let mut b = Request::builder().method("POST").uri(uri).header("content-type", "application/json");
    if let Some(c) = cookie {
        b = b.header("cookie", c);
    }
    b.body(Body::from(body.to_string())).unwrap()
}

pub fn post_raw(uri: &str, cookie: Option<&str>, content_type: Option<&str>, body: &str) -> Request<Body> {
    let mut b = Request::builder().method("POST").uri(uri);
    if let Some(ct) = content_type {
        b = b.header("content-type", ct);
    }
    if let Some(c) = cookie {
        b = b.header("cookie", c);
    }
    b.body(Body::from(body.to_string())).unwrap()
}

pub async fn body_string(resp: Response<Body>) -> String {
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

pub async fn body_json(resp: Response<Body>) -> serde_json::Value {
    let s = body_string(resp).await;
    serde_json::from_str(&s).unwrap_or_else(|e| panic!("not json ({}): {}", e, s))
}
