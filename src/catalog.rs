//! Role catalog: the roles a non-privileged user may ask for.
//!
//! The privileged sentinel (e.g. `super_admin`) is filtered by the backend query
//! *and* again here, so a misbehaving backend filter can never leak it.

use std::collections::HashSet;

use async_trait::async_trait;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::json;
use tracing::{debug, error};

use crate::checkin::RecordStore;
use crate::error::{AppError, AppResult, BackendError};
use crate::identity::Principal;

pub const DEFAULT_PRIVILEGED_ROLE: &str = "super_admin";
pub const ROLE_REQUESTS_TABLE: &str = "role_requests";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct Role {
    #[serde(deserialize_with = "id_as_string")]
    pub id: String,
    pub name: String,
}

impl Role {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self { id: id.into(), name: name.into() }
    }
}

// Row ids arrive as integers from some tables and uuids from others.
fn id_as_string<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawId {
        Int(i64),
        Text(String),
    }
    Ok(match RawId::deserialize(d)? {
        RawId::Int(n) => n.to_string(),
        RawId::Text(s) => s,
    })
}

/// Data side of the backend contract for roles.
#[async_trait]
pub trait RoleCatalog: Send + Sync {
    /// Role rows whose name is not `excluded_name`.
    async fn list_roles(&self, excluded_name: &str) -> Result<Vec<Role>, BackendError>;
}

/// Drop the sentinel and duplicate ids; first occurrence wins.
pub fn assignable(rows: Vec<Role>, privileged_role: &str) -> Vec<Role> {
    let mut seen = HashSet::new();
    rows.into_iter()
        .filter(|r| r.name != privileged_role)
        .filter(|r| seen.insert(r.id.clone()))
        .collect()
}

pub async fn fetch_assignable_roles(catalog: &dyn RoleCatalog, privileged_role: &str) -> AppResult<Vec<Role>> {
    let rows = catalog.list_roles(privileged_role).await.map_err(|e| {
        error!(target: "catalog", "role catalog query failed: {}", e);
        AppError::from(e)
    })?;
    let fetched = rows.len();
    let roles = assignable(rows, privileged_role);
    debug!(target: "catalog", fetched, returned = roles.len(), "role catalog fetched");
    Ok(roles)
}

#[derive(Debug, Clone, Deserialize)]
pub struct RoleRequestPayload {
    #[serde(deserialize_with = "id_as_string")]
    pub role_id: String,
}

/// Record that `principal` asks to be granted `role_id`. Only assignable roles qualify.
pub async fn request_role(
    catalog: &dyn RoleCatalog,
    store: &dyn RecordStore,
    principal: &Principal,
    privileged_role: &str,
    role_id: &str,
) -> AppResult<serde_json::Value> {
    let role_id = role_id.trim();
    if role_id.is_empty() {
        return Err(AppError::user("invalid_role", "role_id is required"));
    }
    let roles = fetch_assignable_roles(catalog, privileged_role).await?;
    let Some(role) = roles.iter().find(|r| r.id == role_id) else {
        return Err(AppError::user("invalid_role".to_string(), format!("role {} cannot be requested", role_id)));
    };
    let row = json!({ "user_id": principal.user_id, "role_id": role.id });
    let stored = store.insert(ROLE_REQUESTS_TABLE, row).await?;
    tracing::info!(target: "catalog", user_id = %principal.user_id, role = %role.name, "role requested");
    Ok(stored)
}
