//! Inventory check-in: validate a scanned code and forward it to the backend.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use tracing::info;

use crate::error::{AppError, AppResult, BackendError};
use crate::identity::Principal;

pub const CHECK_INS_TABLE: &str = "check_ins";
pub const MAX_CODE_LEN: usize = 128;

/// Row inserts against the data backend.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Insert one row and return it as stored.
    async fn insert(&self, table: &str, row: serde_json::Value) -> Result<serde_json::Value, BackendError>;
}

#[derive(Debug, Clone, Deserialize)]
pub struct CheckInPayload {
    pub code: String,
}

/// Trimmed scan code, or a user-facing reason it was refused.
pub fn validate_code(raw: &str) -> AppResult<&str> {
    let code = raw.trim();
    if code.is_empty() {
        return Err(AppError::user("invalid_code", "code is required"));
    }
    if code.len() > MAX_CODE_LEN {
        return Err(AppError::user("invalid_code".to_string(), format!("code longer than {} characters", MAX_CODE_LEN)));
    }
    if let Some(bad) = code.chars().find(|&c| !(c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | ':' | '/'))) {
        return Err(AppError::user("invalid_code".to_string(), format!("code contains invalid character {:?}", bad)));
    }
    Ok(code)
}

pub async fn record_check_in(store: &dyn RecordStore, principal: &Principal, raw_code: &str) -> AppResult<serde_json::Value> {
    let code = validate_code(raw_code)?;
    let row = json!({ "code": code, "user_id": principal.user_id });
    let stored = store.insert(CHECK_INS_TABLE, row).await?;
    info!(target: "checkin", user_id = %principal.user_id, code, "item checked in");
    Ok(stored)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_typical_barcodes() {
        assert_eq!(validate_code("  SKU-0042 ").unwrap(), "SKU-0042");
        assert_eq!(validate_code("urn:item/7.b_c").unwrap(), "urn:item/7.b_c");
        assert!(validate_code(&"9".repeat(MAX_CODE_LEN)).is_ok());
    }

    #[test]
    fn rejects_bad_codes() {
        assert!(validate_code("").is_err());
        assert!(validate_code("   ").is_err());
        assert!(validate_code(&"9".repeat(MAX_CODE_LEN + 1)).is_err());
        let err = validate_code("abc<script>").unwrap_err();
        assert_eq!(err.http_status(), 400);
        assert!(err.message().contains("'<'"));
        assert!(validate_code("käse").is_err());
    }
}
