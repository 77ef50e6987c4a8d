use super::Principal;
use crate::error::{AppError, AppResult};

/// Per-request view of who is calling, stored in request extensions by the gate.
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub request_id: String,
    pub principal: Option<Principal>,
}

impl RequestContext {
    pub fn new(principal: Option<Principal>) -> Self {
        Self { request_id: uuid::Uuid::new_v4().to_string(), principal }
    }

    pub fn anonymous() -> Self { Self::new(None) }

    pub fn require_principal(&self) -> AppResult<&Principal> {
        self.principal
            .as_ref()
            .ok_or_else(|| AppError::auth("unauthenticated", "sign in required"))
    }
}

impl Default for RequestContext {
    fn default() -> Self { Self::anonymous() }
}
