use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::principal::Principal;
use crate::error::BackendError;

/// Tokens proving an established login. Stored client-side as cookies.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct SessionTokens {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
}

/// Identity side of the backend contract.
///
/// A token the provider does not recognise (or no longer honours) is `Ok(None)`;
/// `Err` is reserved for the provider being unreachable or answering garbage.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Resolve an access token to the principal it belongs to.
    async fn user_for_token(&self, access_token: &str) -> Result<Option<Principal>, BackendError>;

    /// Exchange a refresh token for a fresh token pair.
    async fn refresh(&self, refresh_token: &str) -> Result<Option<SessionTokens>, BackendError>;
}
