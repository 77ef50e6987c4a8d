use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The authenticated caller, as reported by the identity provider.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Principal {
    pub user_id: String,
    #[serde(default)]
    pub email: Option<String>,
    /// End of the session validity window; `None` when the provider did not say.
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
}

impl Principal {
    pub fn new(user_id: impl Into<String>) -> Self {
        Self { user_id: user_id.into(), ..Default::default() }
    }

    pub fn with_expiry(mut self, expires_at: DateTime<Utc>) -> Self {
        self.expires_at = Some(expires_at);
        self
    }

    /// A principal with no known expiry is valid until the provider says otherwise.
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        match self.expires_at {
            Some(exp) => exp > now,
            None => true,
        }
    }
}
