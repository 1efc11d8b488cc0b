use std::fmt;

use serde::{Deserialize, Serialize};

/// Seconds before `expires_at` at which a cached token is treated as expired,
/// so a token never runs out in the middle of a backend call.
pub const EXPIRY_MARGIN_SECS: u64 = 15;

/// Credential issuer family. Each variant has exactly one registered provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceType {
    /// The resource-management service itself (email/password login).
    Internal,
    /// Static API key used directly as the bearer credential.
    Airtable,
    /// Service-account JWT assertion exchanged for an OAuth bearer token.
    GoogleSheets,
}

impl ServiceType {
    pub fn as_str(self) -> &'static str {
        match self {
            ServiceType::Internal => "internal",
            ServiceType::Airtable => "airtable",
            ServiceType::GoogleSheets => "google_sheets",
        }
    }
}

impl fmt::Display for ServiceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Upstream credential held in the token cache.
#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken {
    pub service_type: ServiceType,
    /// Cache key the token was stored under.
    pub credential_key: String,
    pub token_value: String,
    pub token_type: String,
    pub expires_at: u64,
    /// Issuer email or user id reported by the provider, when known.
    pub principal: Option<String>,
}

impl AccessToken {
    pub fn is_expired_at(&self, now_epoch_secs: u64) -> bool {
        now_epoch_secs >= self.expires_at.saturating_sub(EXPIRY_MARGIN_SECS)
    }

    /// Value for the `Authorization` header.
    pub fn authorization(&self) -> String {
        format!("{} {}", self.token_type, self.token_value)
    }
}

// Keep token values out of logs.
impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessToken")
            .field("service_type", &self.service_type)
            .field("credential_key", &self.credential_key)
            .field("token_type", &self.token_type)
            .field("expires_at", &self.expires_at)
            .field("principal", &self.principal)
            .finish_non_exhaustive()
    }
}
