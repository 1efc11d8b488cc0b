//! Conduit snapshot as served by the resource-management service.
//!
//! The gateway never mutates these values; the routing cache swaps whole
//! `Arc<Conduit>` entries when the upstream record changes.

use std::collections::BTreeSet;
use std::fmt;
use std::net::IpAddr;

use serde::{Deserialize, Serialize};

use crate::error::{ConduitError, Result};
use crate::model::method::HttpMethod;
use crate::model::token::ServiceType;

/// Backend service a conduit proxies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BackendType {
    /// Tabular REST API (bases and tables).
    Airtable,
    /// Spreadsheet values API.
    GoogleSheets,
}

impl BackendType {
    pub fn as_str(self) -> &'static str {
        match self {
            BackendType::Airtable => "AIRTABLE",
            BackendType::GoogleSheets => "GOOGLE_SHEETS",
        }
    }

    /// Token provider family that issues credentials for this backend.
    pub fn service_type(self) -> ServiceType {
        match self {
            BackendType::Airtable => ServiceType::Airtable,
            BackendType::GoogleSheets => ServiceType::GoogleSheets,
        }
    }
}

impl fmt::Display for BackendType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Opaque name of a credential. Never carries secret material itself.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CredentialRef(String);

impl CredentialRef {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CredentialRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConduitStatus {
    Active,
    Inactive,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EntryStatus {
    Active,
    Inactive,
}

/// One allow-list line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AllowListEntry {
    pub ip: IpAddr,
    pub status: EntryStatus,
    #[serde(default)]
    pub comment: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HiddenFieldPolicy {
    /// Absorb the submission when the field carries a value.
    DropIfFilled,
    /// Absorb the submission unless the field equals the configured value.
    PassIfMatch,
}

/// Anti-spam rule evaluated against the first submitted record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct HiddenFieldRule {
    pub field_name: String,
    pub policy: HiddenFieldPolicy,
    /// When false the field is removed before forwarding.
    pub include: bool,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Conduit {
    pub id: String,
    pub host_identifier: String,
    pub backend_type: BackendType,
    pub credential_ref: CredentialRef,
    pub container_key: String,
    pub allowed_methods: BTreeSet<HttpMethod>,
    #[serde(default)]
    pub allow_list: Vec<AllowListEntry>,
    #[serde(default)]
    pub hidden_field_rules: Vec<HiddenFieldRule>,
    pub status: ConduitStatus,
}

impl Conduit {
    /// Check the invariants the gateway relies on.
    pub fn validate(&self) -> Result<()> {
        if normalize_host(&self.host_identifier).is_empty() {
            return Err(ConduitError::UnprocessableEntity(format!(
                "conduit {} has an empty hostIdentifier",
                self.id
            )));
        }
        if self.allowed_methods.is_empty() {
            return Err(ConduitError::UnprocessableEntity(format!(
                "conduit {} must allow at least one method",
                self.id
            )));
        }
        if self.container_key.trim().is_empty() {
            return Err(ConduitError::UnprocessableEntity(format!(
                "conduit {} has an empty containerKey",
                self.id
            )));
        }
        Ok(())
    }

    /// Routing-table key for this conduit.
    pub fn host_key(&self) -> String {
        normalize_host(&self.host_identifier)
    }

    pub fn is_active(&self) -> bool {
        self.status == ConduitStatus::Active
    }

    pub fn allows(&self, method: HttpMethod) -> bool {
        self.allowed_methods.contains(&method)
    }
}

/// Normalize a `Host` header value (or configured host) into a routing key:
/// lowercase, without port and trailing dot.
pub fn normalize_host(raw: &str) -> String {
    let raw = raw.trim();
    let host = if let Some(rest) = raw.strip_prefix('[') {
        // [v6]:port
        match rest.split_once(']') {
            Some((addr, _)) => return format!("[{}]", addr.to_ascii_lowercase()),
            None => raw,
        }
    } else if raw.matches(':').count() == 1 {
        raw.split_once(':').map(|(h, _)| h).unwrap_or(raw)
    } else {
        raw
    };
    host.trim_end_matches('.').to_ascii_lowercase()
}
