use std::collections::HashMap;
use std::time::Duration;

use serde::Deserialize;
use conduit_core::error::{ConduitError, Result};

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GatewayConfig {
    pub version: u32,

    #[serde(default)]
    pub gateway: GatewaySection,

    pub routing: RoutingSection,

    pub resource: ResourceSection,

    #[serde(default)]
    pub backends: BackendsSection,

    /// Directory holding service-account key files (`<credential_ref>.json`).
    #[serde(default = "default_vault_dir")]
    pub vault_dir: String,

    /// Secret material, keyed by credential reference.
    #[serde(default)]
    pub credentials: HashMap<String, CredentialEntry>,
}

impl GatewayConfig {
    pub fn validate(&self) -> Result<()> {
        if self.version != 1 {
            return Err(bad(format!("unsupported config version: {}", self.version)));
        }

        self.gateway.validate()?;
        self.routing.validate()?;
        self.resource.validate()?;
        self.backends.validate()?;

        if !self.credentials.contains_key(&self.routing.operator_credential) {
            return Err(bad(format!(
                "routing.operator_credential `{}` has no entry under credentials",
                self.routing.operator_credential
            )));
        }
        Ok(())
    }
}

fn bad(msg: String) -> ConduitError {
    ConduitError::UnprocessableEntity(msg)
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GatewaySection {
    #[serde(default = "default_listen")]
    pub listen: String,

    /// Log request failures. Off by default; clients never see diagnostics.
    #[serde(default)]
    pub log_errors: bool,

    /// Take the caller IP from `X-Forwarded-For` (behind a trusted proxy).
    #[serde(default)]
    pub trust_forwarded_for: bool,
}

impl Default for GatewaySection {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            log_errors: false,
            trust_forwarded_for: false,
        }
    }
}

impl GatewaySection {
    pub fn validate(&self) -> Result<()> {
        if self.listen.parse::<std::net::SocketAddr>().is_err() {
            return Err(bad(format!(
                "gateway.listen must be a valid socket address: {}",
                self.listen
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RoutingSection {
    #[serde(default = "default_refresh_interval_ms")]
    pub refresh_interval_ms: u64,

    /// Credential of the privileged account whose conduits are served.
    pub operator_credential: String,
}

impl RoutingSection {
    pub fn validate(&self) -> Result<()> {
        if !(1_000..=3_600_000).contains(&self.refresh_interval_ms) {
            return Err(bad(
                "routing.refresh_interval_ms must be between 1000 and 3600000".into(),
            ));
        }
        Ok(())
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_millis(self.refresh_interval_ms)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ResourceSection {
    pub base_url: String,

    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Lifetime assumed for login tokens that do not report one.
    #[serde(default = "default_token_ttl_secs")]
    pub token_ttl_secs: u64,
}

impl ResourceSection {
    pub fn validate(&self) -> Result<()> {
        validate_url("resource.base_url", &self.base_url)?;
        validate_timeout("resource.timeout_ms", self.timeout_ms)?;
        if self.token_ttl_secs < 60 {
            return Err(bad("resource.token_ttl_secs must be at least 60".into()));
        }
        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BackendsSection {
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    #[serde(default)]
    pub airtable: AirtableSection,

    #[serde(default)]
    pub google_sheets: GoogleSheetsSection,
}

impl Default for BackendsSection {
    fn default() -> Self {
        Self {
            timeout_ms: default_timeout_ms(),
            airtable: AirtableSection::default(),
            google_sheets: GoogleSheetsSection::default(),
        }
    }
}

impl BackendsSection {
    pub fn validate(&self) -> Result<()> {
        validate_timeout("backends.timeout_ms", self.timeout_ms)?;
        validate_url("backends.airtable.base_url", &self.airtable.base_url)?;
        validate_url("backends.google_sheets.base_url", &self.google_sheets.base_url)?;
        validate_url("backends.google_sheets.token_uri", &self.google_sheets.token_uri)?;
        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AirtableSection {
    #[serde(default = "default_airtable_base_url")]
    pub base_url: String,
}

impl Default for AirtableSection {
    fn default() -> Self {
        Self {
            base_url: default_airtable_base_url(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GoogleSheetsSection {
    #[serde(default = "default_sheets_base_url")]
    pub base_url: String,

    /// Token endpoint used when the key file does not name one.
    #[serde(default = "default_token_uri")]
    pub token_uri: String,

    #[serde(default = "default_sheets_scope")]
    pub scope: String,
}

impl Default for GoogleSheetsSection {
    fn default() -> Self {
        Self {
            base_url: default_sheets_base_url(),
            token_uri: default_token_uri(),
            scope: default_sheets_scope(),
        }
    }
}

/// Secret material behind one credential reference.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CredentialEntry {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub api_key: Option<String>,
}

fn validate_url(field: &str, value: &str) -> Result<()> {
    if !(value.starts_with("http://") || value.starts_with("https://")) {
        return Err(bad(format!("{field} must be an http(s) URL: {value}")));
    }
    Ok(())
}

fn validate_timeout(field: &str, value: u64) -> Result<()> {
    if !(100..=120_000).contains(&value) {
        return Err(bad(format!("{field} must be between 100 and 120000")));
    }
    Ok(())
}

fn default_listen() -> String {
    "0.0.0.0:8080".into()
}
fn default_refresh_interval_ms() -> u64 {
    10_000
}
fn default_timeout_ms() -> u64 {
    10_000
}
fn default_token_ttl_secs() -> u64 {
    3_600
}
fn default_vault_dir() -> String {
    "keys".into()
}
fn default_airtable_base_url() -> String {
    "https://api.airtable.com".into()
}
fn default_sheets_base_url() -> String {
    "https://sheets.googleapis.com".into()
}
fn default_token_uri() -> String {
    "https://oauth2.googleapis.com/token".into()
}
fn default_sheets_scope() -> String {
    "https://www.googleapis.com/auth/spreadsheets".into()
}
