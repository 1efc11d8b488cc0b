//! Gateway config loader (strict parsing).

pub mod schema;

use std::fs;

use conduit_core::error::{ConduitError, Result};

pub use schema::{
    AirtableSection, BackendsSection, CredentialEntry, GatewayConfig, GatewaySection,
    GoogleSheetsSection, ResourceSection, RoutingSection,
};

/// Env var naming the config file; falls back to `conduit.yaml`.
pub const CONFIG_PATH_ENV: &str = "CONDUIT_CONFIG";

pub fn default_path() -> String {
    std::env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| "conduit.yaml".to_string())
}

pub fn load_from_file(path: &str) -> Result<GatewayConfig> {
    let s = fs::read_to_string(path)
        .map_err(|e| ConduitError::Internal(format!("read config failed ({path}): {e}")))?;
    load_from_str(&s)
}

pub fn load_from_str(s: &str) -> Result<GatewayConfig> {
    let cfg: GatewayConfig = serde_yaml::from_str(s)
        .map_err(|e| ConduitError::UnprocessableEntity(format!("invalid yaml: {e}")))?;
    cfg.validate()?;
    Ok(cfg)
}
