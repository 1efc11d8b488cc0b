//! Secret material behind credential references.
//!
//! Conduits and the routing table only ever carry the reference name; the
//! providers resolve it here at exchange time.

use std::collections::HashMap;

use conduit_core::error::{ConduitError, Result};
use conduit_core::model::CredentialRef;

use crate::config::CredentialEntry;

#[derive(Debug, Default)]
pub struct CredentialStore {
    entries: HashMap<String, CredentialEntry>,
}

impl CredentialStore {
    pub fn new(entries: HashMap<String, CredentialEntry>) -> Self {
        Self { entries }
    }

    pub fn get(&self, credential: &CredentialRef) -> Option<&CredentialEntry> {
        self.entries.get(credential.as_str())
    }

    /// `(email, password)` pair, or `INVALID_CREDENTIALS`.
    pub fn login_pair(&self, credential: &CredentialRef) -> Result<(&str, &str)> {
        let entry = self.get(credential);
        let email = entry.and_then(|e| e.email.as_deref()).filter(|s| !s.is_empty());
        let password = entry
            .and_then(|e| e.password.as_deref())
            .filter(|s| !s.is_empty());
        match (email, password) {
            (Some(e), Some(p)) => Ok((e, p)),
            _ => Err(ConduitError::InvalidCredentials(format!(
                "credential `{credential}` has no email/password"
            ))),
        }
    }

    pub fn api_key(&self, credential: &CredentialRef) -> Result<&str> {
        self.get(credential)
            .and_then(|e| e.api_key.as_deref())
            .filter(|s| !s.is_empty())
            .ok_or_else(|| {
                ConduitError::InvalidCredentials(format!("credential `{credential}` has no api_key"))
            })
    }
}
