use std::sync::Arc;

use async_trait::async_trait;

use conduit_core::error::Result;
use conduit_core::model::{CredentialRef, ServiceType};

use crate::token::credentials::CredentialStore;
use crate::token::service::{Clock, IssuedToken, TokenProvider};

/// Lifetime given to wrapped API keys; they do not expire on their own.
pub const STATIC_KEY_TTL_SECS: u64 = 365 * 24 * 60 * 60;

/// Wraps a stored API key as a bearer token.
pub struct StaticKeyProvider {
    service: ServiceType,
    store: Arc<CredentialStore>,
    clock: Arc<dyn Clock>,
}

impl StaticKeyProvider {
    pub fn new(service: ServiceType, store: Arc<CredentialStore>, clock: Arc<dyn Clock>) -> Self {
        Self {
            service,
            store,
            clock,
        }
    }
}

#[async_trait]
impl TokenProvider for StaticKeyProvider {
    fn service_type(&self) -> ServiceType {
        self.service
    }

    async fn request_access_token(&self, credential: &CredentialRef) -> Result<IssuedToken> {
        let key = self.store.api_key(credential)?;
        Ok(IssuedToken {
            token: key.to_string(),
            token_type: "Bearer".into(),
            expires_at: self.clock.now_epoch_secs().saturating_add(STATIC_KEY_TTL_SECS),
            principal: None,
        })
    }
}
