use std::sync::Arc;

use async_trait::async_trait;

use conduit_core::error::Result;
use conduit_core::model::{CredentialRef, ServiceType};

use crate::token::credentials::CredentialStore;
use crate::token::service::{Clock, IssuedToken, TokenProvider};
use crate::upstream::ResourceClient;

/// Logs in to the resource service with a stored email/password pair.
pub struct InternalAuthProvider {
    client: Arc<ResourceClient>,
    store: Arc<CredentialStore>,
    clock: Arc<dyn Clock>,
    default_ttl_secs: u64,
}

impl InternalAuthProvider {
    pub fn new(
        client: Arc<ResourceClient>,
        store: Arc<CredentialStore>,
        clock: Arc<dyn Clock>,
        default_ttl_secs: u64,
    ) -> Self {
        Self {
            client,
            store,
            clock,
            default_ttl_secs,
        }
    }
}

#[async_trait]
impl TokenProvider for InternalAuthProvider {
    fn service_type(&self) -> ServiceType {
        ServiceType::Internal
    }

    async fn request_access_token(&self, credential: &CredentialRef) -> Result<IssuedToken> {
        let (email, password) = self.store.login_pair(credential)?;
        let login = self.client.login(email, password).await?;
        let ttl = login.expires_in.unwrap_or(self.default_ttl_secs);

        tracing::debug!(user = %login.user.id, ttl, "resource service login succeeded");
        Ok(IssuedToken {
            token: login.token,
            token_type: "Bearer".into(),
            expires_at: self.clock.now_epoch_secs().saturating_add(ttl),
            principal: Some(login.user.id),
        })
    }
}
