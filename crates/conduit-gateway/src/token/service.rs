use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use dashmap::DashMap;

use conduit_core::error::{ConduitError, Result};
use conduit_core::model::{AccessToken, CredentialRef, ServiceType};

/// Wall clock in epoch seconds.
pub trait Clock: Send + Sync {
    fn now_epoch_secs(&self) -> u64;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_epoch_secs(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs()
    }
}

/// What every provider hands back. The service adds the cache bookkeeping.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub token_type: String,
    pub expires_at: u64,
    pub principal: Option<String>,
}

/// Credential exchange for one service type.
#[async_trait]
pub trait TokenProvider: Send + Sync {
    fn service_type(&self) -> ServiceType;
    async fn request_access_token(&self, credential: &CredentialRef) -> Result<IssuedToken>;
}

/// Cache-first access token lookup, one provider per service type.
///
/// Concurrent misses on the same key may both call the provider; the later
/// insert simply overwrites the earlier one.
pub struct TokenService {
    providers: DashMap<ServiceType, Arc<dyn TokenProvider>>,
    cache: DashMap<String, AccessToken>,
    clock: Arc<dyn Clock>,
}

impl TokenService {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            providers: DashMap::new(),
            cache: DashMap::new(),
            clock,
        }
    }

    pub fn register(&self, provider: Arc<dyn TokenProvider>) {
        self.providers.insert(provider.service_type(), provider);
    }

    pub fn registered_services(&self) -> Vec<ServiceType> {
        self.providers.iter().map(|e| *e.key()).collect()
    }

    pub fn cache_key(service: ServiceType, credential: &CredentialRef) -> String {
        format!("{service}:{credential}")
    }

    pub async fn get_access_token(
        &self,
        service: ServiceType,
        credential: &CredentialRef,
    ) -> Result<AccessToken> {
        let key = Self::cache_key(service, credential);
        let now = self.clock.now_epoch_secs();

        let cached = self.cache.get(&key).map(|e| e.value().clone());
        if let Some(token) = cached {
            if !token.is_expired_at(now) {
                return Ok(token);
            }
            tracing::debug!(%service, credential = %credential, "cached token expired");
        }

        let provider = self
            .providers
            .get(&service)
            .map(|e| Arc::clone(e.value()))
            .ok_or_else(|| {
                ConduitError::Internal(format!("no token provider registered for {service}"))
            })?;

        let issued = provider.request_access_token(credential).await?;
        let token = AccessToken {
            service_type: service,
            credential_key: key.clone(),
            token_value: issued.token,
            token_type: issued.token_type,
            expires_at: issued.expires_at,
            principal: issued.principal,
        };
        tracing::debug!(%service, credential = %credential, expires_at = token.expires_at, "access token issued");

        self.cache.insert(key, token.clone());
        Ok(token)
    }

    /// Drop a cached token so the next call re-issues it.
    pub fn invalidate(&self, service: ServiceType, credential: &CredentialRef) {
        self.cache.remove(&Self::cache_key(service, credential));
    }

    pub fn cached_len(&self) -> usize {
        self.cache.len()
    }
}
