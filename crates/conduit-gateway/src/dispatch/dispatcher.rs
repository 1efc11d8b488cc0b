use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use tracing::Instrument;

use conduit_core::error::{ConduitError, Result};
use conduit_core::model::BackendType;

use crate::adapters::{AdapterRequest, GatewayResponse, IntegrationAdapter};
use crate::context::RequestContext;
use crate::token::TokenService;

/// Registry of integration adapters, one per backend type.
pub struct Dispatcher {
    adapters: DashMap<BackendType, Arc<dyn IntegrationAdapter>>,
    tokens: Arc<TokenService>,
    seq: AtomicU64,
}

impl Dispatcher {
    pub fn new(tokens: Arc<TokenService>) -> Self {
        Self {
            adapters: DashMap::new(),
            tokens,
            seq: AtomicU64::new(0),
        }
    }

    pub fn register(&self, adapter: Arc<dyn IntegrationAdapter>) {
        self.adapters.insert(adapter.backend(), adapter);
    }

    pub fn registered_backends(&self) -> Vec<BackendType> {
        self.adapters.iter().map(|e| *e.key()).collect()
    }

    /// Token lookup, then `map_in -> transmit -> map_out` on the conduit's
    /// adapter. Backend status and data are returned as-is.
    pub async fn dispatch(&self, ctx: RequestContext) -> Result<GatewayResponse> {
        let conduit = Arc::clone(&ctx.conduit);
        let backend = conduit.backend_type;

        let adapter = self
            .adapters
            .get(&backend)
            .map(|e| Arc::clone(e.value()))
            .ok_or_else(|| {
                ConduitError::Internal(format!("backend {} is not supported", backend.as_str()))
            })?;

        let method = ctx.method.ok_or_else(|| {
            ConduitError::MethodNotAllowed(format!("method {} is not allowed", ctx.raw_method))
        })?;

        let seq = self.seq.fetch_add(1, Ordering::Relaxed);
        let span = tracing::info_span!(
            "dispatch",
            seq,
            conduit = %conduit.id,
            backend = backend.as_str()
        );

        async move {
            let token = self
                .tokens
                .get_access_token(backend.service_type(), &conduit.credential_ref)
                .await?;

            let req = AdapterRequest {
                container_key: conduit.container_key.clone(),
                token,
                method,
                path: ctx.path,
                query: ctx.query,
                body: ctx.body,
            };

            let call = adapter.map_in(req).await?;
            tracing::debug!(method = %call.method, url = %call.url, "backend call");
            let resp = adapter.transmit(call).await?;
            let out = adapter.map_out(resp).await?;
            tracing::debug!(status = out.status, "backend answered");
            Ok(out)
        }
        .instrument(span)
        .await
    }
}
