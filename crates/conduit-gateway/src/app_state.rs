//! Shared application state for the conduit gateway.
//!
//! Builds the caches, clients, token providers, and adapters once at startup
//! and hands out cheap `Arc` clones to handlers and background tasks.

use std::sync::Arc;

use conduit_core::error::Result;
use conduit_core::model::{CredentialRef, ServiceType};

use crate::adapters::{AirtableAdapter, GoogleSheetsAdapter};
use crate::config::GatewayConfig;
use crate::dispatch::Dispatcher;
use crate::policy::PolicyPipeline;
use crate::routing::{RoutingCache, RoutingRefresher};
use crate::token::providers::{InternalAuthProvider, SignedAssertionProvider, StaticKeyProvider};
use crate::token::{Clock, CredentialStore, SystemClock, TokenService};
use crate::upstream::{build_client, OperatorConduitSource, ResourceClient};

#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
    routes: Arc<RoutingCache>,
    tokens: Arc<TokenService>,
    dispatcher: Arc<Dispatcher>,
}

struct AppStateInner {
    cfg: GatewayConfig,
    pipeline: PolicyPipeline,
    resource: Arc<ResourceClient>,
}

impl AppState {
    /// Build application state.
    /// Returns Result so main can handle errors gracefully (no panic).
    pub fn new(cfg: GatewayConfig) -> Result<Self> {
        Self::with_clock(cfg, Arc::new(SystemClock))
    }

    pub fn with_clock(cfg: GatewayConfig, clock: Arc<dyn Clock>) -> Result<Self> {
        // 1) Clients and secrets
        let resource = Arc::new(ResourceClient::new(
            cfg.resource.base_url.clone(),
            cfg.resource.timeout(),
        )?);
        let backend_http = build_client(cfg.backends.timeout())?;
        let store = Arc::new(CredentialStore::new(cfg.credentials.clone()));

        // 2) Token providers
        let tokens = Arc::new(TokenService::new(Arc::clone(&clock)));
        tokens.register(Arc::new(InternalAuthProvider::new(
            Arc::clone(&resource),
            Arc::clone(&store),
            Arc::clone(&clock),
            cfg.resource.token_ttl_secs,
        )));
        tokens.register(Arc::new(StaticKeyProvider::new(
            ServiceType::Airtable,
            Arc::clone(&store),
            Arc::clone(&clock),
        )));
        tokens.register(Arc::new(SignedAssertionProvider::new(
            ServiceType::GoogleSheets,
            cfg.vault_dir.clone(),
            cfg.backends.google_sheets.token_uri.clone(),
            cfg.backends.google_sheets.scope.clone(),
            backend_http.clone(),
            Arc::clone(&clock),
        )));

        // 3) Adapters
        let dispatcher = Dispatcher::new(Arc::clone(&tokens));
        dispatcher.register(Arc::new(AirtableAdapter::new(
            cfg.backends.airtable.base_url.clone(),
            backend_http.clone(),
        )));
        dispatcher.register(Arc::new(GoogleSheetsAdapter::new(
            cfg.backends.google_sheets.base_url.clone(),
            backend_http,
        )));

        // every adapter needs a provider for its service type
        let services = tokens.registered_services();
        for backend in dispatcher.registered_backends() {
            if !services.contains(&backend.service_type()) {
                tracing::warn!(
                    backend = backend.as_str(),
                    "adapter registered without a token provider for its service"
                );
            }
        }

        let routes = Arc::new(RoutingCache::new());
        let pipeline = PolicyPipeline::new(Arc::clone(&routes));
        tracing::debug!(stages = ?pipeline.stage_names(), "policy pipeline ready");

        Ok(Self {
            inner: Arc::new(AppStateInner {
                cfg,
                pipeline,
                resource,
            }),
            routes,
            tokens,
            dispatcher: Arc::new(dispatcher),
        })
    }

    pub fn cfg(&self) -> &GatewayConfig {
        &self.inner.cfg
    }

    pub fn pipeline(&self) -> &PolicyPipeline {
        &self.inner.pipeline
    }

    pub fn routes(&self) -> Arc<RoutingCache> {
        Arc::clone(&self.routes)
    }

    pub fn tokens(&self) -> Arc<TokenService> {
        Arc::clone(&self.tokens)
    }

    pub fn dispatcher(&self) -> Arc<Dispatcher> {
        Arc::clone(&self.dispatcher)
    }

    /// Refresher pulling the operator account's conduits into the routing
    /// table.
    pub fn refresher(&self) -> RoutingRefresher {
        let source = OperatorConduitSource::new(
            Arc::clone(&self.inner.resource),
            Arc::clone(&self.tokens),
            CredentialRef::new(self.cfg().routing.operator_credential.clone()),
        );
        RoutingRefresher::new(
            Arc::clone(&self.routes),
            Arc::new(source),
            self.cfg().routing.refresh_interval(),
        )
    }
}
