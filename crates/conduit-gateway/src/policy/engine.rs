use std::sync::Arc;

use conduit_core::error::{ConduitError, Result};

use super::{allowlist, body, hidden_field};
use crate::context::{InboundRequest, RequestContext};
use crate::routing::RoutingCache;

/// Result of one pipeline stage.
#[derive(Debug)]
pub enum StageOutcome {
    /// Hand the request to the next stage.
    Continue,
    /// Answer 200 without dispatching.
    Absorb,
    /// Terminate with a client-facing error.
    Reject(ConduitError),
}

/// Final decision for an inbound request.
#[derive(Debug)]
pub enum PolicyDecision {
    Dispatch(RequestContext),
    Absorb { conduit_id: String },
    Reject(ConduitError),
}

/// A stage reads and may rewrite the shared context.
pub type Stage = fn(&mut RequestContext) -> StageOutcome;

/// Ordered, early-exit request filter chain.
/// Each stage may assume every earlier stage returned `Continue`.
pub struct PolicyPipeline {
    routes: Arc<RoutingCache>,
    stages: Vec<(&'static str, Stage)>,
}

impl PolicyPipeline {
    pub fn new(routes: Arc<RoutingCache>) -> Self {
        Self {
            routes,
            stages: Self::default_stages(),
        }
    }

    /// allowlist -> method -> body shape -> hidden fields.
    pub fn default_stages() -> Vec<(&'static str, Stage)> {
        vec![
            ("allowlist", allowlist::check as Stage),
            ("method", check_method as Stage),
            ("body", body::check as Stage),
            ("hidden_field", hidden_field::check as Stage),
        ]
    }

    pub fn stage_names(&self) -> Vec<&'static str> {
        self.stages.iter().map(|(name, _)| *name).collect()
    }

    /// Routing stage: bind the request to the conduit serving its host.
    pub fn resolve(&self, req: InboundRequest) -> Result<RequestContext> {
        let conduit = self
            .routes
            .lookup(&req.host)
            .filter(|c| c.is_active())
            .ok_or_else(|| ConduitError::NotFound(format!("no conduit for host {}", req.host)))?;
        Ok(RequestContext::new(conduit, req))
    }

    pub fn evaluate(&self, req: InboundRequest) -> PolicyDecision {
        let mut ctx = match self.resolve(req) {
            Ok(ctx) => ctx,
            Err(e) => return PolicyDecision::Reject(e),
        };

        for (name, stage) in &self.stages {
            match stage(&mut ctx) {
                StageOutcome::Continue => {}
                StageOutcome::Absorb => {
                    tracing::debug!(stage = name, conduit = %ctx.conduit.id, "request absorbed");
                    return PolicyDecision::Absorb {
                        conduit_id: ctx.conduit.id.clone(),
                    };
                }
                StageOutcome::Reject(e) => {
                    tracing::debug!(stage = name, conduit = %ctx.conduit.id, error = %e, "request rejected");
                    return PolicyDecision::Reject(e);
                }
            }
        }

        PolicyDecision::Dispatch(ctx)
    }
}

/// Method stage: the conduit must enable the inbound method.
pub fn check_method(ctx: &mut RequestContext) -> StageOutcome {
    match ctx.method {
        Some(m) if ctx.conduit.allows(m) => StageOutcome::Continue,
        _ => StageOutcome::Reject(ConduitError::MethodNotAllowed(format!(
            "{} is not enabled on this conduit",
            ctx.raw_method
        ))),
    }
}
