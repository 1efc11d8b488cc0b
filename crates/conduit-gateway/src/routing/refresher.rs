use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use conduit_core::error::Result;
use conduit_core::model::Conduit;

use super::cache::{RefreshStats, RoutingCache};

/// Supplier of the full conduit list served by this gateway.
///
/// Items are raw JSON so one malformed record does not fail the whole cycle.
#[async_trait]
pub trait ConduitSource: Send + Sync {
    async fn fetch_conduits(&self) -> Result<Vec<Value>>;
}

/// Periodically pulls the conduit list and applies it to the routing cache.
pub struct RoutingRefresher {
    cache: Arc<RoutingCache>,
    source: Arc<dyn ConduitSource>,
    interval: Duration,
}

impl RoutingRefresher {
    pub fn new(cache: Arc<RoutingCache>, source: Arc<dyn ConduitSource>, interval: Duration) -> Self {
        Self {
            cache,
            source,
            interval,
        }
    }

    /// One fetch + apply cycle. On error the table is left untouched.
    pub async fn refresh_once(&self) -> Result<RefreshStats> {
        let raw = self.source.fetch_conduits().await?;

        let mut skipped = 0;
        let mut fresh = Vec::with_capacity(raw.len());
        for item in raw {
            match parse_conduit(item) {
                Ok(c) => fresh.push(c),
                Err(reason) => {
                    skipped += 1;
                    tracing::warn!(%reason, "skipping invalid conduit record");
                }
            }
        }

        let mut stats = self.cache.replace_all(fresh);
        stats.skipped = skipped;
        Ok(stats)
    }

    /// Run until `shutdown` flips to true. The first cycle runs immediately.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    match self.refresh_once().await {
                        Ok(stats) => tracing::debug!(
                            inserted = stats.inserted,
                            updated = stats.updated,
                            unchanged = stats.unchanged,
                            evicted = stats.evicted,
                            skipped = stats.skipped,
                            routes = self.cache.len(),
                            "routing table refreshed"
                        ),
                        Err(e) => tracing::warn!(error = %e, "routing refresh failed; keeping previous table"),
                    }
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        tracing::info!("routing refresher stopped");
                        return;
                    }
                }
            }
        }
    }

    pub fn spawn(self, shutdown: watch::Receiver<bool>) -> JoinHandle<()> {
        tokio::spawn(self.run(shutdown))
    }
}

fn parse_conduit(item: Value) -> std::result::Result<Conduit, String> {
    let id = item
        .get("id")
        .and_then(Value::as_str)
        .unwrap_or("<unknown>")
        .to_string();
    let conduit: Conduit =
        serde_json::from_value(item).map_err(|e| format!("conduit {id}: {e}"))?;
    conduit.validate().map_err(|e| e.to_string())?;
    Ok(conduit)
}
