use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use dashmap::DashMap;

use conduit_core::model::{normalize_host, Conduit};

/// Outcome of one `replace_all` pass.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RefreshStats {
    pub inserted: usize,
    pub updated: usize,
    pub unchanged: usize,
    pub evicted: usize,
    /// Fresh entries dropped because they failed to parse or validate.
    pub skipped: usize,
}

/// Host -> conduit routing table.
///
/// Readers and the refresher share this through `Arc`. Writes are atomic per
/// key; a reader may see some keys from the previous refresh and some from
/// the next, never a half-built conduit.
#[derive(Default)]
pub struct RoutingCache {
    table: DashMap<String, Arc<Conduit>>,
    synced: AtomicBool,
}

impl RoutingCache {
    pub fn new() -> Self {
        Self {
            table: DashMap::new(),
            synced: AtomicBool::new(false),
        }
    }

    /// Resolve an inbound `Host` header value.
    pub fn lookup(&self, host: &str) -> Option<Arc<Conduit>> {
        self.table
            .get(&normalize_host(host))
            .map(|e| Arc::clone(e.value()))
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    pub fn hosts(&self) -> Vec<String> {
        self.table.iter().map(|e| e.key().clone()).collect()
    }

    /// True once at least one full list has been applied.
    pub fn is_synced(&self) -> bool {
        self.synced.load(Ordering::Acquire)
    }

    /// Apply a full, current conduit list: evict hosts missing from it and
    /// insert-or-replace the rest. Entries whose configuration did not change
    /// keep their existing `Arc`.
    pub fn replace_all(&self, fresh: Vec<Conduit>) -> RefreshStats {
        let mut stats = RefreshStats::default();

        let mut by_host: HashMap<String, Conduit> = HashMap::with_capacity(fresh.len());
        for c in fresh {
            let host = c.host_key();
            if let Some(prev) = by_host.insert(host.clone(), c) {
                tracing::warn!(%host, dropped = %prev.id, "duplicate host in conduit list; last entry wins");
            }
        }

        self.table.retain(|host, _| {
            let keep = by_host.contains_key(host);
            if !keep {
                stats.evicted += 1;
            }
            keep
        });

        for (host, conduit) in by_host {
            let unchanged = self
                .table
                .get(&host)
                .map(|cur| **cur.value() == conduit)
                .unwrap_or(false);
            if unchanged {
                stats.unchanged += 1;
                continue;
            }
            match self.table.insert(host, Arc::new(conduit)) {
                Some(_) => stats.updated += 1,
                None => stats.inserted += 1,
            }
        }

        self.synced.store(true, Ordering::Release);
        stats
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use conduit_core::model::{BackendType, ConduitStatus, CredentialRef, HttpMethod};

    fn conduit(id: &str, host: &str) -> Conduit {
        Conduit {
            id: id.into(),
            host_identifier: host.into(),
            backend_type: BackendType::Airtable,
            credential_ref: CredentialRef::new("airtable-main"),
            container_key: "app1/Table".into(),
            allowed_methods: [HttpMethod::Get].into_iter().collect(),
            allow_list: vec![],
            hidden_field_rules: vec![],
            status: ConduitStatus::Active,
        }
    }

    #[test]
    fn lookup_normalizes_host() {
        let cache = RoutingCache::new();
        cache.replace_all(vec![conduit("a", "a.example.com")]);
        assert!(cache.lookup("A.Example.com:443").is_some());
        assert!(cache.lookup("b.example.com").is_none());
    }

    #[test]
    fn refresh_evicts_and_inserts() {
        let cache = RoutingCache::new();
        cache.replace_all(vec![
            conduit("a", "a.test"),
            conduit("b", "b.test"),
            conduit("c", "c.test"),
        ]);
        let b_before = cache.lookup("b.test").unwrap();
        let c_before = cache.lookup("c.test").unwrap();

        let stats = cache.replace_all(vec![
            conduit("b", "b.test"),
            conduit("c", "c.test"),
            conduit("d", "d.test"),
        ]);

        let mut hosts = cache.hosts();
        hosts.sort();
        assert_eq!(hosts, vec!["b.test", "c.test", "d.test"]);
        assert!(Arc::ptr_eq(&b_before, &cache.lookup("b.test").unwrap()));
        assert!(Arc::ptr_eq(&c_before, &cache.lookup("c.test").unwrap()));
        assert_eq!(
            stats,
            RefreshStats {
                inserted: 1,
                updated: 0,
                unchanged: 2,
                evicted: 1,
                skipped: 0
            }
        );
    }

    #[test]
    fn changed_config_replaces_entry() {
        let cache = RoutingCache::new();
        cache.replace_all(vec![conduit("a", "a.test")]);
        let before = cache.lookup("a.test").unwrap();

        let mut changed = conduit("a", "a.test");
        changed.allowed_methods.insert(HttpMethod::Post);
        let stats = cache.replace_all(vec![changed]);

        let after = cache.lookup("a.test").unwrap();
        assert!(!Arc::ptr_eq(&before, &after));
        assert!(after.allows(HttpMethod::Post));
        assert_eq!(stats.updated, 1);
    }

    #[test]
    fn empty_list_evicts_everything() {
        let cache = RoutingCache::new();
        assert!(!cache.is_synced());
        cache.replace_all(vec![conduit("a", "a.test")]);
        let stats = cache.replace_all(vec![]);
        assert!(cache.is_empty());
        assert_eq!(stats.evicted, 1);
        assert!(cache.is_synced());
    }
}
