//! Per-document metadata cache.
//!
//! Holds, per document ID, any subset of: the resolved record, the last
//! known content size, the last known resource kind, and the document's lock
//! and property managers.
//!
//! Data lookups are gated by an explicit enable flag (off by default) and an
//! optional TTL; with a TTL, [`DocumentCache::spawn_purger`] drops expired
//! data once per TTL period. The managers are not gated: the first access for a document
//! creates them and every later access returns the same instance, whether
//! or not caching is enabled. Managers are never evicted.

use crate::config::CacheConfig;
use crate::metadata::ResourceKind;
use crate::props::PropertyManager;
use dashmap::DashMap;
use dav_server::memls::MemLs;
use docdav_store::DocumentRecord;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, trace};

/// Cache key for the root collection's managers. Document IDs are never empty.
const ROOT_KEY: &str = "";

#[derive(Debug, Clone)]
struct Cached<T> {
    value: T,
    stored: Instant,
}

impl<T: Clone> Cached<T> {
    fn new(value: T) -> Self {
        Self {
            value,
            stored: Instant::now(),
        }
    }

    fn fresh(&self, ttl: Option<Duration>) -> Option<T> {
        match ttl {
            Some(ttl) if self.stored.elapsed() >= ttl => None,
            _ => Some(self.value.clone()),
        }
    }
}

#[derive(Debug, Default)]
struct CacheEntry {
    metadata: Option<Cached<Arc<DocumentRecord>>>,
    size: Option<Cached<u64>>,
    kind: Option<Cached<ResourceKind>>,
    locks: Option<Arc<MemLs>>,
    props: Option<Arc<PropertyManager>>,
}

/// Hit/miss counters for the data lookups.
#[derive(Debug, Default)]
pub struct CacheStats {
    pub hits: AtomicU64,
    pub misses: AtomicU64,
}

impl CacheStats {
    #[inline]
    fn record_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    pub fn misses(&self) -> u64 {
        self.misses.load(Ordering::Relaxed)
    }

    /// Fraction of lookups served from the cache (0.0 when none).
    pub fn hit_rate(&self) -> f64 {
        let hits = self.hits();
        let total = hits + self.misses();
        if total == 0 {
            0.0
        } else {
            hits as f64 / total as f64
        }
    }
}

/// Process-wide document cache, shared by the filesystem adapter and the
/// lock system.
#[derive(Debug)]
pub struct DocumentCache {
    enabled: bool,
    ttl: Option<Duration>,
    entries: DashMap<String, CacheEntry>,
    stats: CacheStats,
}

impl Default for DocumentCache {
    fn default() -> Self {
        Self::new(&CacheConfig::default())
    }
}

impl DocumentCache {
    pub fn new(config: &CacheConfig) -> Self {
        Self {
            enabled: config.enabled,
            ttl: config.ttl,
            entries: DashMap::new(),
            stats: CacheStats::default(),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn ttl(&self) -> Option<Duration> {
        self.ttl
    }

    pub fn stats(&self) -> &CacheStats {
        &self.stats
    }

    /// Number of documents with any cached state (managers included).
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn lookup<T: Clone>(
        &self,
        document_id: &str,
        field: impl Fn(&CacheEntry) -> Option<&Cached<T>>,
    ) -> Option<T> {
        if !self.is_enabled() {
            return None;
        }
        let found = self
            .entries
            .get(document_id)
            .and_then(|entry| field(entry.value()).and_then(|c| c.fresh(self.ttl)));
        if found.is_some() {
            self.stats.record_hit();
        } else {
            self.stats.record_miss();
        }
        trace!(document_id, hit = found.is_some(), "cache lookup");
        found
    }

    fn store(&self, document_id: &str, update: impl FnOnce(&mut CacheEntry)) {
        if self.is_enabled() {
            update(self.entries.entry(document_id.to_string()).or_default().value_mut());
        }
    }

    pub fn metadata(&self, document_id: &str) -> Option<Arc<DocumentRecord>> {
        self.lookup(document_id, |e| e.metadata.as_ref())
    }

    pub fn put_metadata(&self, document_id: &str, record: Arc<DocumentRecord>) {
        self.store(document_id, |e| e.metadata = Some(Cached::new(record)));
    }

    pub fn size(&self, document_id: &str) -> Option<u64> {
        self.lookup(document_id, |e| e.size.as_ref())
    }

    pub fn put_size(&self, document_id: &str, size: u64) {
        self.store(document_id, |e| e.size = Some(Cached::new(size)));
    }

    pub fn kind(&self, document_id: &str) -> Option<ResourceKind> {
        self.lookup(document_id, |e| e.kind.as_ref())
    }

    pub fn put_kind(&self, document_id: &str, kind: ResourceKind) {
        self.store(document_id, |e| e.kind = Some(Cached::new(kind)));
    }

    /// Record a completed write made through this process: the new record
    /// replaces the cached one and the cached size is dropped.
    pub fn refresh_after_write(&self, record: Arc<DocumentRecord>) {
        if let Some(mut entry) = self.entries.get_mut(&record.document_id) {
            entry.size = None;
        }
        let document_id = record.document_id.clone();
        self.put_metadata(&document_id, record);
    }

    /// The document's lock manager, created on first access.
    ///
    /// `None` selects the root collection's manager.
    pub fn lock_manager(&self, document_id: Option<&str>) -> Arc<MemLs> {
        let key = document_id.unwrap_or(ROOT_KEY);
        let mut entry = self.entries.entry(key.to_string()).or_default();
        entry
            .locks
            .get_or_insert_with(|| {
                trace!(document_id = key, "creating lock manager");
                Arc::new(*MemLs::new())
            })
            .clone()
    }

    /// The document's property manager, created on first access.
    ///
    /// `None` selects the root collection's manager.
    pub fn property_manager(&self, document_id: Option<&str>) -> Arc<PropertyManager> {
        let key = document_id.unwrap_or(ROOT_KEY);
        let mut entry = self.entries.entry(key.to_string()).or_default();
        entry
            .props
            .get_or_insert_with(|| {
                trace!(document_id = key, "creating property manager");
                Arc::new(PropertyManager::new())
            })
            .clone()
    }

    /// Drop expired data fields. Managers stay.
    ///
    /// Returns the number of documents removed from the map.
    pub fn purge_expired(&self) -> usize {
        let Some(ttl) = self.ttl else {
            return 0;
        };
        let before = self.entries.len();
        for mut entry in self.entries.iter_mut() {
            let expired = |stored: Instant| stored.elapsed() >= ttl;
            if entry.metadata.as_ref().is_some_and(|c| expired(c.stored)) {
                entry.metadata = None;
            }
            if entry.size.as_ref().is_some_and(|c| expired(c.stored)) {
                entry.size = None;
            }
            if entry.kind.as_ref().is_some_and(|c| expired(c.stored)) {
                entry.kind = None;
            }
        }
        self.entries.retain(|_, e| {
            e.metadata.is_some()
                || e.size.is_some()
                || e.kind.is_some()
                || e.locks.is_some()
                || e.props.is_some()
        });
        before.saturating_sub(self.entries.len())
    }

    /// Spawn a task that purges expired data once per TTL period.
    ///
    /// Returns `None` when the cache is disabled or has no TTL. The task
    /// ends once the cache is dropped; callers abort it on shutdown.
    pub fn spawn_purger(self: &Arc<Self>) -> Option<JoinHandle<()>> {
        let period = self.ttl.filter(|ttl| self.enabled && !ttl.is_zero())?;
        let cache = Arc::downgrade(self);
        Some(tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick completes immediately.
            interval.tick().await;
            loop {
                interval.tick().await;
                let Some(cache) = cache.upgrade() else {
                    break;
                };
                let removed = cache.purge_expired();
                debug!(removed, remaining = cache.len(), "purged expired cache entries");
            }
        }))
    }
}
