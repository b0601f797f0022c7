//! Unbounded in-process backend

use crate::cache::backend::CacheBackend;
use crate::cache::config::CacheConfig;
use crate::cache::entry::{EntryMetadata, LocalEntry};
use crate::cache::invalidation::{InvalidationEvent, InvalidationReason};
use crate::cache::key::StructuralKey;
use crate::cache::materialize::{LiveMaterializer, Materializer};
use crate::cache::types::{BackendCapabilities, BackendKind};
use crate::error::{CacheError, Result};
use crate::query::{CachedValue, ExecutionTarget, Query, ResultKind};
use async_trait::async_trait;
use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use tokio::sync::{Mutex, MutexGuard, OwnedMutexGuard, RwLock};
use tracing::{debug, info};

/// Called once for every entry removed by invalidation or [`LocalBackend::clear`]
pub type DropHandler = Arc<dyn Fn(&StructuralKey, &CachedValue) + Send + Sync>;

/// In-process cache holding live results
///
/// Entries are keyed by the exact (target, query) pair and are never
/// evicted: memory grows with the number of distinct queries until the
/// owning scope is invalidated. Scope invalidation scans every key.
///
/// Misses are serialized through a miss lock. With one shard (the default)
/// all misses share a single lock; more shards split the key space by hash
/// while keeping each key on exactly one lock. Invalidation and `clear`
/// hold every shard, so a miss already executing upstream finishes storing
/// before the scan and is removed with the rest of its scope.
pub struct LocalBackend {
    entries: RwLock<HashMap<StructuralKey, LocalEntry<CachedValue>>>,
    miss_locks: Vec<Arc<Mutex<()>>>,
    materializer: LiveMaterializer,
    on_drop: Option<DropHandler>,
}

impl LocalBackend {
    pub fn new() -> Self {
        Self::with_lock_shards(1)
    }

    /// Split the miss lock into `shards` buckets (at least one)
    pub fn with_lock_shards(shards: usize) -> Self {
        let shards = shards.max(1);
        Self {
            entries: RwLock::new(HashMap::new()),
            miss_locks: (0..shards).map(|_| Arc::new(Mutex::new(()))).collect(),
            materializer: LiveMaterializer,
            on_drop: None,
        }
    }

    pub fn from_config(config: &CacheConfig) -> Result<Self> {
        config.validate()?;
        if config.backend != BackendKind::Local {
            return Err(CacheError::ConfigError(format!(
                "configuration selects the {} backend",
                config.backend
            )));
        }

        info!(
            "Initializing local cache backend ({} miss lock shard(s))",
            config.lock_shards
        );
        Ok(Self::with_lock_shards(config.lock_shards))
    }

    /// Install a handler run for every dropped entry
    pub fn with_drop_handler<F>(mut self, handler: F) -> Self
    where
        F: Fn(&StructuralKey, &CachedValue) + Send + Sync + 'static,
    {
        self.on_drop = Some(Arc::new(handler));
        self
    }

    pub fn lock_shards(&self) -> usize {
        self.miss_locks.len()
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    /// Check if a key exists (without updating access metadata)
    pub async fn contains_key(&self, key: &StructuralKey) -> bool {
        self.entries.read().await.contains_key(key)
    }

    pub async fn metadata(&self, key: &StructuralKey) -> Option<EntryMetadata> {
        self.entries.read().await.get(key).map(|entry| entry.metadata)
    }

    /// Drop every entry
    pub async fn clear(&self) -> InvalidationEvent {
        let guards = self.lock_all_misses().await;
        let drained: Vec<_> = self.entries.write().await.drain().collect();
        drop(guards);
        let count = drained.len();
        self.run_drop_handler(drained);

        info!("Cleared {} entries from local cache", count);
        InvalidationEvent::new(InvalidationReason::Cleared, count)
    }

    /// Acquire every miss-lock shard, always in index order
    async fn lock_all_misses(&self) -> Vec<MutexGuard<'_, ()>> {
        let mut guards = Vec::with_capacity(self.miss_locks.len());
        for lock in &self.miss_locks {
            guards.push(lock.lock().await);
        }
        guards
    }

    fn run_drop_handler(&self, removed: Vec<(StructuralKey, LocalEntry<CachedValue>)>) {
        if let Some(handler) = &self.on_drop {
            for (key, entry) in &removed {
                handler(key, &entry.value);
            }
        }
    }

    fn shard_for(&self, key: &StructuralKey) -> usize {
        if self.miss_locks.len() == 1 {
            return 0;
        }
        let mut hasher = DefaultHasher::new();
        key.hash(&mut hasher);
        (hasher.finish() % self.miss_locks.len() as u64) as usize
    }
}

impl Default for LocalBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CacheBackend for LocalBackend {
    type Key = StructuralKey;

    fn kind(&self) -> BackendKind {
        BackendKind::Local
    }

    fn capabilities(&self) -> BackendCapabilities {
        BackendCapabilities {
            scope_invalidation: true,
            serialized_misses: true,
            expires_entries: false,
        }
    }

    fn derive_key(&self, target: &ExecutionTarget, query: &Query) -> StructuralKey {
        StructuralKey::new(target, query)
    }

    async fn get(&self, key: &StructuralKey, kind: ResultKind) -> Result<Option<CachedValue>> {
        let stored = {
            let mut entries = self.entries.write().await;
            match entries.get_mut(key) {
                Some(entry) => {
                    entry.mark_accessed();
                    entry.value.clone()
                }
                None => return Ok(None),
            }
        };

        self.materializer.decode(kind, stored).map(Some)
    }

    async fn put(
        &self,
        key: &StructuralKey,
        _target: &ExecutionTarget,
        value: &CachedValue,
    ) -> Result<()> {
        let stored = self.materializer.encode(value)?;
        let mut entries = self.entries.write().await;

        if entries.insert(key.clone(), LocalEntry::new(stored)).is_some() {
            debug!("Replaced local cache entry for {}", key.target);
        }
        Ok(())
    }

    async fn invalidate_scope(&self, scope: &ExecutionTarget) -> Result<InvalidationEvent> {
        let guards = self.lock_all_misses().await;
        let removed = {
            let mut entries = self.entries.write().await;
            let doomed: Vec<StructuralKey> = entries
                .keys()
                .filter(|key| key.in_scope(scope))
                .cloned()
                .collect();

            doomed
                .into_iter()
                .filter_map(|key| entries.remove_entry(&key))
                .collect::<Vec<_>>()
        };
        drop(guards);

        let count = removed.len();
        self.run_drop_handler(removed);

        info!("Invalidated {} local cache entries for {}", count, scope);
        Ok(InvalidationEvent::scope(scope.identity(), count))
    }

    async fn lock_misses(&self, key: &StructuralKey) -> Option<OwnedMutexGuard<()>> {
        let lock = self.miss_locks[self.shard_for(key)].clone();
        Some(lock.lock_owned().await)
    }

    async fn entry_count(&self) -> Option<usize> {
        Some(self.len().await)
    }
}
