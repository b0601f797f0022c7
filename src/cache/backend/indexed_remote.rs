//! Remote backend with a per-target key index

use crate::cache::backend::CacheBackend;
use crate::cache::config::CacheConfig;
use crate::cache::invalidation::InvalidationEvent;
use crate::cache::key::{HashedKey, KeyDeriver};
use crate::cache::materialize::{Materializer, TextMaterializer};
use crate::cache::types::{BackendCapabilities, BackendKind};
use crate::error::Result;
use crate::query::{CachedValue, ExecutionTarget, Query, ResultKind};
use crate::store::RemoteStore;
use async_trait::async_trait;
use tracing::{debug, info};

/// Entries live in a [`RemoteStore`] without expiry; every stored key is
/// also added to an index set named after its target
///
/// A put is two round trips (value, then index) and is not atomic: a crash
/// in between leaves an entry that scope invalidation will not find.
/// Invalidation removes only the index members it read, so a key indexed
/// concurrently stays reachable for the next invalidation.
pub struct IndexedRemoteBackend<S> {
    store: S,
    keys: KeyDeriver,
    materializer: TextMaterializer,
}

impl<S: RemoteStore> IndexedRemoteBackend<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            keys: KeyDeriver::default(),
            materializer: TextMaterializer,
        }
    }

    pub fn from_config(store: S, config: &CacheConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::new(store).with_key_prefix(config.key_prefix.clone()))
    }

    pub fn with_key_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.keys = KeyDeriver::new(prefix);
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn key_deriver(&self) -> &KeyDeriver {
        &self.keys
    }

    /// Keys currently indexed under `target`
    pub async fn indexed_keys(&self, target: &ExecutionTarget) -> Result<Vec<String>> {
        self.store.set_members(self.keys.scope(target).as_str()).await
    }
}

#[async_trait]
impl<S: RemoteStore> CacheBackend for IndexedRemoteBackend<S> {
    type Key = HashedKey;

    fn kind(&self) -> BackendKind {
        BackendKind::IndexedRemote
    }

    fn capabilities(&self) -> BackendCapabilities {
        BackendCapabilities {
            scope_invalidation: true,
            serialized_misses: false,
            expires_entries: false,
        }
    }

    fn derive_key(&self, target: &ExecutionTarget, query: &Query) -> HashedKey {
        self.keys.hashed(target, query)
    }

    async fn get(&self, key: &HashedKey, kind: ResultKind) -> Result<Option<CachedValue>> {
        match self.store.get(key.as_str()).await? {
            Some(text) => self.materializer.decode(kind, text).map(Some),
            None => Ok(None),
        }
    }

    async fn put(
        &self,
        key: &HashedKey,
        target: &ExecutionTarget,
        value: &CachedValue,
    ) -> Result<()> {
        let text = self.materializer.encode(value)?;
        self.store.set(key.as_str(), &text, None).await?;

        let scope = self.keys.scope(target);
        self.store.add_to_set(scope.as_str(), key.as_str()).await?;

        debug!("Stored {} ({} bytes) under {}", key, text.len(), scope);
        Ok(())
    }

    async fn invalidate_scope(&self, scope: &ExecutionTarget) -> Result<InvalidationEvent> {
        let index = self.keys.scope(scope);
        let members = self.store.set_members(index.as_str()).await?;

        let removed = self.store.delete(&members).await?;
        self.store.remove_from_set(index.as_str(), &members).await?;

        info!(
            "Invalidated {} remote cache entries for {} ({} indexed)",
            removed,
            scope,
            members.len()
        );
        Ok(InvalidationEvent::scope(scope.identity(), removed as usize).with_keys(members))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use std::sync::Arc;
    use std::time::Duration;

    /// Indexes one extra key the moment values are deleted, like a put
    /// landing between the index read and its cleanup
    struct InterleavingStore {
        inner: MemoryStore,
        index: String,
        late_key: String,
    }

    #[async_trait]
    impl RemoteStore for InterleavingStore {
        async fn get(&self, key: &str) -> Result<Option<String>> {
            self.inner.get(key).await
        }

        async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<()> {
            self.inner.set(key, value, ttl).await
        }

        async fn delete(&self, keys: &[String]) -> Result<u64> {
            let removed = self.inner.delete(keys).await?;
            self.inner.set(&self.late_key, "true", None).await?;
            self.inner.add_to_set(&self.index, &self.late_key).await?;
            Ok(removed)
        }

        async fn add_to_set(&self, set: &str, member: &str) -> Result<()> {
            self.inner.add_to_set(set, member).await
        }

        async fn remove_from_set(&self, set: &str, members: &[String]) -> Result<u64> {
            self.inner.remove_from_set(set, members).await
        }

        async fn set_members(&self, set: &str) -> Result<Vec<String>> {
            self.inner.set_members(set).await
        }

        async fn health_check(&self) -> Result<bool> {
            self.inner.health_check().await
        }

        fn provider_name(&self) -> &'static str {
            "interleaving"
        }
    }

    fn query(text: &str) -> Query {
        Query::parse(text).unwrap()
    }

    #[tokio::test]
    async fn test_put_indexes_key_under_target() {
        let store = Arc::new(MemoryStore::new());
        let backend = IndexedRemoteBackend::new(store.clone());
        let target = ExecutionTarget::service("http://example.org/sparql");
        let key = backend.derive_key(&target, &query("ASK { ?s ?p ?o }"));

        backend
            .put(&key, &target, &CachedValue::Boolean(false))
            .await
            .unwrap();

        assert_eq!(
            backend.indexed_keys(&target).await.unwrap(),
            vec![key.as_str().to_string()]
        );
        let value = backend.get(&key, ResultKind::Boolean).await.unwrap().unwrap();
        assert!(!value.into_boolean().unwrap());
    }

    #[tokio::test]
    async fn test_invalidate_deletes_members_and_index() {
        let store = Arc::new(MemoryStore::new());
        let backend = IndexedRemoteBackend::new(store.clone());
        let a = ExecutionTarget::service("http://example.org/a");
        let b = ExecutionTarget::service("http://example.org/b");

        for text in ["ASK { ?s ?p 1 }", "ASK { ?s ?p 2 }"] {
            let key = backend.derive_key(&a, &query(text));
            backend
                .put(&key, &a, &CachedValue::Boolean(true))
                .await
                .unwrap();
        }
        let kept = backend.derive_key(&b, &query("ASK { ?s ?p 1 }"));
        backend
            .put(&kept, &b, &CachedValue::Boolean(true))
            .await
            .unwrap();

        let event = backend.invalidate_scope(&a).await.unwrap();
        assert_eq!(event.removed, 2);
        assert_eq!(event.keys.len(), 2);
        assert!(backend.indexed_keys(&a).await.unwrap().is_empty());
        assert!(!store
            .contains_key(backend.key_deriver().scope(&a).as_str())
            .await);
        assert!(store.contains_key(kept.as_str()).await);

        // empty or repeated invalidation succeeds with nothing removed
        let again = backend.invalidate_scope(&a).await.unwrap();
        assert!(again.is_empty());
    }

    #[tokio::test]
    async fn test_key_indexed_during_invalidation_stays_indexed() {
        let keys = KeyDeriver::default();
        let target = ExecutionTarget::service("http://example.org/sparql");
        let early = keys.hashed(&target, &query("ASK { ?s ?p 1 }"));
        let late = keys.hashed(&target, &query("ASK { ?s ?p 2 }"));

        let backend = IndexedRemoteBackend::new(InterleavingStore {
            inner: MemoryStore::new(),
            index: keys.scope(&target).as_str().to_string(),
            late_key: late.as_str().to_string(),
        });
        backend
            .put(&early, &target, &CachedValue::Boolean(true))
            .await
            .unwrap();

        let event = backend.invalidate_scope(&target).await.unwrap();
        assert_eq!(event.keys, vec![early.as_str().to_string()]);
        assert_eq!(
            backend.indexed_keys(&target).await.unwrap(),
            vec![late.as_str().to_string()]
        );
    }

    #[tokio::test]
    async fn test_garbage_entry_is_a_decode_failure() {
        let store = Arc::new(MemoryStore::new());
        let backend = IndexedRemoteBackend::new(store.clone());
        let target = ExecutionTarget::service("http://example.org/sparql");
        let key = backend.derive_key(&target, &query("SELECT * { ?s ?p ?o }"));

        store.set(key.as_str(), "not xml", None).await.unwrap();

        let err = backend.get(&key, ResultKind::Solutions).await.unwrap_err();
        assert!(err.is_decode_failure());
    }
}
