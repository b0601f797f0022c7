//! Remote backend with a uniform TTL and no invalidation

use crate::cache::backend::CacheBackend;
use crate::cache::config::{CacheConfig, DEFAULT_TTL};
use crate::cache::invalidation::InvalidationEvent;
use crate::cache::key::{HashedKey, KeyDeriver};
use crate::cache::materialize::{Materializer, TextMaterializer};
use crate::cache::types::{BackendCapabilities, BackendKind};
use crate::error::{CacheError, Result};
use crate::query::{CachedValue, ExecutionTarget, Query, ResultKind};
use crate::store::RemoteStore;
use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, warn};

/// Entries live in a [`RemoteStore`] and expire after a fixed TTL
///
/// Keys are hashed, so the target of an entry cannot be recovered and
/// [`invalidate_scope`](CacheBackend::invalidate_scope) is rejected with
/// [`CacheError::InvalidationUnsupported`]. Stale results can be served for
/// up to one TTL after the underlying data changes.
pub struct TtlRemoteBackend<S> {
    store: S,
    keys: KeyDeriver,
    ttl: Duration,
    materializer: TextMaterializer,
}

impl<S: RemoteStore> TtlRemoteBackend<S> {
    /// Backend with the default one-day TTL
    pub fn new(store: S) -> Self {
        Self {
            store,
            keys: KeyDeriver::default(),
            ttl: DEFAULT_TTL,
            materializer: TextMaterializer,
        }
    }

    pub fn from_config(store: S, config: &CacheConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::new(store)
            .with_ttl(config.ttl)
            .with_key_prefix(config.key_prefix.clone()))
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn with_key_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.keys = KeyDeriver::new(prefix);
        self
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn store(&self) -> &S {
        &self.store
    }
}

#[async_trait]
impl<S: RemoteStore> CacheBackend for TtlRemoteBackend<S> {
    type Key = HashedKey;

    fn kind(&self) -> BackendKind {
        BackendKind::TtlRemote
    }

    fn capabilities(&self) -> BackendCapabilities {
        BackendCapabilities {
            scope_invalidation: false,
            serialized_misses: false,
            expires_entries: true,
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
        _target: &ExecutionTarget,
        value: &CachedValue,
    ) -> Result<()> {
        let text = self.materializer.encode(value)?;
        self.store.set(key.as_str(), &text, Some(self.ttl)).await?;
        debug!("Stored {} ({} bytes, ttl {:?})", key, text.len(), self.ttl);
        Ok(())
    }

    async fn invalidate_scope(&self, scope: &ExecutionTarget) -> Result<InvalidationEvent> {
        warn!(
            "Rejected invalidation of {}: entries expire by TTL only",
            scope
        );
        Err(CacheError::InvalidationUnsupported {
            backend: BackendKind::TtlRemote.as_str(),
        })
    }
}
