//! Storage backends for cached query results
//!
//! | Backend | Key | Stored form | Invalidation | Expiry | Miss lock |
//! |---|---|---|---|---|---|
//! | [`LocalBackend`] | structural | live values | key scan | never | yes |
//! | [`TtlRemoteBackend`] | hashed | text | unsupported | uniform TTL | no |
//! | [`IndexedRemoteBackend`] | hashed | text | scope index set | never | no |

mod indexed_remote;
mod local;
mod ttl_remote;

pub use indexed_remote::IndexedRemoteBackend;
pub use local::{DropHandler, LocalBackend};
pub use ttl_remote::TtlRemoteBackend;

use crate::cache::invalidation::InvalidationEvent;
use crate::cache::types::{BackendCapabilities, BackendKind};
use crate::error::Result;
use crate::query::{CachedValue, ExecutionTarget, Query, ResultKind};
use async_trait::async_trait;
use std::fmt::Debug;
use tokio::sync::OwnedMutexGuard;

/// A place to keep materialized results keyed by (target, query)
///
/// Backend failures surface as errors and absent entries as `Ok(None)`; the
/// two are never conflated. Stored values that cannot be decoded surface as
/// [`CacheError::Decode`](crate::error::CacheError::Decode).
#[async_trait]
pub trait CacheBackend: Send + Sync {
    type Key: Clone + Debug + Send + Sync + 'static;

    fn kind(&self) -> BackendKind;

    fn capabilities(&self) -> BackendCapabilities;

    /// Deterministic key for a (target, query) pair
    fn derive_key(&self, target: &ExecutionTarget, query: &Query) -> Self::Key;

    /// Fetch and decode an entry as a fresh, independently consumable value
    async fn get(&self, key: &Self::Key, kind: ResultKind) -> Result<Option<CachedValue>>;

    /// Store a value created under `target`, replacing any previous one
    async fn put(&self, key: &Self::Key, target: &ExecutionTarget, value: &CachedValue)
        -> Result<()>;

    /// Drop every entry created under `scope`
    async fn invalidate_scope(&self, scope: &ExecutionTarget) -> Result<InvalidationEvent>;

    /// Serialize misses on `key`; `None` when the backend does not
    async fn lock_misses(&self, _key: &Self::Key) -> Option<OwnedMutexGuard<()>> {
        None
    }

    /// Number of entries held, when cheaply known
    async fn entry_count(&self) -> Option<usize> {
        None
    }
}
