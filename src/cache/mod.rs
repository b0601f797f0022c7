//! # Query Result Caching
//!
//! Everything between a caller and the upstream query engine: keys,
//! storage backends, result materialization and invalidation.
//!
//! ## Backends
//!
//! - **Local**: unbounded in-process map of live results. Exact keys,
//!   scan-based scope invalidation, misses serialized so a burst of callers
//!   for one query runs it once.
//! - **TTL remote**: hashed keys in a remote store with a uniform TTL
//!   (one day by default). No invalidation; data may be stale for up to one
//!   TTL.
//! - **Indexed remote**: hashed keys in a remote store plus a per-target
//!   index set, so a target's entries can be dropped exactly.
//!
//! ## Example
//!
//! ```rust
//! use sparql_cache::cache::{CacheBackend, CacheConfig, LocalBackend};
//! use sparql_cache::query::{CachedValue, ExecutionTarget, Query, ResultKind};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let backend = LocalBackend::from_config(&CacheConfig::local())?;
//! let target = ExecutionTarget::service("http://example.org/sparql");
//! let query = Query::parse("ASK { ?s ?p ?o }")?;
//!
//! let key = backend.derive_key(&target, &query);
//! backend.put(&key, &target, &CachedValue::Boolean(true)).await?;
//!
//! if let Some(value) = backend.get(&key, ResultKind::Boolean).await? {
//!     println!("Cache hit: {}", value.into_boolean()?);
//! }
//!
//! backend.invalidate_scope(&target).await?;
//! # Ok(())
//! # }
//! ```

pub mod backend;
pub mod config;
pub mod entry;
pub mod invalidation;
pub mod key;
pub mod materialize;
pub mod types;

pub use backend::{CacheBackend, DropHandler, IndexedRemoteBackend, LocalBackend, TtlRemoteBackend};
pub use config::{CacheConfig, CacheConfigBuilder, FailurePolicy};
pub use entry::{EntryMetadata, LocalEntry};
pub use invalidation::{InvalidationEvent, InvalidationReason};
pub use key::{HashedKey, KeyDeriver, ScopeId, StructuralKey};
pub use materialize::{LiveMaterializer, Materializer, TextMaterializer};
pub use types::{BackendCapabilities, BackendKind, CacheStats};
