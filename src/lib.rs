//! # sparql-cache
//!
//! A result cache for SPARQL query execution. Wrap any [`QueryExecutor`]
//! in a [`CachedExecutor`] and repeated queries against the same execution
//! target are answered from the cache instead of the query engine.
//!
//! ## Features
//!
//! - Caching for all four query forms (SELECT, CONSTRUCT, DESCRIBE, ASK),
//!   including the graph-merging `*_into` variants
//! - Replayable SELECT results: a cached result can be iterated again and
//!   again
//! - Three storage backends: unbounded in-process, remote with TTL, remote
//!   with exact per-target invalidation
//! - Redis store over a multiplexed connection, checked with `PING` on connect
//! - Configurable reaction to cache failures: propagate or bypass
//!
//! ## Caching SELECT results in process
//!
//! ```no_run
//! use sparql_cache::{CachedExecutor, ExecutionTarget, LocalBackend, Query, ServiceExecutor};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let executor = CachedExecutor::new(LocalBackend::new(), ServiceExecutor::new());
//!     let endpoint = ExecutionTarget::service("https://dbpedia.org/sparql");
//!     let query = Query::parse("SELECT ?s WHERE { ?s a ?type } LIMIT 10")?;
//!
//!     let mut rows = executor.select_rewindable(&endpoint, &query).await?;
//!     for row in rows.by_ref() {
//!         println!("{:?}", row.get("s"));
//!     }
//!     rows.reset();
//!
//!     println!("{}", executor.stats().await);
//!     Ok(())
//! }
//! ```
//!
//! ## Sharing a cache through Redis
//!
//! ```no_run
//! use sparql_cache::{
//!     CacheConfig, CachedExecutor, ExecutionTarget, IndexedRemoteBackend, Query,
//!     QueryExecutor, RedisStore, ServiceExecutor,
//! };
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = CacheConfig::from_env()?;
//!     let store = RedisStore::connect(&config.redis_url).await?;
//!     let backend = IndexedRemoteBackend::from_config(store, &config)?;
//!     let executor = CachedExecutor::from_config(backend, ServiceExecutor::new(), &config);
//!
//!     let endpoint = ExecutionTarget::service("https://dbpedia.org/sparql");
//!     let query = Query::parse("ASK { ?s ?p ?o }")?;
//!     println!("non-empty: {}", executor.ask(&endpoint, &query).await?);
//!
//!     // the endpoint's data changed: forget everything cached for it
//!     let event = executor.invalidate(&endpoint).await?;
//!     println!("dropped {} entries", event.removed);
//!     Ok(())
//! }
//! ```

pub mod cache;
pub mod error;
pub mod executor;
pub mod query;
pub mod store;

// Re-export main types for convenience
pub use cache::{
    BackendKind, CacheBackend, CacheConfig, CacheConfigBuilder, CacheStats, FailurePolicy,
    IndexedRemoteBackend, InvalidationEvent, InvalidationReason, LocalBackend, TtlRemoteBackend,
};
pub use error::{CacheError, Result};
pub use executor::{CachedExecutor, QueryExecutor, ServiceExecutor};
pub use query::{
    DatasetHandle, ExecutionTarget, Graph, Query, QueryForm, ResultKind, SolutionStream, Solutions,
};
pub use store::{MemoryStore, RedisStore, RemoteStore};
