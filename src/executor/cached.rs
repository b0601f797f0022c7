//! Caching decorator around a [`QueryExecutor`]

use crate::cache::backend::CacheBackend;
use crate::cache::config::{CacheConfig, FailurePolicy};
use crate::cache::invalidation::InvalidationEvent;
use crate::cache::materialize::merge_into;
use crate::cache::types::{CacheStats, StatsCounters};
use crate::error::{CacheError, Result};
use crate::executor::QueryExecutor;
use crate::query::{
    CachedValue, ExecutionTarget, Graph, Operation, Query, ResultKind, SolutionStream, Solutions,
};
use async_trait::async_trait;
use tracing::{debug, warn};

/// A query executor that consults a cache backend before running a query
///
/// Every operation follows the same protocol:
/// 1. derive the key for (target, query)
/// 2. on a hit, return a fresh copy of the stored result
/// 3. on a miss, run the query upstream, store the result, return it
///
/// Upstream failures propagate and nothing is stored. Cache failures (an
/// unreachable store, an unreadable entry) follow the [`FailurePolicy`].
///
/// # Example
/// ```no_run
/// use sparql_cache::cache::LocalBackend;
/// use sparql_cache::executor::{CachedExecutor, QueryExecutor, ServiceExecutor};
/// use sparql_cache::query::{ExecutionTarget, Query};
///
/// #[tokio::main]
/// async fn main() -> anyhow::Result<()> {
///     let executor = CachedExecutor::new(LocalBackend::new(), ServiceExecutor::new());
///     let target = ExecutionTarget::service("https://query.wikidata.org/sparql");
///     let query = Query::parse("SELECT ?s WHERE { ?s ?p ?o } LIMIT 10")?;
///
///     let first = executor.select_rewindable(&target, &query).await?;
///     let again = executor.select_rewindable(&target, &query).await?; // served from cache
///     assert_eq!(first.len(), again.len());
///
///     executor.invalidate(&target).await?;
///     Ok(())
/// }
/// ```
pub struct CachedExecutor<B, E> {
    backend: B,
    inner: E,
    policy: FailurePolicy,
    stats: Option<StatsCounters>,
}

impl<B: CacheBackend, E: QueryExecutor> CachedExecutor<B, E> {
    /// Wrap `inner` with the default failure policy (propagate)
    pub fn new(backend: B, inner: E) -> Self {
        Self {
            backend,
            inner,
            policy: FailurePolicy::default(),
            stats: Some(StatsCounters::default()),
        }
    }

    /// Take the failure policy and metrics switch from a configuration
    pub fn from_config(backend: B, inner: E, config: &CacheConfig) -> Self {
        Self::new(backend, inner)
            .with_failure_policy(config.failure_policy)
            .with_metrics(config.enable_metrics)
    }

    pub fn with_failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_metrics(mut self, enabled: bool) -> Self {
        self.stats = enabled.then(StatsCounters::default);
        self
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// The wrapped executor
    pub fn inner(&self) -> &E {
        &self.inner
    }

    pub fn failure_policy(&self) -> FailurePolicy {
        self.policy
    }

    /// Snapshot of the counters (all zero when metrics are disabled)
    pub async fn stats(&self) -> CacheStats {
        match &self.stats {
            Some(counters) => counters.snapshot(self.backend.entry_count().await),
            None => CacheStats::default(),
        }
    }

    /// Drop every cached result created under `scope`
    ///
    /// Idempotent where supported. The TTL remote backend rejects this with
    /// [`CacheError::InvalidationUnsupported`] regardless of the failure
    /// policy.
    pub async fn invalidate(&self, scope: &ExecutionTarget) -> Result<InvalidationEvent> {
        let event = self.backend.invalidate_scope(scope).await?;
        self.count(|c| c.invalidated(event.removed));
        Ok(event)
    }

    /// Run a SELECT query and return a result that can be iterated repeatedly
    pub async fn select_rewindable(
        &self,
        target: &ExecutionTarget,
        query: &Query,
    ) -> Result<Solutions> {
        self.fetch(Operation::Select, target, query)
            .await?
            .into_solutions()
    }

    fn count(&self, record: impl FnOnce(&StatsCounters)) {
        if let Some(counters) = &self.stats {
            record(counters);
        }
    }

    async fn fetch(
        &self,
        operation: Operation,
        target: &ExecutionTarget,
        query: &Query,
    ) -> Result<CachedValue> {
        if !operation.accepts(query.form()) {
            return Err(CacheError::FormMismatch {
                operation,
                form: query.form(),
            });
        }

        let kind = operation.result_kind();
        let key = self.backend.derive_key(target, query);

        if let Some(value) = self.lookup(operation, target, &key, kind).await? {
            return Ok(value);
        }

        // Held until the result is stored; a waiter finds it on re-check
        let guard = self.backend.lock_misses(&key).await;
        if guard.is_some() {
            if let Some(value) = self.lookup(operation, target, &key, kind).await? {
                return Ok(value);
            }
        }

        self.count(StatsCounters::miss);
        debug!("Cache miss: {} on {}", operation, target);

        let value = self.execute_upstream(operation, target, query).await?;
        self.store(operation, &key, target, &value).await?;
        Ok(value)
    }

    async fn lookup(
        &self,
        operation: Operation,
        target: &ExecutionTarget,
        key: &B::Key,
        kind: ResultKind,
    ) -> Result<Option<CachedValue>> {
        match self.backend.get(key, kind).await {
            Ok(Some(value)) => {
                self.count(StatsCounters::hit);
                debug!("Cache hit: {} on {}", operation, target);
                Ok(Some(value))
            }
            Ok(None) => Ok(None),
            Err(e) => self.degrade(operation, "read", e).map(|()| None),
        }
    }

    async fn store(
        &self,
        operation: Operation,
        key: &B::Key,
        target: &ExecutionTarget,
        value: &CachedValue,
    ) -> Result<()> {
        match self.backend.put(key, target, value).await {
            Ok(()) => {
                self.count(StatsCounters::store);
                debug!("Cached {} result for {}", operation, target);
                Ok(())
            }
            Err(e) => self.degrade(operation, "write", e),
        }
    }

    /// Apply the failure policy to a cache error
    fn degrade(&self, operation: Operation, stage: &str, error: CacheError) -> Result<()> {
        match self.policy {
            FailurePolicy::Fail => Err(error),
            FailurePolicy::Bypass => {
                warn!(
                    "Cache {} failed during {} ({} backend), executing directly: {}",
                    stage,
                    operation,
                    self.backend.kind(),
                    error
                );
                self.count(StatsCounters::bypass);
                Ok(())
            }
        }
    }

    async fn execute_upstream(
        &self,
        operation: Operation,
        target: &ExecutionTarget,
        query: &Query,
    ) -> Result<CachedValue> {
        let value = match operation {
            Operation::Select => {
                let stream = self.inner.select(target, query).await?;
                CachedValue::Solutions(Solutions::materialize(stream)?)
            }
            Operation::Construct | Operation::ConstructInto => {
                CachedValue::Graph(self.inner.construct(target, query).await?)
            }
            Operation::Describe | Operation::DescribeInto => {
                CachedValue::Graph(self.inner.describe(target, query).await?)
            }
            Operation::Ask => CachedValue::Boolean(self.inner.ask(target, query).await?),
        };
        Ok(value)
    }
}

#[async_trait]
impl<B: CacheBackend, E: QueryExecutor> QueryExecutor for CachedExecutor<B, E> {
    async fn select(&self, target: &ExecutionTarget, query: &Query) -> Result<SolutionStream> {
        Ok(self.select_rewindable(target, query).await?.into())
    }

    async fn construct(&self, target: &ExecutionTarget, query: &Query) -> Result<Graph> {
        self.fetch(Operation::Construct, target, query)
            .await?
            .into_graph()
    }

    async fn construct_into(
        &self,
        target: &ExecutionTarget,
        query: &Query,
        graph: &mut Graph,
    ) -> Result<()> {
        let constructed = self
            .fetch(Operation::ConstructInto, target, query)
            .await?
            .into_graph()?;
        merge_into(graph, &constructed);
        Ok(())
    }

    async fn describe(&self, target: &ExecutionTarget, query: &Query) -> Result<Graph> {
        self.fetch(Operation::Describe, target, query)
            .await?
            .into_graph()
    }

    async fn describe_into(
        &self,
        target: &ExecutionTarget,
        query: &Query,
        graph: &mut Graph,
    ) -> Result<()> {
        let described = self
            .fetch(Operation::DescribeInto, target, query)
            .await?
            .into_graph()?;
        merge_into(graph, &described);
        Ok(())
    }

    async fn ask(&self, target: &ExecutionTarget, query: &Query) -> Result<bool> {
        self.fetch(Operation::Ask, target, query)
            .await?
            .into_boolean()
    }
}
