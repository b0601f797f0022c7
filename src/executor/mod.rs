//! Query execution: the upstream contract and its caching decorator
//!
//! [`QueryExecutor`] is what any engine (local dataset, remote endpoint)
//! offers. [`CachedExecutor`] wraps one and implements the same trait, so
//! it can stand in anywhere the plain engine is used.

pub mod cached;
pub mod service;

pub use cached::CachedExecutor;
pub use service::ServiceExecutor;

use crate::cache::materialize::merge_into;
use crate::error::Result;
use crate::query::{ExecutionTarget, Graph, Query, SolutionStream};
use async_trait::async_trait;
use std::sync::Arc;

/// Executes parsed queries against an execution target
///
/// Failures are reported as
/// [`CacheError::Execution`](crate::error::CacheError::Execution).
#[async_trait]
pub trait QueryExecutor: Send + Sync {
    /// Run a SELECT query; the stream can be consumed once
    async fn select(&self, target: &ExecutionTarget, query: &Query) -> Result<SolutionStream>;

    /// Run a CONSTRUCT query into a fresh graph
    async fn construct(&self, target: &ExecutionTarget, query: &Query) -> Result<Graph>;

    /// Run a CONSTRUCT query, adding the result to `graph`
    async fn construct_into(
        &self,
        target: &ExecutionTarget,
        query: &Query,
        graph: &mut Graph,
    ) -> Result<()> {
        let constructed = self.construct(target, query).await?;
        merge_into(graph, &constructed);
        Ok(())
    }

    /// Run a DESCRIBE query into a fresh graph
    async fn describe(&self, target: &ExecutionTarget, query: &Query) -> Result<Graph>;

    /// Run a DESCRIBE query, adding the result to `graph`
    async fn describe_into(
        &self,
        target: &ExecutionTarget,
        query: &Query,
        graph: &mut Graph,
    ) -> Result<()> {
        let described = self.describe(target, query).await?;
        merge_into(graph, &described);
        Ok(())
    }

    /// Run an ASK query
    async fn ask(&self, target: &ExecutionTarget, query: &Query) -> Result<bool>;
}

#[async_trait]
impl<E: QueryExecutor + ?Sized> QueryExecutor for Arc<E> {
    async fn select(&self, target: &ExecutionTarget, query: &Query) -> Result<SolutionStream> {
        (**self).select(target, query).await
    }

    async fn construct(&self, target: &ExecutionTarget, query: &Query) -> Result<Graph> {
        (**self).construct(target, query).await
    }

    async fn construct_into(
        &self,
        target: &ExecutionTarget,
        query: &Query,
        graph: &mut Graph,
    ) -> Result<()> {
        (**self).construct_into(target, query, graph).await
    }

    async fn describe(&self, target: &ExecutionTarget, query: &Query) -> Result<Graph> {
        (**self).describe(target, query).await
    }

    async fn describe_into(
        &self,
        target: &ExecutionTarget,
        query: &Query,
        graph: &mut Graph,
    ) -> Result<()> {
        (**self).describe_into(target, query, graph).await
    }

    async fn ask(&self, target: &ExecutionTarget, query: &Query) -> Result<bool> {
        (**self).ask(target, query).await
    }
}
