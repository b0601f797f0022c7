//! Remote backends driven through the caching executor
//!
//! Uses the in-process `MemoryStore`, so no server is needed. Covers the
//! text round trip of every result kind, the TTL backend's refusal to
//! invalidate, and the failure policy for unreachable stores and unreadable
//! entries.

mod common;

use common::{query, StubExecutor, ENDPOINT};
use sparql_cache::cache::KeyDeriver;
use sparql_cache::{
    CacheBackend, CacheConfig, CacheError, CachedExecutor, ExecutionTarget, FailurePolicy, Graph,
    IndexedRemoteBackend, MemoryStore, QueryExecutor, RemoteStore, TtlRemoteBackend,
};
use std::sync::Arc;
use std::time::Duration;

const SELECT: &str = "SELECT ?s ?source WHERE { ?s ?p ?source }";
const CONSTRUCT: &str = "CONSTRUCT { ?s ?p ?o } WHERE { ?s ?p ?o }";
const ASK: &str = "ASK { ?s ?p ?o }";

fn indexed(
    store: &Arc<MemoryStore>,
) -> CachedExecutor<IndexedRemoteBackend<Arc<MemoryStore>>, StubExecutor> {
    CachedExecutor::new(IndexedRemoteBackend::new(store.clone()), StubExecutor::new())
}

#[tokio::test]
async fn test_indexed_round_trip_for_every_kind() {
    let store = Arc::new(MemoryStore::new());
    let executor = indexed(&store);
    let target = ExecutionTarget::service(ENDPOINT);

    let rows = executor.select_rewindable(&target, &query(SELECT)).await.unwrap();
    let graph = executor.construct(&target, &query(CONSTRUCT)).await.unwrap();
    let answer = executor.ask(&target, &query(ASK)).await.unwrap();
    assert_eq!(executor.inner().calls(), 3);

    let cached_rows = executor.select_rewindable(&target, &query(SELECT)).await.unwrap();
    let cached_graph = executor.construct(&target, &query(CONSTRUCT)).await.unwrap();
    let cached_answer = executor.ask(&target, &query(ASK)).await.unwrap();
    assert_eq!(executor.inner().calls(), 3);

    assert!(cached_rows.same_content(&rows));
    assert_eq!(cached_rows.variables(), rows.variables());
    assert_eq!(cached_graph, graph);
    assert_eq!(cached_answer, answer);

    // three values plus one index set
    assert_eq!(store.len().await, 4);
}

#[tokio::test]
async fn test_indexed_construct_into_merges_cached_graph() {
    let store = Arc::new(MemoryStore::new());
    let executor = indexed(&store);
    let target = ExecutionTarget::service(ENDPOINT);
    let q = query(CONSTRUCT);

    let mut first = Graph::new();
    executor.construct_into(&target, &q, &mut first).await.unwrap();
    let mut second = Graph::new();
    executor.construct_into(&target, &q, &mut second).await.unwrap();

    assert_eq!(first, second);
    assert_eq!(executor.inner().calls(), 1);
}

#[tokio::test]
async fn test_indexed_invalidation_is_exact() {
    let store = Arc::new(MemoryStore::new());
    let executor = indexed(&store);
    let a = ExecutionTarget::service("http://example.org/a");
    let b = ExecutionTarget::service("http://example.org/b");

    for target in [&a, &b] {
        executor.ask(target, &query(ASK)).await.unwrap();
        executor.construct(target, &query(CONSTRUCT)).await.unwrap();
    }
    assert_eq!(executor.inner().calls(), 4);

    let event = executor.invalidate(&a).await.unwrap();
    assert_eq!(event.removed, 2);
    assert_eq!(event.keys.len(), 2);

    executor.ask(&b, &query(ASK)).await.unwrap();
    assert_eq!(executor.inner().calls(), 4);
    executor.ask(&a, &query(ASK)).await.unwrap();
    assert_eq!(executor.inner().calls(), 5);

    let repeat = executor.invalidate(&b).await.unwrap();
    assert_eq!(repeat.removed, 2);
    assert!(executor.invalidate(&b).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_ttl_backend_rejects_invalidation() {
    let backend = TtlRemoteBackend::new(MemoryStore::new());
    let executor = CachedExecutor::new(backend, StubExecutor::new())
        .with_failure_policy(FailurePolicy::Bypass);
    let target = ExecutionTarget::service(ENDPOINT);

    executor.ask(&target, &query(ASK)).await.unwrap();

    let err = executor.invalidate(&target).await.unwrap_err();
    assert!(matches!(err, CacheError::InvalidationUnsupported { .. }));

    // the entry is still served
    executor.ask(&target, &query(ASK)).await.unwrap();
    assert_eq!(executor.inner().calls(), 1);
}

#[tokio::test]
async fn test_ttl_entries_expire() {
    let backend = TtlRemoteBackend::new(MemoryStore::new()).with_ttl(Duration::from_millis(50));
    let executor = CachedExecutor::new(backend, StubExecutor::new());
    let target = ExecutionTarget::service(ENDPOINT);
    let q = query(CONSTRUCT);

    executor.construct(&target, &q).await.unwrap();
    executor.construct(&target, &q).await.unwrap();
    assert_eq!(executor.inner().calls(), 1);

    tokio::time::sleep(Duration::from_millis(80)).await;
    executor.construct(&target, &q).await.unwrap();
    assert_eq!(executor.inner().calls(), 2);
}

#[tokio::test]
async fn test_unreadable_entry_is_not_a_miss() {
    let store = Arc::new(MemoryStore::new());
    let executor = indexed(&store);
    let target = ExecutionTarget::service(ENDPOINT);
    let q = query(SELECT);

    let key = KeyDeriver::default().hashed(&target, &q);
    store.set(key.as_str(), "<<garbage>>", None).await.unwrap();

    let err = executor.select_rewindable(&target, &q).await.unwrap_err();
    assert!(err.is_decode_failure());
    assert!(!err.is_backend_failure());
    assert_eq!(executor.inner().calls(), 0);
}

#[tokio::test]
async fn test_unreadable_entry_is_replaced_when_bypassing() {
    let store = Arc::new(MemoryStore::new());
    let executor = indexed(&store).with_failure_policy(FailurePolicy::Bypass);
    let target = ExecutionTarget::service(ENDPOINT);
    let q = query(ASK);

    let key = executor.backend().derive_key(&target, &q);
    store.set(key.as_str(), "maybe", None).await.unwrap();

    assert!(executor.ask(&target, &q).await.unwrap());
    assert!(executor.ask(&target, &q).await.unwrap());
    assert_eq!(executor.inner().calls(), 1);
    assert_eq!(store.get(key.as_str()).await.unwrap().as_deref(), Some("true"));

    let stats = executor.stats().await;
    assert_eq!(stats.bypasses, 1);
    assert_eq!(stats.hits, 1);
}

#[tokio::test]
async fn test_unreachable_store_fails_by_default() {
    let store = Arc::new(MemoryStore::new());
    let executor = indexed(&store);
    let target = ExecutionTarget::service(ENDPOINT);
    store.set_offline(true);

    for err in [
        executor.ask(&target, &query(ASK)).await.unwrap_err(),
        executor.construct(&target, &query(CONSTRUCT)).await.unwrap_err(),
        executor
            .select_rewindable(&target, &query(SELECT))
            .await
            .unwrap_err(),
    ] {
        assert!(err.is_backend_failure());
    }
    assert!(executor.invalidate(&target).await.unwrap_err().is_backend_failure());
    assert_eq!(executor.inner().calls(), 0);
}

#[tokio::test]
async fn test_unreachable_store_is_bypassed_in_degraded_mode() {
    let store = Arc::new(MemoryStore::new());
    let config = CacheConfig::builder()
        .failure_policy(FailurePolicy::Bypass)
        .build();
    let executor = CachedExecutor::from_config(
        IndexedRemoteBackend::new(store.clone()),
        StubExecutor::new(),
        &config,
    );
    let target = ExecutionTarget::service(ENDPOINT);
    store.set_offline(true);

    let rows = executor.select_rewindable(&target, &query(SELECT)).await.unwrap();
    assert_eq!(rows.len(), 10);
    let mut graph = Graph::new();
    executor
        .construct_into(&target, &query(CONSTRUCT), &mut graph)
        .await
        .unwrap();
    assert_eq!(graph.len(), 2);
    assert!(executor.ask(&target, &query(ASK)).await.unwrap());

    // each call failed its read and its write
    let stats = executor.stats().await;
    assert_eq!(stats.bypasses, 6);
    assert_eq!(stats.stores, 0);
    assert_eq!(executor.inner().calls(), 3);

    store.set_offline(false);
    executor.ask(&target, &query(ASK)).await.unwrap();
    executor.ask(&target, &query(ASK)).await.unwrap();
    assert_eq!(executor.inner().calls(), 4);
}

#[tokio::test]
async fn test_upstream_failure_stores_nothing_remotely() {
    let store = Arc::new(MemoryStore::new());
    let executor = indexed(&store);
    let target = ExecutionTarget::service(ENDPOINT);

    executor.inner().set_failing(true);
    let err = executor.ask(&target, &query(ASK)).await.unwrap_err();
    assert!(matches!(err, CacheError::Execution(_)));
    assert!(store.is_empty().await);
}
