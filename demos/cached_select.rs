//! Cached SELECT Demo
//!
//! Runs the same SELECT twice against a public endpoint through the backend
//! chosen by the environment, then invalidates the endpoint's entries.
//!
//! Usage:
//!   cargo run --example cached_select
//!
//! Environment variables (a .env file works too):
//!   SPARQL_ENDPOINT        - endpoint URL (default: https://dbpedia.org/sparql)
//!   SPARQL_CACHE_BACKEND   - local | ttl-remote | indexed-remote (default: local)
//!   SPARQL_CACHE_REDIS_URL - Redis address for the remote backends

use sparql_cache::{
    BackendKind, CacheBackend, CacheConfig, CachedExecutor, ExecutionTarget, IndexedRemoteBackend,
    LocalBackend, Query, RedisStore, ServiceExecutor, TtlRemoteBackend,
};
use std::time::{Duration, Instant};
use tracing::{info, warn, Level};

const QUERY: &str = "
    PREFIX dbo: <http://dbpedia.org/ontology/>
    SELECT ?city ?population WHERE {
        ?city a dbo:City ;
              dbo:populationTotal ?population .
    }
    ORDER BY DESC(?population)
    LIMIT 10";

async fn run<B: CacheBackend>(
    executor: CachedExecutor<B, ServiceExecutor>,
    endpoint: ExecutionTarget,
) -> anyhow::Result<()> {
    let query = Query::parse(QUERY)?;

    for attempt in 1..=2 {
        let start = Instant::now();
        let mut rows = executor.select_rewindable(&endpoint, &query).await?;
        info!(
            "Attempt {}: {} rows in {}ms",
            attempt,
            rows.len(),
            start.elapsed().as_millis()
        );

        for row in rows.by_ref() {
            if let (Some(city), Some(population)) = (row.get("city"), row.get("population")) {
                info!("  {} {}", city, population);
            }
        }
        // a cached result can be read again
        rows.reset();
        info!("  replayed {} rows", rows.count());
    }

    let stats = executor.stats().await;
    info!("{}", stats);
    println!("{}", serde_json::to_string_pretty(&stats)?);

    match executor.invalidate(&endpoint).await {
        Ok(event) => {
            info!("Invalidated {} entries for {}", event.removed, endpoint);
            println!("{}", serde_json::to_string_pretty(&event)?);
        }
        Err(e) => warn!("Invalidation skipped: {}", e),
    }

    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt().with_max_level(Level::INFO).init();

    let config = CacheConfig::from_env()?;
    let endpoint = ExecutionTarget::service(
        std::env::var("SPARQL_ENDPOINT").unwrap_or_else(|_| "https://dbpedia.org/sparql".to_string()),
    );
    let upstream = ServiceExecutor::with_timeout(Duration::from_secs(30))?;

    info!("=== Cached SELECT Demo ({} backend) ===", config.backend);

    match config.backend {
        BackendKind::Local => {
            let backend = LocalBackend::from_config(&config)?;
            run(CachedExecutor::from_config(backend, upstream, &config), endpoint).await
        }
        BackendKind::TtlRemote => {
            let store = RedisStore::connect(&config.redis_url).await?;
            info!("Redis at {} answered PING", store.url());
            let backend = TtlRemoteBackend::from_config(store, &config)?;
            run(CachedExecutor::from_config(backend, upstream, &config), endpoint).await
        }
        BackendKind::IndexedRemote => {
            let store = RedisStore::connect(&config.redis_url).await?;
            info!("Redis at {} answered PING", store.url());
            let backend = IndexedRemoteBackend::from_config(store, &config)?;
            run(CachedExecutor::from_config(backend, upstream, &config), endpoint).await
        }
    }
}
