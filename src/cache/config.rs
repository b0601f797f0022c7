//! Configuration for the cache system

use crate::cache::key::DEFAULT_KEY_PREFIX;
use crate::cache::types::BackendKind;
use crate::error::{CacheError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Default TTL for the TTL remote backend: one day
pub const DEFAULT_TTL: Duration = Duration::from_secs(60 * 60 * 24);

/// Default remote store address
pub const DEFAULT_REDIS_URL: &str = "redis://127.0.0.1:6379";

/// What to do when the cache itself fails (unreachable store, unreadable entry)
///
/// Applied identically to every operation kind of one executor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailurePolicy {
    /// Propagate the failure to the caller
    #[default]
    Fail,

    /// Log it and execute the query directly (degraded mode)
    Bypass,
}

impl fmt::Display for FailurePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailurePolicy::Fail => write!(f, "fail"),
            FailurePolicy::Bypass => write!(f, "bypass"),
        }
    }
}

impl FromStr for FailurePolicy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fail" => Ok(FailurePolicy::Fail),
            "bypass" | "degraded" => Ok(FailurePolicy::Bypass),
            other => Err(format!("unknown failure policy: {}", other)),
        }
    }
}

/// Configuration for the query cache
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Which backend to build
    pub backend: BackendKind,

    /// Remote store address (remote backends only)
    pub redis_url: String,

    /// Uniform time-to-live (TTL remote backend only)
    pub ttl: Duration,

    /// Namespace for remote keys and scope indexes
    pub key_prefix: String,

    /// Reaction to backend and decode failures
    pub failure_policy: FailurePolicy,

    /// Number of miss-lock buckets for the local backend (1 = one coarse lock)
    pub lock_shards: usize,

    /// Enable metrics collection
    pub enable_metrics: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            backend: BackendKind::Local,
            redis_url: DEFAULT_REDIS_URL.to_string(),
            ttl: DEFAULT_TTL,
            key_prefix: DEFAULT_KEY_PREFIX.to_string(),
            failure_policy: FailurePolicy::Fail,
            lock_shards: 1,
            enable_metrics: true,
        }
    }
}

impl CacheConfig {
    /// Create a new builder for cache configuration
    pub fn builder() -> CacheConfigBuilder {
        CacheConfigBuilder::default()
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.lock_shards == 0 {
            return Err(CacheError::ConfigError(
                "lock_shards must be greater than 0".to_string(),
            ));
        }

        if self.key_prefix.is_empty() {
            return Err(CacheError::ConfigError(
                "key_prefix must not be empty".to_string(),
            ));
        }

        if self.backend == BackendKind::TtlRemote && self.ttl.as_secs() == 0 {
            return Err(CacheError::ConfigError(
                "ttl must be at least one second".to_string(),
            ));
        }

        if self.backend != BackendKind::Local && !self.redis_url.starts_with("redis") {
            return Err(CacheError::ConfigError(format!(
                "redis_url must use the redis:// or rediss:// scheme, got {}",
                self.redis_url
            )));
        }

        Ok(())
    }

    /// Load configuration from the environment (and a `.env` file if present)
    ///
    /// Recognized variables: `SPARQL_CACHE_BACKEND`, `SPARQL_CACHE_REDIS_URL`,
    /// `SPARQL_CACHE_TTL_SECS`, `SPARQL_CACHE_KEY_PREFIX`,
    /// `SPARQL_CACHE_FAILURE_POLICY`, `SPARQL_CACHE_LOCK_SHARDS`.
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub(crate) fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut builder = CacheConfig::builder();

        if let Some(backend) = lookup("SPARQL_CACHE_BACKEND") {
            builder = builder.backend(backend.parse().map_err(CacheError::ConfigError)?);
        }
        if let Some(url) = lookup("SPARQL_CACHE_REDIS_URL") {
            builder = builder.redis_url(url);
        }
        if let Some(secs) = lookup("SPARQL_CACHE_TTL_SECS") {
            let secs: u64 = secs.trim().parse().map_err(|_| {
                CacheError::ConfigError(format!("SPARQL_CACHE_TTL_SECS is not a number: {}", secs))
            })?;
            builder = builder.ttl(Duration::from_secs(secs));
        }
        if let Some(prefix) = lookup("SPARQL_CACHE_KEY_PREFIX") {
            builder = builder.key_prefix(prefix);
        }
        if let Some(policy) = lookup("SPARQL_CACHE_FAILURE_POLICY") {
            builder = builder.failure_policy(policy.parse().map_err(CacheError::ConfigError)?);
        }
        if let Some(shards) = lookup("SPARQL_CACHE_LOCK_SHARDS") {
            let shards: usize = shards.trim().parse().map_err(|_| {
                CacheError::ConfigError(format!(
                    "SPARQL_CACHE_LOCK_SHARDS is not a number: {}",
                    shards
                ))
            })?;
            builder = builder.lock_shards(shards);
        }

        let config = builder.build();
        config.validate()?;
        Ok(config)
    }
}

/// Builder for cache configuration with validation
#[derive(Debug, Default)]
pub struct CacheConfigBuilder {
    backend: Option<BackendKind>,
    redis_url: Option<String>,
    ttl: Option<Duration>,
    key_prefix: Option<String>,
    failure_policy: Option<FailurePolicy>,
    lock_shards: Option<usize>,
    enable_metrics: Option<bool>,
}

impl CacheConfigBuilder {
    /// Select the storage backend
    pub fn backend(mut self, backend: BackendKind) -> Self {
        self.backend = Some(backend);
        self
    }

    /// Set the remote store address
    pub fn redis_url(mut self, url: impl Into<String>) -> Self {
        self.redis_url = Some(url.into());
        self
    }

    /// Set the TTL applied to every remote entry
    pub fn ttl(mut self, ttl: Duration) -> Self {
        self.ttl = Some(ttl);
        self
    }

    /// Set the key namespace
    pub fn key_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.key_prefix = Some(prefix.into());
        self
    }

    /// Set the failure policy
    pub fn failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.failure_policy = Some(policy);
        self
    }

    /// Set the number of miss-lock buckets
    pub fn lock_shards(mut self, shards: usize) -> Self {
        self.lock_shards = Some(shards);
        self
    }

    /// Enable or disable metrics collection
    pub fn enable_metrics(mut self, enable: bool) -> Self {
        self.enable_metrics = Some(enable);
        self
    }

    /// Build the cache configuration
    pub fn build(self) -> CacheConfig {
        let defaults = CacheConfig::default();

        CacheConfig {
            backend: self.backend.unwrap_or(defaults.backend),
            redis_url: self.redis_url.unwrap_or(defaults.redis_url),
            ttl: self.ttl.unwrap_or(defaults.ttl),
            key_prefix: self.key_prefix.unwrap_or(defaults.key_prefix),
            failure_policy: self.failure_policy.unwrap_or(defaults.failure_policy),
            lock_shards: self.lock_shards.unwrap_or(defaults.lock_shards),
            enable_metrics: self.enable_metrics.unwrap_or(defaults.enable_metrics),
        }
    }
}

/// Preset configurations for the three backends
impl CacheConfig {
    /// Unbounded in-process cache
    pub fn local() -> Self {
        Self::default()
    }

    /// Remote cache with a one-day TTL and no invalidation
    pub fn ttl_remote() -> Self {
        Self {
            backend: BackendKind::TtlRemote,
            ..Default::default()
        }
    }

    /// Remote cache with exact scope invalidation and no TTL
    pub fn indexed_remote() -> Self {
        Self {
            backend: BackendKind::IndexedRemote,
            ..Default::default()
        }
    }
}
