//! Remote key-value stores behind the remote cache backends
//!
//! [`RemoteStore`] is the small command surface the TTL and indexed
//! backends need: string get/set (with optional TTL), multi-key delete, and
//! unordered sets for the per-target key index.

pub mod memory;
pub mod redis;

pub use self::memory::MemoryStore;
pub use self::redis::RedisStore;

use crate::error::Result;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

/// Command surface of a remote key-value store
///
/// Every failure to reach the store is reported as
/// [`CacheError::BackendUnavailable`](crate::error::CacheError::BackendUnavailable)
/// (or a timeout), never as a missing key.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Read a string value, `None` when absent or expired
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Write a string value, replacing any previous one
    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<()>;

    /// Delete keys, returning how many existed
    async fn delete(&self, keys: &[String]) -> Result<u64>;

    /// Add a member to an unordered set
    async fn add_to_set(&self, set: &str, member: &str) -> Result<()>;

    /// Remove members from a set, returning how many were present
    ///
    /// A set left without members no longer exists.
    async fn remove_from_set(&self, set: &str, members: &[String]) -> Result<u64>;

    /// All members of a set, empty when the set does not exist
    async fn set_members(&self, set: &str) -> Result<Vec<String>>;

    /// Cheap liveness check
    async fn health_check(&self) -> Result<bool>;

    fn provider_name(&self) -> &'static str;
}

#[async_trait]
impl<S: RemoteStore + ?Sized> RemoteStore for Arc<S> {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        (**self).get(key).await
    }

    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<()> {
        (**self).set(key, value, ttl).await
    }

    async fn delete(&self, keys: &[String]) -> Result<u64> {
        (**self).delete(keys).await
    }

    async fn add_to_set(&self, set: &str, member: &str) -> Result<()> {
        (**self).add_to_set(set, member).await
    }

    async fn remove_from_set(&self, set: &str, members: &[String]) -> Result<u64> {
        (**self).remove_from_set(set, members).await
    }

    async fn set_members(&self, set: &str) -> Result<Vec<String>> {
        (**self).set_members(set).await
    }

    async fn health_check(&self) -> Result<bool> {
        (**self).health_check().await
    }

    fn provider_name(&self) -> &'static str {
        (**self).provider_name()
    }
}
