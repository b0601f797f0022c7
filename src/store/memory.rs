//! In-process [`RemoteStore`]
//!
//! Behaves like a single Redis node for the commands the cache uses,
//! including per-key TTLs. Handy for tests and single-node deployments that
//! still want hashed keys and the scope index.

use crate::error::{CacheError, Result};
use crate::store::RemoteStore;
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::debug;

#[derive(Debug, Clone)]
enum StoredValue {
    Text {
        value: String,
        expires_at: Option<Instant>,
    },
    Set(HashSet<String>),
}

impl StoredValue {
    fn is_expired(&self, now: Instant) -> bool {
        match self {
            StoredValue::Text {
                expires_at: Some(at),
                ..
            } => now >= *at,
            _ => false,
        }
    }
}

/// Thread-safe in-memory store
#[derive(Debug, Default)]
pub struct MemoryStore {
    data: RwLock<HashMap<String, StoredValue>>,
    offline: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulate an outage: every command fails until switched back
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Number of live keys (values and sets)
    pub async fn len(&self) -> usize {
        let now = Instant::now();
        let data = self.data.read().await;
        data.values().filter(|v| !v.is_expired(now)).count()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Whether a live key exists
    pub async fn contains_key(&self, key: &str) -> bool {
        let now = Instant::now();
        let data = self.data.read().await;
        data.get(key).is_some_and(|v| !v.is_expired(now))
    }

    fn ensure_online(&self) -> Result<()> {
        if self.offline.load(Ordering::SeqCst) {
            Err(CacheError::BackendUnavailable(
                "memory store is offline".to_string(),
            ))
        } else {
            Ok(())
        }
    }
}

fn wrong_type(key: &str) -> CacheError {
    CacheError::Other(format!(
        "WRONGTYPE operation against key {} holding the wrong kind of value",
        key
    ))
}

#[async_trait]
impl RemoteStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        self.ensure_online()?;
        let now = Instant::now();
        let mut data = self.data.write().await;

        match data.get(key) {
            Some(value) if value.is_expired(now) => {
                debug!("Memory store key expired: {}", key);
                data.remove(key);
                Ok(None)
            }
            Some(StoredValue::Text { value, .. }) => Ok(Some(value.clone())),
            Some(StoredValue::Set(_)) => Err(wrong_type(key)),
            None => Ok(None),
        }
    }

    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<()> {
        self.ensure_online()?;
        let expires_at = ttl.map(|ttl| Instant::now() + ttl);
        self.data.write().await.insert(
            key.to_string(),
            StoredValue::Text {
                value: value.to_string(),
                expires_at,
            },
        );
        Ok(())
    }

    async fn delete(&self, keys: &[String]) -> Result<u64> {
        self.ensure_online()?;
        let now = Instant::now();
        let mut data = self.data.write().await;

        let mut removed = 0;
        for key in keys {
            if let Some(value) = data.remove(key) {
                if !value.is_expired(now) {
                    removed += 1;
                }
            }
        }
        Ok(removed)
    }

    async fn add_to_set(&self, set: &str, member: &str) -> Result<()> {
        self.ensure_online()?;
        let mut data = self.data.write().await;

        match data
            .entry(set.to_string())
            .or_insert_with(|| StoredValue::Set(HashSet::new()))
        {
            StoredValue::Set(members) => {
                members.insert(member.to_string());
                Ok(())
            }
            StoredValue::Text { .. } => Err(wrong_type(set)),
        }
    }

    async fn remove_from_set(&self, set: &str, members: &[String]) -> Result<u64> {
        self.ensure_online()?;
        let mut data = self.data.write().await;

        let (removed, now_empty) = match data.get_mut(set) {
            Some(StoredValue::Set(stored)) => {
                let removed = members.iter().filter(|m| stored.remove(*m)).count();
                (removed as u64, stored.is_empty())
            }
            Some(StoredValue::Text { .. }) => return Err(wrong_type(set)),
            None => return Ok(0),
        };
        if now_empty {
            data.remove(set);
        }
        Ok(removed)
    }

    async fn set_members(&self, set: &str) -> Result<Vec<String>> {
        self.ensure_online()?;
        let data = self.data.read().await;

        match data.get(set) {
            Some(StoredValue::Set(members)) => Ok(members.iter().cloned().collect()),
            Some(StoredValue::Text { .. }) => Err(wrong_type(set)),
            None => Ok(Vec::new()),
        }
    }

    async fn health_check(&self) -> Result<bool> {
        self.ensure_online()?;
        Ok(true)
    }

    fn provider_name(&self) -> &'static str {
        "memory"
    }
}
