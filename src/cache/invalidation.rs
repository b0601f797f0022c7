//! Cache invalidation events
//!
//! Entries leave a cache in one of three ways:
//! - scope invalidation: every entry created under one execution target
//! - clearing the whole local backend
//! - remote TTL expiry, which happens inside the store and is never reported

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Reason for cache invalidation
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InvalidationReason {
    /// Every entry of one execution target was dropped
    Scope { target: String },

    /// The whole cache was emptied
    Cleared,
}

impl std::fmt::Display for InvalidationReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InvalidationReason::Scope { target } => write!(f, "scope invalidated: {}", target),
            InvalidationReason::Cleared => write!(f, "cache cleared"),
        }
    }
}

/// Outcome of an invalidation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvalidationEvent {
    /// Reason for invalidation
    pub reason: InvalidationReason,

    /// When the invalidation occurred
    pub timestamp: DateTime<Utc>,

    /// Number of entries removed
    pub removed: usize,

    /// Remote keys that were deleted (empty for the local backend)
    pub keys: Vec<String>,

    /// Additional context
    pub context: Option<String>,
}

impl InvalidationEvent {
    /// Create a new invalidation event
    pub fn new(reason: InvalidationReason, removed: usize) -> Self {
        Self {
            reason,
            timestamp: Utc::now(),
            removed,
            keys: Vec::new(),
            context: None,
        }
    }

    /// Event for a scope invalidation of `target`
    pub fn scope(target: impl Into<String>, removed: usize) -> Self {
        Self::new(
            InvalidationReason::Scope {
                target: target.into(),
            },
            removed,
        )
    }

    /// Record the deleted remote keys
    pub fn with_keys(mut self, keys: Vec<String>) -> Self {
        self.keys = keys;
        self
    }

    /// Add context to the event
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    /// Nothing was removed (repeat invalidation, empty scope)
    pub fn is_empty(&self) -> bool {
        self.removed == 0
    }
}
