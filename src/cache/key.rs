//! Cache key derivation
//!
//! Two families of keys exist:
//! - [`StructuralKey`]: the (target, query) pair itself. Exact, and the
//!   target can be recovered by scanning stored keys.
//! - [`HashedKey`]: a SHA-256 digest of the target identity and canonical
//!   query. Stable across processes, but the target cannot be recovered from
//!   it, so scope invalidation needs a separate [`ScopeId`] index.
//!
//! Two distinct pairs colliding in the digest would be indistinguishable.

use crate::query::{ExecutionTarget, Query};
use sha2::{Digest, Sha256};
use std::fmt;

/// Default namespace for remote keys
pub const DEFAULT_KEY_PREFIX: &str = "sparql-cache";

/// Exact key for in-process storage
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StructuralKey {
    pub target: ExecutionTarget,
    pub query: Query,
}

impl StructuralKey {
    pub fn new(target: &ExecutionTarget, query: &Query) -> Self {
        Self {
            target: target.clone(),
            query: query.clone(),
        }
    }

    /// Whether this key was created under the given scope
    pub fn in_scope(&self, scope: &ExecutionTarget) -> bool {
        &self.target == scope
    }
}

impl fmt::Display for StructuralKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} :: {}", self.target, self.query)
    }
}

/// Digest-based key for remote stores
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct HashedKey(String);

impl HashedKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for HashedKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Name of the index set holding every key created under one target
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ScopeId(String);

impl ScopeId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ScopeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Derives hashed keys and scope ids under a namespace prefix
#[derive(Debug, Clone)]
pub struct KeyDeriver {
    prefix: String,
}

impl KeyDeriver {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn structural(&self, target: &ExecutionTarget, query: &Query) -> StructuralKey {
        StructuralKey::new(target, query)
    }

    pub fn hashed(&self, target: &ExecutionTarget, query: &Query) -> HashedKey {
        let mut hasher = Sha256::new();
        hasher.update(target.identity().as_bytes());
        // NUL cannot appear in an IRI or in the identity prefix
        hasher.update([0u8]);
        hasher.update(query.canonical().as_bytes());
        HashedKey(format!(
            "{}:result:{}",
            self.prefix,
            hex::encode(hasher.finalize())
        ))
    }

    pub fn scope(&self, target: &ExecutionTarget) -> ScopeId {
        let digest = Sha256::digest(target.identity().as_bytes());
        ScopeId(format!("{}:scope:{}", self.prefix, hex::encode(digest)))
    }
}

impl Default for KeyDeriver {
    fn default() -> Self {
        Self::new(DEFAULT_KEY_PREFIX)
    }
}
