//! Execution targets: what a query runs against

use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::{Hash, Hasher};
use uuid::Uuid;

/// Handle to an in-process dataset
///
/// Identity is assigned at creation. Clones share it, so two handles compare
/// equal exactly when they refer to the same dataset. The label is display
/// only and takes no part in equality or hashing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetHandle {
    id: Uuid,
    label: Option<String>,
}

impl DatasetHandle {
    /// Create a handle with a fresh identity
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            label: None,
        }
    }

    /// Create a handle with a fresh identity and a human-readable label
    pub fn labeled(label: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            label: Some(label.into()),
        }
    }

    /// Recreate a handle for a known identity (e.g. a persisted dataset)
    pub fn with_id(id: Uuid) -> Self {
        Self { id, label: None }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }
}

impl PartialEq for DatasetHandle {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for DatasetHandle {}

impl Hash for DatasetHandle {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl Default for DatasetHandle {
    fn default() -> Self {
        Self::new()
    }
}

/// What a query is executed against
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ExecutionTarget {
    /// In-process dataset
    Dataset(DatasetHandle),

    /// Remote SPARQL service endpoint URI
    Service(String),
}

impl ExecutionTarget {
    /// Target a remote endpoint
    pub fn service(endpoint: impl Into<String>) -> Self {
        ExecutionTarget::Service(endpoint.into())
    }

    /// Target an in-process dataset
    pub fn dataset(handle: DatasetHandle) -> Self {
        ExecutionTarget::Dataset(handle)
    }

    /// Stable identifying string used for hashing and scope ids
    pub fn identity(&self) -> String {
        match self {
            ExecutionTarget::Dataset(handle) => format!("dataset:{}", handle.id),
            ExecutionTarget::Service(endpoint) => format!("service:{}", endpoint),
        }
    }

    /// Endpoint URI for service targets
    pub fn endpoint(&self) -> Option<&str> {
        match self {
            ExecutionTarget::Service(endpoint) => Some(endpoint),
            ExecutionTarget::Dataset(_) => None,
        }
    }
}

impl fmt::Display for ExecutionTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExecutionTarget::Dataset(handle) => match &handle.label {
                Some(label) => write!(f, "dataset {} ({})", label, handle.id),
                None => write!(f, "dataset {}", handle.id),
            },
            ExecutionTarget::Service(endpoint) => write!(f, "service {}", endpoint),
        }
    }
}
