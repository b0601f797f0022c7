//! Query-side model: targets, parsed queries and results
//!
//! These are the values the caching layer keys on and stores. The query
//! engine itself lives behind [`crate::executor::QueryExecutor`].

pub mod parsed;
pub mod results;
pub mod target;

pub use parsed::{Query, QueryForm};
pub use results::{CachedValue, Operation, ResultKind, SolutionStream, Solutions};
pub use target::{DatasetHandle, ExecutionTarget};

pub use oxrdf::{Graph, Term, Triple, Variable};
pub use sparesults::QuerySolution;
