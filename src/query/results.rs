//! Query results in their live and replayable forms

use crate::error::{CacheError, Result};
use crate::query::parsed::QueryForm;
use oxrdf::{Graph, Term, Variable};
use serde::{Deserialize, Serialize};
use sparesults::QuerySolution;
use std::fmt;
use std::sync::Arc;

/// Shape of a query result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResultKind {
    /// Tabular solutions (SELECT)
    Solutions,
    /// RDF graph (CONSTRUCT, DESCRIBE)
    Graph,
    /// Boolean (ASK)
    Boolean,
}

impl fmt::Display for ResultKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResultKind::Solutions => write!(f, "solutions"),
            ResultKind::Graph => write!(f, "graph"),
            ResultKind::Boolean => write!(f, "boolean"),
        }
    }
}

/// Operations a query executor exposes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Select,
    Construct,
    ConstructInto,
    Describe,
    DescribeInto,
    Ask,
}

impl Operation {
    pub fn result_kind(&self) -> ResultKind {
        match self {
            Operation::Select => ResultKind::Solutions,
            Operation::Construct
            | Operation::ConstructInto
            | Operation::Describe
            | Operation::DescribeInto => ResultKind::Graph,
            Operation::Ask => ResultKind::Boolean,
        }
    }

    /// Whether a query of `form` can run under this operation
    pub fn accepts(&self, form: QueryForm) -> bool {
        matches!(
            (self, form),
            (Operation::Select, QueryForm::Select)
                | (Operation::Construct | Operation::ConstructInto, QueryForm::Construct)
                | (Operation::Describe | Operation::DescribeInto, QueryForm::Describe)
                | (Operation::Ask, QueryForm::Ask)
        )
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operation::Select => write!(f, "select"),
            Operation::Construct => write!(f, "construct"),
            Operation::ConstructInto => write!(f, "construct-into"),
            Operation::Describe => write!(f, "describe"),
            Operation::DescribeInto => write!(f, "describe-into"),
            Operation::Ask => write!(f, "ask"),
        }
    }
}

type RowIter = Box<dyn Iterator<Item = Result<QuerySolution>> + Send>;

/// A one-shot stream of solutions as produced by a query engine
pub struct SolutionStream {
    variables: Arc<[Variable]>,
    rows: RowIter,
}

impl SolutionStream {
    /// Wrap an arbitrary row iterator
    pub fn new(
        variables: Vec<Variable>,
        rows: impl Iterator<Item = Result<QuerySolution>> + Send + 'static,
    ) -> Self {
        Self {
            variables: variables.into(),
            rows: Box::new(rows),
        }
    }

    /// Build a stream from positional values, one `Vec` per row
    pub fn from_values(variables: Vec<Variable>, rows: Vec<Vec<Option<Term>>>) -> Self {
        let variables: Arc<[Variable]> = variables.into();
        let shared = Arc::clone(&variables);
        let rows = rows.into_iter().map(move |values| {
            Ok::<_, CacheError>(QuerySolution::from((Arc::clone(&shared), values)))
        });
        Self {
            variables,
            rows: Box::new(rows),
        }
    }

    pub fn variables(&self) -> &[Variable] {
        &self.variables
    }
}

impl Iterator for SolutionStream {
    type Item = Result<QuerySolution>;

    fn next(&mut self) -> Option<Self::Item> {
        self.rows.next()
    }
}

impl fmt::Debug for SolutionStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SolutionStream")
            .field("variables", &self.variables)
            .finish_non_exhaustive()
    }
}

impl From<Solutions> for SolutionStream {
    fn from(mut solutions: Solutions) -> Self {
        solutions.reset();
        let variables = Arc::clone(&solutions.variables);
        Self {
            variables,
            rows: Box::new(solutions.map(Ok::<_, CacheError>)),
        }
    }
}

/// Rewindable solutions
///
/// Rows are shared behind an `Arc`; every clone carries its own cursor, so
/// independent consumers never observe each other's progress.
#[derive(Clone)]
pub struct Solutions {
    variables: Arc<[Variable]>,
    rows: Arc<[QuerySolution]>,
    position: usize,
}

impl Solutions {
    pub fn new(variables: Vec<Variable>, rows: Vec<QuerySolution>) -> Self {
        Self {
            variables: variables.into(),
            rows: rows.into(),
            position: 0,
        }
    }

    /// Drain a one-shot stream into a replayable form
    ///
    /// Fails with the first row error; nothing partial is returned.
    pub fn materialize(stream: SolutionStream) -> Result<Self> {
        let variables = Arc::clone(&stream.variables);
        let rows = stream.collect::<Result<Vec<_>>>()?;
        Ok(Self {
            variables,
            rows: rows.into(),
            position: 0,
        })
    }

    pub fn variables(&self) -> &[Variable] {
        &self.variables
    }

    /// All rows, independent of the cursor
    pub fn rows(&self) -> &[QuerySolution] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Current cursor position
    pub fn position(&self) -> usize {
        self.position
    }

    /// Move the cursor back to the first row
    pub fn reset(&mut self) {
        self.position = 0;
    }

    /// A copy positioned at the first row
    pub fn rewound(&self) -> Self {
        Self {
            variables: Arc::clone(&self.variables),
            rows: Arc::clone(&self.rows),
            position: 0,
        }
    }

    /// Row-by-row content equality, ignoring cursor positions
    pub fn same_content(&self, other: &Solutions) -> bool {
        self.variables == other.variables
            && self.rows.len() == other.rows.len()
            && self.rows.iter().zip(other.rows.iter()).all(|(a, b)| {
                self.variables
                    .iter()
                    .all(|variable| a.get(variable) == b.get(variable))
            })
    }
}

impl Iterator for Solutions {
    type Item = QuerySolution;

    fn next(&mut self) -> Option<Self::Item> {
        let row = self.rows.get(self.position)?;
        self.position += 1;
        Some(QuerySolution::from((
            row.variables().to_vec(),
            row.values().to_vec(),
        )))
    }
}

impl fmt::Debug for Solutions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Solutions")
            .field("variables", &self.variables)
            .field("rows", &self.rows.len())
            .field("position", &self.position)
            .finish()
    }
}

/// A result in its in-memory, storable form
#[derive(Debug, Clone)]
pub enum CachedValue {
    Solutions(Solutions),
    Graph(Graph),
    Boolean(bool),
}

impl CachedValue {
    pub fn kind(&self) -> ResultKind {
        match self {
            CachedValue::Solutions(_) => ResultKind::Solutions,
            CachedValue::Graph(_) => ResultKind::Graph,
            CachedValue::Boolean(_) => ResultKind::Boolean,
        }
    }

    pub fn into_solutions(self) -> Result<Solutions> {
        match self {
            CachedValue::Solutions(solutions) => Ok(solutions),
            other => Err(kind_mismatch(ResultKind::Solutions, other.kind())),
        }
    }

    pub fn into_graph(self) -> Result<Graph> {
        match self {
            CachedValue::Graph(graph) => Ok(graph),
            other => Err(kind_mismatch(ResultKind::Graph, other.kind())),
        }
    }

    pub fn into_boolean(self) -> Result<bool> {
        match self {
            CachedValue::Boolean(value) => Ok(value),
            other => Err(kind_mismatch(ResultKind::Boolean, other.kind())),
        }
    }
}

fn kind_mismatch(expected: ResultKind, found: ResultKind) -> CacheError {
    CacheError::decode(expected, format!("stored value is a {} result", found))
}
