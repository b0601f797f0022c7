//! Parsed SPARQL queries with structural identity

use crate::error::{CacheError, Result};
use crate::query::results::ResultKind;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;
use std::sync::Arc;

/// Query form as declared by the parsed query
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueryForm {
    Select,
    Construct,
    Describe,
    Ask,
}

impl QueryForm {
    /// The result kind this form produces
    pub fn result_kind(&self) -> ResultKind {
        match self {
            QueryForm::Select => ResultKind::Solutions,
            QueryForm::Construct | QueryForm::Describe => ResultKind::Graph,
            QueryForm::Ask => ResultKind::Boolean,
        }
    }
}

impl fmt::Display for QueryForm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueryForm::Select => write!(f, "SELECT"),
            QueryForm::Construct => write!(f, "CONSTRUCT"),
            QueryForm::Describe => write!(f, "DESCRIBE"),
            QueryForm::Ask => write!(f, "ASK"),
        }
    }
}

/// An immutable parsed query
///
/// Equality and hashing go through the parser's normalized serialization,
/// so whitespace, prefix declarations and keyword casing do not produce
/// distinct cache entries.
#[derive(Debug, Clone)]
pub struct Query {
    parsed: spargebra::Query,
    canonical: Arc<str>,
}

impl Query {
    /// Parse a query without a base IRI
    pub fn parse(text: &str) -> Result<Self> {
        Self::parse_with_base(text, None)
    }

    /// Parse a query resolving relative IRIs against `base_iri`
    pub fn parse_with_base(text: &str, base_iri: Option<&str>) -> Result<Self> {
        let parsed = spargebra::Query::parse(text, base_iri)
            .map_err(|e| CacheError::QueryParse(e.to_string()))?;
        Ok(Self::from(parsed))
    }

    /// Normalized query text
    pub fn canonical(&self) -> &str {
        &self.canonical
    }

    /// The underlying algebra
    pub fn algebra(&self) -> &spargebra::Query {
        &self.parsed
    }

    pub fn form(&self) -> QueryForm {
        match &self.parsed {
            spargebra::Query::Select { .. } => QueryForm::Select,
            spargebra::Query::Construct { .. } => QueryForm::Construct,
            spargebra::Query::Describe { .. } => QueryForm::Describe,
            spargebra::Query::Ask { .. } => QueryForm::Ask,
        }
    }
}

impl From<spargebra::Query> for Query {
    fn from(parsed: spargebra::Query) -> Self {
        let canonical: Arc<str> = parsed.to_string().into();
        Self { parsed, canonical }
    }
}

impl FromStr for Query {
    type Err = CacheError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl PartialEq for Query {
    fn eq(&self, other: &Self) -> bool {
        self.canonical == other.canonical
    }
}

impl Eq for Query {}

impl Hash for Query {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.canonical.hash(state);
    }
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.canonical)
    }
}
