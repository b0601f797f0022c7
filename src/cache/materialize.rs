//! Result materialization for cache storage
//!
//! The local backend keeps results live ([`LiveMaterializer`]). Remote
//! backends store text ([`TextMaterializer`]):
//! - solutions as SPARQL Query Results XML
//! - graphs as N-Triples
//! - booleans as the literal `true` / `false`
//!
//! Blank node labels are written as-is but are not guaranteed to be
//! preserved by every parser, so graph round trips are content-equal rather
//! than label-identical. [`merge_into`] gives every merged blank node a
//! fresh label so cached nodes never alias nodes already in the caller's
//! graph.

use crate::error::{CacheError, Result};
use crate::query::{CachedValue, ResultKind, Solutions};
use oxrdf::{BlankNode, Graph, Subject, Term, Triple, Variable};
use oxttl::NTriplesParser;
use sparesults::{
    QueryResultsFormat, QueryResultsParser, QueryResultsSerializer, ReaderQueryResultsParserOutput,
};
use std::collections::HashMap;
use std::fmt::Write;

/// Converts between live results and a backend's stored form
pub trait Materializer: Send + Sync {
    type Stored: Clone + Send + Sync + 'static;

    fn encode(&self, value: &CachedValue) -> Result<Self::Stored>;

    /// Rebuild a fresh, independently consumable value
    fn decode(&self, kind: ResultKind, stored: Self::Stored) -> Result<CachedValue>;
}

/// Identity materialization: values are stored as live objects
#[derive(Debug, Clone, Copy, Default)]
pub struct LiveMaterializer;

impl Materializer for LiveMaterializer {
    type Stored = CachedValue;

    fn encode(&self, value: &CachedValue) -> Result<CachedValue> {
        Ok(match value {
            CachedValue::Solutions(solutions) => CachedValue::Solutions(solutions.rewound()),
            other => other.clone(),
        })
    }

    fn decode(&self, kind: ResultKind, stored: CachedValue) -> Result<CachedValue> {
        if stored.kind() != kind {
            return Err(CacheError::decode(
                kind,
                format!("stored value is a {} result", stored.kind()),
            ));
        }
        Ok(match stored {
            CachedValue::Solutions(solutions) => CachedValue::Solutions(solutions.rewound()),
            other => other,
        })
    }
}

/// Text materialization for remote stores
#[derive(Debug, Clone, Copy, Default)]
pub struct TextMaterializer;

impl Materializer for TextMaterializer {
    type Stored = String;

    fn encode(&self, value: &CachedValue) -> Result<String> {
        match value {
            CachedValue::Solutions(solutions) => encode_solutions(solutions),
            CachedValue::Graph(graph) => Ok(encode_graph(graph)),
            CachedValue::Boolean(value) => Ok(encode_boolean(*value)),
        }
    }

    fn decode(&self, kind: ResultKind, stored: String) -> Result<CachedValue> {
        match kind {
            ResultKind::Solutions => decode_solutions(&stored).map(CachedValue::Solutions),
            ResultKind::Graph => decode_graph(&stored).map(CachedValue::Graph),
            ResultKind::Boolean => decode_boolean(&stored).map(CachedValue::Boolean),
        }
    }
}

/// Serialize solutions to SPARQL Query Results XML
pub fn encode_solutions(solutions: &Solutions) -> Result<String> {
    let encode_err = |e: std::io::Error| CacheError::Encode(e.to_string());

    let mut writer = QueryResultsSerializer::from_format(QueryResultsFormat::Xml)
        .serialize_solutions_to_writer(Vec::new(), solutions.variables().to_vec())
        .map_err(encode_err)?;
    for row in solutions.rows() {
        writer.serialize(row.iter()).map_err(encode_err)?;
    }
    let bytes = writer.finish().map_err(encode_err)?;

    String::from_utf8(bytes).map_err(|e| CacheError::Encode(e.to_string()))
}

/// Parse SPARQL Query Results XML into rewindable solutions
pub fn decode_solutions(text: &str) -> Result<Solutions> {
    let parsed = QueryResultsParser::from_format(QueryResultsFormat::Xml)
        .for_reader(text.as_bytes())
        .map_err(|e| CacheError::decode(ResultKind::Solutions, e))?;

    match parsed {
        ReaderQueryResultsParserOutput::Solutions(parser) => {
            let variables: Vec<Variable> = parser.variables().to_vec();
            let rows = parser
                .collect::<std::result::Result<Vec<_>, _>>()
                .map_err(|e| CacheError::decode(ResultKind::Solutions, e))?;
            Ok(Solutions::new(variables, rows))
        }
        ReaderQueryResultsParserOutput::Boolean(_) => Err(CacheError::decode(
            ResultKind::Solutions,
            "document holds a boolean result",
        )),
    }
}

/// Parse a SPARQL Query Results XML boolean document
pub fn decode_xml_boolean(text: &str) -> Result<bool> {
    let parsed = QueryResultsParser::from_format(QueryResultsFormat::Xml)
        .for_reader(text.as_bytes())
        .map_err(|e| CacheError::decode(ResultKind::Boolean, e))?;

    match parsed {
        ReaderQueryResultsParserOutput::Boolean(value) => Ok(value),
        ReaderQueryResultsParserOutput::Solutions(_) => Err(CacheError::decode(
            ResultKind::Boolean,
            "document holds solutions",
        )),
    }
}

/// Serialize a graph as N-Triples, one statement per line
pub fn encode_graph(graph: &Graph) -> String {
    let mut out = String::new();
    for triple in graph.iter() {
        // Writing into a String cannot fail
        let _ = writeln!(out, "{} .", triple);
    }
    out
}

/// Parse N-Triples into a fresh graph
pub fn decode_graph(text: &str) -> Result<Graph> {
    let mut graph = Graph::new();
    for triple in NTriplesParser::new().for_reader(text.as_bytes()) {
        let triple = triple.map_err(|e| CacheError::decode(ResultKind::Graph, e))?;
        graph.insert(&triple);
    }
    Ok(graph)
}

pub fn encode_boolean(value: bool) -> String {
    value.to_string()
}

/// Parse the literal `true` / `false`; anything else is a decode failure
pub fn decode_boolean(text: &str) -> Result<bool> {
    match text.trim() {
        "true" => Ok(true),
        "false" => Ok(false),
        other => Err(CacheError::decode(
            ResultKind::Boolean,
            format!("expected true or false, found {:?}", other),
        )),
    }
}

/// Add every triple of `source` to `target`, returning how many were new
///
/// Each blank node of `source` is replaced by one fresh blank node, so
/// shared nodes stay shared within the merged triples.
pub fn merge_into(target: &mut Graph, source: &Graph) -> usize {
    let mut fresh: HashMap<BlankNode, BlankNode> = HashMap::new();
    let mut relabel = |node: BlankNode| fresh.entry(node).or_default().clone();

    let mut added = 0;
    for triple in source.iter() {
        let Triple {
            subject,
            predicate,
            object,
        } = triple.into_owned();
        let subject = match subject {
            Subject::BlankNode(node) => Subject::BlankNode(relabel(node)),
            other => other,
        };
        let object = match object {
            Term::BlankNode(node) => Term::BlankNode(relabel(node)),
            other => other,
        };
        if target.insert(&Triple::new(subject, predicate, object)) {
            added += 1;
        }
    }
    added
}
