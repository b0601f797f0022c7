//! Shared test doubles

#![allow(dead_code)]

use async_trait::async_trait;
use oxrdf::{Literal, NamedNode, Triple, Variable};
use sparql_cache::{CacheError, ExecutionTarget, Graph, Query, QueryExecutor, Result, SolutionStream};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

pub const ENDPOINT: &str = "http://example.org/sparql";

pub fn node(iri: &str) -> NamedNode {
    NamedNode::new_unchecked(iri)
}

pub fn query(text: &str) -> Query {
    Query::parse(text).unwrap()
}

/// Upstream engine with canned answers that counts every call
///
/// Answers depend on the target so results from different targets can be
/// told apart.
pub struct StubExecutor {
    calls: AtomicUsize,
    failing: AtomicBool,
    delay: Duration,
    pub rows: usize,
    pub answer: bool,
}

impl StubExecutor {
    pub fn new() -> Self {
        Self {
            calls: AtomicUsize::new(0),
            failing: AtomicBool::new(false),
            delay: Duration::ZERO,
            rows: 10,
            answer: true,
        }
    }

    /// Every call takes at least `delay`
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn answering(mut self, answer: bool) -> Self {
        self.answer = answer;
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    async fn enter(&self) -> Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        if self.failing.load(Ordering::SeqCst) {
            return Err(CacheError::Execution("endpoint returned 503".to_string()));
        }
        Ok(())
    }
}

fn subject(target: &ExecutionTarget) -> NamedNode {
    node(&format!("http://example.org/item/{}", target.identity().len()))
}

#[async_trait]
impl QueryExecutor for StubExecutor {
    async fn select(&self, target: &ExecutionTarget, _query: &Query) -> Result<SolutionStream> {
        self.enter().await?;
        let rows = (0..self.rows)
            .map(|i| {
                vec![
                    Some(node(&format!("http://example.org/item/{}", i)).into()),
                    Some(Literal::new_simple_literal(target.identity()).into()),
                ]
            })
            .collect();
        Ok(SolutionStream::from_values(
            vec![Variable::new_unchecked("s"), Variable::new_unchecked("source")],
            rows,
        ))
    }

    async fn construct(&self, target: &ExecutionTarget, _query: &Query) -> Result<Graph> {
        self.enter().await?;
        let mut graph = Graph::new();
        graph.insert(&Triple::new(
            subject(target),
            node("http://example.org/name"),
            Literal::new_simple_literal("constructed"),
        ));
        graph.insert(&Triple::new(
            subject(target),
            node("http://example.org/source"),
            Literal::new_simple_literal(target.identity()),
        ));
        Ok(graph)
    }

    async fn describe(&self, target: &ExecutionTarget, _query: &Query) -> Result<Graph> {
        self.enter().await?;
        let mut graph = Graph::new();
        graph.insert(&Triple::new(
            subject(target),
            node("http://example.org/described"),
            Literal::new_simple_literal(target.identity()),
        ));
        Ok(graph)
    }

    async fn ask(&self, _target: &ExecutionTarget, _query: &Query) -> Result<bool> {
        self.enter().await?;
        Ok(self.answer)
    }
}
