//! SPARQL 1.1 Protocol client for remote endpoints

use crate::cache::materialize::{decode_graph, decode_solutions, decode_xml_boolean};
use crate::error::{CacheError, Result};
use crate::executor::QueryExecutor;
use crate::query::{ExecutionTarget, Graph, Query, QueryForm, SolutionStream};
use async_trait::async_trait;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, info};

const SPARQL_QUERY: &str = "application/sparql-query";
const SPARQL_RESULTS_XML: &str = "application/sparql-results+xml";
const N_TRIPLES: &str = "application/n-triples";

/// Executes queries against `Service` targets over HTTP
///
/// Queries are POSTed as `application/sparql-query`; tabular and boolean
/// results are requested as SPARQL Query Results XML and graphs as
/// N-Triples. `Dataset` targets are rejected.
#[derive(Debug, Clone)]
pub struct ServiceExecutor {
    client: Client,
}

impl ServiceExecutor {
    pub fn new() -> Self {
        Self {
            client: Client::new(),
        }
    }

    /// Use a preconfigured HTTP client (proxies, TLS, default headers)
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }

    /// Client with a per-request timeout
    pub fn with_timeout(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| CacheError::ConfigError(e.to_string()))?;
        Ok(Self { client })
    }

    async fn fetch(&self, target: &ExecutionTarget, query: &Query) -> Result<String> {
        let endpoint = target.endpoint().ok_or_else(|| {
            CacheError::Execution(format!(
                "{} is an in-process dataset, not a SPARQL endpoint",
                target
            ))
        })?;

        debug!("POST {} query to {}", query.form(), endpoint);

        let response = self
            .client
            .post(endpoint)
            .header(CONTENT_TYPE, SPARQL_QUERY)
            .header(ACCEPT, accept_for(query.form()))
            .body(query.canonical().to_string())
            .send()
            .await
            .map_err(|e| upstream_error(endpoint, e))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(CacheError::Execution(format!(
                "{} answered {}: {}",
                endpoint,
                status,
                detail.trim()
            )));
        }

        let body = response
            .text()
            .await
            .map_err(|e| upstream_error(endpoint, e))?;
        info!("{} returned {} bytes", endpoint, body.len());
        Ok(body)
    }
}

impl Default for ServiceExecutor {
    fn default() -> Self {
        Self::new()
    }
}

fn accept_for(form: QueryForm) -> &'static str {
    match form {
        QueryForm::Select | QueryForm::Ask => SPARQL_RESULTS_XML,
        QueryForm::Construct | QueryForm::Describe => N_TRIPLES,
    }
}

fn upstream_error(endpoint: &str, error: reqwest::Error) -> CacheError {
    if error.is_timeout() {
        CacheError::Execution(format!("request to {} timed out", endpoint))
    } else {
        CacheError::Execution(format!("request to {} failed: {}", endpoint, error))
    }
}

/// An unparsable response is an upstream failure, not a cache decode failure
fn unreadable(target: &ExecutionTarget, error: CacheError) -> CacheError {
    CacheError::Execution(format!("unreadable response from {}: {}", target, error))
}

#[async_trait]
impl QueryExecutor for ServiceExecutor {
    async fn select(&self, target: &ExecutionTarget, query: &Query) -> Result<SolutionStream> {
        let body = self.fetch(target, query).await?;
        let solutions = decode_solutions(&body).map_err(|e| unreadable(target, e))?;
        Ok(solutions.into())
    }

    async fn construct(&self, target: &ExecutionTarget, query: &Query) -> Result<Graph> {
        let body = self.fetch(target, query).await?;
        decode_graph(&body).map_err(|e| unreadable(target, e))
    }

    async fn describe(&self, target: &ExecutionTarget, query: &Query) -> Result<Graph> {
        let body = self.fetch(target, query).await?;
        decode_graph(&body).map_err(|e| unreadable(target, e))
    }

    async fn ask(&self, target: &ExecutionTarget, query: &Query) -> Result<bool> {
        let body = self.fetch(target, query).await?;
        decode_xml_boolean(&body).map_err(|e| unreadable(target, e))
    }
}
