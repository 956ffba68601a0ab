//! Web search client
//!
//! Thin client for the hosted search API the medicine lookup generator
//! queries. The upstream contract is "given a query, return zero or more
//! {title, url, snippet}"; an empty result list is a valid answer (the
//! tool abstained), not an error.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use health_agent_core::{SearchProvider, SearchResult};

use crate::ToolError;

/// Search client configuration
#[derive(Debug, Clone)]
pub struct SearchConfig {
    pub endpoint: String,
    pub api_key: Option<String>,
    pub timeout: Duration,
    /// Cap on results forwarded to the generator
    pub max_results: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://api.search.example.com/v1/search".to_string(),
            api_key: None,
            timeout: Duration::from_secs(10),
            max_results: 5,
        }
    }
}

/// HTTP search client
#[derive(Clone)]
pub struct HttpSearchClient {
    client: Client,
    config: SearchConfig,
}

impl HttpSearchClient {
    pub fn new(config: SearchConfig) -> Result<Self, ToolError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| ToolError::Configuration(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { client, config })
    }
}

#[async_trait]
impl SearchProvider for HttpSearchClient {
    async fn search(&self, query: &str) -> health_agent_core::Result<Vec<SearchResult>> {
        let mut builder = self
            .client
            .get(&self.config.endpoint)
            .query(&[("q", query)]);
        if let Some(key) = &self.config.api_key {
            builder = builder.bearer_auth(key);
        }

        let response = builder.send().await.map_err(ToolError::from)?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(ToolError::Api(format!("{}: {}", status, body)).into());
        }

        let wire: WireSearchResponse = response
            .json()
            .await
            .map_err(|e| ToolError::InvalidResponse(e.to_string()))?;

        let results: Vec<SearchResult> = wire
            .results
            .into_iter()
            .take(self.config.max_results)
            .map(|r| SearchResult {
                title: r.title,
                url: r.url,
                snippet: r.snippet.unwrap_or_default(),
            })
            .collect();

        tracing::debug!(query = %query, count = results.len(), "Search completed");

        Ok(results)
    }
}

#[derive(Debug, Deserialize)]
struct WireSearchResponse {
    #[serde(default)]
    results: Vec<WireSearchResult>,
}

#[derive(Debug, Deserialize)]
struct WireSearchResult {
    title: String,
    url: String,
    #[serde(default)]
    snippet: Option<String>,
}
