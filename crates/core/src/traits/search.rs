//! External web search interface

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::Result;

/// One retrieved search result
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResult {
    pub title: String,
    pub url: String,
    pub snippet: String,
}

/// External search capability consumed by the medicine lookup generator.
///
/// The contract is deliberately thin: given a query, return zero or more
/// results. The core does not implement search, only consumes it; an
/// empty result set means the tool abstained and no source links may be
/// fabricated downstream.
#[async_trait]
pub trait SearchProvider: Send + Sync + 'static {
    async fn search(&self, query: &str) -> Result<Vec<SearchResult>>;
}
