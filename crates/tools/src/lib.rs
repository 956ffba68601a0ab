//! External capabilities consumed by the generation pipeline
//!
//! The core never implements search or profile storage; it consumes both
//! through the trait seams in `health-agent-core`. This crate provides the
//! HTTP clients for the hosted services.

pub mod profile;
pub mod search;

pub use profile::{HttpProfileStore, ProfileStoreConfig};
pub use search::{HttpSearchClient, SearchConfig};

use thiserror::Error;

/// Tool errors
#[derive(Error, Debug)]
pub enum ToolError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("API error: {0}")]
    Api(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl From<reqwest::Error> for ToolError {
    fn from(err: reqwest::Error) -> Self {
        ToolError::Network(err.to_string())
    }
}

impl From<ToolError> for health_agent_core::Error {
    fn from(err: ToolError) -> Self {
        health_agent_core::Error::Generation(err.to_string())
    }
}
