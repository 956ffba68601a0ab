//! LLM integration
//!
//! Hosted chat-completion backend used by the intent router and both
//! response generators.

pub mod backend;

pub use backend::{HttpLlmBackend, LlmConfig};

use thiserror::Error;

/// LLM errors
#[derive(Error, Debug)]
pub enum LlmError {
    #[error("API error: {0}")]
    Api(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Timeout")]
    Timeout,

    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl From<reqwest::Error> for LlmError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            LlmError::Timeout
        } else {
            LlmError::Network(err.to_string())
        }
    }
}

impl From<LlmError> for health_agent_core::Error {
    fn from(err: LlmError) -> Self {
        health_agent_core::Error::Generation(err.to_string())
    }
}
