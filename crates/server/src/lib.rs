//! Health Assistant Server
//!
//! HTTP endpoints for the conversational pipeline: chat with admission
//! control and intent routing, streamed speech synthesis, health and
//! metrics.

pub mod auth;
pub mod http;
pub mod metrics;
pub mod rate_limit;
pub mod state;

pub use auth::{authenticate, StaticTokenVerifier};
pub use http::create_router;
pub use metrics::{init_metrics, metrics_handler};
pub use rate_limit::{RateLimitDecision, RateLimiter};
pub use state::AppState;

use thiserror::Error;

/// Server errors
#[derive(Error, Debug)]
pub enum ServerError {
    #[error("Authentication error: {0}")]
    Auth(String),

    #[error("Rate limit exceeded")]
    RateLimited { reset_in: u64 },

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<ServerError> for axum::http::StatusCode {
    fn from(err: ServerError) -> Self {
        match err {
            ServerError::Auth(_) => axum::http::StatusCode::UNAUTHORIZED,
            ServerError::RateLimited { .. } => axum::http::StatusCode::TOO_MANY_REQUESTS,
            ServerError::InvalidRequest(_) => axum::http::StatusCode::BAD_REQUEST,
            ServerError::Internal(_) => axum::http::StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}
