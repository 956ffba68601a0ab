//! Authentication
//!
//! Bearer-token identity resolution for the HTTP API. Token issuance and
//! real verification belong to the external identity provider; the
//! config-driven static verifier covers development and tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use axum::http::{header, HeaderMap};

use health_agent_core::{Error, IdentityVerifier};

use crate::state::AppState;
use crate::ServerError;

/// Track if we've warned about auth being disabled (warn once only)
static AUTH_DISABLED_WARNED: AtomicBool = AtomicBool::new(false);

/// Identity used when authentication is disabled (development only)
const ANONYMOUS_IDENTITY: &str = "anonymous";

/// Resolve the caller identity for a request.
///
/// With auth disabled every caller shares the anonymous identity, which
/// also means they share one rate-limit budget.
pub async fn authenticate(state: &AppState, headers: &HeaderMap) -> Result<String, ServerError> {
    let enabled = state.config.read().auth.enabled;
    if !enabled {
        if !AUTH_DISABLED_WARNED.swap(true, Ordering::Relaxed) {
            tracing::warn!(
                "API authentication is DISABLED! Set HEALTH_AGENT__AUTH__ENABLED=true for production."
            );
        }
        return Ok(ANONYMOUS_IDENTITY.to_string());
    }

    let header = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| ServerError::Auth("Missing Authorization header".to_string()))?;

    let token = header
        .strip_prefix("Bearer ")
        .ok_or_else(|| {
            ServerError::Auth(
                "Invalid Authorization header format. Expected: Bearer <token>".to_string(),
            )
        })?;

    state
        .verifier
        .verify(token)
        .await
        .map_err(|_| ServerError::Auth("Invalid token".to_string()))
}

/// Static token table, resolved before any generation work begins
pub struct StaticTokenVerifier {
    tokens: HashMap<String, String>,
}

impl StaticTokenVerifier {
    /// Create from a token -> user id table
    pub fn new(tokens: HashMap<String, String>) -> Self {
        if tokens.is_empty() {
            tracing::warn!("Auth token table is empty; every request will be rejected");
        }
        Self { tokens }
    }
}

#[async_trait]
impl IdentityVerifier for StaticTokenVerifier {
    async fn verify(&self, token: &str) -> health_agent_core::Result<String> {
        for (expected, user_id) in &self.tokens {
            // Constant-time comparison to prevent timing attacks
            if constant_time_compare(token.as_bytes(), expected.as_bytes()) {
                return Ok(user_id.clone());
            }
        }
        Err(Error::Unauthorized)
    }
}

/// Constant-time comparison to prevent timing attacks
fn constant_time_compare(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let mut result = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        result |= x ^ y;
    }
    result == 0
}
