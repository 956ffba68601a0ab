//! Application State
//!
//! Shared state across all handlers.

use std::sync::Arc;

use parking_lot::RwLock;

use health_agent_agent::HealthAgent;
use health_agent_config::Settings;
use health_agent_core::{IdentityVerifier, ProfileStore, SpeechSynthesizer};

use crate::rate_limit::RateLimiter;

/// Application state
#[derive(Clone)]
pub struct AppState {
    /// Configuration, shared for hot-path reads
    pub config: Arc<RwLock<Settings>>,
    /// Admission controller, the only mutable state shared across turns
    pub limiter: Arc<RateLimiter>,
    /// Conversational pipeline
    pub agent: Arc<HealthAgent>,
    /// Streaming synthesizer backing the speech endpoint
    pub synthesizer: Arc<dyn SpeechSynthesizer>,
    /// Caller identity resolution
    pub verifier: Arc<dyn IdentityVerifier>,
    /// Read-only health profile lookups
    pub profiles: Arc<dyn ProfileStore>,
}

impl AppState {
    pub fn new(
        config: Settings,
        agent: Arc<HealthAgent>,
        synthesizer: Arc<dyn SpeechSynthesizer>,
        verifier: Arc<dyn IdentityVerifier>,
        profiles: Arc<dyn ProfileStore>,
    ) -> Self {
        let limiter = Arc::new(RateLimiter::new(
            std::time::Duration::from_secs(config.rate_limit.window_secs),
            config.rate_limit.max_requests,
        ));

        Self {
            config: Arc::new(RwLock::new(config)),
            limiter,
            agent,
            synthesizer,
            verifier,
            profiles,
        }
    }
}
