//! Profile document store client
//!
//! Read-only view of the hosted user document store, consulted once per
//! turn to enrich the generation request. A missing document is `None`;
//! transport failures are surfaced so the caller can log and proceed
//! without a profile.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};

use health_agent_core::{HealthProfile, ProfileStore};

use crate::ToolError;

/// Profile store configuration
#[derive(Debug, Clone)]
pub struct ProfileStoreConfig {
    pub endpoint: String,
    pub api_key: Option<String>,
    pub timeout: Duration,
}

impl Default for ProfileStoreConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:9090".to_string(),
            api_key: None,
            timeout: Duration::from_secs(5),
        }
    }
}

/// HTTP profile store client
#[derive(Clone)]
pub struct HttpProfileStore {
    client: Client,
    config: ProfileStoreConfig,
}

impl HttpProfileStore {
    pub fn new(config: ProfileStoreConfig) -> Result<Self, ToolError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| ToolError::Configuration(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { client, config })
    }

    fn profile_url(&self, user_id: &str) -> String {
        format!("{}/users/{}/profile", self.config.endpoint, user_id)
    }
}

#[async_trait]
impl ProfileStore for HttpProfileStore {
    async fn fetch(&self, user_id: &str) -> health_agent_core::Result<Option<HealthProfile>> {
        let mut builder = self.client.get(self.profile_url(user_id));
        if let Some(key) = &self.config.api_key {
            builder = builder.bearer_auth(key);
        }

        let response = builder.send().await.map_err(ToolError::from)?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(ToolError::Api(format!("{}: {}", status, body)).into());
        }

        let profile: HealthProfile = response
            .json()
            .await
            .map_err(|e| ToolError::InvalidResponse(e.to_string()))?;

        Ok(Some(profile))
    }
}
