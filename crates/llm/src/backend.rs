//! LLM backend implementation
//!
//! Talks to a hosted chat-completion style REST API. One request per
//! generation call, bounded by the configured timeout; failed calls are
//! never retried here — retry policy belongs to the caller, and the
//! pipeline deliberately has none.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use health_agent_core::{
    FinishReason, GenerateRequest, GenerateResponse, LanguageModel, Message, TokenUsage,
};

use crate::LlmError;

/// LLM configuration
#[derive(Debug, Clone)]
pub struct LlmConfig {
    /// Model name/ID
    pub model: String,
    /// API endpoint
    pub endpoint: String,
    /// API key (optional)
    pub api_key: Option<String>,
    /// Maximum tokens to generate
    pub max_tokens: u32,
    /// Temperature
    pub temperature: f32,
    /// Request timeout
    pub timeout: Duration,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            model: "qwen2.5:7b-instruct-q4_K_M".to_string(),
            endpoint: "http://localhost:11434".to_string(),
            api_key: None,
            max_tokens: 1024,
            temperature: 0.7,
            timeout: Duration::from_secs(30),
        }
    }
}

/// Chat-completion backend over HTTP
#[derive(Clone)]
pub struct HttpLlmBackend {
    client: Client,
    config: LlmConfig,
}

impl HttpLlmBackend {
    /// Create a new backend
    pub fn new(config: LlmConfig) -> Result<Self, LlmError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| LlmError::Configuration(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { client, config })
    }

    fn api_url(&self, path: &str) -> String {
        format!("{}/v1{}", self.config.endpoint, path)
    }

    fn build_wire_request(&self, request: &GenerateRequest) -> ChatCompletionRequest {
        let response_format = request.response_schema.as_ref().map(|schema| ResponseFormat {
            format_type: "json_schema".to_string(),
            json_schema: Some(JsonSchemaFormat {
                name: "structured_output".to_string(),
                schema: schema.clone(),
            }),
        });

        ChatCompletionRequest {
            model: request
                .model
                .clone()
                .unwrap_or_else(|| self.config.model.clone()),
            messages: request.messages.iter().map(|m| m.into()).collect(),
            temperature: request.temperature.or(Some(self.config.temperature)),
            top_p: request.top_p,
            max_tokens: request.max_tokens.or(Some(self.config.max_tokens)),
            response_format,
        }
    }
}

#[async_trait]
impl LanguageModel for HttpLlmBackend {
    async fn generate(
        &self,
        request: GenerateRequest,
    ) -> health_agent_core::Result<GenerateResponse> {
        let wire = self.build_wire_request(&request);

        let mut builder = self.client.post(self.api_url("/chat/completions")).json(&wire);
        if let Some(key) = &self.config.api_key {
            builder = builder.bearer_auth(key);
        }

        let response = builder.send().await.map_err(LlmError::from)?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            let err = if status.is_server_error() {
                LlmError::Network(format!("Server error {}: {}", status, body))
            } else {
                LlmError::Api(format!("{}: {}", status, body))
            };
            return Err(err.into());
        }

        let completion: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| LlmError::InvalidResponse(e.to_string()))?;

        let choice = completion
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| LlmError::InvalidResponse("empty choices".to_string()))?;

        Ok(GenerateResponse {
            text: choice.message.content,
            finish_reason: parse_finish_reason(choice.finish_reason.as_deref()),
            usage: completion.usage.map(|u| TokenUsage {
                prompt_tokens: u.prompt_tokens,
                completion_tokens: u.completion_tokens,
                total_tokens: u.total_tokens,
            }),
        })
    }

    async fn is_available(&self) -> bool {
        self.client
            .get(self.api_url("/models"))
            .send()
            .await
            .map(|r| r.status().is_success())
            .unwrap_or(false)
    }

    fn model_name(&self) -> &str {
        &self.config.model
    }
}

fn parse_finish_reason(reason: Option<&str>) -> FinishReason {
    match reason {
        Some("length") => FinishReason::Length,
        Some("content_filter") => FinishReason::ContentFilter,
        Some("error") => FinishReason::Error,
        _ => FinishReason::Stop,
    }
}

// Wire-format types

#[derive(Debug, Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<WireMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_p: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    format_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    json_schema: Option<JsonSchemaFormat>,
}

#[derive(Debug, Serialize)]
struct JsonSchemaFormat {
    name: String,
    schema: serde_json::Value,
}

#[derive(Debug, Serialize, Deserialize)]
struct WireMessage {
    role: String,
    content: String,
}

impl From<&Message> for WireMessage {
    fn from(msg: &Message) -> Self {
        Self {
            role: msg.role.to_string(),
            content: msg.content.clone(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
    #[serde(default)]
    usage: Option<WireUsage>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: WireMessage,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WireUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
    total_tokens: u32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use health_agent_core::Schema;

    #[test]
    fn test_config_default() {
        let config = LlmConfig::default();
        assert_eq!(config.temperature, 0.7);
        assert_eq!(config.timeout, Duration::from_secs(30));
    }

    #[test]
    fn test_message_conversion() {
        let msg = Message::user("Hello");
        let wire: WireMessage = (&msg).into();
        assert_eq!(wire.role, "user");
        assert_eq!(wire.content, "Hello");
    }

    #[test]
    fn test_wire_request_carries_response_schema() {
        let backend = HttpLlmBackend::new(LlmConfig::default()).unwrap();
        let schema = Schema::new()
            .required("response", health_agent_core::FieldType::String)
            .to_wire();
        let request = GenerateRequest::new("system")
            .with_user_message("hi")
            .with_response_schema(schema);

        let wire = backend.build_wire_request(&request);
        let format = wire.response_format.expect("schema should be forwarded");
        assert_eq!(format.format_type, "json_schema");
        assert!(format.json_schema.is_some());
    }

    #[test]
    fn test_finish_reason_parsing() {
        assert_eq!(parse_finish_reason(Some("stop")), FinishReason::Stop);
        assert_eq!(parse_finish_reason(Some("length")), FinishReason::Length);
        assert_eq!(parse_finish_reason(None), FinishReason::Stop);
    }
}
