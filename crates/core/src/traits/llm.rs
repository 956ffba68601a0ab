//! Language Model interface

use async_trait::async_trait;

use crate::{GenerateRequest, GenerateResponse, Result};

/// Language Model interface
///
/// Implementations:
/// - `HttpLlmBackend` - hosted chat-completion REST API
///
/// # Example
///
/// ```ignore
/// let llm: Arc<dyn LanguageModel> = Arc::new(HttpLlmBackend::new(config)?);
/// let request = GenerateRequest::new("You are a health assistant")
///     .with_user_message("What is paracetamol used for?");
/// let response = llm.generate(request).await?;
/// println!("{}", response.text);
/// ```
#[async_trait]
pub trait LanguageModel: Send + Sync + 'static {
    /// Generate a completion.
    ///
    /// Implementations apply a bounded request timeout; a timeout surfaces
    /// as a generation failure, never a silent hang.
    async fn generate(&self, request: GenerateRequest) -> Result<GenerateResponse>;

    /// Check if the backend is reachable
    async fn is_available(&self) -> bool;

    /// Get model name for logging
    fn model_name(&self) -> &str;
}

#[cfg(test)]
mod tests {
    use super::*;

    struct MockLlm;

    #[async_trait]
    impl LanguageModel for MockLlm {
        async fn generate(&self, _request: GenerateRequest) -> Result<GenerateResponse> {
            Ok(GenerateResponse::text("Mock response"))
        }

        async fn is_available(&self) -> bool {
            true
        }

        fn model_name(&self) -> &str {
            "mock-llm"
        }
    }

    #[tokio::test]
    async fn test_mock_llm() {
        let llm = MockLlm;
        assert!(llm.is_available().await);
        assert_eq!(llm.model_name(), "mock-llm");

        let request = GenerateRequest::new("Test").with_user_message("Hello");
        let response = llm.generate(request).await.unwrap();
        assert_eq!(response.text, "Mock response");
    }
}
