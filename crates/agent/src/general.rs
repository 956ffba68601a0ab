//! General response generation
//!
//! Conversational answers for everything the medicine path does not
//! handle. Formatting constraints live in the prompt; the validator only
//! checks the structural contract (`response` present and a string) —
//! content-level rules are policy, not machine-checked here.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use health_agent_core::{ChatRequest, FieldType, GenerateRequest, LanguageModel, Schema};

use crate::{parse_validated, push_history, AgentError};

const GENERAL_SYSTEM_PROMPT: &str = "\
You are a friendly health-information assistant.

Guidelines:
- Answer in plain conversational sentences, no markdown, no bullet lists
- Keep answers short and clear; expand only when asked
- Do not append disclaimers or tell the user to see a doctor unless the \
situation genuinely warrants it
- For emergencies, advise contacting local emergency services immediately

Respond with JSON only: {\"response\": \"<your answer>\"}";

/// General generator result
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralReply {
    pub response: String,
}

fn reply_schema() -> Schema {
    Schema::new().required("response", FieldType::String)
}

/// General response generator
pub struct GeneralGenerator {
    llm: Arc<dyn LanguageModel>,
}

impl GeneralGenerator {
    pub fn new(llm: Arc<dyn LanguageModel>) -> Self {
        Self { llm }
    }

    /// Generate a conversational answer
    pub async fn generate(&self, request: &ChatRequest) -> Result<GeneralReply, AgentError> {
        let schema = reply_schema();

        let mut system = GENERAL_SYSTEM_PROMPT.to_string();
        if let Some(profile) = request.profile.as_ref().filter(|p| !p.is_empty()) {
            system.push_str("\n\nKnown about this user:\n");
            system.push_str(&profile.prompt_context());
        }

        let generate = push_history(
            GenerateRequest::new(system).with_response_schema(schema.to_wire()),
            &request.history,
        )
        .with_user_message(&request.message);

        let response = self.llm.generate(generate).await?;
        parse_validated(&response.text, &schema)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use health_agent_core::{GenerateResponse, HealthProfile};
    use parking_lot::Mutex;

    struct RecordingLlm {
        reply: &'static str,
        last_request: Mutex<Option<GenerateRequest>>,
    }

    #[async_trait]
    impl LanguageModel for RecordingLlm {
        async fn generate(
            &self,
            request: GenerateRequest,
        ) -> health_agent_core::Result<GenerateResponse> {
            *self.last_request.lock() = Some(request);
            Ok(GenerateResponse::text(self.reply))
        }

        async fn is_available(&self) -> bool {
            true
        }

        fn model_name(&self) -> &str {
            "recording"
        }
    }

    #[tokio::test]
    async fn test_generates_validated_reply() {
        let llm = Arc::new(RecordingLlm {
            reply: r#"{"response":"Rest and fluids usually help."}"#,
            last_request: Mutex::new(None),
        });
        let generator = GeneralGenerator::new(llm);

        let reply = generator
            .generate(&ChatRequest::new("I have a headache"))
            .await
            .unwrap();
        assert_eq!(reply.response, "Rest and fluids usually help.");
    }

    #[tokio::test]
    async fn test_profile_reaches_the_prompt() {
        let llm = Arc::new(RecordingLlm {
            reply: r#"{"response":"ok"}"#,
            last_request: Mutex::new(None),
        });
        let generator = GeneralGenerator::new(llm.clone());

        let profile = HealthProfile {
            allergies: vec!["penicillin".to_string()],
            chronic_conditions: Vec::new(),
            emergency_contact: None,
        };
        generator
            .generate(&ChatRequest::new("Can I take amoxicillin?").with_profile(profile))
            .await
            .unwrap();

        let request = llm.last_request.lock().clone().unwrap();
        assert!(request.messages[0].content.contains("penicillin"));
    }

    #[tokio::test]
    async fn test_extra_fields_fail_validation() {
        let llm = Arc::new(RecordingLlm {
            reply: r#"{"response":"hi","mood":"cheerful"}"#,
            last_request: Mutex::new(None),
        });
        let generator = GeneralGenerator::new(llm);

        let err = generator
            .generate(&ChatRequest::new("hello"))
            .await
            .unwrap_err();
        assert!(matches!(err, AgentError::Validation(_)));
    }
}
