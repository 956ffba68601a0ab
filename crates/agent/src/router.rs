//! Intent routing
//!
//! One classification call decides whether an inbound message is a
//! medicine lookup or general conversation. The loosely-typed classifier
//! payload is validated and immediately collapsed into a tagged variant;
//! optional fields never travel deeper into the pipeline.

use std::sync::Arc;

use serde::Deserialize;

use health_agent_core::{ChatTurn, FieldType, GenerateRequest, LanguageModel, Schema};

use crate::{parse_validated, push_history, AgentError};

const ROUTER_SYSTEM_PROMPT: &str = "\
You classify messages for a health-information assistant.

Decide whether the user's latest message asks about a specific medicine, \
drug, or pharmaceutical product (uses, dosage, side effects, interactions, \
brand or generic names). If it does, extract the medicine name exactly as \
the user wrote it.

Respond with JSON only:
- should_route: true when the message is a medicine lookup
- medicine_name: the medicine asked about, omitted otherwise

General symptoms, lifestyle questions and smalltalk are not medicine \
lookups.";

/// Routing decision, produced once per inbound message and consumed
/// immediately
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    /// Fall through to the general conversational generator
    General,
    /// Route to the medicine lookup generator with a usable query term
    Medicine { name: String },
}

/// Raw classifier payload, kept private to the router
#[derive(Debug, Deserialize)]
struct Classification {
    should_route: bool,
    #[serde(default)]
    medicine_name: Option<String>,
}

fn classification_schema() -> Schema {
    Schema::new()
        .required("should_route", FieldType::Boolean)
        .optional("medicine_name", FieldType::String)
}

/// Intent router
pub struct IntentRouter {
    llm: Arc<dyn LanguageModel>,
}

impl IntentRouter {
    pub fn new(llm: Arc<dyn LanguageModel>) -> Self {
        Self { llm }
    }

    /// Classify a message.
    ///
    /// Never fails the turn: any classification failure logs a warning and
    /// defaults to the general path.
    pub async fn route(&self, message: &str, history: &[ChatTurn]) -> Route {
        match self.classify(message, history).await {
            Ok(route) => route,
            Err(e) => {
                tracing::warn!(error = %e, "Intent classification failed, defaulting to general path");
                Route::General
            }
        }
    }

    async fn classify(&self, message: &str, history: &[ChatTurn]) -> Result<Route, AgentError> {
        let schema = classification_schema();
        let request = push_history(
            GenerateRequest::new(ROUTER_SYSTEM_PROMPT)
                .with_temperature(0.0)
                .with_max_tokens(128)
                .with_response_schema(schema.to_wire()),
            history,
        )
        .with_user_message(message);

        let response = self.llm.generate(request).await?;
        let classification: Classification = parse_validated(&response.text, &schema)?;

        Ok(match classification {
            Classification {
                should_route: true,
                medicine_name: Some(name),
            } if !name.trim().is_empty() => Route::Medicine {
                name: name.trim().to_string(),
            },
            // Routing without a usable query term falls through to the
            // general path.
            _ => Route::General,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use health_agent_core::{Error, GenerateResponse};

    struct ScriptedLlm {
        reply: Result<&'static str, ()>,
    }

    #[async_trait]
    impl LanguageModel for ScriptedLlm {
        async fn generate(
            &self,
            _request: GenerateRequest,
        ) -> health_agent_core::Result<GenerateResponse> {
            match self.reply {
                Ok(text) => Ok(GenerateResponse::text(text)),
                Err(()) => Err(Error::Generation("model timed out".to_string())),
            }
        }

        async fn is_available(&self) -> bool {
            true
        }

        fn model_name(&self) -> &str {
            "scripted"
        }
    }

    fn router(reply: Result<&'static str, ()>) -> IntentRouter {
        IntentRouter::new(Arc::new(ScriptedLlm { reply }))
    }

    fn router_with(reply: &'static str) -> IntentRouter {
        router(Ok(reply))
    }

    #[tokio::test]
    async fn test_explicit_drug_name_routes() {
        let router = router(Ok(r#"{"should_route":true,"medicine_name":"paracetamol"}"#));
        let route = router.route("What is paracetamol used for?", &[]).await;
        assert_eq!(
            route,
            Route::Medicine {
                name: "paracetamol".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_general_message_does_not_route() {
        let router = router(Ok(r#"{"should_route":false}"#));
        let route = router.route("I have a headache", &[]).await;
        assert_eq!(route, Route::General);
    }

    #[tokio::test]
    async fn test_routed_without_name_falls_back_to_general() {
        let router = router(Ok(r#"{"should_route":true}"#));
        assert_eq!(router.route("medicine?", &[]).await, Route::General);

        let router = router_with(r#"{"should_route":true,"medicine_name":"  "}"#);
        assert_eq!(router.route("medicine?", &[]).await, Route::General);
    }

    #[tokio::test]
    async fn test_classifier_failure_defaults_to_general() {
        let router = router(Err(()));
        assert_eq!(router.route("anything", &[]).await, Route::General);
    }

    #[tokio::test]
    async fn test_invalid_classifier_output_defaults_to_general() {
        // Unknown field fails the closed schema.
        let router = router_with(r#"{"should_route":true,"confidence":0.8}"#);
        assert_eq!(router.route("anything", &[]).await, Route::General);

        // Non-JSON output.
        let router = router_with("definitely route this one");
        assert_eq!(router.route("anything", &[]).await, Route::General);
    }
}
