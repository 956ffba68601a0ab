//! Intent routing and response generation
//!
//! One logical turn runs sequentially: the router classifies the inbound
//! message, exactly one generator produces the reply, and the output
//! schema validator gates the result before it leaves this crate.

pub mod agent;
pub mod general;
pub mod medicine;
pub mod router;

pub use agent::{ChatReply, HealthAgent};
pub use general::{GeneralGenerator, GeneralReply};
pub use medicine::{MedicineAnswer, MedicineGenerator, SourceLink};
pub use router::{IntentRouter, Route};

use thiserror::Error;

use health_agent_core::{ChatTurn, GenerateRequest, SchemaViolation, TurnRole};

/// Agent errors
#[derive(Error, Debug)]
pub enum AgentError {
    /// Model call failed (timeout, transport, API error)
    #[error("Generation failed: {0}")]
    Generation(String),

    /// Result did not satisfy its declared output schema
    #[error("Output validation failed: {0}")]
    Validation(#[from] SchemaViolation),

    /// Model produced something that is not parseable JSON at all
    #[error("Malformed generator output: {0}")]
    MalformedOutput(String),
}

impl From<health_agent_core::Error> for AgentError {
    fn from(err: health_agent_core::Error) -> Self {
        match err {
            health_agent_core::Error::Validation(v) => AgentError::Validation(v),
            other => AgentError::Generation(other.to_string()),
        }
    }
}

impl From<AgentError> for health_agent_core::Error {
    fn from(err: AgentError) -> Self {
        match err {
            AgentError::Validation(v) => health_agent_core::Error::Validation(v),
            other => health_agent_core::Error::Generation(other.to_string()),
        }
    }
}

/// Linearize history in chronological order into the message list.
///
/// No truncation here: capping history length is the caller's concern.
pub(crate) fn push_history(mut request: GenerateRequest, history: &[ChatTurn]) -> GenerateRequest {
    for turn in history {
        request = match turn.role {
            TurnRole::User => request.with_user_message(&turn.content),
            TurnRole::Assistant => request.with_assistant_message(&turn.content),
        };
    }
    request
}

/// Parse and gate a structured generation result.
///
/// The schema that was sent to the model is the same schema the result is
/// validated against; a mismatch is terminal for the turn and never
/// retried.
pub(crate) fn parse_validated<T: serde::de::DeserializeOwned>(
    text: &str,
    schema: &health_agent_core::Schema,
) -> Result<T, AgentError> {
    let value: serde_json::Value =
        serde_json::from_str(text).map_err(|e| AgentError::MalformedOutput(e.to_string()))?;
    schema.validate(&value)?;
    serde_json::from_value(value).map_err(|e| AgentError::MalformedOutput(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use health_agent_core::{FieldType, Schema};

    #[test]
    fn test_push_history_preserves_order() {
        let history = vec![
            ChatTurn::user("first"),
            ChatTurn::assistant("second"),
            ChatTurn::user("third"),
        ];
        let request = push_history(GenerateRequest::new("system"), &history);

        assert_eq!(request.messages.len(), 4);
        assert_eq!(request.messages[1].content, "first");
        assert_eq!(request.messages[2].content, "second");
        assert_eq!(request.messages[3].content, "third");
    }

    #[test]
    fn test_parse_validated_rejects_unknown_fields() {
        #[derive(serde::Deserialize, Debug)]
        struct Reply {
            #[allow(dead_code)]
            response: String,
        }

        let schema = Schema::new().required("response", FieldType::String);
        let err =
            parse_validated::<Reply>(r#"{"response":"hi","extra":1}"#, &schema).unwrap_err();
        assert!(matches!(err, AgentError::Validation(_)));
    }

    #[test]
    fn test_parse_validated_rejects_non_json() {
        #[derive(serde::Deserialize, Debug)]
        struct Reply {
            #[allow(dead_code)]
            response: String,
        }

        let schema = Schema::new().required("response", FieldType::String);
        let err = parse_validated::<Reply>("I am not JSON", &schema).unwrap_err();
        assert!(matches!(err, AgentError::MalformedOutput(_)));
    }
}
