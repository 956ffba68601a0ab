//! Conversation turns and chat request shapes

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::profile::HealthProfile;

/// Role in a conversation turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnRole {
    /// User message
    User,
    /// Assistant message
    Assistant,
}

impl TurnRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            TurnRole::User => "user",
            TurnRole::Assistant => "assistant",
        }
    }
}

impl std::fmt::Display for TurnRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A single turn in the conversation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatTurn {
    /// Role of the speaker
    pub role: TurnRole,
    /// Content of the turn
    pub content: String,
    /// When the turn occurred
    pub timestamp: DateTime<Utc>,
}

impl ChatTurn {
    /// Create a new turn
    pub fn new(role: TurnRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            timestamp: Utc::now(),
        }
    }

    /// Create a user turn
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(TurnRole::User, content)
    }

    /// Create an assistant turn
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(TurnRole::Assistant, content)
    }
}

/// Ordered conversation history. Insertion order is significant and the
/// sequence is append-only for the duration of a session; it is owned by
/// the caller, not by the core.
pub type ChatHistory = Vec<ChatTurn>;

/// Read-only input to a generator: the inbound message, the caller-owned
/// history, and an optional health profile used to enrich the prompt.
#[derive(Debug, Clone)]
pub struct ChatRequest {
    /// The inbound user message
    pub message: String,
    /// Prior turns, chronological
    pub history: ChatHistory,
    /// Health profile from the external document store, if available
    pub profile: Option<HealthProfile>,
}

impl ChatRequest {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            history: Vec::new(),
            profile: None,
        }
    }

    pub fn with_history(mut self, history: ChatHistory) -> Self {
        self.history = history;
        self
    }

    pub fn with_profile(mut self, profile: HealthProfile) -> Self {
        self.profile = Some(profile);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_turn_creation() {
        let turn = ChatTurn::user("What is paracetamol used for?");
        assert_eq!(turn.role, TurnRole::User);
        assert_eq!(turn.role.as_str(), "user");

        let turn = ChatTurn::assistant("Paracetamol relieves pain and fever.");
        assert_eq!(turn.role, TurnRole::Assistant);
    }

    #[test]
    fn test_request_builder() {
        let request = ChatRequest::new("I have a headache")
            .with_history(vec![ChatTurn::user("hi"), ChatTurn::assistant("hello")]);
        assert_eq!(request.history.len(), 2);
        assert!(request.profile.is_none());
    }
}
