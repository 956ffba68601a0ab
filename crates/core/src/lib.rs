//! Core traits and types for the health assistant
//!
//! This crate provides foundational types used across all other crates:
//! - Core traits for pluggable backends (LLM, speech, search, profile store)
//! - Conversation turn types and chat request shapes
//! - Output schema validation for structured generation results
//! - Audio chunk types for the synthesis stream
//! - Error taxonomy

pub mod audio;
pub mod conversation;
pub mod error;
pub mod llm_types;
pub mod profile;
pub mod schema;
pub mod traits;

pub use audio::AudioChunk;
pub use conversation::{ChatHistory, ChatRequest, ChatTurn, TurnRole};
pub use error::{Error, Result};
pub use llm_types::{FinishReason, GenerateRequest, GenerateResponse, Message, Role, TokenUsage};
pub use profile::HealthProfile;
pub use schema::{FieldType, Schema, SchemaViolation};

pub use traits::{
    // LLM
    LanguageModel,
    // Speech
    AudioStream, SpeechSynthesizer,
    // Search
    SearchProvider, SearchResult,
    // External stores
    IdentityVerifier, ProfileStore,
};
