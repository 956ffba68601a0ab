//! Core trait interfaces for pluggable backends

pub mod llm;
pub mod search;
pub mod speech;
pub mod store;

pub use llm::LanguageModel;
pub use search::{SearchProvider, SearchResult};
pub use speech::{AudioStream, SpeechSynthesizer};
pub use store::{IdentityVerifier, ProfileStore};
