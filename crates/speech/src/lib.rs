//! Streaming speech synthesis and playback coordination
//!
//! Two halves of one pipeline:
//! - `SpeechClient` produces an ordered stream of audio chunks from text,
//!   decoding the speech model's transport encoding incrementally.
//! - `PlaybackCoordinator` consumes that stream into an append-only audio
//!   buffer under strict backpressure, one session per output device.

pub mod markup;
pub mod playback;
pub mod synthesizer;

pub use markup::strip_markup;
pub use playback::{
    AudioOutput, AudioSink, PlaybackConfig, PlaybackCoordinator, PlaybackState,
};
pub use synthesizer::{SpeechClient, SpeechConfig};

use thiserror::Error;

/// Speech pipeline errors
#[derive(Error, Debug)]
pub enum SpeechError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("API error: {0}")]
    Api(String),

    #[error("Transport decode error: {0}")]
    Transport(String),

    #[error("Playback buffer did not open in time")]
    BufferTimeout,

    #[error("Playback buffer error: {0}")]
    Buffer(String),

    #[error("Cancelled")]
    Cancelled,
}

impl From<reqwest::Error> for SpeechError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            SpeechError::Network("request timed out".to_string())
        } else {
            SpeechError::Network(err.to_string())
        }
    }
}

impl From<SpeechError> for health_agent_core::Error {
    fn from(err: SpeechError) -> Self {
        match err {
            SpeechError::BufferTimeout | SpeechError::Buffer(_) => {
                health_agent_core::Error::Playback(err.to_string())
            }
            SpeechError::Cancelled => health_agent_core::Error::Cancelled,
            _ => health_agent_core::Error::Synthesis(err.to_string()),
        }
    }
}
