//! Speech synthesis interface

use std::pin::Pin;

use futures::Stream;

use crate::{AudioChunk, Result};

/// A lazy, finite, non-restartable sequence of audio chunks. Consuming it
/// twice requires calling `synthesize` again.
pub type AudioStream = Pin<Box<dyn Stream<Item = Result<AudioChunk>> + Send>>;

/// Text-to-speech interface
///
/// Implementations:
/// - `SpeechClient` - hosted speech model with a streamed transport
///
/// The returned stream yields each chunk as soon as it is available; the
/// caller may consume chunk 1 before chunk 2 is produced. A mid-stream
/// failure of the underlying model terminates the stream with an error,
/// but chunks already yielded remain valid and must still be played back.
pub trait SpeechSynthesizer: Send + Sync + 'static {
    /// Synthesize text into a stream of audio chunks.
    ///
    /// Structural markup is stripped before the text reaches the speech
    /// model; if nothing remains, the stream terminates immediately with
    /// zero chunks (not an error).
    fn synthesize(&self, text: &str) -> AudioStream;

    /// Get model name for logging
    fn model_name(&self) -> &str;
}
