//! Streaming speech synthesis client
//!
//! Sends stripped text to the hosted speech model and decodes its
//! streamed transport encoding into ordered audio chunks. The transport
//! is newline-delimited JSON: each line carries one base64 audio payload,
//! decoded and yielded as soon as the line completes, so the caller can
//! start playback before synthesis finishes.

use base64::Engine;
use futures::StreamExt;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use health_agent_core::{AudioChunk, AudioStream, Error, SpeechSynthesizer};

use crate::markup::strip_markup;
use crate::SpeechError;

/// Speech client configuration
#[derive(Debug, Clone)]
pub struct SpeechConfig {
    /// API endpoint
    pub endpoint: String,
    /// Speech model name
    pub model: String,
    /// Voice ID
    pub voice: String,
    /// Transport audio format requested from the model
    pub audio_format: String,
    /// API key (optional)
    pub api_key: Option<String>,
    /// Request timeout
    pub timeout: std::time::Duration,
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:8880".to_string(),
            model: "kokoro".to_string(),
            voice: "af_heart".to_string(),
            audio_format: "mp3".to_string(),
            api_key: None,
            timeout: std::time::Duration::from_secs(30),
        }
    }
}

/// Streaming speech synthesis client
#[derive(Clone)]
pub struct SpeechClient {
    client: Client,
    config: SpeechConfig,
}

impl SpeechClient {
    /// Create a new client
    pub fn new(config: SpeechConfig) -> Result<Self, SpeechError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| SpeechError::Configuration(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { client, config })
    }

    fn stream_url(&self) -> String {
        format!("{}/v1/audio/speech/stream", self.config.endpoint)
    }
}

impl SpeechSynthesizer for SpeechClient {
    fn synthesize(&self, text: &str) -> AudioStream {
        let spoken = strip_markup(text);
        if spoken.is_empty() {
            // Nothing speakable: terminate immediately with zero chunks.
            return Box::pin(futures::stream::empty());
        }

        let client = self.client.clone();
        let config = self.config.clone();
        let url = self.stream_url();

        Box::pin(async_stream::try_stream! {
            let request = WireSpeechRequest {
                model: config.model.clone(),
                input: spoken,
                voice: config.voice.clone(),
                format: config.audio_format.clone(),
            };

            let mut builder = client.post(&url).json(&request);
            if let Some(key) = &config.api_key {
                builder = builder.bearer_auth(key);
            }

            let response = builder
                .send()
                .await
                .map_err(|e| Error::from(SpeechError::from(e)))?;

            if !response.status().is_success() {
                let status = response.status();
                let body = response.text().await.unwrap_or_default();
                Err(Error::from(SpeechError::Api(format!("{}: {}", status, body))))?;
            } else {

            // Dropping the stream mid-consumption drops `bytes` and with it
            // the underlying connection, so early termination by the
            // consumer cannot leak the response handle.
            let mut bytes = response.bytes_stream();
            let mut lines = LineBuffer::new();
            let mut seq = 0u64;

            while let Some(piece) = bytes.next().await {
                let piece = piece.map_err(|e| Error::from(SpeechError::from(e)))?;
                for line in lines.push(&piece) {
                    if let Some(data) = decode_event(&line).map_err(Error::from)? {
                        yield AudioChunk::new(data, seq);
                        seq += 1;
                    }
                }
            }

            if let Some(line) = lines.finish() {
                if let Some(data) = decode_event(&line).map_err(Error::from)? {
                    yield AudioChunk::new(data, seq);
                }
            }
            }
        })
    }

    fn model_name(&self) -> &str {
        &self.config.model
    }
}

/// Accumulates transport bytes and emits complete lines.
///
/// Network reads split lines arbitrarily; a JSON event is only decoded
/// once its terminating newline has arrived.
pub(crate) struct LineBuffer {
    buf: Vec<u8>,
}

impl LineBuffer {
    pub(crate) fn new() -> Self {
        Self { buf: Vec::new() }
    }

    /// Feed bytes, returning every line completed by this read
    pub(crate) fn push(&mut self, bytes: &[u8]) -> Vec<String> {
        self.buf.extend_from_slice(bytes);

        let mut lines = Vec::new();
        while let Some(pos) = self.buf.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = self.buf.drain(..=pos).collect();
            let line = String::from_utf8_lossy(&line[..line.len() - 1]);
            let line = line.trim();
            if !line.is_empty() {
                lines.push(line.to_string());
            }
        }
        lines
    }

    /// Flush any unterminated trailing line at end of stream
    pub(crate) fn finish(self) -> Option<String> {
        let line = String::from_utf8_lossy(&self.buf);
        let line = line.trim();
        if line.is_empty() {
            None
        } else {
            Some(line.to_string())
        }
    }
}

/// Decode one transport line into raw audio bytes.
///
/// Returns `None` for non-audio events (the final `done` marker).
pub(crate) fn decode_event(line: &str) -> Result<Option<Vec<u8>>, SpeechError> {
    let event: WireSpeechEvent = serde_json::from_str(line)
        .map_err(|e| SpeechError::Transport(format!("malformed event: {}", e)))?;

    if let Some(message) = event.error {
        return Err(SpeechError::Api(message));
    }

    match event.audio {
        Some(encoded) => {
            let data = base64::engine::general_purpose::STANDARD
                .decode(encoded.as_bytes())
                .map_err(|e| SpeechError::Transport(format!("invalid base64 payload: {}", e)))?;
            Ok(Some(data))
        }
        None => Ok(None),
    }
}

#[derive(Debug, Serialize)]
struct WireSpeechRequest {
    model: String,
    input: String,
    voice: String,
    format: String,
}

#[derive(Debug, Deserialize)]
struct WireSpeechEvent {
    /// Base64-encoded audio payload; absent on the final `done` marker
    #[serde(default)]
    audio: Option<String>,
    /// Mid-stream failure reported by the model
    #[serde(default)]
    error: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;

    fn encode(data: &[u8]) -> String {
        base64::engine::general_purpose::STANDARD.encode(data)
    }

    #[test]
    fn test_line_buffer_reassembles_split_lines() {
        let mut lines = LineBuffer::new();
        assert!(lines.push(b"{\"audio\":").is_empty());
        let complete = lines.push(b"\"QQ==\"}\n{\"done\":true}\n");
        assert_eq!(complete.len(), 2);
        assert_eq!(complete[0], "{\"audio\":\"QQ==\"}");
        assert_eq!(complete[1], "{\"done\":true}");
        assert!(lines.finish().is_none());
    }

    #[test]
    fn test_line_buffer_flushes_trailing_line() {
        let mut lines = LineBuffer::new();
        assert!(lines.push(b"{\"done\":true}").is_empty());
        assert_eq!(lines.finish().unwrap(), "{\"done\":true}");
    }

    #[test]
    fn test_decode_audio_event() {
        let line = format!("{{\"audio\":\"{}\"}}", encode(b"pcm"));
        let data = decode_event(&line).unwrap().unwrap();
        assert_eq!(data, b"pcm");
    }

    #[test]
    fn test_decode_done_event_yields_nothing() {
        assert!(decode_event("{\"done\":true}").unwrap().is_none());
    }

    #[test]
    fn test_decode_error_event() {
        let err = decode_event("{\"error\":\"voice unavailable\"}").unwrap_err();
        assert!(matches!(err, SpeechError::Api(_)));
    }

    #[test]
    fn test_decode_malformed_line() {
        let err = decode_event("not json").unwrap_err();
        assert!(matches!(err, SpeechError::Transport(_)));
    }

    #[test]
    fn test_transport_lines_decode_in_order() {
        let mut lines = LineBuffer::new();
        let body = format!(
            "{{\"audio\":\"{}\"}}\n{{\"audio\":\"{}\"}}\n{{\"audio\":\"{}\"}}\n{{\"done\":true}}\n",
            encode(b"one"),
            encode(b"two"),
            encode(b"three"),
        );

        let mut chunks = Vec::new();
        for line in lines.push(body.as_bytes()) {
            if let Some(data) = decode_event(&line).unwrap() {
                chunks.push(data);
            }
        }
        assert_eq!(chunks, vec![b"one".to_vec(), b"two".to_vec(), b"three".to_vec()]);
    }

    #[tokio::test]
    async fn test_empty_input_synthesizes_zero_chunks() {
        let client = SpeechClient::new(SpeechConfig::default()).unwrap();
        // Whitespace and markup-only inputs never reach the network.
        let mut stream = client.synthesize("   ");
        assert!(stream.next().await.is_none());

        let mut stream = client.synthesize("** ** #");
        assert!(stream.next().await.is_none());
    }
}
