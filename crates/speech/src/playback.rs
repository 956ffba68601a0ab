//! Playback buffer coordination
//!
//! Consumes a synthesis chunk stream into an append-only audio buffer.
//! One coordinator owns one output device; at most one session is active
//! at a time, and starting a new one supersedes (never queues behind) the
//! previous session. The consume loop appends strictly in order and waits
//! for each append's completion signal before issuing the next — the
//! append future itself is the backpressure bound.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use parking_lot::Mutex;
use tokio::sync::{watch, Mutex as AsyncMutex};
use tokio::task::JoinHandle;
use uuid::Uuid;

use health_agent_core::{AudioChunk, AudioStream};

use crate::SpeechError;

/// Append-only audio buffer handle.
///
/// Buffer handles are a scarce resource; `release` is deterministic and
/// idempotent and never relies on drop timing. An in-flight `append`
/// future may be dropped when its session is cancelled; `release` must
/// remain safe afterwards.
#[async_trait]
pub trait AudioSink: Send + Sync + 'static {
    /// Append one chunk. Resolves only when the buffer is ready to accept
    /// the next append; the coordinator is the sole appender, so awaiting
    /// this future is what prevents concurrent appends.
    async fn append(&self, chunk: AudioChunk) -> Result<(), SpeechError>;

    /// Signal end-of-stream once the final append has completed
    async fn finalize(&self) -> Result<(), SpeechError>;

    /// Suspend or resume audible output without discarding buffered audio
    fn set_paused(&self, paused: bool);

    /// Release the underlying buffer handle
    fn release(&self);
}

/// Opens fresh playback buffers for a device
#[async_trait]
pub trait AudioOutput: Send + Sync + 'static {
    async fn open(&self) -> Result<Arc<dyn AudioSink>, SpeechError>;
}

/// Playback session states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackState {
    /// No active session
    Idle,
    /// Consuming the chunk stream; nothing audible yet
    Appending,
    /// Audio is audible; the stream may still be draining into the buffer
    Playing,
    /// Output suspended, buffered audio retained
    Paused,
    /// Stream exhausted and buffer finalized
    Ended,
    /// Append or stream failure; auto-clears back to idle
    Errored,
}

impl PlaybackState {
    fn is_active(self) -> bool {
        matches!(self, PlaybackState::Appending | PlaybackState::Playing)
    }
}

/// Coordinator configuration
#[derive(Debug, Clone)]
pub struct PlaybackConfig {
    /// Timeout for acquiring a fresh playback buffer
    pub buffer_open_timeout: Duration,
    /// Delay before an errored session auto-clears. A UX debounce, not a
    /// retry.
    pub error_clear: Duration,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            buffer_open_timeout: Duration::from_secs(5),
            error_clear: Duration::from_secs(5),
        }
    }
}

struct ActiveSession {
    id: Uuid,
    item_id: String,
    sink: Arc<dyn AudioSink>,
    state_tx: Arc<watch::Sender<PlaybackState>>,
    state_rx: watch::Receiver<PlaybackState>,
    cancel_tx: watch::Sender<bool>,
    /// State to restore when a pause is lifted
    resume_to: Mutex<PlaybackState>,
    task: JoinHandle<()>,
}

/// Per-device playback coordinator.
///
/// An explicit owned resource held by the session that uses it, so
/// independent sessions (and tests) run without cross-contamination.
pub struct PlaybackCoordinator {
    output: Arc<dyn AudioOutput>,
    config: PlaybackConfig,
    current: AsyncMutex<Option<ActiveSession>>,
    /// User-visible message for the most recent failure
    error_message: Arc<Mutex<Option<String>>>,
}

impl PlaybackCoordinator {
    pub fn new(output: Arc<dyn AudioOutput>, config: PlaybackConfig) -> Self {
        Self {
            output,
            config,
            current: AsyncMutex::new(None),
            error_message: Arc::new(Mutex::new(None)),
        }
    }

    /// Start playback of `stream` for `item_id`.
    ///
    /// Any existing session is torn down first — output stopped, buffer
    /// handle released, pending chunks discarded — before the new buffer
    /// is opened, so the new session's first append can never race the old
    /// session's handle.
    pub async fn play(
        &self,
        item_id: impl Into<String>,
        stream: AudioStream,
    ) -> Result<watch::Receiver<PlaybackState>, SpeechError> {
        let item_id = item_id.into();
        let mut current = self.current.lock().await;

        if let Some(previous) = current.take() {
            teardown(previous).await;
        }

        let sink = tokio::time::timeout(self.config.buffer_open_timeout, self.output.open())
            .await
            .map_err(|_| SpeechError::BufferTimeout)??;

        let (state_tx, state_rx) = watch::channel(PlaybackState::Idle);
        let state_tx = Arc::new(state_tx);
        let (cancel_tx, cancel_rx) = watch::channel(false);

        let session_id = Uuid::new_v4();
        tracing::debug!(session = %session_id, item = %item_id, "Starting playback session");

        let task = tokio::spawn(run_session(
            stream,
            sink.clone(),
            state_tx.clone(),
            cancel_rx,
            self.error_message.clone(),
            self.config.error_clear,
        ));

        let session = ActiveSession {
            id: session_id,
            item_id,
            sink,
            state_tx,
            state_rx: state_rx.clone(),
            cancel_tx,
            resume_to: Mutex::new(PlaybackState::Playing),
            task,
        };
        *current = Some(session);

        Ok(state_rx)
    }

    /// Pause the active session's output. Buffered audio is retained.
    pub async fn pause(&self) {
        let current = self.current.lock().await;
        if let Some(session) = current.as_ref() {
            let state = *session.state_rx.borrow();
            if state.is_active() {
                *session.resume_to.lock() = state;
                session.sink.set_paused(true);
                let _ = session.state_tx.send(PlaybackState::Paused);
            }
        }
    }

    /// Resume a paused session
    pub async fn resume(&self) {
        let current = self.current.lock().await;
        if let Some(session) = current.as_ref() {
            if *session.state_rx.borrow() == PlaybackState::Paused {
                session.sink.set_paused(false);
                let _ = session.state_tx.send(*session.resume_to.lock());
            }
        }
    }

    /// Toggle playback for `item_id`.
    ///
    /// Returns `true` when the toggle applied to the current session
    /// (paused or resumed it). Returns `false` when `item_id` is not the
    /// current item — the caller should start a new playback, which
    /// supersedes the current session outright.
    pub async fn toggle(&self, item_id: &str) -> bool {
        let is_current = {
            let current = self.current.lock().await;
            match current.as_ref() {
                Some(session) if session.item_id == item_id => {
                    Some(*session.state_rx.borrow() == PlaybackState::Paused)
                }
                _ => None,
            }
        };

        match is_current {
            Some(true) => {
                self.resume().await;
                true
            }
            Some(false) => {
                self.pause().await;
                true
            }
            None => false,
        }
    }

    /// Cancel the active session, releasing its buffer handle
    pub async fn cancel(&self) {
        let mut current = self.current.lock().await;
        if let Some(session) = current.take() {
            tracing::debug!(session = %session.id, "Cancelling playback session");
            teardown(session).await;
        }
    }

    /// Current session state (`Idle` when no session exists)
    pub async fn state(&self) -> PlaybackState {
        let current = self.current.lock().await;
        current
            .as_ref()
            .map(|s| *s.state_rx.borrow())
            .unwrap_or(PlaybackState::Idle)
    }

    /// User-visible message for the most recent failure, if it has not
    /// auto-cleared yet
    pub fn error_message(&self) -> Option<String> {
        self.error_message.lock().clone()
    }
}

/// Stop the session's task and wait until its buffer handle is released
async fn teardown(session: ActiveSession) {
    let _ = session.cancel_tx.send(true);
    let _ = session.task.await;
}

async fn run_session(
    mut stream: AudioStream,
    sink: Arc<dyn AudioSink>,
    state_tx: Arc<watch::Sender<PlaybackState>>,
    mut cancel_rx: watch::Receiver<bool>,
    error_message: Arc<Mutex<Option<String>>>,
    error_clear: Duration,
) {
    let _ = state_tx.send(PlaybackState::Appending);
    let mut appended = 0u64;

    loop {
        // Cancellation wins over further stream progress; a changed() error
        // means the coordinator itself is gone, which cancels too.
        let next = tokio::select! {
            biased;
            _ = cancel_rx.changed() => {
                sink.release();
                let _ = state_tx.send(PlaybackState::Idle);
                return;
            }
            item = stream.next() => item,
        };

        match next {
            Some(Ok(chunk)) => {
                let seq = chunk.seq;
                let result = tokio::select! {
                    biased;
                    _ = cancel_rx.changed() => {
                        sink.release();
                        let _ = state_tx.send(PlaybackState::Idle);
                        return;
                    }
                    result = sink.append(chunk) => result,
                };

                match result {
                    Ok(()) => {
                        appended += 1;
                        if appended == 1 && *state_tx.borrow() == PlaybackState::Appending {
                            let _ = state_tx.send(PlaybackState::Playing);
                        }
                    }
                    Err(e) => {
                        tracing::error!(seq, error = %e, "Audio buffer rejected append");
                        fail(
                            &sink,
                            &state_tx,
                            &error_message,
                            error_clear,
                            format!("Audio playback failed: {}", e),
                        );
                        return;
                    }
                }
            }
            Some(Err(e)) => {
                // Synthesis died mid-stream. Chunks already appended stay
                // playable: finalize the buffer so it drains, then give the
                // handle back.
                tracing::error!(error = %e, "Synthesis stream failed mid-playback");
                let _ = sink.finalize().await;
                fail(
                    &sink,
                    &state_tx,
                    &error_message,
                    error_clear,
                    format!("Speech is unavailable: {}", e),
                );
                return;
            }
            None => {
                match sink.finalize().await {
                    Ok(()) => {
                        sink.release();
                        let _ = state_tx.send(PlaybackState::Ended);
                        tracing::debug!(chunks = appended, "Playback stream complete");
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "Failed to finalize audio buffer");
                        fail(
                            &sink,
                            &state_tx,
                            &error_message,
                            error_clear,
                            format!("Audio playback failed: {}", e),
                        );
                    }
                }
                return;
            }
        }
    }
}

/// Release resources, surface a user-visible message and schedule the
/// auto-clear back to idle
fn fail(
    sink: &Arc<dyn AudioSink>,
    state_tx: &Arc<watch::Sender<PlaybackState>>,
    error_message: &Arc<Mutex<Option<String>>>,
    error_clear: Duration,
    message: String,
) {
    sink.release();
    *error_message.lock() = Some(message);
    let _ = state_tx.send(PlaybackState::Errored);

    let error_message = error_message.clone();
    let state_tx = state_tx.clone();
    tokio::spawn(async move {
        tokio::time::sleep(error_clear).await;
        *error_message.lock() = None;
        if *state_tx.borrow() == PlaybackState::Errored {
            let _ = state_tx.send(PlaybackState::Idle);
        }
    });
}
