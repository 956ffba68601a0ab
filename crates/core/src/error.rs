//! Error taxonomy shared across the workspace
//!
//! Each crate defines its own `thiserror` enum for local detail and
//! converts into this taxonomy at the boundary where a turn either
//! succeeds or is surfaced to the caller.

use thiserror::Error;

use crate::schema::SchemaViolation;

/// Top-level errors
#[derive(Error, Debug)]
pub enum Error {
    /// Caller identity could not be established
    #[error("unauthorized")]
    Unauthorized,

    /// Admission controller rejected the request
    #[error("rate limit exceeded, retry in {reset_in}s")]
    RateLimited {
        /// Seconds until the caller's window resets
        reset_in: u64,
    },

    /// A generation result did not satisfy its declared output schema.
    /// Never retried automatically; a malformed structured result usually
    /// means a prompt/schema mismatch, not transient noise.
    #[error("schema validation failed: {0}")]
    Validation(#[from] SchemaViolation),

    /// A generation call failed (model timeout, transport error)
    #[error("generation failed: {0}")]
    Generation(String),

    /// Speech synthesis failed; chunks already yielded remain valid
    #[error("synthesis failed: {0}")]
    Synthesis(String),

    /// Playback buffer unavailable or rejected an append
    #[error("playback failed: {0}")]
    Playback(String),

    /// Operation cancelled by a superseding request or the user
    #[error("cancelled")]
    Cancelled,
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Fixed fallback message shown when a terminal generator fails.
    /// The underlying cause goes to the log, never to the user.
    pub const FALLBACK_MESSAGE: &'static str = "I'm having trouble responding right now";
}
