//! # Error Taxonomy
//!
//! Failure semantics by concern:
//!
//! - [`ConfigError`] is synchronous and fatal to the construction attempt.
//! - [`AnswerError`] settles exactly one in-flight answer; other pending
//!   requests and the engine itself are unaffected.
//! - Handler failures are caught per invocation and never surface here.
//! - Malformed or foreign inbound traffic is not an error at all; it is
//!   filtered silently on the shared transport.

use thiserror::Error;

/// Errors from validating [`Options`](crate::Options) at construction time.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// The channel identifier contains the reserved `':'` delimiter.
    #[error("channel identifier must not contain ':': {channel:?}")]
    InvalidChannel {
        /// The rejected channel identifier.
        channel: String,
    },
}

/// Errors that settle an [`Answer`](crate::Answer).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AnswerError {
    /// No matching reply arrived within `max_wait_time`.
    ///
    /// The display text is part of the wire-level contract and must not
    /// change: callers match on it.
    #[error("Response timeout reached.")]
    Timeout,

    /// The messenger was closed before a reply arrived.
    #[error("messenger closed before a reply arrived")]
    Closed,
}

/// Errors from the transport seam.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// The transport was torn down and can no longer carry messages.
    #[error("transport closed")]
    Closed,

    /// The transport rejected an outbound message.
    #[error("transport send failed: {0}")]
    Send(String),
}

/// Errors from [`Messenger::post`](crate::Messenger::post).
#[derive(Debug, Error)]
pub enum PostError {
    /// The payload could not be serialized to JSON.
    #[error("payload serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),

    /// The transport rejected the request envelope.
    #[error(transparent)]
    Transport(#[from] TransportError),
}
