//! # Transport Seam
//!
//! The engine never holds an implicit global reference to the underlying
//! message channel; it is injected as a [`Transport`] capability. Sending is
//! fire-and-forget and synchronous, subscription yields a stream of raw JSON
//! values that may well contain unrelated traffic.

use crate::error::TransportError;
use crate::DEFAULT_CHANNEL_CAPACITY;
use futures::stream::BoxStream;
use futures::StreamExt;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use tokio::sync::broadcast;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tokio_stream::wrappers::BroadcastStream;
use tracing::{debug, warn};

/// Stream of raw inbound transport messages.
pub type InboundStream = BoxStream<'static, serde_json::Value>;

/// Restricts which origins may receive an outbound message.
///
/// Mirrors the `targetOrigin` argument of window-style message channels:
/// [`Any`](Self::Any) is the `"*"` wildcard.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum OriginFilter {
    /// Deliver to any origin (`"*"`).
    #[default]
    Any,
    /// Deliver only to the named origin.
    Exact(String),
}

impl fmt::Display for OriginFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Any => f.write_str("*"),
            Self::Exact(origin) => f.write_str(origin),
        }
    }
}

impl Serialize for OriginFilter {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for OriginFilter {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let origin = String::deserialize(deserializer)?;
        match origin.as_str() {
            "*" => Ok(Self::Any),
            "" => Err(D::Error::custom("origin filter must not be empty")),
            _ => Ok(Self::Exact(origin)),
        }
    }
}

/// A broadcast, fire-and-forget message channel.
///
/// Implementations carry arbitrary JSON values; protocol envelopes share the
/// channel with whatever else the host posts on it.
pub trait Transport: Send + Sync {
    /// Send a message to every current subscriber. Never blocks.
    fn send(
        &self,
        message: serde_json::Value,
        origin: &OriginFilter,
    ) -> Result<(), TransportError>;

    /// Subscribe to the inbound message stream.
    fn subscribe(&self) -> InboundStream;
}

/// In-memory [`Transport`] over `tokio::sync::broadcast`.
///
/// Suitable for same-process messaging and as a test double. A send with no
/// live subscribers is a logged drop, not an error, matching the
/// fire-and-forget contract.
pub struct InMemoryTransport {
    sender: broadcast::Sender<serde_json::Value>,
    capacity: usize,
}

impl InMemoryTransport {
    /// Create a transport with the default buffer capacity.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CHANNEL_CAPACITY)
    }

    /// Create a transport buffering up to `capacity` messages per subscriber.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender, capacity }
    }

    /// Number of live subscribers.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }

    /// Per-subscriber buffer capacity.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for InMemoryTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for InMemoryTransport {
    fn send(
        &self,
        message: serde_json::Value,
        origin: &OriginFilter,
    ) -> Result<(), TransportError> {
        match self.sender.send(message) {
            Ok(receivers) => {
                debug!(receivers, origin = %origin, "Message sent");
            }
            Err(_) => {
                // No receivers: the message is dropped.
                warn!(origin = %origin, "Message dropped (no subscribers)");
            }
        }
        Ok(())
    }

    fn subscribe(&self) -> InboundStream {
        BroadcastStream::new(self.sender.subscribe())
            .filter_map(|item| async move {
                match item {
                    Ok(message) => Some(message),
                    Err(BroadcastStreamRecvError::Lagged(count)) => {
                        debug!(lagged = count, "Subscriber lagged, some messages dropped");
                        None
                    }
                }
            })
            .boxed()
    }
}
