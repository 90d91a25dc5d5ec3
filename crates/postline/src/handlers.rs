//! # Handler Registry
//!
//! Ordered collection of inbound-request callbacks. Handlers run
//! sequentially in registration order; a failing handler is caught and
//! logged locally and never prevents the remaining handlers from running.

use async_trait::async_trait;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

/// Opaque key for a registered handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HandlerId(Uuid);

impl HandlerId {
    /// Generate a fresh handler id.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for HandlerId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for HandlerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Callback invoked for each inbound request envelope.
///
/// `Ok(Some(value))` becomes the body of an outbound reply envelope;
/// `Ok(None)` produces no reply. Errors are isolated per invocation.
#[async_trait]
pub trait ReceiveHandler: Send + Sync {
    /// Handle an inbound request payload.
    async fn handle(&self, data: serde_json::Value) -> anyhow::Result<Option<serde_json::Value>>;
}

/// Adapter turning an async closure into a [`ReceiveHandler`].
pub struct FnHandler<F>(F);

#[async_trait]
impl<F, Fut> ReceiveHandler for FnHandler<F>
where
    F: Fn(serde_json::Value) -> Fut + Send + Sync,
    Fut: Future<Output = anyhow::Result<Option<serde_json::Value>>> + Send,
{
    async fn handle(&self, data: serde_json::Value) -> anyhow::Result<Option<serde_json::Value>> {
        (self.0)(data).await
    }
}

/// Wrap an async closure as a [`ReceiveHandler`].
pub fn handler_fn<F, Fut>(f: F) -> FnHandler<F>
where
    F: Fn(serde_json::Value) -> Fut + Send + Sync,
    Fut: Future<Output = anyhow::Result<Option<serde_json::Value>>> + Send,
{
    FnHandler(f)
}

/// Ordered registry of inbound-request handlers.
pub struct HandlerRegistry {
    /// Registration order is invocation order.
    handlers: RwLock<Vec<(HandlerId, Arc<dyn ReceiveHandler>)>>,
    /// Chatty per-invocation logging.
    enable_debug: bool,
}

impl HandlerRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new(enable_debug: bool) -> Self {
        Self {
            handlers: RwLock::new(Vec::new()),
            enable_debug,
        }
    }

    /// Register a handler and return its key.
    pub fn add(&self, handler: Arc<dyn ReceiveHandler>) -> HandlerId {
        let id = HandlerId::new();
        self.handlers.write().push((id, handler));
        debug!(handler_id = %id, "Handler registered");
        id
    }

    /// Remove a handler. No-op when the key is unknown.
    pub fn remove(&self, id: HandlerId) {
        self.handlers.write().retain(|(key, _)| *key != id);
        debug!(handler_id = %id, "Handler removed");
    }

    /// Number of registered handlers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.handlers.read().len()
    }

    /// Whether no handler is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.handlers.read().is_empty()
    }

    /// Invoke every handler sequentially with `data`.
    ///
    /// Works on a snapshot, so handlers added or removed mid-invocation only
    /// affect later requests. Returns the produced results paired with the
    /// id of the handler that produced each; `None` results and failed
    /// invocations contribute nothing.
    pub async fn invoke_all(
        &self,
        data: &serde_json::Value,
    ) -> Vec<(HandlerId, serde_json::Value)> {
        let snapshot: Vec<_> = self.handlers.read().clone();
        let mut results = Vec::new();

        for (id, handler) in snapshot {
            match handler.handle(data.clone()).await {
                Ok(Some(result)) => {
                    if self.enable_debug {
                        debug!(handler_id = %id, "Handler produced a reply");
                    }
                    results.push((id, result));
                }
                Ok(None) => {}
                Err(error) => {
                    // Isolated: log and keep going.
                    debug!(
                        handler_id = %id,
                        error = %error,
                        "Handler failed, continuing with remaining handlers"
                    );
                }
            }
        }

        results
    }
}
