//! # Messenger
//!
//! Façade composing the correlation engine: id generation, the pending
//! request table, the handler registry, and the inbound dispatcher, behind
//! `post` / `on_receive` / `remove_handler`.

use crate::config::Options;
use crate::dispatcher::InboundDispatcher;
use crate::envelope::{Envelope, MsgId};
use crate::error::{ConfigError, PostError};
use crate::handlers::{handler_fn, HandlerId, HandlerRegistry, ReceiveHandler};
use crate::pending::{Answer, PendingRequestTable};
use crate::transport::Transport;
use serde::Serialize;
use std::future::Future;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::debug;

/// Result of [`Messenger::post`]: the request's id and its awaitable answer.
pub struct Posted {
    /// Identifier the eventual reply must reference as `origMsgId`.
    pub msg_id: MsgId,
    /// Settles with the reply data or rejects on timeout.
    pub answer: Answer,
}

/// Correlated request/reply engine over a broadcast transport.
///
/// Construction subscribes once to the transport's inbound stream and
/// spawns the dispatcher, so it must happen within a Tokio runtime. Each
/// instance is self-contained: its failures, timers, and pending requests
/// never cross into another instance sharing the same transport.
pub struct Messenger {
    options: Options,
    transport: Arc<dyn Transport>,
    pending: Arc<PendingRequestTable>,
    handlers: Arc<HandlerRegistry>,
    dispatcher: JoinHandle<()>,
}

impl Messenger {
    /// Build a messenger over `transport`.
    ///
    /// Fails with [`ConfigError`] when the channel identifier contains
    /// `':'`. The options are stored verbatim otherwise.
    pub fn new(transport: Arc<dyn Transport>, options: Options) -> Result<Self, ConfigError> {
        options.validate()?;

        let pending = Arc::new(PendingRequestTable::new());
        let handlers = Arc::new(HandlerRegistry::new(options.enable_debug));
        let dispatcher = InboundDispatcher {
            transport: Arc::clone(&transport),
            pending: Arc::clone(&pending),
            handlers: Arc::clone(&handlers),
            channel: options.channel.clone(),
            target_origin: options.target_origin.clone(),
            enable_debug: options.enable_debug,
        }
        .spawn();

        debug!(channel = ?options.channel, "Messenger constructed");

        Ok(Self {
            options,
            transport,
            pending,
            handlers,
            dispatcher,
        })
    }

    /// Post a request and return its id plus the awaitable answer.
    ///
    /// Non-blocking: the envelope is sent fire-and-forget and the answer
    /// settles later, on a matching reply or on timeout. Concurrent posts
    /// are fully independent.
    pub fn post(&self, data: impl Serialize) -> Result<Posted, PostError> {
        let payload = serde_json::to_value(data)?;
        let msg_id = MsgId::generate(self.options.channel.as_deref());
        let answer = self
            .pending
            .register(msg_id.clone(), self.options.max_wait_time);

        let envelope = Envelope::request(msg_id.clone(), payload);
        let message = serde_json::to_value(&envelope)?;
        if let Err(error) = self.transport.send(message, &self.options.target_origin) {
            // Nothing went out; do not leave a timer waiting for a reply
            // that cannot come.
            self.pending.cancel(&msg_id);
            return Err(error.into());
        }

        if self.options.enable_debug {
            debug!(msg_id = %msg_id, "Posted request");
        }

        Ok(Posted { msg_id, answer })
    }

    /// Register an inbound-request handler; returns its removal key.
    pub fn on_receive(&self, handler: impl ReceiveHandler + 'static) -> HandlerId {
        self.handlers.add(Arc::new(handler))
    }

    /// Register an async closure as an inbound-request handler.
    pub fn on_receive_fn<F, Fut>(&self, f: F) -> HandlerId
    where
        F: Fn(serde_json::Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<Option<serde_json::Value>>> + Send + 'static,
    {
        self.on_receive(handler_fn(f))
    }

    /// Remove a handler. Idempotent: unknown keys are a no-op.
    pub fn remove_handler(&self, id: HandlerId) {
        self.handlers.remove(id);
    }

    /// The stored construction options, unchanged.
    #[must_use]
    pub fn options(&self) -> &Options {
        &self.options
    }

    /// Number of requests currently awaiting a reply.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Number of registered handlers.
    #[must_use]
    pub fn handler_count(&self) -> usize {
        self.handlers.len()
    }

    /// Tear down: stop the dispatcher and reject every in-flight answer
    /// with [`AnswerError::Closed`](crate::AnswerError::Closed).
    pub fn close(&self) {
        self.dispatcher.abort();
        self.pending.clear();
        debug!(channel = ?self.options.channel, "Messenger closed");
    }
}

impl Drop for Messenger {
    fn drop(&mut self) {
        // Symmetric teardown of the one-time subscription.
        self.dispatcher.abort();
    }
}
