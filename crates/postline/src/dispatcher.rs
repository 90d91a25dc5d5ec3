//! # Inbound Dispatcher
//!
//! Subscribes once, at engine construction, to the transport's inbound
//! stream and routes every message:
//!
//! 1. Not a well-formed envelope → dropped silently (shared channel).
//! 2. Foreign channel prefix → dropped.
//! 3. Reply (`origMsgId` present) → pending request table; never produces
//!    outbound traffic.
//! 4. Request → handler registry; each produced result goes back out as a
//!    reply envelope.

use crate::envelope::{Envelope, MsgId};
use crate::handlers::HandlerRegistry;
use crate::pending::PendingRequestTable;
use crate::transport::{OriginFilter, Transport};
use futures::StreamExt;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

pub(crate) struct InboundDispatcher {
    pub(crate) transport: Arc<dyn Transport>,
    pub(crate) pending: Arc<PendingRequestTable>,
    pub(crate) handlers: Arc<HandlerRegistry>,
    pub(crate) channel: Option<String>,
    pub(crate) target_origin: OriginFilter,
    pub(crate) enable_debug: bool,
}

impl InboundDispatcher {
    /// Subscribe and run until the inbound stream ends or the task is
    /// aborted by [`Messenger::close`](crate::Messenger::close).
    pub(crate) fn spawn(self) -> JoinHandle<()> {
        // Subscribe synchronously so no message sent after construction can
        // slip past the dispatcher.
        let mut inbound = self.transport.subscribe();
        tokio::spawn(async move {
            while let Some(message) = inbound.next().await {
                self.dispatch(message).await;
            }
            warn!("Inbound stream ended, dispatcher shutting down");
        })
    }

    async fn dispatch(&self, message: serde_json::Value) {
        let Some(envelope) = Envelope::from_value(&message) else {
            if self.enable_debug {
                debug!("Ignoring non-envelope traffic");
            }
            return;
        };

        if !self.accepts(&envelope.msg_id) {
            debug!(msg_id = %envelope.msg_id, "Ignoring envelope from another channel");
            return;
        }

        match envelope.orig_msg_id {
            // Reply path: settle the matching pending request, if any.
            Some(orig_msg_id) => {
                self.pending.resolve_if_pending(&orig_msg_id, envelope.data);
            }
            // Request path: invoke handlers and answer with their results.
            None => self.answer_request(envelope.msg_id, envelope.data).await,
        }
    }

    /// Channel isolation: with a channel configured, only envelopes whose
    /// id carries the same prefix are ours.
    fn accepts(&self, msg_id: &MsgId) -> bool {
        match &self.channel {
            Some(channel) => msg_id.channel() == Some(channel.as_str()),
            None => true,
        }
    }

    async fn answer_request(&self, request_id: MsgId, data: serde_json::Value) {
        if self.enable_debug {
            debug!(msg_id = %request_id, "Dispatching inbound request to handlers");
        }

        for (handler_id, result) in self.handlers.invoke_all(&data).await {
            let reply = Envelope::reply(
                MsgId::generate(self.channel.as_deref()),
                result,
                request_id.clone(),
            );
            let message = match serde_json::to_value(&reply) {
                Ok(message) => message,
                Err(error) => {
                    debug!(
                        handler_id = %handler_id,
                        error = %error,
                        "Reply envelope serialization failed"
                    );
                    continue;
                }
            };
            if let Err(error) = self.transport.send(message, &self.target_origin) {
                warn!(
                    handler_id = %handler_id,
                    orig_msg_id = %request_id,
                    error = %error,
                    "Failed to send reply"
                );
            }
        }
    }
}
