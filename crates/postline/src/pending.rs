//! # Pending Request Table
//!
//! Tracks in-flight requests awaiting a reply. Each entry owns exactly one
//! timer task; the entry is removed exactly once, either by a matching reply
//! or by timer expiry, never both. `DashMap::remove` is the atomic arbiter:
//! whichever path removes the entry settles the answer, the loser finds
//! nothing and backs off.

use crate::envelope::MsgId;
use crate::error::AnswerError;
use dashmap::DashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::{Duration, Instant};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

type Settlement = Result<serde_json::Value, AnswerError>;

/// One in-flight request.
struct PendingRequest {
    /// Channel that settles the caller's [`Answer`].
    sender: oneshot::Sender<Settlement>,
    /// Timeout task. `None` only for the instant between insertion and
    /// timer attachment inside [`PendingRequestTable::register`].
    timer: Option<JoinHandle<()>>,
    /// When the request was registered.
    created_at: Instant,
}

/// Table of requests awaiting replies.
///
/// Flow:
/// 1. `post()` generates a message id and calls [`register`](Self::register).
/// 2. The caller keeps the returned [`Answer`] and sends the envelope.
/// 3. The inbound dispatcher calls
///    [`resolve_if_pending`](Self::resolve_if_pending) when a reply arrives.
/// 4. If nothing arrives within `max_wait`, the timer task rejects the
///    answer with [`AnswerError::Timeout`].
#[derive(Default)]
pub struct PendingRequestTable {
    pending: DashMap<MsgId, PendingRequest>,
}

impl PendingRequestTable {
    /// Create an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a request and arm its timeout.
    ///
    /// Returns immediately; the [`Answer`] settles later from the dispatcher
    /// or the timer task. Must be called within a Tokio runtime.
    pub fn register(self: &Arc<Self>, msg_id: MsgId, max_wait: Duration) -> Answer {
        let (tx, rx) = oneshot::channel();

        // Insert before spawning so a zero-duration timer cannot fire
        // against a not-yet-visible entry.
        self.pending.insert(
            msg_id.clone(),
            PendingRequest {
                sender: tx,
                timer: None,
                created_at: Instant::now(),
            },
        );

        let table = Arc::clone(self);
        let expired_id = msg_id.clone();
        let timer = tokio::spawn(async move {
            tokio::time::sleep(max_wait).await;
            table.expire(&expired_id);
        });

        // The entry may already be gone if the timer fired first; in that
        // case the task has finished and there is nothing to attach.
        if let Some(mut entry) = self.pending.get_mut(&msg_id) {
            entry.timer = Some(timer);
        }

        debug!(
            msg_id = %msg_id,
            max_wait_ms = max_wait.as_millis() as u64,
            "Registered pending request"
        );

        Answer { rx }
    }

    /// Resolve the request `orig_msg_id` answers, if it is still pending.
    ///
    /// Returns `true` when an entry was found and cleared. An unmatched
    /// reply (late, duplicate, or foreign) returns `false` and has no other
    /// effect.
    pub fn resolve_if_pending(&self, orig_msg_id: &MsgId, data: serde_json::Value) -> bool {
        let Some((_, pending)) = self.pending.remove(orig_msg_id) else {
            debug!(
                orig_msg_id = %orig_msg_id,
                "Reply for unknown or expired message id"
            );
            return false;
        };

        if let Some(timer) = pending.timer {
            timer.abort();
        }

        let response_time = pending.created_at.elapsed();
        if pending.sender.send(Ok(data)).is_err() {
            debug!(
                orig_msg_id = %orig_msg_id,
                "Answer dropped before the reply arrived"
            );
        } else {
            debug!(
                orig_msg_id = %orig_msg_id,
                response_time_ms = response_time.as_millis() as u64,
                "Resolved pending request"
            );
        }
        true
    }

    /// Cancel a single pending request without settling it with a reply.
    ///
    /// The caller's [`Answer`] rejects with [`AnswerError::Closed`]. Returns
    /// `false` if the entry had already been removed.
    pub fn cancel(&self, msg_id: &MsgId) -> bool {
        let Some((_, pending)) = self.pending.remove(msg_id) else {
            return false;
        };
        if let Some(timer) = pending.timer {
            timer.abort();
        }
        let _ = pending.sender.send(Err(AnswerError::Closed));
        true
    }

    /// Drop every pending entry and abort its timer.
    ///
    /// All outstanding [`Answer`]s reject with [`AnswerError::Closed`].
    pub fn clear(&self) {
        self.pending.retain(|msg_id, pending| {
            if let Some(timer) = &pending.timer {
                timer.abort();
            }
            debug!(msg_id = %msg_id, "Cancelled pending request on teardown");
            false
        });
    }

    /// Number of requests currently awaiting a reply.
    #[must_use]
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    /// Whether no request is in flight.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Timer path: remove the entry and reject its answer.
    fn expire(&self, msg_id: &MsgId) {
        let Some((_, pending)) = self.pending.remove(msg_id) else {
            // Already resolved; the reply won the race.
            return;
        };
        warn!(
            msg_id = %msg_id,
            waited_ms = pending.created_at.elapsed().as_millis() as u64,
            "Pending request timed out"
        );
        let _ = pending.sender.send(Err(AnswerError::Timeout));
    }
}

/// The caller's side of a pending request.
///
/// Settles exactly once: `Ok(data)` from a matching reply,
/// `Err(AnswerError::Timeout)` on expiry, or `Err(AnswerError::Closed)` when
/// the messenger is torn down first.
pub struct Answer {
    rx: oneshot::Receiver<Settlement>,
}

impl Future for Answer {
    type Output = Settlement;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.rx).poll(cx).map(|settled| match settled {
            Ok(settlement) => settlement,
            // Sender dropped without settling: the table was torn down.
            Err(_) => Err(AnswerError::Closed),
        })
    }
}
