//! # Postline - Correlated Request/Reply over Broadcast Transports
//!
//! Turns a broadcast, fire-and-forget message channel (a window-like object
//! exposing post/subscribe) into a correlated request/reply protocol: a
//! caller posts a payload and receives an [`Answer`] that resolves with the
//! matching reply or rejects on timeout.
//!
//! ```text
//! ┌──────────────┐                          ┌──────────────┐
//! │  Messenger A │                          │  Messenger B │
//! │              │  post() ─── request ───▶ │  handlers    │
//! │  pending     │ ◀── reply ── send()      │              │
//! └──────────────┘                          └──────────────┘
//!         ▲                                        ▲
//!         └──────────── shared Transport ──────────┘
//! ```
//!
//! ## Correlation
//!
//! - Every request carries a fresh [`MsgId`]; replies reference it as
//!   `origMsgId`.
//! - The [`PendingRequestTable`] owns one cancellable timer per in-flight
//!   request; each entry is released exactly once, by reply or by expiry.
//! - Inbound traffic without the protocol marker is dropped silently: the
//!   transport is expected to be shared with unrelated messages.
//!
//! ## Example
//!
//! ```no_run
//! use postline::{InMemoryTransport, Messenger, Options};
//! use std::sync::Arc;
//!
//! # async fn demo() -> anyhow::Result<()> {
//! let transport = Arc::new(InMemoryTransport::new());
//! let messenger = Messenger::new(transport, Options::default())?;
//!
//! messenger.on_receive_fn(|data| async move {
//!     Ok(Some(serde_json::json!({ "echo": data })))
//! });
//!
//! let posted = messenger.post("Hello")?;
//! let reply = posted.answer.await?;
//! # Ok(())
//! # }
//! ```

// Nursery lints that are too strict
#![allow(clippy::missing_const_for_fn)]
// Allow in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
#![cfg_attr(test, allow(clippy::panic))]

pub mod config;
mod dispatcher;
pub mod envelope;
pub mod error;
pub mod handlers;
pub mod pending;
pub mod transport;

mod messenger;

// Re-export main types
pub use config::Options;
pub use envelope::{Envelope, MsgId};
pub use error::{AnswerError, ConfigError, PostError, TransportError};
pub use handlers::{handler_fn, FnHandler, HandlerId, HandlerRegistry, ReceiveHandler};
pub use messenger::{Messenger, Posted};
pub use pending::{Answer, PendingRequestTable};
pub use transport::{InMemoryTransport, InboundStream, OriginFilter, Transport};

use std::time::Duration;

/// Delimiter separating the channel prefix from the unique part of a
/// [`MsgId`]. Channel identifiers must not contain it.
pub const CHANNEL_DELIMITER: char = ':';

/// Default time a posted request waits for a reply.
pub const DEFAULT_MAX_WAIT_TIME: Duration = Duration::from_millis(5000);

/// Default per-subscriber buffer of [`InMemoryTransport`].
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1000;
