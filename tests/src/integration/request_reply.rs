//! # End-to-End Request/Reply Flows
//!
//! Two messengers on one shared in-memory transport:
//!
//! ```text
//! [Messenger A] ──request──▶ [Transport] ──▶ [Messenger B handlers]
//!       ▲                                            │
//!       └───────────── reply envelope ◀──────────────┘
//! ```

#[cfg(test)]
use postline::{
    AnswerError, InMemoryTransport, Messenger, Options, Transport,
};

#[cfg(test)]
use serde_json::json;

#[cfg(test)]
use std::sync::Arc;

#[cfg(test)]
use std::time::Duration;

#[cfg(test)]
use tokio::time::timeout;

/// A pair of messengers sharing one transport.
#[cfg(test)]
fn peer_pair(options: Options) -> (Messenger, Messenger) {
    let transport: Arc<dyn Transport> = Arc::new(InMemoryTransport::new());
    let a = Messenger::new(Arc::clone(&transport), options.clone()).unwrap();
    let b = Messenger::new(transport, options).unwrap();
    (a, b)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_post_resolves_with_peer_reply() {
        let (caller, responder) = peer_pair(Options {
            max_wait_time: Duration::from_millis(1000),
            ..Options::default()
        });

        responder.on_receive_fn(|_| async { Ok(Some(json!("Hello back"))) });

        let posted = caller.post("Hello").unwrap();
        let resolved = timeout(Duration::from_millis(500), posted.answer)
            .await
            .expect("timeout")
            .unwrap();
        assert_eq!(resolved, json!("Hello back"));
        assert_eq!(caller.pending_count(), 0);
    }

    #[tokio::test]
    async fn test_handler_sees_request_payload() {
        let (caller, responder) = peer_pair(Options {
            max_wait_time: Duration::from_millis(1000),
            ..Options::default()
        });

        responder.on_receive_fn(|data| async move { Ok(Some(json!({ "echo": data }))) });

        let posted = caller.post(json!({ "n": 42 })).unwrap();
        let resolved = timeout(Duration::from_millis(500), posted.answer)
            .await
            .expect("timeout")
            .unwrap();
        assert_eq!(resolved, json!({ "echo": { "n": 42 } }));
    }

    #[tokio::test]
    async fn test_timeout_when_peer_stays_silent() {
        let (caller, _responder) = peer_pair(Options {
            max_wait_time: Duration::from_millis(100),
            ..Options::default()
        });

        let posted = caller.post("Hello").unwrap();
        let err = timeout(Duration::from_millis(1000), posted.answer)
            .await
            .expect("should settle at ~100ms")
            .unwrap_err();
        assert_eq!(err.to_string(), "Response timeout reached.");
    }

    #[tokio::test]
    async fn test_concurrent_posts_resolve_to_matching_replies() {
        let (caller, responder) = peer_pair(Options {
            max_wait_time: Duration::from_millis(1000),
            ..Options::default()
        });

        // Echo handler: each answer must match its own request.
        responder.on_receive_fn(|data| async move { Ok(Some(data)) });

        let first = caller.post("one").unwrap();
        let second = caller.post("two").unwrap();
        assert_ne!(first.msg_id, second.msg_id);

        let (a, b) = tokio::join!(
            timeout(Duration::from_millis(500), first.answer),
            timeout(Duration::from_millis(500), second.answer),
        );
        assert_eq!(a.expect("timeout").unwrap(), json!("one"));
        assert_eq!(b.expect("timeout").unwrap(), json!("two"));
    }

    #[tokio::test]
    async fn test_failing_handler_leaves_healthy_one_replying() {
        let (caller, responder) = peer_pair(Options {
            max_wait_time: Duration::from_millis(1000),
            ..Options::default()
        });

        responder.on_receive_fn(|_| async { Err(anyhow::anyhow!("broken handler")) });
        responder.on_receive_fn(|_| async { Ok(Some(json!("survivor"))) });

        let posted = caller.post("Hello").unwrap();
        let resolved = timeout(Duration::from_millis(500), posted.answer)
            .await
            .expect("timeout")
            .unwrap();
        assert_eq!(resolved, json!("survivor"));
    }

    #[tokio::test]
    async fn test_removed_handler_causes_timeout() {
        let (caller, responder) = peer_pair(Options {
            max_wait_time: Duration::from_millis(100),
            ..Options::default()
        });

        let id = responder.on_receive_fn(|_| async { Ok(Some(json!("never sent"))) });
        responder.remove_handler(id);

        let posted = caller.post("Hello").unwrap();
        assert!(matches!(posted.answer.await, Err(AnswerError::Timeout)));
    }

    #[tokio::test]
    async fn test_close_rejects_in_flight_and_stops_replies() {
        let (caller, responder) = peer_pair(Options {
            max_wait_time: Duration::from_millis(1000),
            ..Options::default()
        });
        responder.on_receive_fn(|_| async { Ok(Some(json!("late"))) });

        let posted = caller.post("Hello").unwrap();
        caller.close();

        assert!(matches!(posted.answer.await, Err(AnswerError::Closed)));
        assert_eq!(caller.pending_count(), 0);
    }
}
