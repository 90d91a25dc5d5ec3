//! # Shared-Channel Isolation
//!
//! One transport carrying several tenants: messengers on different
//! channels, plus unrelated traffic that merely shares the wire.

#[cfg(test)]
use postline::{
    InMemoryTransport, Messenger, Options, OriginFilter, Transport,
};

#[cfg(test)]
use serde_json::json;

#[cfg(test)]
use std::sync::Arc;

#[cfg(test)]
use std::time::Duration;

#[cfg(test)]
use tokio::time::timeout;

#[cfg(test)]
fn on_channel(transport: &Arc<InMemoryTransport>, channel: &str, max_wait: Duration) -> Messenger {
    let transport: Arc<dyn Transport> = Arc::clone(transport) as Arc<dyn Transport>;
    Messenger::new(
        transport,
        Options {
            channel: Some(channel.to_string()),
            max_wait_time: max_wait,
            ..Options::default()
        },
    )
    .unwrap()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_same_channel_peers_converse() {
        let transport = Arc::new(InMemoryTransport::new());
        let caller = on_channel(&transport, "tunnel_a", Duration::from_millis(1000));
        let responder = on_channel(&transport, "tunnel_a", Duration::from_millis(1000));

        responder.on_receive_fn(|_| async { Ok(Some(json!("from tunnel_a"))) });

        let posted = caller.post("Hello").unwrap();
        assert_eq!(posted.msg_id.channel(), Some("tunnel_a"));

        let resolved = timeout(Duration::from_millis(500), posted.answer)
            .await
            .expect("timeout")
            .unwrap();
        assert_eq!(resolved, json!("from tunnel_a"));
    }

    #[tokio::test]
    async fn test_other_channel_does_not_answer() {
        let transport = Arc::new(InMemoryTransport::new());
        let caller = on_channel(&transport, "tunnel_a", Duration::from_millis(100));
        let stranger = on_channel(&transport, "tunnel_b", Duration::from_millis(100));

        // The stranger would happily reply, but it never sees tunnel_a
        // requests.
        stranger.on_receive_fn(|_| async { Ok(Some(json!("from tunnel_b"))) });

        let posted = caller.post("Hello").unwrap();
        let err = timeout(Duration::from_millis(1000), posted.answer)
            .await
            .expect("should time out on its own")
            .unwrap_err();
        assert_eq!(err.to_string(), "Response timeout reached.");
    }

    #[tokio::test]
    async fn test_unrelated_wire_traffic_is_harmless() {
        let transport = Arc::new(InMemoryTransport::new());
        let caller = on_channel(&transport, "tunnel_a", Duration::from_millis(1000));
        let responder = on_channel(&transport, "tunnel_a", Duration::from_millis(1000));

        responder.on_receive_fn(|_| async { Ok(Some(json!("still works"))) });

        let posted = caller.post("Hello").unwrap();

        // Noise from whatever else uses the window.
        for noise in [
            json!("unrelated string"),
            json!({ "type": "analytics", "event": "click" }),
            json!({ "marker": "not-a-bool", "msgId": "x" }),
        ] {
            transport.send(noise, &OriginFilter::Any).unwrap();
        }

        let resolved = timeout(Duration::from_millis(500), posted.answer)
            .await
            .expect("timeout")
            .unwrap();
        assert_eq!(resolved, json!("still works"));
    }

    #[tokio::test]
    async fn test_unmatched_reply_envelope_is_dropped() {
        let transport = Arc::new(InMemoryTransport::new());
        let caller = on_channel(&transport, "tunnel_a", Duration::from_millis(100));

        let posted = caller.post("Hello").unwrap();

        // A reply for an id nobody is waiting on: silently ignored.
        transport
            .send(
                json!({
                    "marker": true,
                    "msgId": "tunnel_a:stray",
                    "data": "for nobody",
                    "origMsgId": "tunnel_a:unknown"
                }),
                &OriginFilter::Any,
            )
            .unwrap();

        // The real request still times out untouched.
        let err = timeout(Duration::from_millis(1000), posted.answer)
            .await
            .expect("should settle by timeout")
            .unwrap_err();
        assert_eq!(err.to_string(), "Response timeout reached.");
        assert_eq!(caller.pending_count(), 0);
    }

    #[tokio::test]
    async fn test_channelless_instance_accepts_bare_ids() {
        let transport = Arc::new(InMemoryTransport::new());
        let open: Arc<dyn Transport> = Arc::clone(&transport) as Arc<dyn Transport>;
        let listener = Messenger::new(
            open,
            Options {
                max_wait_time: Duration::from_millis(500),
                ..Options::default()
            },
        )
        .unwrap();

        let invoked = Arc::new(std::sync::atomic::AtomicBool::new(false));
        let seen = Arc::clone(&invoked);
        listener.on_receive_fn(move |_| {
            let seen = Arc::clone(&seen);
            async move {
                seen.store(true, std::sync::atomic::Ordering::SeqCst);
                Ok(None)
            }
        });

        transport
            .send(
                json!({ "marker": true, "msgId": "1-1", "data": "Test Msg" }),
                &OriginFilter::Any,
            )
            .unwrap();

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(invoked.load(std::sync::atomic::Ordering::SeqCst));
    }
}
