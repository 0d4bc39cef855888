//! # Subscriptions
//!
//! Events reach every local subscriber, and the host hears `off/call` only
//! when the last local subscriber goes away.

#[cfg(test)]
mod tests {
    use crate::harness::{config, event_sink, Bridge};
    use bridge_client::{BridgeError, ConflictPolicy};
    use serde_json::json;

    const SUBSCRIBERS: usize = 3;

    #[tokio::test]
    async fn test_unsubscribe_is_sent_only_for_the_last_subscriber() {
        let bridge = Bridge::initialized(config(ConflictPolicy::RejectConflict)).await;

        let mut callbacks = Vec::new();
        let mut sinks = Vec::new();
        for _ in 0..SUBSCRIBERS {
            let (callback, sink) = event_sink();
            bridge.client.on_call_state(callback.clone()).await.unwrap();
            callbacks.push(callback);
            sinks.push(sink);
        }
        assert_eq!(bridge.sent("on/call").await.len(), SUBSCRIBERS);
        assert_eq!(bridge.client.scheduler().subscriber_count("call"), SUBSCRIBERS);

        for callback in &callbacks[..SUBSCRIBERS - 1] {
            assert!(!bridge.client.off_call_state(callback).await.unwrap());
        }
        assert!(bridge.sent("off/call").await.is_empty());

        assert!(bridge.client.off_call_state(&callbacks[SUBSCRIBERS - 1]).await.unwrap());
        assert_eq!(bridge.sent("off/call").await.len(), 1);
        assert_eq!(bridge.client.scheduler().subscriber_count("call"), 0);
        assert_eq!(bridge.client.scheduler().pending_count(), 0);

        // The host has dropped the topic: nothing more is pushed.
        assert_eq!(bridge.host.emit("call", json!({"state": "ended"})).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_events_reach_every_subscriber() {
        let bridge = Bridge::initialized(config(ConflictPolicy::RejectConflict)).await;
        let (first, mut first_events) = event_sink();
        let (second, mut second_events) = event_sink();
        bridge.client.on_call_state(first).await.unwrap();
        bridge.client.on_call_state(second).await.unwrap();

        let posted = bridge
            .host
            .emit("call", json!({"id": 7, "state": "ringing"}))
            .await
            .unwrap();
        assert_eq!(posted, 2);

        assert_eq!(first_events.recv().await.unwrap()["state"], json!("ringing"));
        assert_eq!(second_events.recv().await.unwrap()["state"], json!("ringing"));
    }

    #[tokio::test]
    async fn test_removed_subscriber_stops_receiving() {
        let bridge = Bridge::initialized(config(ConflictPolicy::RejectConflict)).await;
        let (kept, mut kept_events) = event_sink();
        let (removed, mut removed_events) = event_sink();
        bridge.client.on_call_state(kept).await.unwrap();
        bridge.client.on_call_state(removed.clone()).await.unwrap();

        assert!(!bridge.client.off_call_state(&removed).await.unwrap());
        bridge.host.emit("call", json!({"state": "held"})).await.unwrap();

        assert_eq!(kept_events.recv().await.unwrap(), json!({"state": "held"}));
        assert!(removed_events.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_same_callback_twice_needs_two_unsubscribes() {
        let bridge = Bridge::initialized(config(ConflictPolicy::RejectConflict)).await;
        let (callback, _events) = event_sink();

        let first = bridge.client.on_call_state(callback.clone()).await.unwrap();
        let second = bridge.client.on_call_state(callback.clone()).await.unwrap();
        assert_ne!(first, second);

        assert!(!bridge.client.off_call_state(&callback).await.unwrap());
        assert!(bridge.client.off_call_state(&callback).await.unwrap());

        let err = bridge.client.off_call_state(&callback).await.unwrap_err();
        assert!(matches!(err, BridgeError::SubscriptionNotFound { ref path } if path == "call"));
        assert_eq!(bridge.sent("off/call").await.len(), 1);
    }

    #[tokio::test]
    async fn test_off_without_on_sends_nothing() {
        let bridge = Bridge::initialized(config(ConflictPolicy::RejectConflict)).await;
        let (callback, _events) = event_sink();

        let err = bridge.client.off_call_state(&callback).await.unwrap_err();
        assert!(matches!(err, BridgeError::SubscriptionNotFound { .. }));
        assert!(bridge.sent("off/call").await.is_empty());
    }

    #[tokio::test]
    async fn test_subscribe_before_init_is_rejected() {
        let bridge = Bridge::start(config(ConflictPolicy::RejectConflict));
        let (callback, _events) = event_sink();

        let err = bridge.client.on_call_state(callback).await.unwrap_err();
        assert!(matches!(err, BridgeError::NotInitialized));
        assert_eq!(bridge.client.scheduler().subscriber_count("call"), 0);
        assert!(bridge.host.received().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_resubscribe_after_full_unsubscribe() {
        let bridge = Bridge::initialized(config(ConflictPolicy::RejectConflict)).await;
        let (callback, mut events) = event_sink();

        bridge.client.on_call_state(callback.clone()).await.unwrap();
        assert!(bridge.client.off_call_state(&callback).await.unwrap());
        bridge.client.on_call_state(callback.clone()).await.unwrap();

        assert_eq!(bridge.host.emit("call", json!({"state": "ringing"})).await.unwrap(), 1);
        assert_eq!(events.recv().await.unwrap(), json!({"state": "ringing"}));
    }
}
