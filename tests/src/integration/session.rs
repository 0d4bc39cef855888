//! # Session and Correlation
//!
//! `init` gating, reply correlation by `message_uid`, duplicate and late
//! replies, and the full init → get user round trip.

#[cfg(test)]
mod tests {
    use crate::harness::{config, Bridge, REQUEST_TIMEOUT};
    use bridge_client::{BridgeError, ConflictPolicy, InboundEnvelope, ProtocolError, StatusCode};
    use bridge_runtime::LoopbackHost;
    use serde_json::json;
    use std::sync::atomic::Ordering;

    #[tokio::test]
    async fn test_requests_before_init_never_reach_the_host() {
        let bridge = Bridge::start(config(ConflictPolicy::RejectConflict));

        for result in [
            bridge.client.get_current_user().await,
            bridge.client.get_current_contact().await,
            bridge.client.get_current_call().await,
        ] {
            assert!(matches!(result, Err(BridgeError::NotInitialized)));
        }
        assert!(bridge.host.received().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_init_then_get_current_user() {
        let config = config(ConflictPolicy::RejectConflict);
        let host = LoopbackHost::new(config.host_origin())
            .with_session(json!("c1"), json!("s1"))
            .with_data("get/user", json!({"first_name": "Amy"}));
        let bridge = Bridge::with_host(config, host);

        let session = bridge.client.init().await.unwrap();
        assert_eq!(session, json!({"context": "c1", "service": "s1"}));

        let user = bridge.client.get_current_user().await.unwrap();
        assert_eq!(user, json!({"first_name": "Amy"}));

        let sent = bridge.sent("get/user").await;
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].context, json!("c1"));
        assert_eq!(sent[0].service, json!("s1"));
        assert_eq!(sent[0].client_uid, "frame-1");
    }

    #[tokio::test]
    async fn test_init_is_stamped_with_null_session() {
        let bridge = Bridge::initialized(config(ConflictPolicy::RejectConflict)).await;

        let init = bridge.sent("init").await;
        assert_eq!(init.len(), 1);
        assert!(init[0].context.is_null());
        assert!(init[0].service.is_null());
    }

    #[tokio::test]
    async fn test_unknown_path_is_a_host_error() {
        let bridge = Bridge::initialized(config(ConflictPolicy::RejectConflict)).await;

        let err = bridge.client.get("get/calendar").await.unwrap_err();
        assert!(matches!(
            err,
            BridgeError::Host {
                status: StatusCode::PathNotFound,
                ..
            }
        ));
        // The failed request left nothing behind.
        assert_eq!(bridge.client.scheduler().pending_count(), 0);
        assert!(!bridge.client.scheduler().is_in_flight("get/calendar"));
    }

    #[tokio::test]
    async fn test_second_delivery_of_a_reply_is_a_protocol_error() {
        let bridge = Bridge::initialized(config(ConflictPolicy::RejectConflict)).await;
        bridge.client.get_current_contact().await.unwrap();

        let sent = bridge.sent("get/contact").await;
        let replay = InboundEnvelope::reply_to(&sent[0], StatusCode::Ok, json!({}));
        let err = bridge.client.scheduler().dispatch_inbound(replay).unwrap_err();
        assert!(matches!(
            err,
            ProtocolError::UnexpectedReply { correlation_id, .. } if correlation_id == sent[0].message_uid
        ));
    }

    #[tokio::test]
    async fn test_concurrent_gets_on_different_paths_resolve_independently() {
        let bridge = Bridge::initialized(config(ConflictPolicy::RejectConflict)).await;

        let (user, contact, call) = tokio::join!(
            bridge.client.get_current_user(),
            bridge.client.get_current_contact(),
            bridge.client.get_current_call(),
        );
        assert_eq!(user.unwrap()["first_name"], json!("Amy"));
        assert_eq!(contact.unwrap()["id"], json!(42));
        assert_eq!(call.unwrap()["state"], json!("idle"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_then_late_reply() {
        let bridge = Bridge::initialized(config(ConflictPolicy::RejectConflict)).await;
        bridge.host.silence("get/call").await.unwrap();

        let err = bridge.client.get_current_call().await.unwrap_err();
        assert!(matches!(err, BridgeError::Timeout { after, .. } if after == REQUEST_TIMEOUT));

        let scheduler = bridge.client.scheduler().clone();
        assert_eq!(scheduler.stats().total_timeouts.load(Ordering::Relaxed), 1);

        // The late reply goes through the listener and matches nothing.
        assert_eq!(bridge.host.release("get/call").await.unwrap(), 1);
        crate::harness::wait_until(|| scheduler.stats().total_unexpected.load(Ordering::Relaxed) == 1).await;

        // The path is usable again.
        assert!(bridge.client.get_current_call().await.is_ok());
    }

    #[tokio::test]
    async fn test_dispose_rejects_everything_afterwards() {
        let bridge = Bridge::initialized(config(ConflictPolicy::RejectConflict)).await;
        bridge.client.dispose();

        assert!(matches!(bridge.client.init().await, Err(BridgeError::Disposed)));
        assert!(matches!(
            bridge.client.get_current_user().await,
            Err(BridgeError::Disposed)
        ));
    }
}
