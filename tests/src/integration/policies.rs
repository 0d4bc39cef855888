//! # Conflict Policies
//!
//! A second get for a path that already has one outstanding is either
//! rejected at once or queued behind it, depending on the policy.

#[cfg(test)]
mod tests {
    use crate::harness::{config, event_sink, wait_until, Bridge};
    use bridge_client::{BridgeError, ConflictPolicy};
    use serde_json::json;

    #[tokio::test]
    async fn test_reject_conflict_leaves_first_request_intact() {
        let bridge = Bridge::initialized(config(ConflictPolicy::RejectConflict)).await;
        bridge.host.silence("get/user").await.unwrap();

        let client = bridge.client.clone();
        let first = tokio::spawn(async move { client.get_current_user().await });
        let scheduler = bridge.client.scheduler().clone();
        wait_until(|| scheduler.is_in_flight("get/user")).await;

        let err = bridge.client.get_current_user().await.unwrap_err();
        assert!(matches!(err, BridgeError::Conflict { ref path } if path == "get/user"));
        assert_eq!(bridge.sent("get/user").await.len(), 1);

        bridge.host.release("get/user").await.unwrap();
        assert_eq!(first.await.unwrap().unwrap()["first_name"], json!("Amy"));
        assert!(!scheduler.is_in_flight("get/user"));

        // Once settled, the path accepts a new request.
        assert!(bridge.client.get_current_user().await.is_ok());
    }

    #[tokio::test]
    async fn test_reject_conflict_is_per_path() {
        let bridge = Bridge::initialized(config(ConflictPolicy::RejectConflict)).await;
        bridge.host.silence("get/user").await.unwrap();

        let client = bridge.client.clone();
        let user = tokio::spawn(async move { client.get_current_user().await });
        let scheduler = bridge.client.scheduler().clone();
        wait_until(|| scheduler.is_in_flight("get/user")).await;

        assert!(bridge.client.get_current_contact().await.is_ok());

        bridge.host.release("get/user").await.unwrap();
        assert!(user.await.unwrap().is_ok());
    }

    #[tokio::test]
    async fn test_queue_sends_second_request_after_first_settles() {
        let bridge = Bridge::initialized(config(ConflictPolicy::Queue)).await;
        bridge.host.silence("get/user").await.unwrap();
        let scheduler = bridge.client.scheduler().clone();

        let client = bridge.client.clone();
        let first = tokio::spawn(async move { client.get_current_user().await });
        wait_until(|| scheduler.is_in_flight("get/user")).await;

        let client = bridge.client.clone();
        let second = tokio::spawn(async move { client.get_current_user().await });
        wait_until(|| scheduler.queued("get/user") == 1).await;

        assert_eq!(bridge.sent("get/user").await.len(), 1);

        bridge.host.release("get/user").await.unwrap();
        assert!(first.await.unwrap().is_ok());
        assert!(second.await.unwrap().is_ok());

        let sent = bridge.sent("get/user").await;
        assert_eq!(sent.len(), 2);
        assert_ne!(sent[0].message_uid, sent[1].message_uid);
    }

    #[tokio::test]
    async fn test_queue_preserves_fifo_order() {
        let bridge = Bridge::initialized(config(ConflictPolicy::Queue)).await;
        bridge.host.silence("get/contact").await.unwrap();
        let scheduler = bridge.client.scheduler().clone();

        let client = bridge.client.clone();
        let first = tokio::spawn(async move { client.get_current_contact().await });
        wait_until(|| scheduler.is_in_flight("get/contact")).await;

        let mut waiters = Vec::new();
        for queued in 1..=3 {
            let client = bridge.client.clone();
            waiters.push(tokio::spawn(async move { client.get_current_contact().await }));
            wait_until(|| scheduler.queued("get/contact") == queued).await;
        }

        bridge.host.release("get/contact").await.unwrap();
        assert!(first.await.unwrap().is_ok());
        for waiter in waiters {
            assert!(waiter.await.unwrap().is_ok());
        }
        assert_eq!(bridge.sent("get/contact").await.len(), 4);
        assert_eq!(scheduler.queued("get/contact"), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_queued_request_runs_after_a_timeout() {
        let bridge = Bridge::initialized(config(ConflictPolicy::Queue)).await;
        bridge.host.silence("get/call").await.unwrap();
        let scheduler = bridge.client.scheduler().clone();

        let client = bridge.client.clone();
        let first = tokio::spawn(async move { client.get_current_call().await });
        wait_until(|| scheduler.is_in_flight("get/call")).await;

        let client = bridge.client.clone();
        let second = tokio::spawn(async move { client.get_current_call().await });
        wait_until(|| scheduler.queued("get/call") == 1).await;

        assert!(matches!(first.await.unwrap(), Err(BridgeError::Timeout { .. })));
        // Its own deadline only started once it was sent.
        assert!(matches!(second.await.unwrap(), Err(BridgeError::Timeout { .. })));
        assert_eq!(bridge.sent("get/call").await.len(), 2);
    }

    #[tokio::test]
    async fn test_subscriptions_ignore_the_policy() {
        let bridge = Bridge::initialized(config(ConflictPolicy::RejectConflict)).await;
        let (first, _first_events) = event_sink();
        let (second, _second_events) = event_sink();

        let (a, b) = tokio::join!(
            bridge.client.on_call_state(first),
            bridge.client.on_call_state(second),
        );
        assert!(a.is_ok());
        assert!(b.is_ok());
        assert_eq!(bridge.client.scheduler().subscriber_count("call"), 2);
    }
}
