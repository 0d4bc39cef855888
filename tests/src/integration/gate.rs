//! # Inbound Gate
//!
//! Messages from foreign origins, without routing fields, or addressed to
//! another client never reach the scheduler.

#[cfg(test)]
mod tests {
    use crate::harness::{config, Bridge};
    use bridge_client::{
        create_channel, BridgeConfig, BridgeError, ConflictPolicy, HostClient, InboundEnvelope, RawInbound,
        StatusCode,
    };
    use bridge_runtime::LoopbackHost;
    use serde_json::json;
    use std::sync::atomic::Ordering;
    use std::sync::Arc;

    #[tokio::test(start_paused = true)]
    async fn test_foreign_origin_is_ignored() {
        let config = config(ConflictPolicy::RejectConflict);
        let bridge = Bridge::with_host(config, LoopbackHost::new("https://evil.example.com"));

        assert!(matches!(bridge.client.init().await, Err(BridgeError::Timeout { .. })));
        assert!(!bridge.client.scheduler().is_initialized());
        assert_eq!(
            bridge
                .client
                .scheduler()
                .stats()
                .total_unexpected
                .load(Ordering::Relaxed),
            0
        );
    }

    #[tokio::test]
    async fn test_wildcard_origin_is_accepted() {
        let config = BridgeConfig {
            allowed_origins: vec!["https://*.dialpadbeta.com".to_string()],
            ..config(ConflictPolicy::RejectConflict)
        };
        let bridge = Bridge::with_host(config, LoopbackHost::new("https://app.dialpadbeta.com"));

        bridge.client.init().await.unwrap();
        assert!(bridge.client.scheduler().is_initialized());
    }

    /// Answer the first request through a hand-built message.
    async fn answer_once(edit: impl FnOnce(&mut serde_json::Value)) -> Result<serde_json::Value, BridgeError> {
        let (transport, source, mut host) = create_channel(8);
        let client = HostClient::new(config(ConflictPolicy::RejectConflict), Arc::new(transport), source).unwrap();

        let init = tokio::spawn(async move { client.init().await });
        let request = host.requests.recv().await.unwrap();

        let mut reply = InboundEnvelope::reply_to(&request, StatusCode::Ok, json!({"ready": true}));
        reply.context = json!("c1");
        reply.service = json!("s1");
        let mut data = serde_json::to_value(&reply).unwrap();
        edit(&mut data);
        host.replies
            .send(RawInbound {
                origin: "https://dialpad.com".to_string(),
                data,
            })
            .await
            .unwrap();

        init.await.unwrap()
    }

    #[tokio::test]
    async fn test_well_formed_reply_is_admitted() {
        assert_eq!(answer_once(|_| {}).await.unwrap(), json!({"ready": true}));
    }

    #[tokio::test(start_paused = true)]
    async fn test_reply_for_another_client_is_ignored() {
        let result = answer_once(|data| data["client_uid"] = json!("frame-2")).await;
        assert!(matches!(result, Err(BridgeError::Timeout { .. })));
    }

    #[tokio::test(start_paused = true)]
    async fn test_reply_without_context_is_ignored() {
        let result = answer_once(|data| {
            data.as_object_mut().unwrap().remove("context");
        })
        .await;
        assert!(matches!(result, Err(BridgeError::Timeout { .. })));
    }

    #[tokio::test(start_paused = true)]
    async fn test_reply_without_status_is_ignored() {
        let result = answer_once(|data| {
            data.as_object_mut().unwrap().remove("status_code");
        })
        .await;
        assert!(matches!(result, Err(BridgeError::Timeout { .. })));
    }
}
