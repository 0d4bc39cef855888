//! Shared fixture: a client wired to a spawned loopback host.

use bridge_client::{create_channel, BridgeConfig, ConflictPolicy, EventCallback, HostClient, OutboundEnvelope};
use bridge_runtime::{spawn_host, HostHandle, LoopbackHost};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

pub const CLIENT_UID: &str = "frame-1";
pub const REQUEST_TIMEOUT: Duration = Duration::from_millis(200);

/// Client configuration used by most tests.
pub fn config(policy: ConflictPolicy) -> BridgeConfig {
    BridgeConfig {
        client_uid: CLIENT_UID.to_string(),
        request_timeout: REQUEST_TIMEOUT,
        conflict_policy: policy,
        ..BridgeConfig::default()
    }
}

/// A client and the host it talks to.
pub struct Bridge {
    pub client: Arc<HostClient>,
    pub host: HostHandle,
}

impl Bridge {
    /// Default loopback host posting from the configured host origin.
    pub fn start(config: BridgeConfig) -> Self {
        let host = LoopbackHost::new(config.host_origin());
        Self::with_host(config, host)
    }

    pub fn with_host(config: BridgeConfig, host: LoopbackHost) -> Self {
        let (transport, source, host_end) = create_channel(64);
        let host = spawn_host(host, host_end);
        let client = HostClient::new(config, Arc::new(transport), source).unwrap();
        Self {
            client: Arc::new(client),
            host,
        }
    }

    /// Started and past `init`.
    pub async fn initialized(config: BridgeConfig) -> Self {
        let bridge = Self::start(config);
        bridge.client.init().await.unwrap();
        bridge
    }

    /// Requests the host has seen for `path`.
    pub async fn sent(&self, path: &str) -> Vec<OutboundEnvelope> {
        self.host
            .received()
            .await
            .unwrap()
            .into_iter()
            .filter(|request| request.path == path)
            .collect()
    }
}

/// Callback forwarding every event into a channel.
pub fn event_sink() -> (EventCallback, mpsc::UnboundedReceiver<Value>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let callback = EventCallback::new(move |content| {
        let _ = tx.send(content);
    });
    (callback, rx)
}

/// Yield until `condition` holds.
pub async fn wait_until(condition: impl Fn() -> bool) {
    for _ in 0..10_000 {
        if condition() {
            return;
        }
        tokio::task::yield_now().await;
    }
    panic!("condition not reached");
}
