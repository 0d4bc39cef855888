//! # Bridge Runtime
//!
//! Wires a guest client to the loopback host and runs one full session:
//!
//! 1. Load logging and client configuration from the environment
//! 2. Start the loopback host on an in-memory channel pair
//! 3. `init`, then fetch the active contact and the current user
//! 4. Subscribe to call state, receive one event, unsubscribe
//! 5. Dispose the client and stop the host

use std::sync::Arc;

use anyhow::{Context, Result};
use bridge_client::{create_channel, BridgeConfig, EventCallback, HostClient};
use bridge_runtime::{spawn_host, LoopbackHost};
use bridge_telemetry::{init_logging, TelemetryConfig};
use serde_json::json;
use tokio::sync::mpsc;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    init_logging(&TelemetryConfig::from_env()).context("failed to initialize logging")?;

    let config = BridgeConfig::from_env().context("invalid bridge configuration")?;
    let timeout = config.request_timeout;

    let (transport, source, host_end) = create_channel(64);
    let host = spawn_host(LoopbackHost::new(config.host_origin()), host_end);
    let client = HostClient::new(config, Arc::new(transport), source)
        .context("failed to start host client")?;

    let session = client.init().await.context("init failed")?;
    info!(session = %session, "Client initialized");

    let contact = client
        .get_current_contact()
        .await
        .context("get/contact failed")?;
    info!(contact = %contact, "Current contact");

    let user = client.get_current_user().await.context("get/user failed")?;
    info!(user = %user, "Current user");

    let (event_tx, mut event_rx) = mpsc::unbounded_channel();
    let on_call = EventCallback::new(move |content| {
        let _ = event_tx.send(content);
    });
    client
        .on_call_state(on_call.clone())
        .await
        .context("on/call failed")?;

    host.emit("call", json!({"id": 7, "state": "ringing"}))
        .await
        .context("host stopped")?;
    match tokio::time::timeout(timeout, event_rx.recv()).await {
        Ok(Some(event)) => info!(event = %event, "Call state changed"),
        _ => warn!("No call event received"),
    }

    let notified = client
        .off_call_state(&on_call)
        .await
        .context("off/call failed")?;
    info!(host_notified = notified, "Unsubscribed from call state");

    client.dispose();
    let host = host.shutdown().await.context("host stopped unexpectedly")?;
    info!(requests = host.received().len(), "Session finished");
    Ok(())
}
