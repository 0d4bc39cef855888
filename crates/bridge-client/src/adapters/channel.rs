//! In-memory transport built on tokio mpsc channels.
//!
//! The guest half implements [`Transport`] and [`InboundSource`]; the
//! [`HostEnd`] is what a host (simulated or test) reads from and writes to.

use crate::ports::inbound::{InboundSource, RawInbound};
use crate::ports::outbound::{Transport, TransportError};
use async_trait::async_trait;
use bridge_types::OutboundEnvelope;
use tokio::sync::mpsc;
use tracing::trace;

/// Guest-side sender.
#[derive(Clone)]
pub struct ChannelTransport(pub mpsc::Sender<OutboundEnvelope>);

/// Guest-side receiver.
pub struct ChannelSource(pub mpsc::Receiver<RawInbound>);

#[async_trait]
impl Transport for ChannelTransport {
    async fn send(&self, target_origin: &str, envelope: OutboundEnvelope) -> Result<(), TransportError> {
        trace!(target_origin = target_origin, path = %envelope.path, "Posting envelope");
        self.0
            .send(envelope)
            .await
            .map_err(|_| TransportError::ChannelClosed)
    }
}

#[async_trait]
impl InboundSource for ChannelSource {
    async fn receive(&mut self) -> Result<RawInbound, TransportError> {
        self.0.recv().await.ok_or(TransportError::ChannelClosed)
    }
}

/// Host side of the channel pair.
pub struct HostEnd {
    /// Envelopes posted by the guest
    pub requests: mpsc::Receiver<OutboundEnvelope>,
    /// Messages to deliver to the guest
    pub replies: mpsc::Sender<RawInbound>,
}

/// Create a connected guest/host channel pair.
pub fn create_channel(buffer: usize) -> (ChannelTransport, ChannelSource, HostEnd) {
    let (req_tx, req_rx) = mpsc::channel(buffer);
    let (resp_tx, resp_rx) = mpsc::channel(buffer);
    (
        ChannelTransport(req_tx),
        ChannelSource(resp_rx),
        HostEnd {
            requests: req_rx,
            replies: resp_tx,
        },
    )
}
