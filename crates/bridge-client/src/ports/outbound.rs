//! Outbound port: delivering envelopes to the host.

use async_trait::async_trait;
use bridge_types::OutboundEnvelope;

/// Transport error types
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum TransportError {
    #[error("channel closed")]
    ChannelClosed,
}

/// Fire-and-forget delivery to the host.
///
/// `Ok` only means the envelope was handed over; it says nothing about
/// whether the host will answer.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, target_origin: &str, envelope: OutboundEnvelope) -> Result<(), TransportError>;
}
