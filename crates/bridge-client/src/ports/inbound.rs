//! Inbound port: messages arriving from the host, before screening.

use async_trait::async_trait;
use crate::ports::outbound::TransportError;
use serde_json::Value;

/// A message as the transport received it.
#[derive(Debug, Clone, PartialEq)]
pub struct RawInbound {
    /// Origin the transport attributes the message to
    pub origin: String,
    /// Unvalidated payload
    pub data: Value,
}

/// Source of raw inbound messages.
#[async_trait]
pub trait InboundSource: Send {
    /// Next message. `Err(TransportError::ChannelClosed)` ends the stream.
    async fn receive(&mut self) -> Result<RawInbound, TransportError>;
}
