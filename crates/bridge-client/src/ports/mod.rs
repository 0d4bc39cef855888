//! Ports to the transport that actually moves envelopes between contexts.

pub mod inbound;
pub mod outbound;

pub use inbound::{InboundSource, RawInbound};
pub use outbound::{Transport, TransportError};
