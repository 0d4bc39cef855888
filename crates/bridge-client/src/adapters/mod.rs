//! Transport-side adapters: the inbound gate and an in-memory channel pair.

pub mod channel;
pub mod gate;

pub use channel::{create_channel, ChannelSource, ChannelTransport, HostEnd};
pub use gate::{is_allowed_origin, InboundGate, RejectReason};
