//! Bridge Client - guest-side request/reply correlation for a sandboxed frame.
//!
//! A guest can only talk to its host through untyped, fire-and-forget
//! messages. This crate turns that into request/response calls and event
//! subscriptions.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                         HostClient                            │
//! │   init · get_current_user/contact/call · on/off_call_state    │
//! ├──────────────────────────────────────────────────────────────┤
//! │                      RequestScheduler                         │
//! │  ┌────────────┐ ┌──────────────────┐ ┌─────────────────────┐  │
//! │  │  Session   │ │ Correlation Table│ │  Callback Registry  │  │
//! │  └────────────┘ └──────────────────┘ └─────────────────────┘  │
//! │  ┌──────────────────────────────┐ ┌───────────────────────┐   │
//! │  │ Conflict policy (get only)   │ │ Per-path on/off locks │   │
//! │  └──────────────────────────────┘ └───────────────────────┘   │
//! ├───────────────────────────┬──────────────────────────────────┤
//! │   Transport (outbound)    │  InboundListener ◄─ InboundGate  │
//! └───────────────────────────┴──────────────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use bridge_client::{create_channel, BridgeConfig, HostClient};
//!
//! let (transport, source, host) = create_channel(64);
//! let client = HostClient::new(BridgeConfig::default(), Arc::new(transport), source)?;
//! client.init().await?;
//! let user = client.get_current_user().await?;
//! ```
//!
//! # Errors
//!
//! Every operation returns [`BridgeResult`]. Misuse (`get` before `init`,
//! `off` without `on`, a conflicting get) fails locally without sending
//! anything. Replies nobody is waiting for are logged and counted.

#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod adapters;
pub mod client;
pub mod domain;
pub mod listener;
pub mod ports;
pub mod scheduler;

pub use adapters::{create_channel, is_allowed_origin, ChannelSource, ChannelTransport, HostEnd, InboundGate, RejectReason};
pub use client::HostClient;
pub use domain::{
    BridgeConfig, BridgeError, BridgeResult, CallbackRegistry, ConfigError, ConflictPolicy, Environment,
    EventCallback, PendingRequestStore, PendingStats, ProtocolError, Session, DEFAULT_REQUEST_TIMEOUT,
};
pub use listener::InboundListener;
pub use ports::{InboundSource, RawInbound, Transport, TransportError};
pub use scheduler::RequestScheduler;

// Wire types, re-exported so most users need a single dependency.
pub use bridge_types::{paths, CorrelationId, InboundEnvelope, OutboundEnvelope, RequestKind, RequestPath, StatusCode, Surface};
