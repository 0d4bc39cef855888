//! # Bridge Types Crate
//!
//! Wire-level types exchanged between a sandboxed guest and its host.
//!
//! ## Design Principles
//!
//! - **Correlation by id only**: every reply is matched to its request through
//!   `message_uid`, never through arrival order.
//! - **Opaque session data**: `context` and `service` are carried verbatim;
//!   this crate never inspects them.
//! - **No I/O**: nothing here sends, receives or schedules anything.

pub mod correlation;
pub mod envelope;
pub mod paths;
pub mod status;

pub use correlation::CorrelationId;
pub use envelope::{EnvelopeError, InboundEnvelope, OutboundEnvelope};
pub use paths::{RequestKind, RequestPath, Surface};
pub use status::StatusCode;
