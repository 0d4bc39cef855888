//! Client error types.
//!
//! Every failure of a scheduler operation surfaces through the operation's
//! `BridgeResult`; nothing here is fatal.

use crate::ports::outbound::TransportError;
use bridge_types::{CorrelationId, EnvelopeError, StatusCode};
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;

/// Inbound data that does not fit the request/reply protocol.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ProtocolError {
    /// No pending request or subscription owns this `message_uid`: it was
    /// never issued, already completed, or timed out.
    #[error("unexpected response message_uid: {correlation_id}, path: {path}")]
    UnexpectedReply {
        correlation_id: CorrelationId,
        path: String,
    },

    /// The envelope itself could not be read.
    #[error(transparent)]
    Envelope(#[from] EnvelopeError),
}

/// Errors returned by scheduler and client operations.
#[derive(Debug, Clone, Error)]
pub enum BridgeError {
    /// A non-init request was issued before `init` succeeded. Nothing was sent.
    #[error("client is not initialized")]
    NotInitialized,

    /// No reply arrived before the deadline.
    #[error("message_uid: {correlation_id} ({path}) has exceeded time limit of {}ms", .after.as_millis())]
    Timeout {
        correlation_id: CorrelationId,
        path: String,
        after: Duration,
    },

    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// The host answered with a status from the error subset.
    #[error("host rejected {path}: status {status}")]
    Host {
        path: String,
        status: StatusCode,
        content: Value,
    },

    /// Reject-conflict policy: a get for the same path is still in flight.
    #[error("a request to {path} is already in flight")]
    Conflict { path: String },

    /// `off` without a matching `on`. Nothing was sent.
    #[error("no subscription exists for path: {path}")]
    SubscriptionNotFound { path: String },

    /// The configured surface does not permit this path. Nothing was sent.
    #[error("path {path} is not allowed on this surface")]
    PathNotAllowed { path: String },

    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// The client was disposed while the request was outstanding, or before
    /// it was issued.
    #[error("client disposed")]
    Disposed,
}

/// Result type for scheduler operations
pub type BridgeResult<T> = Result<T, BridgeError>;
