//! # Message Envelopes
//!
//! The logical shape of every message crossing the guest/host boundary.
//!
//! ## Directions
//!
//! - **Outbound** (guest → host): `path`, `client_uid`, `message_uid`, and the
//!   session's `context`/`service` (null until `init` succeeds).
//! - **Inbound** (host → guest): the same `message_uid` plus a `status_code`
//!   and the reply `content`.

use crate::correlation::CorrelationId;
use crate::status::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Errors raised while turning raw inbound data into an [`InboundEnvelope`].
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum EnvelopeError {
    /// A field the scheduler relies on is absent or null.
    #[error("inbound envelope is missing `{0}`")]
    MissingField(&'static str),

    /// The data is present but does not have the expected shape.
    #[error("malformed inbound envelope: {0}")]
    Malformed(String),
}

/// Request sent from the guest to the host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutboundEnvelope {
    pub path: String,
    pub client_uid: String,
    pub message_uid: CorrelationId,
    pub context: Value,
    pub service: Value,
}

/// Reply or event sent from the host to the guest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InboundEnvelope {
    pub path: String,
    pub message_uid: CorrelationId,
    pub status_code: StatusCode,
    #[serde(default)]
    pub content: Value,
    #[serde(default)]
    pub context: Value,
    #[serde(default)]
    pub service: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_uid: Option<String>,
}

impl InboundEnvelope {
    /// Fields that must be present before serde gets a look at the data, so
    /// that a missing field is reported by name.
    const REQUIRED: [&'static str; 3] = ["path", "message_uid", "status_code"];

    /// Parse a raw JSON message.
    pub fn from_value(data: Value) -> Result<Self, EnvelopeError> {
        let Some(object) = data.as_object() else {
            return Err(EnvelopeError::Malformed("expected a JSON object".into()));
        };
        for field in Self::REQUIRED {
            if object.get(field).map_or(true, Value::is_null) {
                return Err(EnvelopeError::MissingField(field));
            }
        }
        serde_json::from_value(data).map_err(|e| EnvelopeError::Malformed(e.to_string()))
    }

    /// Build a reply to `request` with the given status and content. Mostly
    /// useful to host implementations and tests.
    pub fn reply_to(request: &OutboundEnvelope, status_code: StatusCode, content: Value) -> Self {
        Self {
            path: request.path.clone(),
            message_uid: request.message_uid,
            status_code,
            content,
            context: request.context.clone(),
            service: request.service.clone(),
            client_uid: Some(request.client_uid.clone()),
        }
    }
}
