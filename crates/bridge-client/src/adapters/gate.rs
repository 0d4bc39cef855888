//! Inbound gate: screens raw messages before they reach the scheduler.
//!
//! A message is admitted only if it comes from an allowed origin, carries the
//! routing fields, and is addressed to this client.

use crate::ports::inbound::RawInbound;
use bridge_types::{EnvelopeError, InboundEnvelope};
use serde_json::Value;
use thiserror::Error;

/// Why a raw message was not admitted.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RejectReason {
    #[error("event origin {origin} is not allowed")]
    OriginNotAllowed { origin: String },

    #[error("inbound message is missing `{0}`")]
    MissingField(&'static str),

    #[error("client_uid {received} does not match {expected}")]
    ClientUidMismatch { expected: String, received: String },

    #[error(transparent)]
    Envelope(#[from] EnvelopeError),
}

/// Origin, field and addressee checks for inbound messages.
#[derive(Debug, Clone)]
pub struct InboundGate {
    allowed_origins: Vec<String>,
    client_uid: String,
}

impl InboundGate {
    const REQUIRED: [&'static str; 5] = ["path", "client_uid", "context", "service", "message_uid"];

    pub fn new(allowed_origins: Vec<String>, client_uid: impl Into<String>) -> Self {
        Self {
            allowed_origins,
            client_uid: client_uid.into(),
        }
    }

    pub fn allowed_origins(&self) -> &[String] {
        &self.allowed_origins
    }

    /// Screen `raw` and parse it into an envelope.
    pub fn admit(&self, raw: RawInbound) -> Result<InboundEnvelope, RejectReason> {
        if !self
            .allowed_origins
            .iter()
            .any(|allowed| is_allowed_origin(&raw.origin, allowed))
        {
            return Err(RejectReason::OriginNotAllowed { origin: raw.origin });
        }

        for field in Self::REQUIRED {
            if raw.data.get(field).map_or(true, Value::is_null) {
                return Err(RejectReason::MissingField(field));
            }
        }

        match raw.data.get("client_uid").and_then(Value::as_str) {
            Some(uid) if uid == self.client_uid => {}
            other => {
                return Err(RejectReason::ClientUidMismatch {
                    expected: self.client_uid.clone(),
                    received: other.map_or_else(|| raw.data["client_uid"].to_string(), str::to_owned),
                })
            }
        }

        Ok(InboundEnvelope::from_value(raw.data)?)
    }
}

/// Match a message origin against one allowed origin.
///
/// Without `*` the match is exact. With `*` (e.g. `https://*.dialpad.com`)
/// the scheme must be equal and the host must end with the pattern's host.
pub fn is_allowed_origin(origin: &str, allowed: &str) -> bool {
    if !allowed.contains('*') {
        return origin == allowed;
    }
    let pattern = allowed.replacen('*', "", 1);
    match (split_origin(origin), split_origin(&pattern)) {
        (Some((scheme, host)), Some((allowed_scheme, allowed_host))) => {
            scheme.eq_ignore_ascii_case(allowed_scheme) && host.ends_with(allowed_host.as_str())
        }
        _ => false,
    }
}

/// Split `scheme://host[:port][/...]` into scheme and lower-cased hostname.
fn split_origin(origin: &str) -> Option<(&str, String)> {
    let (scheme, rest) = origin.split_once("://")?;
    let authority = rest.split(['/', '?', '#']).next().unwrap_or_default();
    let authority = authority.rsplit('@').next().unwrap_or_default();
    let host = match authority.rfind(':') {
        Some(idx) if !authority.ends_with(']') => &authority[..idx],
        _ => authority,
    };
    if scheme.is_empty() || host.is_empty() {
        return None;
    }
    Some((scheme, host.to_ascii_lowercase()))
}
