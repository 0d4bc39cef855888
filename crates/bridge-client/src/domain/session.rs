//! Client/host session state.
//!
//! Either fully uninitialized or fully initialized; there is no state in which
//! only part of the session data is known.

use serde_json::Value;

/// Session negotiated by a successful `init` reply.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Session {
    #[default]
    Uninitialized,
    Initialized {
        context: Value,
        service: Value,
    },
}

impl Session {
    pub fn is_initialized(&self) -> bool {
        matches!(self, Self::Initialized { .. })
    }

    /// Context to stamp on outbound envelopes (null before init).
    pub fn context(&self) -> Value {
        match self {
            Self::Uninitialized => Value::Null,
            Self::Initialized { context, .. } => context.clone(),
        }
    }

    /// Service to stamp on outbound envelopes (null before init).
    pub fn service(&self) -> Value {
        match self {
            Self::Uninitialized => Value::Null,
            Self::Initialized { service, .. } => service.clone(),
        }
    }
}
