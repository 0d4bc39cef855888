//! Host reply status codes.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Status carried by every inbound envelope.
///
/// Codes this client does not know are kept verbatim in [`StatusCode::Other`]
/// and treated as success.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum StatusCode {
    Ok,
    NotFound,
    NotInitialized,
    PathNotFound,
    SubscriptionAdded,
    SubscriptionRemoved,
    Other(String),
}

impl StatusCode {
    /// Wire form of the code.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Ok => "OK",
            Self::NotFound => "NOT_FOUND",
            Self::NotInitialized => "NOT_INITIALIZED",
            Self::PathNotFound => "PATH_NOT_FOUND",
            Self::SubscriptionAdded => "SUBSCRIPTION_ADDED",
            Self::SubscriptionRemoved => "SUBSCRIPTION_REMOVED",
            Self::Other(code) => code,
        }
    }

    /// True for the codes that make the pending request reject.
    pub fn is_error(&self) -> bool {
        matches!(self, Self::NotFound | Self::NotInitialized | Self::PathNotFound)
    }
}

impl From<String> for StatusCode {
    fn from(code: String) -> Self {
        match code.as_str() {
            "OK" => Self::Ok,
            "NOT_FOUND" => Self::NotFound,
            "NOT_INITIALIZED" => Self::NotInitialized,
            "PATH_NOT_FOUND" => Self::PathNotFound,
            "SUBSCRIPTION_ADDED" => Self::SubscriptionAdded,
            "SUBSCRIPTION_REMOVED" => Self::SubscriptionRemoved,
            _ => Self::Other(code),
        }
    }
}

impl From<&str> for StatusCode {
    fn from(code: &str) -> Self {
        Self::from(code.to_string())
    }
}

impl From<StatusCode> for String {
    fn from(code: StatusCode) -> Self {
        match code {
            StatusCode::Other(code) => code,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
