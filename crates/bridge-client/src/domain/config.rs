//! Client configuration with validation.

use crate::domain::policy::ConflictPolicy;
use bridge_types::Surface;
use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;

const PROD_ORIGIN: &str = "https://dialpad.com";
const SANDBOX_ORIGIN: &str = "https://dialpadbeta.com";

/// Default deadline for a reply.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_millis(5000);

/// Host deployment the guest talks to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Environment {
    #[default]
    Prod,
    Sandbox,
}

impl Environment {
    /// Origin outbound messages are addressed to.
    pub fn host_origin(&self) -> &'static str {
        match self {
            Self::Prod => PROD_ORIGIN,
            Self::Sandbox => SANDBOX_ORIGIN,
        }
    }

    fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "prod" | "production" => Some(Self::Prod),
            "sandbox" => Some(Self::Sandbox),
            _ => None,
        }
    }
}

/// Main client configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// Host deployment
    pub environment: Environment,
    /// Identity of this guest, echoed by the host in every reply
    pub client_uid: String,
    /// Origins inbound messages are accepted from (`https://*.host.com` allowed)
    pub allowed_origins: Vec<String>,
    /// Deadline for each reply
    #[serde(with = "humantime_serde")]
    pub request_timeout: Duration,
    /// Behaviour of a get issued while one for the same path is in flight
    pub conflict_policy: ConflictPolicy,
    /// Restrict requests to the paths of one host surface
    pub surface: Option<Surface>,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            environment: Environment::Prod,
            client_uid: "guest-frame".to_string(),
            allowed_origins: vec![PROD_ORIGIN.to_string(), SANDBOX_ORIGIN.to_string()],
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            conflict_policy: ConflictPolicy::RejectConflict,
            surface: None,
        }
    }
}

impl BridgeConfig {
    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.client_uid.trim().is_empty() {
            return Err(ConfigError::Invalid("client_uid cannot be empty".into()));
        }

        if self.allowed_origins.is_empty() {
            return Err(ConfigError::Invalid(
                "allowed_origins cannot be empty".into(),
            ));
        }

        if self.request_timeout.is_zero() {
            return Err(ConfigError::InvalidTimeout(
                "request_timeout cannot be 0".into(),
            ));
        }

        Ok(())
    }

    /// Origin outbound messages are addressed to
    pub fn host_origin(&self) -> &'static str {
        self.environment.host_origin()
    }

    /// Defaults overlaid with environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `BRIDGE_ENV`: `prod` or `sandbox` (default: prod)
    /// - `BRIDGE_CLIENT_UID`: guest identity (default: guest-frame)
    /// - `BRIDGE_REQUEST_TIMEOUT`: e.g. `5s`, `250ms` (default: 5000ms)
    /// - `BRIDGE_CONFLICT_POLICY`: `reject_conflict` or `queue`
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Ok(value) = env::var("BRIDGE_ENV") {
            config.environment = Environment::parse(&value)
                .ok_or_else(|| ConfigError::Invalid(format!("unknown BRIDGE_ENV: {value}")))?;
        }

        if let Ok(value) = env::var("BRIDGE_CLIENT_UID") {
            config.client_uid = value;
        }

        if let Ok(value) = env::var("BRIDGE_REQUEST_TIMEOUT") {
            config.request_timeout = humantime_serde::parse_duration(&value)
                .map_err(|e| ConfigError::InvalidTimeout(format!("{value}: {e}")))?;
        }

        if let Ok(value) = env::var("BRIDGE_CONFLICT_POLICY") {
            config.conflict_policy = ConflictPolicy::parse(&value).ok_or_else(|| {
                ConfigError::Invalid(format!("unknown BRIDGE_CONFLICT_POLICY: {value}"))
            })?;
        }

        config.validate()?;
        Ok(config)
    }
}

/// Configuration errors
#[derive(Debug, Clone, thiserror::Error)]
pub enum ConfigError {
    /// Invalid timeout value
    #[error("invalid timeout: {0}")]
    InvalidTimeout(String),
    /// General configuration error
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Humantime serde module for Duration serialization
mod humantime_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&format!("{}ms", duration.as_millis()))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        parse_duration(&s).map_err(serde::de::Error::custom)
    }

    pub fn parse_duration(s: &str) -> Result<Duration, &'static str> {
        let s = s.trim();
        // "ms" must be checked before "s" and "m"
        if let Some(ms) = s.strip_suffix("ms") {
            ms.trim()
                .parse::<u64>()
                .map(Duration::from_millis)
                .map_err(|_| "invalid milliseconds")
        } else if let Some(secs) = s.strip_suffix('s') {
            secs.trim()
                .parse::<u64>()
                .map(Duration::from_secs)
                .map_err(|_| "invalid seconds")
        } else if let Some(mins) = s.strip_suffix('m') {
            mins.trim()
                .parse::<u64>()
                .ok()
                .and_then(|m| m.checked_mul(60))
                .map(Duration::from_secs)
                .ok_or("invalid minutes")
        } else {
            // Plain numbers are milliseconds
            s.parse::<u64>()
                .map(Duration::from_millis)
                .map_err(|_| "invalid duration format")
        }
    }
}
