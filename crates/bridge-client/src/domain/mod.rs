//! Domain types for the bridge client.
//!
//! State owned by a single scheduler instance: session, correlation table,
//! callback registry and conflict bookkeeping. Nothing here does I/O.

pub mod config;
pub mod error;
pub mod pending;
pub mod policy;
pub mod registry;
pub mod session;

// Re-exports for convenience
pub use config::{BridgeConfig, ConfigError, Environment, DEFAULT_REQUEST_TIMEOUT};
pub use error::{BridgeError, BridgeResult, ProtocolError};
pub use pending::{PendingRequestStore, PendingStats, Resolution};
pub use policy::{ConflictPolicy, GetPermit, InFlightGets, PathLocks, SubscriptionGuard};
pub use registry::{CallbackId, CallbackRegistry, EventCallback, Subscriber};
pub use session::Session;
