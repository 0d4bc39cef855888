//! # Bridge Runtime Library
//!
//! Exposes the loopback host used by the `bridge-runtime` binary and by the
//! integration suite.

pub mod host_sim;

pub use host_sim::{spawn_host, HostError, HostHandle, LoopbackHost};
