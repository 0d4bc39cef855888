//! # Callback Registry
//!
//! Tracks, per subscription path, the `(callback, correlation id)` pairs that
//! are currently subscribed.
//!
//! ## Reference counting
//!
//! The number of entries under a path is what decides whether the host still
//! needs to deliver events for it. A path is removed as soon as its last
//! entry goes, so an empty subscriber list never lingers.
//!
//! Registering the same callback twice on the same path stacks: each
//! registration is an independent subscription with its own correlation id
//! and needs its own removal.

use bridge_types::CorrelationId;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

static NEXT_CALLBACK_ID: AtomicU64 = AtomicU64::new(1);

/// Identity of an [`EventCallback`]; shared by all of its clones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CallbackId(u64);

/// Caller-supplied handler for subscription events.
///
/// Closures have no usable identity, so each callback gets an id at
/// construction. Clones compare equal; two callbacks built from the same
/// closure do not.
#[derive(Clone)]
pub struct EventCallback {
    id: CallbackId,
    handler: Arc<dyn Fn(Value) + Send + Sync>,
}

impl EventCallback {
    pub fn new<F>(handler: F) -> Self
    where
        F: Fn(Value) + Send + Sync + 'static,
    {
        Self {
            id: CallbackId(NEXT_CALLBACK_ID.fetch_add(1, Ordering::Relaxed)),
            handler: Arc::new(handler),
        }
    }

    pub fn id(&self) -> CallbackId {
        self.id
    }

    /// Deliver one event's content.
    pub fn invoke(&self, content: Value) {
        (self.handler)(content)
    }
}

impl PartialEq for EventCallback {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for EventCallback {}

impl fmt::Debug for EventCallback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventCallback").field("id", &self.id).finish()
    }
}

/// One registered subscriber.
#[derive(Debug, Clone)]
pub struct Subscriber {
    pub callback: EventCallback,
    pub correlation_id: CorrelationId,
}

/// Subscribers grouped by subscription path.
#[derive(Debug, Default)]
pub struct CallbackRegistry {
    by_path: HashMap<String, Vec<Subscriber>>,
}

impl CallbackRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a subscriber. Never fails; duplicates stack.
    pub fn add_callback(&mut self, path: &str, callback: EventCallback, correlation_id: CorrelationId) {
        self.by_path
            .entry(path.to_string())
            .or_default()
            .push(Subscriber {
                callback,
                correlation_id,
            });
    }

    /// Correlation id of the oldest subscription of `callback` on `path`.
    pub fn lookup_correlation_id(&self, path: &str, callback: &EventCallback) -> Option<CorrelationId> {
        self.by_path
            .get(path)?
            .iter()
            .find(|s| &s.callback == callback)
            .map(|s| s.correlation_id)
    }

    /// Remove exactly one entry. Returns false if it was not registered.
    pub fn remove_callback(&mut self, path: &str, correlation_id: CorrelationId) -> bool {
        let Some(subscribers) = self.by_path.get_mut(path) else {
            return false;
        };
        let Some(index) = subscribers
            .iter()
            .position(|s| s.correlation_id == correlation_id)
        else {
            return false;
        };

        subscribers.remove(index);
        if subscribers.is_empty() {
            self.by_path.remove(path);
        }
        true
    }

    /// Current subscribers of `path`, in registration order.
    pub fn list_subscribers(&self, path: &str) -> &[Subscriber] {
        self.by_path.get(path).map(Vec::as_slice).unwrap_or_default()
    }

    /// Number of paths with at least one subscriber.
    pub fn path_count(&self) -> usize {
        self.by_path.len()
    }

    /// Drop every subscriber.
    pub fn clear(&mut self) {
        self.by_path.clear();
    }
}
