//! # Conflict Policies
//!
//! What a get-style request does when another get for the same path is still
//! in flight:
//!
//! - [`ConflictPolicy::RejectConflict`]: fail at once with `Conflict`, nothing
//!   is sent, the in-flight request is untouched.
//! - [`ConflictPolicy::Queue`]: wait, then go out once every earlier request
//!   for the path has settled, in FIFO order.
//!
//! Paths never wait on each other. The policy is fixed per scheduler.
//!
//! Subscription mutations use a separate per-path lock ([`PathLocks`]) so an
//! `on` and an `off` for the same path never overlap.

use crate::domain::error::{BridgeError, BridgeResult};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::OwnedMutexGuard;
use tracing::debug;

/// Policy selected at construction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictPolicy {
    #[default]
    RejectConflict,
    Queue,
}

impl ConflictPolicy {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "reject_conflict" | "rejectconflict" | "reject" => Some(Self::RejectConflict),
            "queue" => Some(Self::Queue),
            _ => None,
        }
    }
}

/// One async mutex per path. An entry lives exactly as long as some guard or
/// waiter for its path, so the map only holds paths with activity.
type SlotMap = Arc<Mutex<HashMap<String, Arc<PathSlot>>>>;

#[derive(Default)]
struct PathSlot {
    lock: Arc<tokio::sync::Mutex<()>>,
    waiting: AtomicUsize,
}

#[derive(Default)]
struct KeyedLocks {
    slots: SlotMap,
}

impl KeyedLocks {
    fn handle(&self, path: &str) -> SlotHandle {
        let slot = self.slots.lock().entry(path.to_string()).or_default().clone();
        SlotHandle {
            path: path.to_string(),
            slot,
            slots: self.slots.clone(),
            waiting: false,
        }
    }

    /// Wait for the path in FIFO order. Dropping the future at any point,
    /// including right after the lock was handed over, releases the path.
    async fn lock(&self, path: &str) -> PathGuard {
        let mut handle = self.handle(path);
        let lock = handle.slot.lock.clone();
        handle.set_waiting(true);
        let guard = lock.lock_owned().await;
        handle.set_waiting(false);
        PathGuard {
            _guard: guard,
            _handle: handle,
        }
    }

    fn try_lock(&self, path: &str) -> Option<PathGuard> {
        let handle = self.handle(path);
        let guard = handle.slot.lock.clone().try_lock_owned().ok()?;
        Some(PathGuard {
            _guard: guard,
            _handle: handle,
        })
    }

    fn contains(&self, path: &str) -> bool {
        self.slots.lock().contains_key(path)
    }

    fn waiting(&self, path: &str) -> usize {
        self.slots
            .lock()
            .get(path)
            .map_or(0, |slot| slot.waiting.load(Ordering::SeqCst))
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.slots.lock().len()
    }
}

/// Keeps a path's entry alive; the last handle out removes it.
struct SlotHandle {
    path: String,
    slot: Arc<PathSlot>,
    slots: SlotMap,
    waiting: bool,
}

impl SlotHandle {
    fn set_waiting(&mut self, waiting: bool) {
        if waiting == self.waiting {
            return;
        }
        if waiting {
            self.slot.waiting.fetch_add(1, Ordering::SeqCst);
        } else {
            self.slot.waiting.fetch_sub(1, Ordering::SeqCst);
        }
        self.waiting = waiting;
    }
}

impl Drop for SlotHandle {
    fn drop(&mut self) {
        self.set_waiting(false);
        let mut slots = self.slots.lock();
        // The map and this handle are the only owners left.
        let last = slots
            .get(&self.path)
            .is_some_and(|slot| Arc::ptr_eq(slot, &self.slot) && Arc::strong_count(slot) == 2);
        if last {
            slots.remove(&self.path);
        }
    }
}

/// Exclusive hold on one path. Fields drop in order: the lock is released
/// before the entry is considered for removal.
struct PathGuard {
    _guard: OwnedMutexGuard<()>,
    _handle: SlotHandle,
}

/// Tracks which paths have a get in flight.
#[derive(Default)]
pub struct InFlightGets {
    locks: KeyedLocks,
}

impl InFlightGets {
    pub fn new() -> Self {
        Self::default()
    }

    /// Obtain the right to send a get for `path`.
    pub async fn acquire(&self, path: &str, policy: ConflictPolicy) -> BridgeResult<GetPermit> {
        let guard = match policy {
            ConflictPolicy::RejectConflict => self.locks.try_lock(path).ok_or_else(|| {
                debug!(path = path, "Rejecting conflicting request");
                BridgeError::Conflict {
                    path: path.to_string(),
                }
            })?,
            ConflictPolicy::Queue => {
                if self.locks.contains(path) {
                    debug!(
                        path = path,
                        queued = self.locks.waiting(path) + 1,
                        "Queued behind in-flight request"
                    );
                }
                self.locks.lock(path).await
            }
        };
        Ok(GetPermit { _guard: guard })
    }

    /// True if a get for `path` is in flight.
    pub fn is_in_flight(&self, path: &str) -> bool {
        self.locks.contains(path)
    }

    /// Number of requests waiting behind the in-flight one for `path`.
    pub fn queued(&self, path: &str) -> usize {
        self.locks.waiting(path)
    }
}

/// Right to have one get in flight for a path. Dropping it hands the slot to
/// the next waiter or frees the path.
pub struct GetPermit {
    _guard: PathGuard,
}

/// One async mutex per subscription path.
#[derive(Default)]
pub struct PathLocks {
    locks: KeyedLocks,
}

/// Held while a subscription mutation for one path runs.
pub struct SubscriptionGuard {
    _guard: PathGuard,
}

impl PathLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait until no other subscription mutation for `path` is running.
    pub async fn lock(&self, path: &str) -> SubscriptionGuard {
        SubscriptionGuard {
            _guard: self.locks.lock(path).await,
        }
    }
}
