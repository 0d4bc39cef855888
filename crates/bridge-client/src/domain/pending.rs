//! Correlation Table - maps correlation ids to in-flight requests.
//!
//! Flow:
//! 1. The scheduler allocates a `CorrelationId`
//! 2. It calls `register()` (or `register_subscription()`) to get a oneshot receiver
//! 3. It sends the outbound envelope carrying that id
//! 4. `dispatch_inbound` calls `resolve()` with the reply's id
//! 5. The scheduler awaits the receiver or times out and calls `expire()`

use crate::domain::error::ProtocolError;
use crate::domain::registry::EventCallback;
use bridge_types::{CorrelationId, InboundEnvelope, RequestKind, RequestPath};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::oneshot;
use tracing::{debug, warn};

/// How an entry completes.
enum Completion {
    /// Single reply, then the entry is gone.
    Reply {
        kind: RequestKind,
        sender: oneshot::Sender<InboundEnvelope>,
    },
    /// Standing subscription. The first reply acknowledges it; every later
    /// message for the same id is an event for `callback`.
    Subscription {
        ack: Option<oneshot::Sender<InboundEnvelope>>,
        callback: EventCallback,
    },
}

/// A request waiting for its reply
struct PendingRequest {
    completion: Completion,
    /// When request was created
    created_at: Instant,
    /// Request path (for logging)
    path: String,
}

impl PendingRequest {
    /// Delivery for a message on a subscription entry, which stays in the
    /// table. `None` for one-shot requests.
    fn subscription_delivery(&mut self) -> Option<Resolution> {
        match &mut self.completion {
            Completion::Subscription { ack, callback } => Some(match ack.take() {
                Some(sender) => Resolution::Ack { sender },
                None => Resolution::Event {
                    callback: callback.clone(),
                },
            }),
            Completion::Reply { .. } => None,
        }
    }

    fn into_resolution(self) -> Resolution {
        match self.completion {
            Completion::Reply { kind, sender } => Resolution::Reply { kind, sender },
            Completion::Subscription {
                ack: Some(sender), ..
            } => Resolution::Ack { sender },
            Completion::Subscription { ack: None, callback } => Resolution::Event { callback },
        }
    }
}

/// What `resolve()` found for an inbound message.
#[derive(Debug)]
pub enum Resolution {
    /// A one-shot request. The entry has been removed.
    Reply {
        kind: RequestKind,
        sender: oneshot::Sender<InboundEnvelope>,
    },
    /// First reply to a subscription request. The entry stays for events.
    Ack {
        sender: oneshot::Sender<InboundEnvelope>,
    },
    /// Event for an acknowledged subscription.
    Event { callback: EventCallback },
}

/// Statistics for the correlation table
#[derive(Debug, Default)]
pub struct PendingStats {
    /// Total requests registered
    pub total_registered: AtomicU64,
    /// Total replies matched to an entry
    pub total_completed: AtomicU64,
    /// Total requests timed out
    pub total_timeouts: AtomicU64,
    /// Total entries removed without a reply (unsubscribed, dropped, disposed)
    pub total_cancelled: AtomicU64,
    /// Total inbound messages with no matching entry
    pub total_unexpected: AtomicU64,
}

/// Correlation table. At most one entry per correlation id.
pub struct PendingRequestStore {
    pending: DashMap<CorrelationId, PendingRequest>,
    stats: Arc<PendingStats>,
}

impl PendingRequestStore {
    pub fn new() -> Self {
        Self {
            pending: DashMap::new(),
            stats: Arc::new(PendingStats::default()),
        }
    }

    /// Register a one-shot request and get a receiver for its reply.
    pub fn register(
        &self,
        correlation_id: CorrelationId,
        path: &RequestPath,
    ) -> oneshot::Receiver<InboundEnvelope> {
        let (tx, rx) = oneshot::channel();
        self.insert(
            correlation_id,
            path,
            Completion::Reply {
                kind: path.kind(),
                sender: tx,
            },
        );
        rx
    }

    /// Register a subscription and get a receiver for its acknowledgement.
    pub fn register_subscription(
        &self,
        correlation_id: CorrelationId,
        path: &RequestPath,
        callback: EventCallback,
    ) -> oneshot::Receiver<InboundEnvelope> {
        let (tx, rx) = oneshot::channel();
        self.insert(
            correlation_id,
            path,
            Completion::Subscription {
                ack: Some(tx),
                callback,
            },
        );
        rx
    }

    fn insert(&self, correlation_id: CorrelationId, path: &RequestPath, completion: Completion) {
        let request = PendingRequest {
            completion,
            created_at: Instant::now(),
            path: path.to_string(),
        };

        if self.pending.insert(correlation_id, request).is_some() {
            // Ids are random v4 uuids; a collision means a caller reused one.
            warn!(correlation_id = %correlation_id, "Replaced existing pending entry");
        }
        self.stats.total_registered.fetch_add(1, Ordering::Relaxed);

        debug!(
            correlation_id = %correlation_id,
            path = %path,
            "Registered pending request"
        );
    }

    /// Match an inbound message to its entry.
    pub fn resolve(&self, envelope: &InboundEnvelope) -> Result<Resolution, ProtocolError> {
        let correlation_id = envelope.message_uid;

        let Entry::Occupied(mut entry) = self.pending.entry(correlation_id) else {
            self.stats.total_unexpected.fetch_add(1, Ordering::Relaxed);
            return Err(ProtocolError::UnexpectedReply {
                correlation_id,
                path: envelope.path.clone(),
            });
        };

        if let Some(resolution) = entry.get_mut().subscription_delivery() {
            if matches!(resolution, Resolution::Ack { .. }) {
                self.stats.total_completed.fetch_add(1, Ordering::Relaxed);
                debug!(correlation_id = %correlation_id, "Subscription acknowledged");
            }
            return Ok(resolution);
        }

        let request = entry.remove();
        self.stats.total_completed.fetch_add(1, Ordering::Relaxed);
        debug!(
            correlation_id = %correlation_id,
            path = request.path,
            response_time_ms = request.created_at.elapsed().as_millis(),
            "Completed pending request"
        );
        Ok(request.into_resolution())
    }

    /// Drop an entry whose deadline passed. Returns false if it already completed.
    pub fn expire(&self, correlation_id: &CorrelationId) -> bool {
        match self.pending.remove(correlation_id) {
            Some((_, request)) => {
                self.stats.total_timeouts.fetch_add(1, Ordering::Relaxed);
                warn!(
                    correlation_id = %correlation_id,
                    path = request.path,
                    elapsed_ms = request.created_at.elapsed().as_millis(),
                    "Pending request exceeded time limit"
                );
                true
            }
            None => false,
        }
    }

    /// Drop an entry without a reply.
    pub fn cancel(&self, correlation_id: &CorrelationId) -> bool {
        if self.pending.remove(correlation_id).is_some() {
            self.stats.total_cancelled.fetch_add(1, Ordering::Relaxed);
            true
        } else {
            false
        }
    }

    /// Drop every entry. Waiting callers observe a closed channel.
    pub fn drain(&self) -> usize {
        let count = self.pending.len();
        self.pending.clear();
        self.stats
            .total_cancelled
            .fetch_add(count as u64, Ordering::Relaxed);
        count
    }

    /// Get number of entries (requests plus live subscriptions)
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Check if a correlation ID is pending
    pub fn is_pending(&self, correlation_id: &CorrelationId) -> bool {
        self.pending.contains_key(correlation_id)
    }

    /// Get statistics
    pub fn stats(&self) -> &PendingStats {
        &self.stats
    }
}

impl Default for PendingRequestStore {
    fn default() -> Self {
        Self::new()
    }
}
