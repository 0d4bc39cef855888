//! # Request Scheduler
//!
//! Issues requests to the host and settles them from inbound replies.
//!
//! ## Life-cycle
//!
//! ```text
//! caller ─► check session ─► (get: conflict policy) ─► register pending
//!        ─► send envelope ─► await reply | timeout ─► settle
//!
//! listener ─► dispatch_inbound ─► resolve correlation id
//!          ├─► reply:  (init: store session) ─► complete caller
//!          ├─► ack:    complete the `on` caller, keep the entry
//!          └─► event:  invoke the subscriber's callback
//! ```
//!
//! Replies are matched strictly by `message_uid`. Every subscription gets its
//! own correlation id and the host is told to stop sending events only when
//! the last local subscriber of a path goes away.

use crate::domain::config::BridgeConfig;
use crate::domain::error::{BridgeError, BridgeResult, ProtocolError};
use crate::domain::pending::{PendingRequestStore, PendingStats, Resolution};
use crate::domain::policy::{ConflictPolicy, InFlightGets, PathLocks};
use crate::domain::registry::{CallbackRegistry, EventCallback};
use crate::domain::session::Session;
use crate::ports::outbound::Transport;
use bridge_types::{paths, CorrelationId, InboundEnvelope, OutboundEnvelope, RequestKind, RequestPath};
use parking_lot::{Mutex, RwLock};
use serde_json::Value;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use tracing::{debug, info, warn};

/// Correlates guest requests with host replies for one client instance.
pub struct RequestScheduler {
    client_uid: String,
    /// Origin every outbound envelope is addressed to
    host_origin: String,
    policy: ConflictPolicy,
    request_timeout: Duration,
    session: RwLock<Session>,
    pending: PendingRequestStore,
    registry: Mutex<CallbackRegistry>,
    in_flight: InFlightGets,
    path_locks: PathLocks,
    transport: Arc<dyn Transport>,
    disposed: AtomicBool,
}

impl RequestScheduler {
    pub fn new(
        client_uid: impl Into<String>,
        host_origin: impl Into<String>,
        policy: ConflictPolicy,
        request_timeout: Duration,
        transport: Arc<dyn Transport>,
    ) -> Self {
        Self {
            client_uid: client_uid.into(),
            host_origin: host_origin.into(),
            policy,
            request_timeout,
            session: RwLock::new(Session::Uninitialized),
            pending: PendingRequestStore::new(),
            registry: Mutex::new(CallbackRegistry::new()),
            in_flight: InFlightGets::new(),
            path_locks: PathLocks::new(),
            transport,
            disposed: AtomicBool::new(false),
        }
    }

    pub fn from_config(config: &BridgeConfig, transport: Arc<dyn Transport>) -> Self {
        Self::new(
            config.client_uid.clone(),
            config.host_origin(),
            config.conflict_policy,
            config.request_timeout,
            transport,
        )
    }

    /// Negotiate the session. Resolves with the reply content once the
    /// session holds the host's `context` and `service`.
    pub async fn request_init(&self) -> BridgeResult<Value> {
        let request = RequestPath::new(paths::INIT);
        self.check_ready(&request)?;

        let correlation_id = CorrelationId::new();
        let rx = self.pending.register(correlation_id, &request);
        let _in_flight = InFlight::request(self, correlation_id);

        let reply = self.exchange(&request, correlation_id, rx).await?;
        into_content(reply)
    }

    /// Fetch data from a get-style path, e.g. `get/user`. Resolves with the
    /// reply's `content`.
    pub async fn request_get(&self, path: &str) -> BridgeResult<Value> {
        let request = RequestPath::new(path);
        self.check_ready(&request)?;

        let _permit = self.in_flight.acquire(request.as_str(), self.policy).await?;
        // A queued request may have waited across a dispose.
        self.check_ready(&request)?;

        let correlation_id = CorrelationId::new();
        let rx = self.pending.register(correlation_id, &request);
        let _in_flight = InFlight::request(self, correlation_id);

        let reply = self.exchange(&request, correlation_id, rx).await?;
        into_content(reply)
    }

    /// Subscribe `callback` to events on `path` (e.g. `on/call`). Resolves
    /// with the subscription's correlation id once the host acknowledges it;
    /// events then go to the callback.
    pub async fn request_on(&self, path: &str, callback: EventCallback) -> BridgeResult<CorrelationId> {
        let request = RequestPath::new(path);
        self.check_ready(&request)?;

        let topic = request.subscription_path().to_string();
        let _guard = self.path_locks.lock(&topic).await;
        self.check_ready(&request)?;

        let correlation_id = CorrelationId::new();
        self.registry
            .lock()
            .add_callback(&topic, callback.clone(), correlation_id);
        let rx = self
            .pending
            .register_subscription(correlation_id, &request, callback);
        let in_flight = InFlight::subscription(self, correlation_id, &topic);

        let reply = self.exchange(&request, correlation_id, rx).await?;
        into_content(reply)?;
        in_flight.settle();

        info!(
            correlation_id = %correlation_id,
            path = %topic,
            subscribers = self.subscriber_count(&topic),
            "Subscription added"
        );
        Ok(correlation_id)
    }

    /// Cancel the subscription of `callback` on `path` (e.g. `off/call`).
    ///
    /// The local subscription is always removed. The host is only notified
    /// when it was the last subscriber of the path; the returned flag says
    /// whether that happened.
    pub async fn request_off(&self, path: &str, callback: &EventCallback) -> BridgeResult<bool> {
        if self.is_disposed() {
            return Err(BridgeError::Disposed);
        }
        let request = RequestPath::new(path);
        let topic = request.subscription_path().to_string();
        let _guard = self.path_locks.lock(&topic).await;

        let (correlation_id, remaining) = {
            let mut registry = self.registry.lock();
            let correlation_id = registry
                .lookup_correlation_id(&topic, callback)
                .ok_or_else(|| BridgeError::SubscriptionNotFound { path: topic.clone() })?;
            registry.remove_callback(&topic, correlation_id);
            (correlation_id, registry.list_subscribers(&topic).len())
        };
        self.pending.cancel(&correlation_id);

        if remaining > 0 {
            debug!(
                correlation_id = %correlation_id,
                path = %topic,
                remaining = remaining,
                "Removed subscriber, host not notified"
            );
            return Ok(false);
        }

        self.check_ready(&request)?;
        let off_id = CorrelationId::new();
        let rx = self.pending.register(off_id, &request);
        let _in_flight = InFlight::request(self, off_id);

        let reply = self.exchange(&request, off_id, rx).await?;
        into_content(reply)?;

        info!(
            correlation_id = %correlation_id,
            path = %topic,
            "Subscription removed"
        );
        Ok(true)
    }

    /// Entry point for every admitted inbound message.
    ///
    /// A message whose `message_uid` matches nothing is reported as a
    /// [`ProtocolError`]. Nothing else fails here: error statuses are handed
    /// to the waiting caller.
    pub fn dispatch_inbound(&self, envelope: InboundEnvelope) -> Result<(), ProtocolError> {
        let resolution = match self.pending.resolve(&envelope) {
            Ok(resolution) => resolution,
            Err(e) => {
                warn!(
                    correlation_id = %envelope.message_uid,
                    path = %envelope.path,
                    status = %envelope.status_code,
                    "Unexpected response"
                );
                return Err(e);
            }
        };

        match resolution {
            Resolution::Reply { kind, sender } => {
                if kind == RequestKind::Init && !envelope.status_code.is_error() {
                    self.store_session(&envelope);
                }
                complete(sender, envelope);
            }
            Resolution::Ack { sender } => complete(sender, envelope),
            Resolution::Event { callback } => {
                if envelope.status_code.is_error() {
                    warn!(
                        correlation_id = %envelope.message_uid,
                        path = %envelope.path,
                        status = %envelope.status_code,
                        "Dropping event with error status"
                    );
                } else {
                    debug!(
                        correlation_id = %envelope.message_uid,
                        path = %envelope.path,
                        "Delivering event"
                    );
                    callback.invoke(envelope.content);
                }
            }
        }
        Ok(())
    }

    /// Release everything this scheduler holds. Outstanding callers fail with
    /// `Disposed`, as does every later request.
    pub fn dispose(&self) {
        if self.disposed.swap(true, Ordering::SeqCst) {
            return;
        }
        let drained = self.pending.drain();
        self.registry.lock().clear();
        info!(drained = drained, "Request scheduler disposed");
    }

    pub fn is_initialized(&self) -> bool {
        self.session.read().is_initialized()
    }

    pub fn session(&self) -> Session {
        self.session.read().clone()
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::SeqCst)
    }

    pub fn client_uid(&self) -> &str {
        &self.client_uid
    }

    pub fn host_origin(&self) -> &str {
        &self.host_origin
    }

    pub fn policy(&self) -> ConflictPolicy {
        self.policy
    }

    pub fn request_timeout(&self) -> Duration {
        self.request_timeout
    }

    /// Entries in the correlation table, live subscriptions included.
    pub fn pending_count(&self) -> usize {
        self.pending.pending_count()
    }

    pub fn stats(&self) -> &PendingStats {
        self.pending.stats()
    }

    /// Local subscribers of a canonical subscription path such as `call`.
    pub fn subscriber_count(&self, path: &str) -> usize {
        self.registry.lock().list_subscribers(path).len()
    }

    /// True while a get for `path` is outstanding.
    pub fn is_in_flight(&self, path: &str) -> bool {
        self.in_flight.is_in_flight(path)
    }

    /// Gets waiting behind the outstanding one for `path`.
    pub fn queued(&self, path: &str) -> usize {
        self.in_flight.queued(path)
    }

    fn check_ready(&self, request: &RequestPath) -> BridgeResult<()> {
        if self.is_disposed() {
            return Err(BridgeError::Disposed);
        }
        if request.kind() != RequestKind::Init && !self.is_initialized() {
            debug!(path = %request, "Rejecting request before init");
            return Err(BridgeError::NotInitialized);
        }
        Ok(())
    }

    fn store_session(&self, envelope: &InboundEnvelope) {
        let mut session = self.session.write();
        if session.is_initialized() {
            debug!(correlation_id = %envelope.message_uid, "Session already initialized");
            return;
        }
        *session = Session::Initialized {
            context: envelope.context.clone(),
            service: envelope.service.clone(),
        };
        info!(correlation_id = %envelope.message_uid, "Session initialized");
    }

    /// Send the envelope for an already registered id and wait for its reply.
    async fn exchange(
        &self,
        request: &RequestPath,
        correlation_id: CorrelationId,
        mut rx: oneshot::Receiver<InboundEnvelope>,
    ) -> BridgeResult<InboundEnvelope> {
        let envelope = {
            let session = self.session.read();
            OutboundEnvelope {
                path: request.to_string(),
                client_uid: self.client_uid.clone(),
                message_uid: correlation_id,
                context: session.context(),
                service: session.service(),
            }
        };

        self.transport.send(&self.host_origin, envelope).await?;
        debug!(
            correlation_id = %correlation_id,
            path = %request,
            "Sent request"
        );

        match tokio::time::timeout(self.request_timeout, &mut rx).await {
            Ok(Ok(reply)) => Ok(reply),
            // Sender dropped: the table was drained or the entry cancelled.
            Ok(Err(_)) => Err(BridgeError::Disposed),
            Err(_) => {
                if let Ok(reply) = rx.try_recv() {
                    return Ok(reply);
                }
                if self.pending.expire(&correlation_id) {
                    return Err(BridgeError::Timeout {
                        correlation_id,
                        path: request.to_string(),
                        after: self.request_timeout,
                    });
                }
                // Resolved concurrently with the deadline; the reply is on its way.
                rx.await.map_err(|_| BridgeError::Disposed)
            }
        }
    }
}

/// Bookkeeping of one outstanding request, undone if the request does not
/// settle successfully (error, timeout, or the caller's future is dropped).
struct InFlight<'a> {
    scheduler: &'a RequestScheduler,
    correlation_id: CorrelationId,
    /// Registry path to roll back for a subscription
    topic: Option<&'a str>,
    armed: bool,
}

impl<'a> InFlight<'a> {
    fn request(scheduler: &'a RequestScheduler, correlation_id: CorrelationId) -> Self {
        Self {
            scheduler,
            correlation_id,
            topic: None,
            armed: true,
        }
    }

    fn subscription(scheduler: &'a RequestScheduler, correlation_id: CorrelationId, topic: &'a str) -> Self {
        Self {
            scheduler,
            correlation_id,
            topic: Some(topic),
            armed: true,
        }
    }

    /// Keep the bookkeeping.
    fn settle(mut self) {
        self.armed = false;
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        self.scheduler.pending.cancel(&self.correlation_id);
        if let Some(topic) = self.topic {
            if self
                .scheduler
                .registry
                .lock()
                .remove_callback(topic, self.correlation_id)
            {
                debug!(
                    correlation_id = %self.correlation_id,
                    path = topic,
                    "Rolled back subscription"
                );
            }
        }
    }
}

fn complete(sender: oneshot::Sender<InboundEnvelope>, envelope: InboundEnvelope) {
    let correlation_id = envelope.message_uid;
    if sender.send(envelope).is_err() {
        debug!(correlation_id = %correlation_id, "Requester went away before its reply");
    }
}

fn into_content(reply: InboundEnvelope) -> BridgeResult<Value> {
    if reply.status_code.is_error() {
        warn!(
            correlation_id = %reply.message_uid,
            path = %reply.path,
            status = %reply.status_code,
            "Host returned error status"
        );
        return Err(BridgeError::Host {
            path: reply.path,
            status: reply.status_code,
            content: reply.content,
        });
    }
    Ok(reply.content)
}
