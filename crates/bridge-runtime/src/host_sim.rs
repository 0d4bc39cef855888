//! Loopback host simulator.
//!
//! Answers `init`, `get/*`, `on/*` and `off/*` the way a host would, pushes
//! events to active subscriptions on request, and can be told to hold back
//! the replies for a path (to exercise timeouts and queueing).

use bridge_client::{HostEnd, RawInbound};
use bridge_types::{CorrelationId, InboundEnvelope, OutboundEnvelope, RequestKind, RequestPath, StatusCode};
use serde_json::{json, Value};
use std::collections::{HashMap, HashSet};
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Errors talking to a spawned host.
#[derive(Debug, Error)]
pub enum HostError {
    #[error("host task stopped")]
    Stopped,

    #[error("failed to encode inbound message: {0}")]
    Encode(#[from] serde_json::Error),
}

#[derive(Debug, Clone)]
struct HostSubscription {
    client_uid: String,
    correlation_id: CorrelationId,
}

/// In-process stand-in for the host side of the bridge.
#[derive(Debug)]
pub struct LoopbackHost {
    origin: String,
    context: Value,
    service: Value,
    /// Content served for each get path
    data: HashMap<String, Value>,
    /// Active subscriptions per topic
    subscriptions: HashMap<String, Vec<HostSubscription>>,
    silenced: HashSet<String>,
    held: Vec<InboundEnvelope>,
    received: Vec<OutboundEnvelope>,
}

impl LoopbackHost {
    /// Host posting from `origin`, serving some sample user/contact/call data.
    pub fn new(origin: impl Into<String>) -> Self {
        let data = HashMap::from([
            ("get/user".to_string(), json!({"id": 1, "first_name": "Amy", "last_name": "Jones"})),
            ("get/contact".to_string(), json!({"id": 42, "name": "Ben Ortiz", "phone": "+15550100"})),
            ("get/call".to_string(), json!({"id": 7, "state": "idle"})),
        ]);

        Self {
            origin: origin.into(),
            context: json!("c1"),
            service: json!("s1"),
            data,
            subscriptions: HashMap::new(),
            silenced: HashSet::new(),
            held: Vec::new(),
            received: Vec::new(),
        }
    }

    /// Session values handed out on `init`.
    pub fn with_session(mut self, context: Value, service: Value) -> Self {
        self.context = context;
        self.service = service;
        self
    }

    /// Serve `content` for a get path.
    pub fn with_data(mut self, path: impl Into<String>, content: Value) -> Self {
        self.data.insert(path.into(), content);
        self
    }

    pub fn origin(&self) -> &str {
        &self.origin
    }

    /// Every request seen so far, in arrival order.
    pub fn received(&self) -> &[OutboundEnvelope] {
        &self.received
    }

    /// Host-side subscriptions for a topic such as `call`.
    pub fn subscription_count(&self, topic: &str) -> usize {
        self.subscriptions.get(topic).map_or(0, Vec::len)
    }

    /// Hold back replies for `path` until [`release`](Self::release).
    pub fn silence(&mut self, path: impl Into<String>) {
        self.silenced.insert(path.into());
    }

    /// Stop holding replies for `path` and return the held ones.
    pub fn release(&mut self, path: &str) -> Vec<InboundEnvelope> {
        self.silenced.remove(path);
        let (released, held): (Vec<_>, Vec<_>) = self.held.drain(..).partition(|reply| reply.path == path);
        self.held = held;
        released
    }

    /// Process one request and return the replies to post right away.
    pub fn handle(&mut self, request: OutboundEnvelope) -> Vec<InboundEnvelope> {
        debug!(
            correlation_id = %request.message_uid,
            path = %request.path,
            "Host received request"
        );
        let reply = self.answer(&request);
        self.received.push(request);

        if self.silenced.contains(&reply.path) {
            debug!(correlation_id = %reply.message_uid, path = %reply.path, "Holding reply");
            self.held.push(reply);
            return Vec::new();
        }
        vec![reply]
    }

    /// One event per active subscription of `topic`.
    pub fn emit(&self, topic: &str, content: Value) -> Vec<InboundEnvelope> {
        self.subscriptions
            .get(topic)
            .into_iter()
            .flatten()
            .map(|subscription| InboundEnvelope {
                path: topic.to_string(),
                message_uid: subscription.correlation_id,
                status_code: StatusCode::Ok,
                content: content.clone(),
                context: self.context.clone(),
                service: self.service.clone(),
                client_uid: Some(subscription.client_uid.clone()),
            })
            .collect()
    }

    /// Wrap an envelope as the guest's transport would receive it.
    pub fn to_raw(&self, envelope: &InboundEnvelope) -> Result<RawInbound, HostError> {
        Ok(RawInbound {
            origin: self.origin.clone(),
            data: serde_json::to_value(envelope)?,
        })
    }

    fn answer(&mut self, request: &OutboundEnvelope) -> InboundEnvelope {
        let path = RequestPath::new(request.path.as_str());
        let (status, content) = match path.kind() {
            RequestKind::Init => (
                StatusCode::Ok,
                json!({"context": self.context, "service": self.service}),
            ),
            _ if request.context != self.context || request.service != self.service => {
                (StatusCode::NotInitialized, Value::Null)
            }
            RequestKind::Get => match self.data.get(path.as_str()) {
                Some(content) => (StatusCode::Ok, content.clone()),
                None => (StatusCode::PathNotFound, Value::Null),
            },
            RequestKind::On => {
                self.subscriptions
                    .entry(path.subscription_path().to_string())
                    .or_default()
                    .push(HostSubscription {
                        client_uid: request.client_uid.clone(),
                        correlation_id: request.message_uid,
                    });
                (StatusCode::SubscriptionAdded, Value::Null)
            }
            RequestKind::Off => {
                let topic = path.subscription_path();
                if let Some(subscriptions) = self.subscriptions.get_mut(topic) {
                    subscriptions.retain(|s| s.client_uid != request.client_uid);
                    if subscriptions.is_empty() {
                        self.subscriptions.remove(topic);
                    }
                }
                (StatusCode::SubscriptionRemoved, Value::Null)
            }
        };

        InboundEnvelope {
            path: request.path.clone(),
            message_uid: request.message_uid,
            status_code: status,
            content,
            context: self.context.clone(),
            service: self.service.clone(),
            client_uid: Some(request.client_uid.clone()),
        }
    }
}

enum HostCommand {
    Emit {
        topic: String,
        content: Value,
        done: oneshot::Sender<usize>,
    },
    Silence {
        path: String,
        done: oneshot::Sender<()>,
    },
    Release {
        path: String,
        done: oneshot::Sender<usize>,
    },
    Received {
        done: oneshot::Sender<Vec<OutboundEnvelope>>,
    },
}

/// Control handle for a host running in its own task.
pub struct HostHandle {
    commands: mpsc::Sender<HostCommand>,
    task: JoinHandle<LoopbackHost>,
}

impl HostHandle {
    /// Push `content` to every subscription of `topic`. Returns the number of
    /// events posted.
    pub async fn emit(&self, topic: &str, content: Value) -> Result<usize, HostError> {
        self.call(|done| HostCommand::Emit {
            topic: topic.to_string(),
            content,
            done,
        })
        .await
    }

    /// Hold back replies for `path`.
    pub async fn silence(&self, path: &str) -> Result<(), HostError> {
        self.call(|done| HostCommand::Silence {
            path: path.to_string(),
            done,
        })
        .await
    }

    /// Post the held replies for `path` and answer it normally again.
    pub async fn release(&self, path: &str) -> Result<usize, HostError> {
        self.call(|done| HostCommand::Release {
            path: path.to_string(),
            done,
        })
        .await
    }

    /// Requests processed so far.
    pub async fn received(&self) -> Result<Vec<OutboundEnvelope>, HostError> {
        self.call(|done| HostCommand::Received { done }).await
    }

    /// Stop the host and hand back its final state.
    pub async fn shutdown(self) -> Result<LoopbackHost, HostError> {
        drop(self.commands);
        self.task.await.map_err(|_| HostError::Stopped)
    }

    async fn call<T>(&self, command: impl FnOnce(oneshot::Sender<T>) -> HostCommand) -> Result<T, HostError> {
        let (tx, rx) = oneshot::channel();
        self.commands
            .send(command(tx))
            .await
            .map_err(|_| HostError::Stopped)?;
        rx.await.map_err(|_| HostError::Stopped)
    }
}

/// Run `host` on the host end of a channel pair.
///
/// Requests already queued are always processed before a command, so a
/// command observes every request the guest finished sending.
pub fn spawn_host(host: LoopbackHost, end: HostEnd) -> HostHandle {
    let (commands, mut command_rx) = mpsc::channel(32);

    let task = tokio::spawn(async move {
        let mut host = host;
        let HostEnd {
            mut requests,
            replies,
        } = end;
        info!(origin = %host.origin, "Loopback host started");

        loop {
            let outgoing = tokio::select! {
                biased;
                Some(request) = requests.recv() => host.handle(request),
                command = command_rx.recv() => match command {
                    Some(command) => run_command(&mut host, command),
                    None => break,
                },
                else => break,
            };

            if !deliver(&host, &replies, outgoing).await {
                break;
            }
        }

        info!(requests = host.received.len(), "Loopback host stopped");
        host
    });

    HostHandle { commands, task }
}

fn run_command(host: &mut LoopbackHost, command: HostCommand) -> Vec<InboundEnvelope> {
    match command {
        HostCommand::Emit {
            topic,
            content,
            done,
        } => {
            let events = host.emit(&topic, content);
            let _ = done.send(events.len());
            events
        }
        HostCommand::Silence { path, done } => {
            host.silence(path);
            let _ = done.send(());
            Vec::new()
        }
        HostCommand::Release { path, done } => {
            let released = host.release(&path);
            let _ = done.send(released.len());
            released
        }
        HostCommand::Received { done } => {
            let _ = done.send(host.received.clone());
            Vec::new()
        }
    }
}

/// Post envelopes to the guest. Returns false once the guest is gone.
async fn deliver(host: &LoopbackHost, replies: &mpsc::Sender<RawInbound>, outgoing: Vec<InboundEnvelope>) -> bool {
    for envelope in outgoing {
        let raw = match host.to_raw(&envelope) {
            Ok(raw) => raw,
            Err(e) => {
                warn!(error = %e, correlation_id = %envelope.message_uid, "Dropping reply");
                continue;
            }
        };
        if replies.send(raw).await.is_err() {
            debug!("Guest channel closed");
            return false;
        }
    }
    true
}
