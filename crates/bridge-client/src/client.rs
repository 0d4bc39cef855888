//! Host client facade.
//!
//! Maps the host's domain operations onto request paths and owns the
//! scheduler together with the listener task that feeds it.

use crate::adapters::gate::InboundGate;
use crate::domain::config::{BridgeConfig, ConfigError};
use crate::domain::error::{BridgeError, BridgeResult};
use crate::domain::registry::EventCallback;
use crate::listener::InboundListener;
use crate::ports::inbound::InboundSource;
use crate::ports::outbound::Transport;
use crate::scheduler::RequestScheduler;
use bridge_types::{paths, CorrelationId};
use parking_lot::Mutex;
use serde_json::Value;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::info;

/// Guest-side client for one host.
pub struct HostClient {
    config: BridgeConfig,
    scheduler: Arc<RequestScheduler>,
    listener: Mutex<Option<JoinHandle<()>>>,
}

impl HostClient {
    /// Validate `config` and start listening on `source`.
    ///
    /// Must be called from within a tokio runtime.
    pub fn new<S>(
        config: BridgeConfig,
        transport: Arc<dyn Transport>,
        source: S,
    ) -> Result<Self, ConfigError>
    where
        S: InboundSource + 'static,
    {
        config.validate()?;

        let scheduler = Arc::new(RequestScheduler::from_config(&config, transport));
        let gate = InboundGate::new(config.allowed_origins.clone(), config.client_uid.clone());
        let listener = tokio::spawn(InboundListener::new(scheduler.clone(), gate, source).run());

        info!(
            client_uid = %config.client_uid,
            host_origin = config.host_origin(),
            policy = ?config.conflict_policy,
            "Host client started"
        );

        Ok(Self {
            config,
            scheduler,
            listener: Mutex::new(Some(listener)),
        })
    }

    /// Initialize the session. Required before any other request.
    pub async fn init(&self) -> BridgeResult<Value> {
        self.check_surface(paths::INIT)?;
        self.scheduler.request_init().await
    }

    /// Data for the current host user.
    pub async fn get_current_user(&self) -> BridgeResult<Value> {
        self.get(paths::GET_USER).await
    }

    /// Data for the active contact.
    pub async fn get_current_contact(&self) -> BridgeResult<Value> {
        self.get(paths::GET_CONTACT).await
    }

    /// Data for the active call.
    pub async fn get_current_call(&self) -> BridgeResult<Value> {
        self.get(paths::GET_CALL).await
    }

    /// Generic get-style request.
    pub async fn get(&self, path: &str) -> BridgeResult<Value> {
        self.check_surface(path)?;
        self.scheduler.request_get(path).await
    }

    /// Receive call state events until [`off_call_state`](Self::off_call_state)
    /// is called with the same callback.
    pub async fn on_call_state(&self, callback: EventCallback) -> BridgeResult<CorrelationId> {
        self.subscribe(paths::ON_CALL, callback).await
    }

    /// Stop delivering call state events to `callback`.
    pub async fn off_call_state(&self, callback: &EventCallback) -> BridgeResult<bool> {
        self.unsubscribe(paths::OFF_CALL, callback).await
    }

    pub async fn subscribe(&self, path: &str, callback: EventCallback) -> BridgeResult<CorrelationId> {
        self.check_surface(path)?;
        self.scheduler.request_on(path, callback).await
    }

    pub async fn unsubscribe(&self, path: &str, callback: &EventCallback) -> BridgeResult<bool> {
        self.check_surface(path)?;
        self.scheduler.request_off(path, callback).await
    }

    pub fn scheduler(&self) -> &Arc<RequestScheduler> {
        &self.scheduler
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    /// Stop the listener and release the scheduler's state.
    pub fn dispose(&self) {
        if let Some(listener) = self.listener.lock().take() {
            listener.abort();
        }
        self.scheduler.dispose();
    }

    fn check_surface(&self, path: &str) -> BridgeResult<()> {
        match self.config.surface {
            Some(surface) if !surface.allows(path) => Err(BridgeError::PathNotAllowed {
                path: path.to_string(),
            }),
            _ => Ok(()),
        }
    }
}

impl Drop for HostClient {
    fn drop(&mut self) {
        if let Some(listener) = self.listener.get_mut().take() {
            listener.abort();
        }
    }
}
