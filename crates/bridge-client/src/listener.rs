//! Inbound listener: feeds admitted host messages into the scheduler.

use crate::adapters::gate::InboundGate;
use crate::ports::inbound::{InboundSource, RawInbound};
use crate::ports::outbound::TransportError;
use crate::scheduler::RequestScheduler;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Pulls raw messages from an [`InboundSource`], screens them through the
/// [`InboundGate`] and dispatches the survivors.
pub struct InboundListener<S> {
    scheduler: Arc<RequestScheduler>,
    gate: InboundGate,
    source: S,
}

impl<S: InboundSource> InboundListener<S> {
    pub fn new(scheduler: Arc<RequestScheduler>, gate: InboundGate, source: S) -> Self {
        Self {
            scheduler,
            gate,
            source,
        }
    }

    /// Run the listener loop until the source closes.
    pub async fn run(mut self) {
        loop {
            match self.source.receive().await {
                Ok(raw) => {
                    self.handle(raw);
                }
                Err(TransportError::ChannelClosed) => {
                    info!("Inbound source closed, stopping listener");
                    break;
                }
                Err(e) => {
                    error!(error = %e, "Error receiving inbound message");
                }
            }
        }
    }

    /// Screen and dispatch one message. Returns true if the scheduler
    /// accepted it.
    pub fn handle(&self, raw: RawInbound) -> bool {
        let origin = raw.origin.clone();
        let envelope = match self.gate.admit(raw) {
            Ok(envelope) => envelope,
            Err(reason) => {
                warn!(origin = %origin, reason = %reason, "Rejected inbound message");
                return false;
            }
        };

        debug!(
            correlation_id = %envelope.message_uid,
            path = %envelope.path,
            status = %envelope.status_code,
            "Admitted inbound message"
        );
        // Unexpected replies are logged by the scheduler.
        self.scheduler.dispatch_inbound(envelope).is_ok()
    }
}
