use crate::error::EngineError;
use crate::policy::{EnforcementReport, PolicyEngine};
use entity::{EventKind, LifecycleEvent};
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tracing::{error, info, warn};

/// An inbound lifecycle message and the channel its outcome is sent back on.
#[derive(Debug)]
pub struct EventEnvelope {
    pub payload: Value,
    pub reply: oneshot::Sender<EventOutcome>,
}

#[derive(Debug)]
pub enum EventOutcome {
    /// A `ready` event: stored and enforced.
    Enforced(EnforcementReport),
    /// An `updated` event: stored.
    Stored,
    /// A `reaped` event: removed from the store.
    Removed,
    /// An event type the reaper does not handle.
    Ignored(String),
    /// The payload was not a valid lifecycle event.
    Invalid(EngineError),
    /// Processing aborted. Storage faults are redelivered, configuration
    /// errors are not.
    Failed(EngineError),
}

impl EventOutcome {
    /// Whether the event is done with and should not be redelivered.
    pub fn is_acknowledged(&self) -> bool {
        !matches!(self, EventOutcome::Failed(e) if e.is_storage())
    }
}

pub async fn process_event(engine: &PolicyEngine, payload: Value) -> EventOutcome {
    let event = match LifecycleEvent::parse(payload) {
        Ok(event) => event,
        Err(e) => {
            error!("Invalid build message received: {}", e);
            return EventOutcome::Invalid(e.into());
        }
    };

    let build = &event.build;
    let outcome = match &event.kind {
        EventKind::Ready => match engine.store().builds().put(build).await {
            Ok(()) => match engine.enforce(build).await {
                Ok(report) => EventOutcome::Enforced(report),
                Err(e) => EventOutcome::Failed(e),
            },
            Err(e) => EventOutcome::Failed(e.into()),
        },
        EventKind::Updated => match engine.store().builds().put(build).await {
            Ok(()) => EventOutcome::Stored,
            Err(e) => EventOutcome::Failed(e.into()),
        },
        EventKind::Reaped => match engine.store().builds().delete(build).await {
            Ok(()) => {
                info!(
                    build_id = %build.id,
                    project_id = %build.project.id,
                    "Reap event received, removed build {} from the database",
                    build.id
                );
                EventOutcome::Removed
            }
            Err(e) => EventOutcome::Failed(e.into()),
        },
        EventKind::Other(kind) => {
            info!(build_id = %build.id, "Ignoring {} event", kind);
            EventOutcome::Ignored(kind.clone())
        }
    };

    if let EventOutcome::Failed(e) = &outcome {
        error!(
            build_id = %build.id,
            "There was an error processing build data: {}",
            e
        );
    }

    outcome
}

/// Processes envelopes one at a time, in arrival order.
pub async fn run_consumer(mut event_rx: mpsc::Receiver<EventEnvelope>, engine: Arc<PolicyEngine>) {
    info!("Starting event consumer");

    while let Some(envelope) = event_rx.recv().await {
        let outcome = process_event(&engine, envelope.payload).await;

        if envelope.reply.send(outcome).is_err() {
            warn!("Event sender went away before the outcome was ready");
        }
    }

    info!("Event consumer shutting down");
}
