use crate::ApiState;
use crate::error::{ApiError, Result};
use axum::{Json, body::Bytes, extract::State};
use reaper_engine::{EventEnvelope, EventOutcome};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::oneshot;
use tracing::{debug, error};

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct EventResponse {
    /// `enforced`, `stored`, `removed`, `ignored` or `invalid`.
    pub outcome: &'static str,

    /// Builds selected for removal by the enforcement pass.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub selected: Vec<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl EventResponse {
    fn new(outcome: &'static str) -> Self {
        Self {
            outcome,
            selected: Vec::new(),
            detail: None,
        }
    }
}

/// Hands the event to the consumer and waits until it has been fully
/// processed.
#[utoipa::path(
    post,
    path = "/events",
    request_body(content = String, content_type = "application/json", description = "Build lifecycle event `{event, build}`"),
    responses(
        (status = OK, description = "Event consumed", body = EventResponse),
        (status = BAD_REQUEST, description = "Body is not JSON"),
        (status = SERVICE_UNAVAILABLE, description = "Storage fault, redeliver the event"),
        (status = INTERNAL_SERVER_ERROR, description = "Limit configuration is invalid"),
    )
)]
pub async fn handle_event(
    State(state): State<Arc<ApiState>>,
    body: Bytes,
) -> Result<Json<EventResponse>> {
    let payload: serde_json::Value = serde_json::from_slice(&body)?;

    let (reply, outcome_rx) = oneshot::channel();
    state
        .event_tx
        .send(EventEnvelope { payload, reply })
        .await
        .map_err(|_| ApiError::ConsumerUnavailable)?;

    let outcome = outcome_rx.await.map_err(|_| {
        error!("Event consumer dropped the reply channel");
        ApiError::ConsumerUnavailable
    })?;
    debug!("Event processed: {:?}", outcome);

    let response = match outcome {
        EventOutcome::Enforced(report) => EventResponse {
            selected: report
                .selected_ids()
                .into_iter()
                .map(str::to_string)
                .collect(),
            ..EventResponse::new("enforced")
        },
        EventOutcome::Stored => EventResponse::new("stored"),
        EventOutcome::Removed => EventResponse::new("removed"),
        EventOutcome::Ignored(kind) => EventResponse {
            detail: Some(kind),
            ..EventResponse::new("ignored")
        },
        EventOutcome::Invalid(e) => EventResponse {
            detail: Some(e.to_string()),
            ..EventResponse::new("invalid")
        },
        EventOutcome::Failed(e) if e.is_config() => return Err(ApiError::Config(e.to_string())),
        EventOutcome::Failed(e) => return Err(ApiError::Storage(e.to_string())),
    };

    Ok(Json(response))
}
