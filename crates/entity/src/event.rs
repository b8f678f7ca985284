use crate::build::Build;
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventKind {
    Ready,
    Updated,
    Reaped,
    Other(String),
}

impl EventKind {
    fn parse(name: &str) -> Self {
        match name {
            "ready" => EventKind::Ready,
            "updated" => EventKind::Updated,
            "reaped" => EventKind::Reaped,
            other => EventKind::Other(other.to_string()),
        }
    }
}

/// A build lifecycle message, `{event, build}`.
#[derive(Debug, Clone)]
pub struct LifecycleEvent {
    pub kind: EventKind,
    pub build: Build,
}

#[derive(Error, Debug)]
pub enum EventError {
    #[error("event payload is not an object")]
    NotAnObject,

    #[error("event has no build")]
    MissingBuild,

    #[error("invalid build in event: {0}")]
    InvalidBuild(#[from] serde_json::Error),
}

#[derive(Deserialize)]
struct Envelope {
    #[serde(default)]
    event: Option<String>,
    #[serde(default)]
    build: Option<Value>,
}

impl LifecycleEvent {
    pub fn parse(payload: Value) -> Result<Self, EventError> {
        if !payload.is_object() {
            return Err(EventError::NotAnObject);
        }

        let envelope: Envelope = serde_json::from_value(payload)?;
        let build = match envelope.build {
            Some(Value::Null) | None => return Err(EventError::MissingBuild),
            Some(build) => serde_json::from_value(build)?,
        };

        Ok(Self {
            kind: EventKind::parse(envelope.event.as_deref().unwrap_or_default()),
            build,
        })
    }
}
