// Typed stream events and their encoded (wire-ready) form.

use crate::models::{ContainerSnapshot, ProcessInfo, ServiceSnapshot, SystemSnapshot};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    System,
    Docker,
    Services,
}

impl EventKind {
    pub const ALL: [EventKind; 3] = [EventKind::System, EventKind::Docker, EventKind::Services];

    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::System => "system",
            EventKind::Docker => "docker",
            EventKind::Services => "services",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "system" => Ok(EventKind::System),
            "docker" => Ok(EventKind::Docker),
            "services" => Ok(EventKind::Services),
            other => anyhow::bail!("unknown event type '{other}'"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemPayload {
    pub system: SystemSnapshot,
    pub processes: Vec<ProcessInfo>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    System(SystemPayload),
    Docker(Vec<ContainerSnapshot>),
    Services(Vec<ServiceSnapshot>),
}

impl StreamEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            StreamEvent::System(_) => EventKind::System,
            StreamEvent::Docker(_) => EventKind::Docker,
            StreamEvent::Services(_) => EventKind::Services,
        }
    }

    /// Serialize fully; a frame either exists whole or not at all.
    pub fn encode(&self) -> serde_json::Result<StreamFrame> {
        let data = match self {
            StreamEvent::System(p) => serde_json::to_string(p)?,
            StreamEvent::Docker(c) => serde_json::to_string(c)?,
            StreamEvent::Services(s) => serde_json::to_string(s)?,
        };
        Ok(StreamFrame {
            kind: self.kind(),
            data,
        })
    }
}

/// One serialized event, ready to be written as an SSE frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamFrame {
    pub kind: EventKind,
    pub data: String,
}

impl StreamFrame {
    pub fn decode(&self) -> serde_json::Result<StreamEvent> {
        Ok(match self.kind {
            EventKind::System => StreamEvent::System(serde_json::from_str(&self.data)?),
            EventKind::Docker => StreamEvent::Docker(serde_json::from_str(&self.data)?),
            EventKind::Services => StreamEvent::Services(serde_json::from_str(&self.data)?),
        })
    }
}
