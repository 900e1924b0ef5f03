//! Event envelopes exchanged over the observer `WebSocket`.
//!
//! Every frame is a JSON object of the form
//! `{"event": "<name>", "data": <payload>}`.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::structs::{InitPayload, LogEntry};

/// A payload carrying only a participant name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct NamePayload {
    /// The participant's display name.
    pub name: String,
}

impl NamePayload {
    /// Wrap a name.
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

/// Server-to-client events, in the order the dispatcher emits them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum ServerEvent {
    /// Full state bootstrap, sent on connect and after every reset.
    Init(Box<InitPayload>),
    /// The new progress value.
    ProgressUpdate(f64),
    /// The newest activity log entry (prepend on the client).
    NewLog(LogEntry),
    /// Cosmetic hint: animate a particle for this participant.
    SpawnParticle(NamePayload),
    /// One-shot completion ceremony signal.
    Completion(NamePayload),
}

impl ServerEvent {
    /// The wire name of this event.
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Init(_) => "init",
            Self::ProgressUpdate(_) => "progress_update",
            Self::NewLog(_) => "new_log",
            Self::SpawnParticle(_) => "spawn_particle",
            Self::Completion(_) => "completion",
        }
    }
}

/// Client-to-server events.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum ClientEvent {
    /// A participant submitted their name.
    UserSubmit(NamePayload),
}
