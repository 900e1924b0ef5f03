//! Session records shared between the core state machine and observers.
//!
//! Field names are serialized in `camelCase` so the JSON seen by the front
//! ends matches the names they render (`isComplete`, `submissionCount`, ...).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// Progress value of a completed session. Only the completion trigger
/// ever sets it.
pub const COMPLETION_PROGRESS: f64 = 100.0;

// ---------------------------------------------------------------------------
// Submission
// ---------------------------------------------------------------------------

/// One accepted, non-trigger participant submission.
///
/// Immutable once created. Owned by the session until the next reset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub struct Submission {
    /// The submitted display name (trimmed).
    pub name: String,
    /// When the dispatcher accepted the submission.
    pub submitted_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// LogEntry
// ---------------------------------------------------------------------------

/// Presentation category of a [`LogEntry`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum LogKind {
    /// An ordinary accepted submission.
    Info,
    /// The completion trigger fired.
    Success,
}

/// A human-readable line for the live activity ticker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct LogEntry {
    /// Local wall-clock time, formatted `HH:MM:SS`.
    pub timestamp: String,
    /// Display message.
    pub message: String,
    /// Entry category. Serialized as `type` for the front ends.
    #[serde(rename = "type")]
    pub kind: LogKind,
}

// ---------------------------------------------------------------------------
// Snapshots
// ---------------------------------------------------------------------------

/// Observer view of the session at one point in the event stream.
///
/// Accepted submissions are deliberately absent; they leave the server only
/// through the export endpoint.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub struct SessionSnapshot {
    /// Current progress in `[0, 100]`.
    pub progress: f64,
    /// Whether the completion trigger has fired this session.
    pub is_complete: bool,
    /// Non-trigger submissions accepted since the last reset.
    pub submission_count: u64,
    /// Activity log, newest first.
    pub logs: Vec<LogEntry>,
}

/// Where participants can reach this server.
///
/// Resolved once at startup and carried unchanged across resets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub struct NetworkIdentity {
    /// Advertised local address (usually a LAN IPv4 address).
    pub server_ip: String,
    /// Advertised TCP port.
    pub port: u16,
    /// Public (tunnel) URL, when one is configured.
    pub public_url: Option<String>,
}

impl NetworkIdentity {
    /// URL participants should open to submit their name.
    ///
    /// The public URL wins when set; otherwise the advertised local address.
    pub fn join_url(&self) -> String {
        self.public_url.as_ref().map_or_else(
            || format!("http://{}:{}/join", self.server_ip, self.port),
            |base| format!("{base}/join"),
        )
    }
}

impl Default for NetworkIdentity {
    fn default() -> Self {
        Self {
            server_ip: String::from("127.0.0.1"),
            port: 3001,
            public_url: None,
        }
    }
}

/// Payload of the `init` event: a full snapshot plus network identity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct InitPayload {
    /// The session state.
    #[serde(flatten)]
    pub snapshot: SessionSnapshot,
    /// The server's advertised address.
    #[serde(flatten)]
    pub identity: NetworkIdentity,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_payload_is_flat_camel_case() {
        let payload = InitPayload {
            snapshot: SessionSnapshot::default(),
            identity: NetworkIdentity {
                server_ip: String::from("192.168.1.20"),
                port: 3001,
                public_url: None,
            },
        };
        let json = serde_json::to_value(&payload).unwrap_or_default();
        assert_eq!(json["isComplete"], serde_json::json!(false));
        assert_eq!(json["submissionCount"], serde_json::json!(0));
        assert_eq!(json["serverIp"], serde_json::json!("192.168.1.20"));
        assert_eq!(json["port"], serde_json::json!(3001));
        assert!(json["publicUrl"].is_null());
        assert!(json["logs"].as_array().is_some_and(Vec::is_empty));
        assert!(json.get("allSubmissions").is_none());
    }

    #[test]
    fn log_entry_kind_serializes_as_type() {
        let entry = LogEntry {
            timestamp: String::from("12:00:00"),
            message: String::from("Alice charged the core"),
            kind: LogKind::Success,
        };
        let json = serde_json::to_value(&entry).unwrap_or_default();
        assert_eq!(json["type"], serde_json::json!("success"));
    }

    #[test]
    fn join_url_prefers_public_url() {
        let mut identity = NetworkIdentity {
            server_ip: String::from("10.0.0.5"),
            port: 8080,
            public_url: None,
        };
        assert_eq!(identity.join_url(), "http://10.0.0.5:8080/join");

        identity.public_url = Some(String::from("https://charge.example.org"));
        assert_eq!(identity.join_url(), "https://charge.example.org/join");
    }
}
