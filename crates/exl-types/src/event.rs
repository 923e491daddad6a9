use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Severity classification for ledger events.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventLevel {
    Debug,
    Info,
    Warn,
    Error,
}

impl std::fmt::Display for EventLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        };
        write!(f, "{s}")
    }
}

/// One hash-chained line of a session ledger.
///
/// `seq` is assigned per session, starting at 1, with no gaps. `prev_hash`
/// carries the previous event's `hash` (the genesis sentinel for the first
/// event), and `hash` is computed over the event with both chain fields
/// removed. The two chain fields are derived by the writer and never set by
/// callers.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LedgerEvent {
    /// When the event was recorded.
    pub ts: DateTime<Utc>,
    /// Severity of the event.
    pub level: EventLevel,
    /// Event kind, e.g. `"command_output"` or `"session_started"`.
    #[serde(rename = "type")]
    pub kind: String,
    /// The session this event belongs to.
    pub session_id: String,
    /// Per-session sequence number, starting at 1.
    pub seq: u64,
    /// Optional structured payload; omitted from the line when absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload: Option<Value>,
    /// Hash carried by the immediately preceding event.
    pub prev_hash: String,
    /// Chain hash of this event.
    pub hash: String,
}

/// The caller-supplied portion of an event.
///
/// A draft is everything a [`LedgerEvent`] needs except the fields the
/// writer owns: `session_id`, `seq`, and the two chain fields.
#[derive(Clone, Debug, PartialEq)]
pub struct EventDraft {
    pub ts: DateTime<Utc>,
    pub level: EventLevel,
    pub kind: String,
    pub payload: Option<Value>,
}

impl EventDraft {
    /// Create a draft stamped with the current time and no payload.
    pub fn new(level: EventLevel, kind: impl Into<String>) -> Self {
        Self {
            ts: Utc::now(),
            level,
            kind: kind.into(),
            payload: None,
        }
    }

    /// Attach a structured payload.
    pub fn with_payload(mut self, payload: Value) -> Self {
        self.payload = Some(payload);
        self
    }

    /// Override the timestamp (tests and replays).
    pub fn at(mut self, ts: DateTime<Utc>) -> Self {
        self.ts = ts;
        self
    }
}
