//! Structured audit trail for material clearing actions.
//!
//! Events: deal create/delete, order submit/update, netting runs, settlement
//! create and status changes. Format: one JSON line with timestamp, actor,
//! action, resource, outcome. Sink: stdout or pluggable (e.g. test mock).

use serde::Serialize;
use std::time::{SystemTime, UNIX_EPOCH};

/// Single audit record: one line of JSON per event.
#[derive(Clone, Debug, Serialize)]
pub struct AuditEvent {
    /// Unix timestamp (seconds since epoch). Log aggregators can convert to ISO8601.
    pub timestamp_secs: u64,
    /// Who performed the action (API key id or "anonymous").
    pub actor: String,
    /// Action type: deal_create, deal_delete, order_submit, order_update,
    /// netting_run, settlement_create, settlement_status.
    pub action: String,
    /// Resource identifiers (e.g. deal_id, order_id). Flexible per action type.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resource: Option<serde_json::Value>,
    /// Outcome: success or rejected.
    pub outcome: String,
}

impl AuditEvent {
    pub fn now(
        actor: impl Into<String>,
        action: impl Into<String>,
        resource: Option<serde_json::Value>,
        outcome: impl Into<String>,
    ) -> Self {
        let timestamp_secs = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);
        Self {
            timestamp_secs,
            actor: actor.into(),
            action: action.into(),
            resource,
            outcome: outcome.into(),
        }
    }
}

/// Sink for audit events. Implementations write to stdout, file, or in-memory (tests).
pub trait AuditSink: Send + Sync {
    fn emit(&self, event: &AuditEvent);
}

/// Writes one JSON line per event to stdout. Safe to use from multiple threads.
pub struct StdoutAuditSink;

impl AuditSink for StdoutAuditSink {
    fn emit(&self, event: &AuditEvent) {
        if let Ok(line) = serde_json::to_string(event) {
            println!("{}", line);
        }
    }
}

/// In-memory sink that stores events for tests. Clone shares the same backing buffer.
#[derive(Clone, Default)]
pub struct InMemoryAuditSink {
    events: std::sync::Arc<std::sync::Mutex<Vec<AuditEvent>>>,
}

impl InMemoryAuditSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<AuditEvent> {
        self.events.lock().expect("lock").clone()
    }
}

impl AuditSink for InMemoryAuditSink {
    fn emit(&self, event: &AuditEvent) {
        self.events.lock().expect("lock").push(event.clone());
    }
}
