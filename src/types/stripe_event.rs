use serde::{Deserialize, Serialize};
use specta::Type;
use uuid::Uuid;

use super::processing::ProcessingOutcome;

/// A processed provider event. One row exists per distinct event id; the
/// row is written before dispatch and only ever updated to attach the result.
#[derive(Debug, Clone, Serialize, Deserialize, Type)]
pub struct ProcessedEvent {
    pub event_id: String,
    pub event_type: String,
    pub payload: String,
    pub result: Option<ProcessingOutcome>,
    pub processed_at: String,
    pub completed_at: Option<String>,
}

/// Append-only audit entry, written on dispute creation.
#[derive(Debug, Clone, Serialize, Deserialize, Type)]
pub struct AdminLogEntry {
    pub id: Uuid,
    pub action: String,
    pub target_type: String,
    pub target_id: String,
    pub details: String,
    pub created_at: String,
}
