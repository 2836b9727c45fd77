use serde::{Deserialize, Serialize};
use specta::Type;

use super::processing::ProcessingOutcome;
use super::stripe_event::{AdminLogEntry, ProcessedEvent};

/// Processed event without its payload, for list views.
#[derive(Debug, Clone, Serialize, Deserialize, Type)]
pub struct ProcessedEventSummary {
    pub event_id: String,
    pub event_type: String,
    pub result: Option<ProcessingOutcome>,
    pub processed_at: String,
    pub completed_at: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Type)]
pub struct ListEventsResponse {
    pub events: Vec<ProcessedEventSummary>,
    pub next_before: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Type)]
pub struct GetEventResponse {
    pub event: ProcessedEvent,
}

#[derive(Debug, Clone, Serialize, Deserialize, Type)]
pub struct ListLogsResponse {
    pub logs: Vec<AdminLogEntry>,
}
