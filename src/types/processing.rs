use serde::{Deserialize, Serialize};
use specta::Type;
use uuid::Uuid;

/// What a webhook handler did with an event. Lookup misses and repeated
/// terminal events are reported here as successful no-ops, not errors.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Type, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ProcessingAction {
    BookingConfirmed,
    BookingPaymentFailed,
    BookingCancelled,
    BookingFullyRefunded,
    BookingPartiallyRefunded,
    DisputeLogged,
    BookingAlreadyProcessed,
    NoBookingFound,
    NoPaymentIntentInCharge,
    NoPaymentIntentInDispute,
}

#[derive(Debug, Clone, Serialize, Deserialize, Type)]
pub struct ProcessingOutcome {
    pub success: bool,
    pub action: ProcessingAction,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub booking_id: Option<Uuid>,
}

impl ProcessingOutcome {
    pub fn new(action: ProcessingAction) -> Self {
        Self {
            success: true,
            action,
            booking_id: None,
        }
    }

    pub fn for_booking(action: ProcessingAction, booking_id: Uuid) -> Self {
        Self {
            success: true,
            action,
            booking_id: Some(booking_id),
        }
    }
}
