use serde::{Deserialize, Serialize};
use specta::Type;
use uuid::Uuid;

/// A booking row as read and written by the webhook processor. Bookings are
/// created elsewhere (the booking flow) with status `pending` and a
/// `payment_intent_id`; this service only moves them to terminal states.
#[derive(Debug, Clone, Serialize, Deserialize, Type)]
pub struct Booking {
    pub id: Uuid,
    pub status: BookingStatus,
    pub payment_intent_id: Option<String>,
    pub payment: Option<PaymentInfo>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Type, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum BookingStatus {
    Pending,
    Confirmed,
    PaymentFailed,
    Cancelled,
    Refunded,
    Disputed,
}

impl BookingStatus {
    /// Whether a success/failure/cancel payment event may still move this
    /// booking. Terminal states absorb re-deliveries as no-ops.
    pub fn settlable(self) -> bool {
        matches!(self, Self::Pending)
    }
}

/// Payment details attached to a booking. Handlers merge into the existing
/// object, so fields written by an earlier event survive later ones.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Type)]
pub struct PaymentInfo {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transaction_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub paid_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failed_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cancelled_at: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub refund_status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refund_amount: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refunded_at: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub dispute_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dispute_reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dispute_amount: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dispute_created_at: Option<String>,
}
