use serde::{Deserialize, Serialize};
use specta::Type;

use super::processing::ProcessingOutcome;

/// Body of `POST /payments/intent`. Amount is in minor units (cents).
#[derive(Debug, Clone, Serialize, Deserialize, Type)]
pub struct CreateIntentRequest {
    pub amount: i64,
    pub currency: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Type)]
#[serde(rename_all = "camelCase")]
pub struct CreateIntentResponse {
    pub client_secret: String,
}

/// Webhook acknowledgement. Always 200 once the signature checks out;
/// `duplicate` marks a re-delivered event id, `result` carries what the
/// handler did.
#[derive(Debug, Clone, Serialize, Deserialize, Type)]
pub struct WebhookAck {
    pub received: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duplicate: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<ProcessingOutcome>,
}

impl WebhookAck {
    pub fn received() -> Self {
        Self {
            received: true,
            duplicate: None,
            result: None,
        }
    }

    pub fn duplicate() -> Self {
        Self {
            received: true,
            duplicate: Some(true),
            result: None,
        }
    }

    pub fn processed(result: ProcessingOutcome) -> Self {
        Self {
            received: true,
            duplicate: None,
            result: Some(result),
        }
    }
}
