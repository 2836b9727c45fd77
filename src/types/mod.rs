pub mod booking;
pub mod stripe_event;
pub mod processing;
pub mod payments;
pub mod admin;
pub mod api_error;

#[allow(unused_imports)]
pub use booking::{Booking, BookingStatus, PaymentInfo};
#[allow(unused_imports)]
pub use stripe_event::{AdminLogEntry, ProcessedEvent};
#[allow(unused_imports)]
pub use processing::{ProcessingAction, ProcessingOutcome};
#[allow(unused_imports)]
pub use payments::{CreateIntentRequest, CreateIntentResponse, WebhookAck};
#[allow(unused_imports)]
pub use admin::{GetEventResponse, ListEventsResponse, ListLogsResponse, ProcessedEventSummary};
#[allow(unused_imports)]
pub use api_error::{ApiErrorCode, ApiErrorResponse};
