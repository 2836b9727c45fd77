mod store;

pub use store::{
    StoreError, apply_refund, cancel_booking, confirm_booking, fail_booking,
    insert_processed_event, mark_disputed, record_event_result,
};
