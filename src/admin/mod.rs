mod store;

pub use store::{
    AdminCursor, ListEventsParams, ListEventsResult, StoreError, get_event, list_events,
    list_logs,
};
