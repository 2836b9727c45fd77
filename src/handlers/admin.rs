use axum::{
    Json,
    extract::{Path, Query, State},
};
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use chrono::DateTime;
use serde::{Deserialize, Serialize};

use crate::{
    admin::{AdminCursor, ListEventsParams, StoreError, get_event, list_events, list_logs},
    error::ApiError,
    state::AppState,
    types::{GetEventResponse, ListEventsResponse, ListLogsResponse},
};

#[derive(Debug, Deserialize)]
pub struct ListEventsQuery {
    limit: Option<i64>,
    before: Option<String>,
    event_type: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ListLogsQuery {
    limit: Option<i64>,
}

#[derive(Debug, Serialize, Deserialize)]
struct CursorPayload {
    processed_at: String,
    event_id: String,
}

pub async fn list_events_handler(
    State(state): State<AppState>,
    Query(query): Query<ListEventsQuery>,
) -> Result<Json<ListEventsResponse>, ApiError> {
    let limit = parse_limit(query.limit)?;
    let before = match query.before {
        Some(raw) => Some(decode_cursor(&raw)?),
        None => None,
    };
    let event_type = match query.event_type {
        Some(raw) => {
            let trimmed = raw.trim();
            if trimmed.is_empty() {
                return Err(ApiError::BadRequest(
                    "event_type must be non-empty".to_string(),
                ));
            }
            Some(trimmed.to_string())
        }
        None => None,
    };

    let params = ListEventsParams {
        limit,
        before,
        event_type,
    };

    let result = list_events(&state.pool, &params)
        .await
        .map_err(map_store_error)?;
    let next_before = match result.next_before {
        Some(cursor) => Some(encode_cursor(&cursor)?),
        None => None,
    };

    Ok(Json(ListEventsResponse {
        events: result.events,
        next_before,
    }))
}

pub async fn get_event_handler(
    State(state): State<AppState>,
    Path(event_id): Path<String>,
) -> Result<Json<GetEventResponse>, ApiError> {
    let event = get_event(&state.pool, &event_id)
        .await
        .map_err(map_store_error)?;
    Ok(Json(GetEventResponse { event }))
}

pub async fn list_logs_handler(
    State(state): State<AppState>,
    Query(query): Query<ListLogsQuery>,
) -> Result<Json<ListLogsResponse>, ApiError> {
    let limit = parse_limit(query.limit)?;
    let logs = list_logs(&state.pool, limit)
        .await
        .map_err(map_store_error)?;
    Ok(Json(ListLogsResponse { logs }))
}

fn parse_limit(limit: Option<i64>) -> Result<i64, ApiError> {
    let limit = limit.unwrap_or(50);
    if !(1..=200).contains(&limit) {
        return Err(ApiError::BadRequest(
            "limit must be between 1 and 200".to_string(),
        ));
    }
    Ok(limit)
}

fn decode_cursor(raw: &str) -> Result<AdminCursor, ApiError> {
    let decoded = URL_SAFE_NO_PAD
        .decode(raw)
        .map_err(|_| ApiError::BadRequest("before must be a valid cursor".to_string()))?;
    let payload: CursorPayload = serde_json::from_slice(&decoded)
        .map_err(|_| ApiError::BadRequest("before must be a valid cursor".to_string()))?;
    DateTime::parse_from_rfc3339(&payload.processed_at)
        .map_err(|_| ApiError::BadRequest("before must be a valid cursor".to_string()))?;
    if payload.event_id.trim().is_empty() {
        return Err(ApiError::BadRequest(
            "before must be a valid cursor".to_string(),
        ));
    }
    Ok(AdminCursor {
        processed_at: payload.processed_at,
        event_id: payload.event_id,
    })
}

fn encode_cursor(cursor: &AdminCursor) -> Result<String, ApiError> {
    let payload = CursorPayload {
        processed_at: cursor.processed_at.clone(),
        event_id: cursor.event_id.clone(),
    };
    let encoded = serde_json::to_vec(&payload)
        .map_err(|_| ApiError::Internal("failed to encode cursor".to_string()))?;
    Ok(URL_SAFE_NO_PAD.encode(encoded))
}

fn map_store_error(err: StoreError) -> ApiError {
    match err {
        StoreError::Db(db) => ApiError::Db(db),
        StoreError::NotFound(message) => ApiError::NotFound(message),
        StoreError::Parse(message) => ApiError::Internal(message),
    }
}
