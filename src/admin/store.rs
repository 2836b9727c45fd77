use sqlx::{QueryBuilder, SqlitePool};
use uuid::Uuid;

use crate::types::{AdminLogEntry, ProcessedEvent, ProcessedEventSummary, ProcessingOutcome};

#[derive(Debug)]
pub enum StoreError {
    Db(sqlx::Error),
    NotFound(String),
    Parse(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        Self::Db(err)
    }
}

/// Keyset cursor over (processed_at, event_id), newest first.
#[derive(Debug, Clone)]
pub struct AdminCursor {
    pub processed_at: String,
    pub event_id: String,
}

#[derive(Debug, Clone)]
pub struct ListEventsParams {
    pub limit: i64,
    pub before: Option<AdminCursor>,
    pub event_type: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ListEventsResult {
    pub events: Vec<ProcessedEventSummary>,
    pub next_before: Option<AdminCursor>,
}

pub async fn list_events(
    pool: &SqlitePool,
    params: &ListEventsParams,
) -> Result<ListEventsResult, StoreError> {
    let mut query = QueryBuilder::new(
        "SELECT \
            event_id, \
            event_type, \
            processing_result, \
            processed_at, \
            completed_at \
        FROM stripe_events \
        WHERE 1 = 1",
    );

    if let Some(event_type) = params.event_type.as_deref() {
        query.push(" AND event_type = ");
        query.push_bind(event_type);
    }

    if let Some(cursor) = &params.before {
        query.push(" AND (processed_at < ");
        query.push_bind(&cursor.processed_at);
        query.push(" OR (processed_at = ");
        query.push_bind(&cursor.processed_at);
        query.push(" AND event_id < ");
        query.push_bind(&cursor.event_id);
        query.push("))");
    }

    query.push(" ORDER BY processed_at DESC, event_id DESC LIMIT ");
    query.push_bind(params.limit + 1);

    let rows: Vec<EventSummaryRow> = query.build_query_as().fetch_all(pool).await?;

    let has_more = rows.len() > params.limit as usize;
    let take_count = if has_more {
        params.limit as usize
    } else {
        rows.len()
    };

    let mut events = Vec::with_capacity(take_count);
    let mut last_cursor = None;

    for row in rows.into_iter().take(take_count) {
        last_cursor = Some(AdminCursor {
            processed_at: row.processed_at.clone(),
            event_id: row.event_id.clone(),
        });
        events.push(summary_from_row(row)?);
    }

    let next_before = if has_more { last_cursor } else { None };

    Ok(ListEventsResult {
        events,
        next_before,
    })
}

pub async fn get_event(pool: &SqlitePool, event_id: &str) -> Result<ProcessedEvent, StoreError> {
    let row = sqlx::query_as::<_, EventRow>(
        r#"
        SELECT event_id, event_type, payload, processing_result, processed_at, completed_at
        FROM stripe_events
        WHERE event_id = ?
        "#,
    )
    .bind(event_id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| StoreError::NotFound("event not found".to_string()))?;

    Ok(ProcessedEvent {
        event_id: row.event_id,
        event_type: row.event_type,
        payload: row.payload,
        result: parse_result(row.processing_result.as_deref())?,
        processed_at: row.processed_at,
        completed_at: row.completed_at,
    })
}

pub async fn list_logs(pool: &SqlitePool, limit: i64) -> Result<Vec<AdminLogEntry>, StoreError> {
    let rows: Vec<LogRow> = sqlx::query_as(
        r#"
        SELECT id, action, target_type, target_id, details, created_at
        FROM admin_logs
        ORDER BY created_at DESC, id DESC
        LIMIT ?
        "#,
    )
    .bind(limit)
    .fetch_all(pool)
    .await?;

    rows.into_iter().map(log_from_row).collect()
}

#[derive(sqlx::FromRow)]
struct EventSummaryRow {
    event_id: String,
    event_type: String,
    processing_result: Option<String>,
    processed_at: String,
    completed_at: Option<String>,
}

#[derive(sqlx::FromRow)]
struct EventRow {
    event_id: String,
    event_type: String,
    payload: String,
    processing_result: Option<String>,
    processed_at: String,
    completed_at: Option<String>,
}

#[derive(sqlx::FromRow)]
struct LogRow {
    id: String,
    action: String,
    target_type: String,
    target_id: String,
    details: String,
    created_at: String,
}

fn summary_from_row(row: EventSummaryRow) -> Result<ProcessedEventSummary, StoreError> {
    Ok(ProcessedEventSummary {
        result: parse_result(row.processing_result.as_deref())?,
        event_id: row.event_id,
        event_type: row.event_type,
        processed_at: row.processed_at,
        completed_at: row.completed_at,
    })
}

fn log_from_row(row: LogRow) -> Result<AdminLogEntry, StoreError> {
    Ok(AdminLogEntry {
        id: Uuid::parse_str(&row.id)
            .map_err(|err| StoreError::Parse(format!("invalid log id: {err}")))?,
        action: row.action,
        target_type: row.target_type,
        target_id: row.target_id,
        details: row.details,
        created_at: row.created_at,
    })
}

fn parse_result(raw: Option<&str>) -> Result<Option<ProcessingOutcome>, StoreError> {
    match raw {
        Some(json) => serde_json::from_str(json)
            .map(Some)
            .map_err(|err| StoreError::Parse(format!("invalid processing result JSON: {err}"))),
        None => Ok(None),
    }
}
