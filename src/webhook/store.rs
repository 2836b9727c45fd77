use chrono::{SecondsFormat, Utc};
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::types::{BookingStatus, PaymentInfo, ProcessingAction, ProcessingOutcome};

#[derive(Debug)]
pub enum StoreError {
    Db(sqlx::Error),
    Parse(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        Self::Db(err)
    }
}

/// Inserts the processed-event record for `event_id`, returning whether the
/// row was created. `false` means the event was already recorded; the
/// primary key on `event_id` is what makes concurrent duplicate delivery
/// safe, so this runs before any booking is touched.
pub async fn insert_processed_event(
    pool: &SqlitePool,
    event_id: &str,
    event_type: &str,
    payload: &str,
) -> Result<bool, StoreError> {
    let result = sqlx::query(
        r#"
        INSERT INTO stripe_events (event_id, event_type, payload, processed_at)
        VALUES (?, ?, ?, ?)
        ON CONFLICT(event_id) DO NOTHING
        "#,
    )
    .bind(event_id)
    .bind(event_type)
    .bind(payload)
    .bind(format_utc(Utc::now()))
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Attaches the handler's result to the processed-event record. The record
/// is never otherwise updated after insert.
pub async fn record_event_result(
    pool: &SqlitePool,
    event_id: &str,
    outcome: &ProcessingOutcome,
) -> Result<(), StoreError> {
    let result_json = serde_json::to_string(outcome)
        .map_err(|err| StoreError::Parse(format!("invalid processing result JSON: {err}")))?;

    sqlx::query(
        r#"
        UPDATE stripe_events
        SET processing_result = ?,
            completed_at = ?
        WHERE event_id = ?
        "#,
    )
    .bind(&result_json)
    .bind(format_utc(Utc::now()))
    .bind(event_id)
    .execute(pool)
    .await?;

    Ok(())
}

/// Payment succeeded: a pending booking becomes confirmed.
pub async fn confirm_booking(
    pool: &SqlitePool,
    payment_intent_id: &str,
) -> Result<ProcessingOutcome, StoreError> {
    let now = format_utc(Utc::now());
    let payment = PaymentInfo {
        status: Some("paid".to_string()),
        method: Some("card".to_string()),
        transaction_id: Some(payment_intent_id.to_string()),
        paid_at: Some(now),
        ..PaymentInfo::default()
    };

    settle(
        pool,
        payment_intent_id,
        BookingStatus::Confirmed,
        ProcessingAction::BookingConfirmed,
        payment,
    )
    .await
}

/// Payment failed: a pending booking becomes payment_failed, keeping the
/// provider's failure message.
pub async fn fail_booking(
    pool: &SqlitePool,
    payment_intent_id: &str,
    error_message: Option<String>,
) -> Result<ProcessingOutcome, StoreError> {
    let now = format_utc(Utc::now());
    let payment = PaymentInfo {
        status: Some("failed".to_string()),
        method: Some("card".to_string()),
        transaction_id: Some(payment_intent_id.to_string()),
        error_message: Some(error_message.unwrap_or_else(|| "Payment failed".to_string())),
        failed_at: Some(now),
        ..PaymentInfo::default()
    };

    settle(
        pool,
        payment_intent_id,
        BookingStatus::PaymentFailed,
        ProcessingAction::BookingPaymentFailed,
        payment,
    )
    .await
}

/// Payment canceled: a pending booking becomes cancelled.
pub async fn cancel_booking(
    pool: &SqlitePool,
    payment_intent_id: &str,
) -> Result<ProcessingOutcome, StoreError> {
    let now = format_utc(Utc::now());
    let payment = PaymentInfo {
        status: Some("cancelled".to_string()),
        method: Some("card".to_string()),
        transaction_id: Some(payment_intent_id.to_string()),
        cancelled_at: Some(now),
        ..PaymentInfo::default()
    };

    settle(
        pool,
        payment_intent_id,
        BookingStatus::Cancelled,
        ProcessingAction::BookingCancelled,
        payment,
    )
    .await
}

/// Shared transition for the three settlement events. Only a booking still
/// in `pending` is moved; anything else is a reported no-op.
async fn settle(
    pool: &SqlitePool,
    payment_intent_id: &str,
    status: BookingStatus,
    action: ProcessingAction,
    payment: PaymentInfo,
) -> Result<ProcessingOutcome, StoreError> {
    let now = format_utc(Utc::now());
    let mut tx = pool.begin().await?;

    let Some(row) = fetch_booking(&mut tx, payment_intent_id).await? else {
        return Ok(ProcessingOutcome::new(ProcessingAction::NoBookingFound));
    };
    let booking_id = parse_booking_id(&row.id)?;
    let current = parse_booking_status(&row.status)?;

    if !current.settlable() {
        return Ok(ProcessingOutcome::for_booking(
            ProcessingAction::BookingAlreadyProcessed,
            booking_id,
        ));
    }

    let payment_json = serde_json::to_string(&payment)
        .map_err(|err| StoreError::Parse(format!("invalid payment JSON: {err}")))?;

    let result = sqlx::query(
        r#"
        UPDATE bookings
        SET status = ?,
            payment = ?,
            updated_at = ?
        WHERE id = ?
          AND status = 'pending'
        "#,
    )
    .bind(booking_status_to_str(status))
    .bind(&payment_json)
    .bind(&now)
    .bind(&row.id)
    .execute(&mut *tx)
    .await?;
    if result.rows_affected() == 0 {
        return Ok(ProcessingOutcome::for_booking(
            ProcessingAction::BookingAlreadyProcessed,
            booking_id,
        ));
    }

    tx.commit().await?;

    Ok(ProcessingOutcome::for_booking(action, booking_id))
}

/// Charge refunded: a full refund moves the booking to `refunded`, a partial
/// one leaves the status alone. Refund details are merged into the existing
/// payment object either way. Amounts arrive in minor units.
pub async fn apply_refund(
    pool: &SqlitePool,
    payment_intent_id: &str,
    amount: i64,
    amount_refunded: i64,
) -> Result<ProcessingOutcome, StoreError> {
    let now = format_utc(Utc::now());
    let mut tx = pool.begin().await?;

    let Some(row) = fetch_booking(&mut tx, payment_intent_id).await? else {
        return Ok(ProcessingOutcome::new(ProcessingAction::NoBookingFound));
    };
    let booking_id = parse_booking_id(&row.id)?;
    let current = parse_booking_status(&row.status)?;

    let full_refund = amount_refunded >= amount;
    let status = if full_refund {
        BookingStatus::Refunded
    } else {
        current
    };

    let mut payment = parse_payment(row.payment.as_deref())?;
    payment.refund_status = Some(if full_refund { "full" } else { "partial" }.to_string());
    payment.refund_amount = Some(amount_refunded as f64 / 100.0);
    payment.refunded_at = Some(now.clone());

    update_booking(&mut tx, &row.id, status, &payment, &now).await?;
    tx.commit().await?;

    let action = if full_refund {
        ProcessingAction::BookingFullyRefunded
    } else {
        ProcessingAction::BookingPartiallyRefunded
    };
    Ok(ProcessingOutcome::for_booking(action, booking_id))
}

/// Dispute created: the booking is marked `disputed` regardless of its
/// current status, and an audit entry is appended. The dispute amount
/// arrives in minor units.
pub async fn mark_disputed(
    pool: &SqlitePool,
    payment_intent_id: &str,
    dispute_id: &str,
    reason: Option<&str>,
    amount: i64,
) -> Result<ProcessingOutcome, StoreError> {
    let now = format_utc(Utc::now());
    let mut tx = pool.begin().await?;

    let Some(row) = fetch_booking(&mut tx, payment_intent_id).await? else {
        return Ok(ProcessingOutcome::new(ProcessingAction::NoBookingFound));
    };
    let booking_id = parse_booking_id(&row.id)?;

    let mut payment = parse_payment(row.payment.as_deref())?;
    payment.dispute_id = Some(dispute_id.to_string());
    payment.dispute_reason = reason.map(str::to_string);
    payment.dispute_amount = Some(amount as f64 / 100.0);
    payment.dispute_created_at = Some(now.clone());

    update_booking(&mut tx, &row.id, BookingStatus::Disputed, &payment, &now).await?;

    let details = serde_json::to_string(&serde_json::json!({
        "dispute_id": dispute_id,
        "reason": reason,
        "amount": amount as f64 / 100.0,
    }))
    .map_err(|err| StoreError::Parse(format!("invalid audit details JSON: {err}")))?;

    sqlx::query(
        r#"
        INSERT INTO admin_logs (id, action, target_type, target_id, details, created_at)
        VALUES (?, 'dispute_created', 'booking', ?, ?, ?)
        "#,
    )
    .bind(Uuid::new_v4().to_string())
    .bind(&row.id)
    .bind(&details)
    .bind(&now)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;

    Ok(ProcessingOutcome::for_booking(
        ProcessingAction::DisputeLogged,
        booking_id,
    ))
}

#[derive(sqlx::FromRow)]
struct BookingRow {
    id: String,
    status: String,
    payment: Option<String>,
}

async fn fetch_booking(
    tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
    payment_intent_id: &str,
) -> Result<Option<BookingRow>, StoreError> {
    let row = sqlx::query_as::<_, BookingRow>(
        r#"
        SELECT id, status, payment
        FROM bookings
        WHERE payment_intent_id = ?
        "#,
    )
    .bind(payment_intent_id)
    .fetch_optional(&mut **tx)
    .await?;

    Ok(row)
}

async fn update_booking(
    tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
    booking_id: &str,
    status: BookingStatus,
    payment: &PaymentInfo,
    now: &str,
) -> Result<(), StoreError> {
    let payment_json = serde_json::to_string(payment)
        .map_err(|err| StoreError::Parse(format!("invalid payment JSON: {err}")))?;

    sqlx::query(
        r#"
        UPDATE bookings
        SET status = ?,
            payment = ?,
            updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(booking_status_to_str(status))
    .bind(&payment_json)
    .bind(now)
    .bind(booking_id)
    .execute(&mut **tx)
    .await?;

    Ok(())
}

fn parse_payment(raw: Option<&str>) -> Result<PaymentInfo, StoreError> {
    match raw {
        Some(json) => serde_json::from_str(json)
            .map_err(|err| StoreError::Parse(format!("invalid payment JSON: {err}"))),
        None => Ok(PaymentInfo::default()),
    }
}

fn parse_booking_id(id: &str) -> Result<Uuid, StoreError> {
    Uuid::parse_str(id).map_err(|err| StoreError::Parse(format!("invalid booking id: {err}")))
}

fn parse_booking_status(status: &str) -> Result<BookingStatus, StoreError> {
    match status {
        "pending" => Ok(BookingStatus::Pending),
        "confirmed" => Ok(BookingStatus::Confirmed),
        "payment_failed" => Ok(BookingStatus::PaymentFailed),
        "cancelled" => Ok(BookingStatus::Cancelled),
        "refunded" => Ok(BookingStatus::Refunded),
        "disputed" => Ok(BookingStatus::Disputed),
        other => Err(StoreError::Parse(format!("unknown booking status: {other}"))),
    }
}

fn booking_status_to_str(status: BookingStatus) -> &'static str {
    match status {
        BookingStatus::Pending => "pending",
        BookingStatus::Confirmed => "confirmed",
        BookingStatus::PaymentFailed => "payment_failed",
        BookingStatus::Cancelled => "cancelled",
        BookingStatus::Refunded => "refunded",
        BookingStatus::Disputed => "disputed",
    }
}

fn format_utc(dt: chrono::DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Secs, true)
}
