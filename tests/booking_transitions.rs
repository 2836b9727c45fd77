#![allow(clippy::expect_used, clippy::unwrap_used)]

use std::fs;

use paygate::{
    types::{ProcessingAction, ProcessingOutcome},
    webhook::{
        apply_refund, cancel_booking, confirm_booking, fail_booking, insert_processed_event,
        mark_disputed, record_event_result,
    },
};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use tempfile::NamedTempFile;
use uuid::Uuid;

struct TestDb {
    pool: sqlx::SqlitePool,
    _db_file: NamedTempFile,
}

async fn setup_db() -> TestDb {
    let db_file = NamedTempFile::new().expect("create temp sqlite file");
    let options = SqliteConnectOptions::new()
        .filename(db_file.path())
        .create_if_missing(true)
        .busy_timeout(std::time::Duration::from_millis(500));

    let mut conn = sqlx::SqliteConnection::connect_with(&options)
        .await
        .expect("connect sqlite");
    sqlx::query("PRAGMA foreign_keys = ON;")
        .execute(&mut conn)
        .await
        .expect("enable foreign keys");

    let mut entries: Vec<_> = fs::read_dir("migrations")
        .expect("read migrations dir")
        .filter_map(|e| e.ok())
        .filter(|e| e.path().extension().and_then(|ext| ext.to_str()) == Some("sql"))
        .collect();
    entries.sort_by_key(|e| e.file_name());
    for entry in entries {
        let contents = fs::read_to_string(entry.path()).expect("read migration");
        for stmt in contents.split(';') {
            let stmt = stmt.trim();
            if !stmt.is_empty() {
                sqlx::query(stmt)
                    .execute(&mut conn)
                    .await
                    .expect("run migration");
            }
        }
    }

    use sqlx::Connection;
    conn.close().await.expect("close migration conn");

    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(options)
        .await
        .expect("connect pool");

    TestDb {
        pool,
        _db_file: db_file,
    }
}

async fn seed_booking(
    pool: &sqlx::SqlitePool,
    payment_intent_id: &str,
    status: &str,
    payment: Option<&str>,
) -> Uuid {
    let id = Uuid::new_v4();
    let now = chrono::Utc::now().to_rfc3339();
    sqlx::query(
        r#"
        INSERT INTO bookings (id, status, payment_intent_id, payment, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(id.to_string())
    .bind(status)
    .bind(payment_intent_id)
    .bind(payment)
    .bind(&now)
    .bind(&now)
    .execute(pool)
    .await
    .expect("insert booking");
    id
}

async fn booking_state(pool: &sqlx::SqlitePool, id: Uuid) -> (String, Option<serde_json::Value>) {
    let (status, payment): (String, Option<String>) =
        sqlx::query_as("SELECT status, payment FROM bookings WHERE id = ?")
            .bind(id.to_string())
            .fetch_one(pool)
            .await
            .expect("fetch booking");
    let payment = payment.map(|json| serde_json::from_str(&json).expect("payment is JSON"));
    (status, payment)
}

// ─────────────────────────────────────────────────────────────────────────────
// Settlement transitions
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn confirm_booking_moves_pending_to_confirmed() {
    let db = setup_db().await;
    let booking_id = seed_booking(&db.pool, "pi_1", "pending", None).await;

    let outcome = confirm_booking(&db.pool, "pi_1").await.expect("confirm");

    assert_eq!(outcome.action, ProcessingAction::BookingConfirmed);
    assert_eq!(outcome.booking_id, Some(booking_id));

    let (status, payment) = booking_state(&db.pool, booking_id).await;
    assert_eq!(status, "confirmed");
    let payment = payment.expect("payment recorded");
    assert_eq!(payment["status"], "paid");
    assert_eq!(payment["method"], "card");
    assert_eq!(payment["transaction_id"], "pi_1");
    assert!(payment["paid_at"].is_string());
}

#[tokio::test]
async fn confirm_booking_twice_reports_already_processed() {
    let db = setup_db().await;
    let booking_id = seed_booking(&db.pool, "pi_1", "pending", None).await;

    confirm_booking(&db.pool, "pi_1").await.expect("confirm");
    let outcome = confirm_booking(&db.pool, "pi_1").await.expect("confirm again");

    assert_eq!(outcome.action, ProcessingAction::BookingAlreadyProcessed);
    assert_eq!(outcome.booking_id, Some(booking_id));
    assert!(outcome.success);
}

#[tokio::test]
async fn confirm_booking_with_unknown_intent_reports_no_booking_found() {
    let db = setup_db().await;

    let outcome = confirm_booking(&db.pool, "pi_unknown").await.expect("confirm");

    assert_eq!(outcome.action, ProcessingAction::NoBookingFound);
    assert!(outcome.success);
    assert_eq!(outcome.booking_id, None);
}

#[tokio::test]
async fn fail_booking_records_provider_message() {
    let db = setup_db().await;
    let booking_id = seed_booking(&db.pool, "pi_1", "pending", None).await;

    let outcome = fail_booking(&db.pool, "pi_1", Some("card_declined".to_string()))
        .await
        .expect("fail");

    assert_eq!(outcome.action, ProcessingAction::BookingPaymentFailed);

    let (status, payment) = booking_state(&db.pool, booking_id).await;
    assert_eq!(status, "payment_failed");
    let payment = payment.expect("payment recorded");
    assert_eq!(payment["status"], "failed");
    assert_eq!(payment["error_message"], "card_declined");
    assert!(payment["failed_at"].is_string());
}

#[tokio::test]
async fn fail_booking_defaults_error_message() {
    let db = setup_db().await;
    let booking_id = seed_booking(&db.pool, "pi_1", "pending", None).await;

    fail_booking(&db.pool, "pi_1", None).await.expect("fail");

    let (_, payment) = booking_state(&db.pool, booking_id).await;
    assert_eq!(payment.expect("payment recorded")["error_message"], "Payment failed");
}

#[tokio::test]
async fn cancel_booking_moves_pending_to_cancelled() {
    let db = setup_db().await;
    let booking_id = seed_booking(&db.pool, "pi_1", "pending", None).await;

    let outcome = cancel_booking(&db.pool, "pi_1").await.expect("cancel");

    assert_eq!(outcome.action, ProcessingAction::BookingCancelled);

    let (status, payment) = booking_state(&db.pool, booking_id).await;
    assert_eq!(status, "cancelled");
    assert_eq!(payment.expect("payment recorded")["status"], "cancelled");
}

#[tokio::test]
async fn cancel_booking_does_not_touch_confirmed_booking() {
    let db = setup_db().await;
    let booking_id = seed_booking(&db.pool, "pi_1", "confirmed", None).await;

    let outcome = cancel_booking(&db.pool, "pi_1").await.expect("cancel");

    assert_eq!(outcome.action, ProcessingAction::BookingAlreadyProcessed);
    let (status, _) = booking_state(&db.pool, booking_id).await;
    assert_eq!(status, "confirmed");
}

// ─────────────────────────────────────────────────────────────────────────────
// Refunds
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn full_refund_sets_refunded_status() {
    let db = setup_db().await;
    let booking_id = seed_booking(&db.pool, "pi_1", "confirmed", None).await;

    let outcome = apply_refund(&db.pool, "pi_1", 5000, 5000).await.expect("refund");

    assert_eq!(outcome.action, ProcessingAction::BookingFullyRefunded);

    let (status, payment) = booking_state(&db.pool, booking_id).await;
    assert_eq!(status, "refunded");
    let payment = payment.expect("payment recorded");
    assert_eq!(payment["refund_status"], "full");
    assert_eq!(payment["refund_amount"], 50.0);
}

#[tokio::test]
async fn over_refund_counts_as_full() {
    let db = setup_db().await;
    let booking_id = seed_booking(&db.pool, "pi_1", "confirmed", None).await;

    let outcome = apply_refund(&db.pool, "pi_1", 5000, 6000).await.expect("refund");

    assert_eq!(outcome.action, ProcessingAction::BookingFullyRefunded);
    let (status, _) = booking_state(&db.pool, booking_id).await;
    assert_eq!(status, "refunded");
}

#[tokio::test]
async fn partial_refund_merges_into_existing_payment() {
    let db = setup_db().await;
    let existing = r#"{"status":"paid","method":"card","transaction_id":"pi_1"}"#;
    let booking_id = seed_booking(&db.pool, "pi_1", "confirmed", Some(existing)).await;

    let outcome = apply_refund(&db.pool, "pi_1", 5000, 1500).await.expect("refund");

    assert_eq!(outcome.action, ProcessingAction::BookingPartiallyRefunded);

    let (status, payment) = booking_state(&db.pool, booking_id).await;
    assert_eq!(status, "confirmed");
    let payment = payment.expect("payment recorded");
    // earlier fields survive the merge
    assert_eq!(payment["status"], "paid");
    assert_eq!(payment["transaction_id"], "pi_1");
    assert_eq!(payment["refund_status"], "partial");
    assert_eq!(payment["refund_amount"], 15.0);
    assert!(payment["refunded_at"].is_string());
}

#[tokio::test]
async fn refund_with_unknown_intent_reports_no_booking_found() {
    let db = setup_db().await;

    let outcome = apply_refund(&db.pool, "pi_unknown", 5000, 5000).await.expect("refund");

    assert_eq!(outcome.action, ProcessingAction::NoBookingFound);
}

// ─────────────────────────────────────────────────────────────────────────────
// Disputes
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn dispute_overrides_pending_status() {
    // No settlable() guard on disputes: even a pending booking is marked.
    let db = setup_db().await;
    let booking_id = seed_booking(&db.pool, "pi_1", "pending", None).await;

    let outcome = mark_disputed(&db.pool, "pi_1", "dp_1", Some("fraudulent"), 5000)
        .await
        .expect("dispute");

    assert_eq!(outcome.action, ProcessingAction::DisputeLogged);

    let (status, payment) = booking_state(&db.pool, booking_id).await;
    assert_eq!(status, "disputed");
    let payment = payment.expect("payment recorded");
    assert_eq!(payment["dispute_id"], "dp_1");
    assert_eq!(payment["dispute_reason"], "fraudulent");
    assert_eq!(payment["dispute_amount"], 50.0);
}

#[tokio::test]
async fn dispute_appends_audit_log_entry() {
    let db = setup_db().await;
    let booking_id = seed_booking(&db.pool, "pi_1", "confirmed", None).await;

    mark_disputed(&db.pool, "pi_1", "dp_1", Some("product_not_received"), 2500)
        .await
        .expect("dispute");

    let (action, target_type, target_id, details): (String, String, String, String) =
        sqlx::query_as("SELECT action, target_type, target_id, details FROM admin_logs")
            .fetch_one(&db.pool)
            .await
            .expect("fetch audit entry");
    assert_eq!(action, "dispute_created");
    assert_eq!(target_type, "booking");
    assert_eq!(target_id, booking_id.to_string());

    let details: serde_json::Value = serde_json::from_str(&details).expect("details is JSON");
    assert_eq!(details["dispute_id"], "dp_1");
    assert_eq!(details["reason"], "product_not_received");
    assert_eq!(details["amount"], 25.0);
}

#[tokio::test]
async fn dispute_with_unknown_intent_reports_no_booking_found() {
    let db = setup_db().await;

    let outcome = mark_disputed(&db.pool, "pi_unknown", "dp_1", None, 5000)
        .await
        .expect("dispute");

    assert_eq!(outcome.action, ProcessingAction::NoBookingFound);

    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM admin_logs")
        .fetch_one(&db.pool)
        .await
        .expect("count logs");
    assert_eq!(count, 0);
}

// ─────────────────────────────────────────────────────────────────────────────
// Processed-event records
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn insert_processed_event_dedupes_by_event_id() {
    let db = setup_db().await;

    let first = insert_processed_event(&db.pool, "evt_1", "payment_intent.succeeded", "{}")
        .await
        .expect("insert");
    let second = insert_processed_event(&db.pool, "evt_1", "payment_intent.succeeded", "{}")
        .await
        .expect("insert again");

    assert!(first);
    assert!(!second);

    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM stripe_events")
        .fetch_one(&db.pool)
        .await
        .expect("count events");
    assert_eq!(count, 1);
}

#[tokio::test]
async fn record_event_result_attaches_result_and_completion_time() {
    let db = setup_db().await;
    insert_processed_event(&db.pool, "evt_1", "payment_intent.succeeded", "{}")
        .await
        .expect("insert");

    let outcome =
        ProcessingOutcome::for_booking(ProcessingAction::BookingConfirmed, Uuid::new_v4());
    record_event_result(&db.pool, "evt_1", &outcome)
        .await
        .expect("record result");

    let (result, completed_at): (Option<String>, Option<String>) = sqlx::query_as(
        "SELECT processing_result, completed_at FROM stripe_events WHERE event_id = 'evt_1'",
    )
    .fetch_one(&db.pool)
    .await
    .expect("fetch event");

    let result: serde_json::Value =
        serde_json::from_str(&result.expect("result recorded")).unwrap();
    assert_eq!(result["action"], "booking_confirmed");
    assert_eq!(result["success"], true);
    assert!(completed_at.is_some());
}
