use axum::{Json, body::Bytes, extract::State, http::HeaderMap};
use serde::de::DeserializeOwned;

use crate::{
    error::ApiError,
    state::AppState,
    stripe::signature,
    stripe::event::{
        ChargeObject, DisputeObject, EventEnvelope, EventKind, PaymentIntentObject,
    },
    types::{ProcessingAction, ProcessingOutcome, WebhookAck},
    webhook::{self, StoreError},
};

/// Stripe webhook endpoint. Signature verification happens before anything
/// else touches the store; once an event is authenticated and recorded, the
/// response is 200 regardless of what the handler found, with business
/// no-ops reported through the `result` field.
pub async fn stripe_webhook_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<WebhookAck>, ApiError> {
    let header = headers
        .get("stripe-signature")
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| ApiError::BadRequest("missing stripe-signature header".to_string()))?;

    signature::verify(
        header,
        &body,
        &state.stripe.webhook_secret,
        state.stripe.signature_tolerance_secs,
    )
    .map_err(|err| {
        tracing::warn!(error = %err, "webhook signature rejected");
        ApiError::BadRequest(err.to_string())
    })?;

    let envelope: EventEnvelope = serde_json::from_slice(&body)
        .map_err(|err| ApiError::BadRequest(format!("invalid event payload: {err}")))?;

    tracing::info!(event_id = %envelope.id, event_type = %envelope.event_type, "received event");

    let Some(kind) = EventKind::from_type(&envelope.event_type) else {
        tracing::info!(event_type = %envelope.event_type, "ignoring unhandled event type");
        return Ok(Json(WebhookAck::received()));
    };

    let payload = serde_json::to_string(&envelope.data.object)
        .map_err(|err| ApiError::Internal(format!("failed to serialize event payload: {err}")))?;

    let inserted =
        webhook::insert_processed_event(&state.pool, &envelope.id, &envelope.event_type, &payload)
            .await
            .map_err(map_store_error)?;
    if !inserted {
        tracing::info!(event_id = %envelope.id, "event already processed, skipping");
        return Ok(Json(WebhookAck::duplicate()));
    }

    let outcome = dispatch(&state, kind, &envelope.data.object).await?;

    webhook::record_event_result(&state.pool, &envelope.id, &outcome)
        .await
        .map_err(map_store_error)?;

    tracing::info!(
        event_id = %envelope.id,
        action = ?outcome.action,
        booking_id = ?outcome.booking_id,
        "event processed"
    );

    Ok(Json(WebhookAck::processed(outcome)))
}

async fn dispatch(
    state: &AppState,
    kind: EventKind,
    object: &serde_json::Value,
) -> Result<ProcessingOutcome, ApiError> {
    match kind {
        EventKind::PaymentSucceeded => {
            let intent: PaymentIntentObject = parse_object(object)?;
            webhook::confirm_booking(&state.pool, &intent.id)
                .await
                .map_err(map_store_error)
        }
        EventKind::PaymentFailed => {
            let intent: PaymentIntentObject = parse_object(object)?;
            let message = intent.last_payment_error.and_then(|e| e.message);
            webhook::fail_booking(&state.pool, &intent.id, message)
                .await
                .map_err(map_store_error)
        }
        EventKind::PaymentCanceled => {
            let intent: PaymentIntentObject = parse_object(object)?;
            webhook::cancel_booking(&state.pool, &intent.id)
                .await
                .map_err(map_store_error)
        }
        EventKind::ChargeRefunded => {
            let charge: ChargeObject = parse_object(object)?;
            let Some(payment_intent_id) = charge.payment_intent.as_deref() else {
                return Ok(ProcessingOutcome::new(
                    ProcessingAction::NoPaymentIntentInCharge,
                ));
            };
            webhook::apply_refund(
                &state.pool,
                payment_intent_id,
                charge.amount,
                charge.amount_refunded,
            )
            .await
            .map_err(map_store_error)
        }
        EventKind::DisputeCreated => {
            let dispute: DisputeObject = parse_object(object)?;
            // The dispute payload names a charge, not a payment intent; the
            // correlation key comes from the provider.
            let charge = state
                .gateway
                .retrieve_charge(&dispute.charge)
                .await
                .map_err(|err| ApiError::Internal(err.to_string()))?;
            let Some(payment_intent_id) = charge.payment_intent.as_deref() else {
                return Ok(ProcessingOutcome::new(
                    ProcessingAction::NoPaymentIntentInDispute,
                ));
            };
            webhook::mark_disputed(
                &state.pool,
                payment_intent_id,
                &dispute.id,
                dispute.reason.as_deref(),
                dispute.amount,
            )
            .await
            .map_err(map_store_error)
        }
    }
}

fn parse_object<T: DeserializeOwned>(object: &serde_json::Value) -> Result<T, ApiError> {
    serde_json::from_value(object.clone())
        .map_err(|err| ApiError::Internal(format!("malformed event object: {err}")))
}

fn map_store_error(err: StoreError) -> ApiError {
    match err {
        StoreError::Db(db) => ApiError::Db(db),
        StoreError::Parse(message) => ApiError::Internal(message),
    }
}
