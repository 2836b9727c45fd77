use axum::{Json, extract::State};

use crate::{
    error::ApiError,
    extractors::ValidJson,
    state::AppState,
    types::{CreateIntentRequest, CreateIntentResponse},
};

/// Creates a payment intent with automatic payment-method selection and
/// hands the client secret back to the mobile client. No persisted side
/// effects; provider errors come back as 400.
pub async fn create_intent_handler(
    State(state): State<AppState>,
    ValidJson(req): ValidJson<CreateIntentRequest>,
) -> Result<Json<CreateIntentResponse>, ApiError> {
    validate_request(&req)?;

    tracing::info!(amount = req.amount, currency = %req.currency, "creating payment intent");

    let intent = state
        .gateway
        .create_payment_intent(req.amount, &req.currency)
        .await
        .map_err(|err| ApiError::BadRequest(err.to_string()))?;

    Ok(Json(CreateIntentResponse {
        client_secret: intent.client_secret,
    }))
}

fn validate_request(req: &CreateIntentRequest) -> Result<(), ApiError> {
    if req.amount <= 0 {
        return Err(ApiError::BadRequest("amount must be > 0".to_string()));
    }
    if req.currency.trim().is_empty() {
        return Err(ApiError::BadRequest("currency is required".to_string()));
    }

    Ok(())
}
