use alloy::primitives::Address;
use axum::extract::State;
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::errors::AppError;
use crate::AppState;

/// GET /api/session
pub async fn get(State(state): State<AppState>) -> Json<Value> {
    let address = state.coordinator.session().address();
    Json(json!({
        "address": address.map(|a| a.to_string()),
        "can_write": state.ledger.signer_address().is_some(),
    }))
}

#[derive(Debug, Deserialize)]
pub struct SetSessionRequest {
    pub address: String,
}

/// PUT /api/session: switch the account whose portfolio is tracked.
pub async fn set(
    State(state): State<AppState>,
    Json(req): Json<SetSessionRequest>,
) -> Result<Json<Value>, AppError> {
    let address: Address = req
        .address
        .trim()
        .parse()
        .map_err(|e| AppError::BadRequest(format!("invalid address: {e}")))?;

    let outcome = state.coordinator.set_session(Some(address)).await;
    Ok(Json(json!({
        "address": address.to_string(),
        "refresh": outcome,
    })))
}

/// DELETE /api/session: disconnect; the portfolio becomes empty.
pub async fn clear(State(state): State<AppState>) -> Json<Value> {
    let outcome = state.coordinator.set_session(None).await;
    Json(json!({ "address": null, "refresh": outcome }))
}
