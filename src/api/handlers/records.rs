use alloy::primitives::utils::parse_ether;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::api::views::RecordView;
use crate::errors::AppError;
use crate::ledger::timed;
use crate::models::BetOption;
use crate::services::tx_watcher;
use crate::AppState;

#[derive(Serialize)]
pub struct TxResponse {
    pub success: bool,
    pub tx_hash: String,
}

/// GET /api/records/:id
pub async fn detail(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> Result<Json<RecordView>, AppError> {
    let timeout = state.config.rpc_timeout();
    let count = timed(timeout, state.ledger.record_count()).await?;
    if id >= count {
        return Err(AppError::NotFound(format!("record {id} does not exist")));
    }
    let record = timed(timeout, state.ledger.record(id)).await?;
    Ok(Json(RecordView::from(&record)))
}

#[derive(Debug, Deserialize)]
pub struct CreateRecordRequest {
    pub description: String,
}

/// POST /api/records: create a new bet.
pub async fn create(
    State(state): State<AppState>,
    Json(req): Json<CreateRecordRequest>,
) -> Result<(StatusCode, Json<TxResponse>), AppError> {
    let description = req.description.trim().to_string();
    if description.is_empty() {
        return Err(AppError::BadRequest("description must not be empty".into()));
    }

    let tx = state.ledger.submit_record(description).await?;
    tx_watcher::spawn_watch(state.ledger.clone(), state.coordinator.clone(), tx);

    Ok((
        StatusCode::ACCEPTED,
        Json(TxResponse {
            success: true,
            tx_hash: tx.to_string(),
        }),
    ))
}

#[derive(Debug, Deserialize)]
pub struct PlaceWagerRequest {
    pub option: BetOption,
    /// Decimal amount in ether units, e.g. "0.25".
    pub amount: String,
}

/// POST /api/records/:id/wagers: place a wager on one side of a record.
pub async fn place_wager(
    State(state): State<AppState>,
    Path(id): Path<u64>,
    Json(req): Json<PlaceWagerRequest>,
) -> Result<(StatusCode, Json<TxResponse>), AppError> {
    let amount = parse_ether(req.amount.trim())
        .map_err(|e| AppError::BadRequest(format!("invalid amount: {e}")))?;
    if amount.is_zero() {
        return Err(AppError::BadRequest("amount must be greater than zero".into()));
    }

    let timeout = state.config.rpc_timeout();
    let count = timed(timeout, state.ledger.record_count()).await?;
    if id >= count {
        return Err(AppError::NotFound(format!("record {id} does not exist")));
    }
    let record = timed(timeout, state.ledger.record(id)).await?;
    if record.resolved {
        return Err(AppError::BadRequest(format!("record {id} is already resolved")));
    }

    let tx = state.ledger.submit_wager(id, req.option, amount).await?;
    tracing::info!(record_id = id, option = %req.option, amount = %amount, tx = %tx, "Wager accepted");
    tx_watcher::spawn_watch(state.ledger.clone(), state.coordinator.clone(), tx);

    Ok((
        StatusCode::ACCEPTED,
        Json(TxResponse {
            success: true,
            tx_hash: tx.to_string(),
        }),
    ))
}
