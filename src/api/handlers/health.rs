use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;

use crate::ledger::timed;
use crate::AppState;

pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let ledger = timed(state.config.rpc_timeout(), state.ledger.record_count()).await;
    let generation = state.coordinator.current_generation();

    match ledger {
        Ok(record_count) => (
            StatusCode::OK,
            Json(json!({
                "status": "healthy",
                "record_count": record_count,
                "generation": generation,
            })),
        ),
        Err(e) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({
                "status": "unhealthy",
                "ledger": e.to_string(),
                "generation": generation,
            })),
        ),
    }
}
