use axum::extract::{Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::api::views::PortfolioView;
use crate::portfolio::{RefreshOutcome, RefreshTrigger};
use crate::AppState;

/// GET /api/portfolio: the latest published snapshot.
pub async fn get(State(state): State<AppState>) -> Json<PortfolioView> {
    let snapshot = state.coordinator.store().current();
    Json(PortfolioView::from(snapshot.as_ref()))
}

#[derive(Debug, Default, Deserialize)]
pub struct RefreshParams {
    /// Block until the resulting generation has settled.
    #[serde(default)]
    pub wait: bool,
}

#[derive(Serialize)]
pub struct RefreshResponse {
    pub outcome: RefreshOutcome,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub portfolio: Option<PortfolioView>,
}

/// POST /api/portfolio/refresh: manual refresh.
pub async fn refresh(
    State(state): State<AppState>,
    Query(params): Query<RefreshParams>,
) -> Json<RefreshResponse> {
    let outcome = state.coordinator.request_refresh(RefreshTrigger::Manual).await;

    let portfolio = if params.wait {
        let snapshot = state
            .coordinator
            .store()
            .wait_for_generation(outcome.generation())
            .await;
        Some(PortfolioView::from(snapshot.as_ref()))
    } else {
        None
    };

    Json(RefreshResponse { outcome, portfolio })
}
