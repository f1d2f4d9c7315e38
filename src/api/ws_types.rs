use serde::Serialize;

use super::views::PortfolioView;

/// Messages pushed to all connected WebSocket clients.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", content = "data")]
pub enum WsMessage {
    #[serde(rename = "portfolio_update")]
    PortfolioUpdate(PortfolioView),
}
