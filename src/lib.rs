pub mod api;
pub mod config;
pub mod errors;
pub mod ledger;
pub mod metrics;
pub mod models;
pub mod portfolio;
pub mod services;

use std::sync::Arc;

use crate::config::AppConfig;
use crate::ledger::LedgerClient;
use crate::portfolio::RefreshCoordinator;

#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub ledger: Arc<dyn LedgerClient>,
    pub coordinator: RefreshCoordinator,
    pub metrics_handle: metrics_exporter_prometheus::PrometheusHandle,
}
