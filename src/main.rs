use std::sync::Arc;

use betwin_portfolio::api::router::create_router;
use betwin_portfolio::config::AppConfig;
use betwin_portfolio::ledger::{ContractLedger, LedgerClient};
use betwin_portfolio::portfolio::{PortfolioStore, RefreshCoordinator, Session};
use betwin_portfolio::services::record_watcher::run_record_watcher;
use betwin_portfolio::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let config = AppConfig::from_env()?;
    let addr = format!("{}:{}", config.host, config.port);
    let metrics_handle = betwin_portfolio::metrics::init_metrics()?;

    tracing::info!(
        rpc_url = %config.rpc_url,
        contract = %config.contract_address,
        "Connecting to ledger..."
    );
    let ledger = ContractLedger::connect(
        &config.rpc_url,
        config.contract_address,
        config.private_key.as_deref(),
        config.chain_id,
        config.tx_confirmation_timeout(),
    )
    .await?;

    match ledger.signer_address() {
        Some(signer) => tracing::info!(%signer, "Ledger connected (read-write)"),
        None => tracing::warn!("No PRIVATE_KEY set: ledger is read-only, wagers disabled"),
    }

    let session_address = config.user_address.or(ledger.signer_address());
    match session_address {
        Some(address) => tracing::info!(%address, "Tracking portfolio"),
        None => tracing::info!("No session address: portfolio stays empty until PUT /api/session"),
    }

    let ledger: Arc<dyn LedgerClient> = Arc::new(ledger);
    let coordinator = RefreshCoordinator::new(
        Arc::clone(&ledger),
        Session::new(session_address),
        PortfolioStore::new(),
        config.scan_concurrency,
        config.rpc_timeout(),
    );

    // --- Record watcher: mount refresh + rescan on record count change ---
    {
        let ledger = Arc::clone(&ledger);
        let coordinator = coordinator.clone();
        let interval_secs = config.record_poll_interval_secs;
        let call_timeout = config.rpc_timeout();
        tokio::spawn(async move {
            run_record_watcher(ledger, coordinator, interval_secs, call_timeout).await;
        });
    }

    let state = AppState {
        config,
        ledger,
        coordinator,
        metrics_handle,
    };
    let router = create_router(state);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {addr}");
    axum::serve(listener, router).await?;

    Ok(())
}

fn init_tracing() {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let json = std::env::var("LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json"));

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(fmt::layer().json()).init();
    } else {
        registry.with(fmt::layer()).init();
    }
}
