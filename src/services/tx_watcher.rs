use std::sync::Arc;

use crate::ledger::{LedgerClient, TxHandle};
use crate::portfolio::RefreshCoordinator;

/// Wait for a submitted write to be mined, then rescan the portfolio.
///
/// Failures are logged; a reverted or lost transaction leaves the portfolio
/// as it was.
pub async fn watch_transaction(
    ledger: Arc<dyn LedgerClient>,
    coordinator: RefreshCoordinator,
    tx: TxHandle,
) {
    match ledger.await_confirmation(tx).await {
        Ok(()) => {
            let outcome = coordinator.notify_transaction_confirmed().await;
            tracing::info!(
                tx = %tx,
                generation = outcome.generation(),
                "Transaction confirmed, portfolio refresh requested"
            );
        }
        Err(e) => {
            tracing::error!(tx = %tx, error = %e, "Transaction did not confirm");
        }
    }
}

/// Fire-and-forget variant of [`watch_transaction`].
pub fn spawn_watch(ledger: Arc<dyn LedgerClient>, coordinator: RefreshCoordinator, tx: TxHandle) {
    tokio::spawn(watch_transaction(ledger, coordinator, tx));
}
