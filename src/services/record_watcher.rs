use std::sync::Arc;
use std::time::Duration;

use tokio::time::{interval, MissedTickBehavior};

use crate::ledger::{timed, LedgerClient};
use crate::portfolio::{RefreshCoordinator, RefreshTrigger};

/// Poll the ledger's record count and rescan whenever it moves.
///
/// The first tick performs the initial (mount) refresh.
pub async fn run_record_watcher(
    ledger: Arc<dyn LedgerClient>,
    coordinator: RefreshCoordinator,
    interval_secs: u64,
    call_timeout: Duration,
) {
    let mut ticker = interval(Duration::from_secs(interval_secs.max(1)));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut mounted = false;
    let mut last_count: Option<u64> = None;

    tracing::info!(interval_secs, "Record watcher started");

    loop {
        ticker.tick().await;

        if coordinator.session().address().is_none() {
            tracing::debug!("Record watcher: no session");
            if !mounted {
                coordinator.request_refresh(RefreshTrigger::Mount).await;
                mounted = true;
            }
            continue;
        }

        let count = match timed(call_timeout, ledger.record_count()).await {
            Ok(c) => c,
            Err(e) => {
                if e.is_transport() {
                    tracing::warn!(error = %e, "Record watcher: failed to read record count");
                } else {
                    tracing::error!(error = %e, "Record watcher: record count unreadable");
                }
                if !mounted {
                    // Publishes `Failed` so the view leaves `Idle`.
                    coordinator.request_refresh(RefreshTrigger::Mount).await;
                    mounted = true;
                }
                continue;
            }
        };

        let trigger = if !mounted {
            RefreshTrigger::Mount
        } else if last_count != Some(count) {
            RefreshTrigger::RecordCountChanged
        } else {
            continue;
        };

        tracing::debug!(previous = ?last_count, current = count, "Record count changed");
        mounted = true;
        last_count = Some(count);
        coordinator.request_refresh(trigger).await;
    }
}
