use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use alloy::primitives::Address;
use metrics::{counter, gauge, histogram};
use serde::Serialize;
use thiserror::Error;
use tokio::task::JoinHandle;

use super::positions::{PositionAggregator, PositionScan};
use super::session::Session;
use super::store::PortfolioStore;
use super::winnings::{WinningsAggregator, WinningsSum};
use crate::ledger::{timed, LedgerClient, LedgerError};
use crate::models::{PortfolioSnapshot, SnapshotStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RefreshTrigger {
    Mount,
    Manual,
    RecordCountChanged,
    SessionChanged,
    TransactionConfirmed,
}

impl RefreshTrigger {
    /// Triggers that imply the in-flight scan reads outdated state, even when
    /// address and record count are unchanged.
    fn supersedes_in_flight(self) -> bool {
        matches!(
            self,
            RefreshTrigger::SessionChanged | RefreshTrigger::TransactionConfirmed
        )
    }

    fn as_str(self) -> &'static str {
        match self {
            RefreshTrigger::Mount => "mount",
            RefreshTrigger::Manual => "manual",
            RefreshTrigger::RecordCountChanged => "record_count_changed",
            RefreshTrigger::SessionChanged => "session_changed",
            RefreshTrigger::TransactionConfirmed => "transaction_confirmed",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "result", content = "generation", rename_all = "snake_case")]
pub enum RefreshOutcome {
    /// A scan was launched for this generation.
    Started(u64),
    /// An equivalent scan is already running under this generation.
    Debounced(u64),
    /// Published without scanning (no session).
    Published(u64),
    /// The scan could not start; `Failed` was published.
    Failed(u64),
    /// A newer request took effect while this one waited on the ledger;
    /// nothing was published. Carries the latest generation.
    Superseded(u64),
}

impl RefreshOutcome {
    pub fn generation(&self) -> u64 {
        match *self {
            RefreshOutcome::Started(g)
            | RefreshOutcome::Debounced(g)
            | RefreshOutcome::Published(g)
            | RefreshOutcome::Failed(g)
            | RefreshOutcome::Superseded(g) => g,
        }
    }
}

/// Inability to produce any snapshot for a generation.
#[derive(Debug, Error)]
pub enum ScanFailure {
    #[error("could not read record count: {0}")]
    RecordCount(#[source] LedgerError),

    #[error("every lookup failed across {0} records")]
    AllLookupsFailed(u64),
}

struct InFlight {
    generation: u64,
    address: Address,
    record_count: u64,
    task: JoinHandle<()>,
}

struct CoordinatorState {
    /// Latest requested generation. Only its result may be published.
    generation: u64,
    /// Ticket of the newest request to arrive.
    requested: u64,
    /// Ticket of the newest request to take effect.
    applied: u64,
    in_flight: Option<InFlight>,
    /// Last `Ready` snapshot, shown while loading and after failures.
    last_good: Arc<PortfolioSnapshot>,
}

impl CoordinatorState {
    fn take_ticket(&mut self) -> u64 {
        self.requested += 1;
        self.requested
    }

    /// Requests take effect in arrival order. One that arrives before an
    /// already applied request, or whose address is no longer the session's,
    /// must not touch the in-flight scan or the store.
    fn admit(&mut self, ticket: u64, requested: Option<Address>, session: Option<Address>) -> bool {
        if ticket < self.applied || requested != session {
            return false;
        }
        self.applied = ticket;
        true
    }

    fn next_generation(&mut self) -> u64 {
        self.generation += 1;
        gauge!("portfolio_generation").set(self.generation as f64);
        self.generation
    }

    fn cancel_in_flight(&mut self) {
        if let Some(prev) = self.in_flight.take() {
            prev.task.abort();
            tracing::debug!(generation = prev.generation, "Superseded scan aborted");
        }
    }

    /// Data to keep on screen for `address` while a new result is pending.
    fn carried_over(&self, address: Option<Address>) -> PortfolioSnapshot {
        if self.last_good.address == address {
            (*self.last_good).clone()
        } else {
            PortfolioSnapshot {
                address,
                ..PortfolioSnapshot::idle()
            }
        }
    }
}

struct Inner {
    ledger: Arc<dyn LedgerClient>,
    positions: PositionAggregator,
    winnings: WinningsAggregator,
    store: PortfolioStore,
    session: Session,
    call_timeout: Duration,
    state: Mutex<CoordinatorState>,
}

/// Owns the generation counter and is the only writer of the portfolio store.
///
/// Each refresh gets a new generation. A result is published only if its
/// generation is still the latest when it completes; superseded scans are
/// aborted and any late result is dropped.
#[derive(Clone)]
pub struct RefreshCoordinator {
    inner: Arc<Inner>,
}

impl RefreshCoordinator {
    pub fn new(
        ledger: Arc<dyn LedgerClient>,
        session: Session,
        store: PortfolioStore,
        concurrency: usize,
        call_timeout: Duration,
    ) -> Self {
        let positions = PositionAggregator::new(Arc::clone(&ledger), concurrency, call_timeout);
        let winnings = WinningsAggregator::new(Arc::clone(&ledger), concurrency, call_timeout);
        let last_good = store.current();

        Self {
            inner: Arc::new(Inner {
                ledger,
                positions,
                winnings,
                store,
                session,
                call_timeout,
                state: Mutex::new(CoordinatorState {
                    generation: last_good.as_of,
                    requested: 0,
                    applied: 0,
                    in_flight: None,
                    last_good,
                }),
            }),
        }
    }

    pub fn store(&self) -> &PortfolioStore {
        &self.inner.store
    }

    pub fn session(&self) -> &Session {
        &self.inner.session
    }

    pub fn current_generation(&self) -> u64 {
        self.inner.lock().generation
    }

    pub fn is_scanning(&self) -> bool {
        self.inner.lock().in_flight.is_some()
    }

    /// A write transaction completed: ledger state changed, rescan.
    pub async fn notify_transaction_confirmed(&self) -> RefreshOutcome {
        self.request_refresh(RefreshTrigger::TransactionConfirmed).await
    }

    /// Switch the connected account. Rescans only when it actually changed.
    pub async fn set_session(&self, address: Option<Address>) -> Option<RefreshOutcome> {
        if !self.inner.session.set_address(address) {
            return None;
        }
        tracing::info!(address = ?address, "Session changed");
        Some(self.request_refresh(RefreshTrigger::SessionChanged).await)
    }

    /// Start a new scan generation, unless an equivalent scan is already
    /// running. Returns once the scan is launched; await
    /// [`PortfolioStore::wait_for_generation`] for its result.
    pub async fn request_refresh(&self, trigger: RefreshTrigger) -> RefreshOutcome {
        let inner = &self.inner;
        let ticket = inner.lock().take_ticket();

        let Some(address) = inner.session.address() else {
            let mut state = inner.lock();
            if !state.admit(ticket, None, inner.session.address()) {
                return superseded(&state, trigger);
            }
            state.cancel_in_flight();
            let generation = state.next_generation();
            let snapshot = PortfolioSnapshot::empty_ready(generation);
            state.last_good = Arc::new(snapshot.clone());
            inner.store.publish(snapshot);
            gauge!("portfolio_positions").set(0.0);
            tracing::debug!(generation, trigger = trigger.as_str(), "No session: published empty portfolio");
            return RefreshOutcome::Published(generation);
        };

        // Fetched fresh for every request; bounds this generation only.
        let record_count = match timed(inner.call_timeout, inner.ledger.record_count()).await {
            Ok(count) => count,
            Err(e) => {
                let failure = ScanFailure::RecordCount(e);
                let mut state = inner.lock();
                if !state.admit(ticket, Some(address), inner.session.address()) {
                    tracing::debug!(error = %failure, "Record count failure from a superseded request");
                    return superseded(&state, trigger);
                }
                state.cancel_in_flight();
                let generation = state.next_generation();
                let snapshot = state
                    .carried_over(Some(address))
                    .restamp(generation, SnapshotStatus::Failed(failure.to_string()));
                inner.store.publish(snapshot);
                counter!("portfolio_scans_failed").increment(1);
                tracing::error!(
                    generation,
                    trigger = trigger.as_str(),
                    error = %failure,
                    "Refresh failed before scanning"
                );
                return RefreshOutcome::Failed(generation);
            }
        };

        let mut state = inner.lock();
        if !state.admit(ticket, Some(address), inner.session.address()) {
            return superseded(&state, trigger);
        }

        if let Some(running) = &state.in_flight {
            if !trigger.supersedes_in_flight()
                && running.address == address
                && running.record_count == record_count
            {
                counter!("portfolio_refresh_debounced").increment(1);
                tracing::debug!(
                    generation = running.generation,
                    trigger = trigger.as_str(),
                    "Refresh debounced: equivalent scan in flight"
                );
                return RefreshOutcome::Debounced(running.generation);
            }
        }

        state.cancel_in_flight();
        let generation = state.next_generation();
        let loading = state
            .carried_over(Some(address))
            .restamp(generation, SnapshotStatus::Loading);
        inner.store.publish(loading);

        // The lock is held until `in_flight` is set, so the task cannot
        // complete against a missing in-flight entry.
        let task_inner = Arc::clone(inner);
        let task = tokio::spawn(async move {
            task_inner.run_scan(generation, address, record_count).await;
        });
        state.in_flight = Some(InFlight {
            generation,
            address,
            record_count,
            task,
        });

        counter!("portfolio_scans_total").increment(1);
        tracing::info!(
            generation,
            trigger = trigger.as_str(),
            user = %address,
            record_count,
            "Portfolio scan started"
        );

        RefreshOutcome::Started(generation)
    }
}

impl Inner {
    fn lock(&self) -> MutexGuard<'_, CoordinatorState> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    async fn run_scan(&self, generation: u64, address: Address, record_count: u64) {
        let started = Instant::now();
        let (positions, winnings) = tokio::join!(
            self.positions.scan(address, record_count),
            self.winnings.sum_winnings(address, record_count),
        );
        histogram!("portfolio_scan_duration_seconds").record(started.elapsed().as_secs_f64());
        self.complete(generation, address, positions, winnings);
    }

    fn complete(
        &self,
        generation: u64,
        address: Address,
        positions: PositionScan,
        winnings: WinningsSum,
    ) {
        let mut state = self.lock();

        if !is_current(state.generation, generation) {
            counter!("portfolio_stale_results_discarded").increment(1);
            tracing::debug!(
                generation,
                latest = state.generation,
                "Discarding stale scan result"
            );
            return;
        }
        state.in_flight = None;

        if positions.is_total_failure() && winnings.is_total_failure() {
            let failure = ScanFailure::AllLookupsFailed(positions.record_count);
            let snapshot = state
                .carried_over(Some(address))
                .restamp(generation, SnapshotStatus::Failed(failure.to_string()));
            self.store.publish(snapshot);
            counter!("portfolio_scans_failed").increment(1);
            tracing::error!(generation, error = %failure, "Portfolio scan failed");
            return;
        }

        // Payouts count only where the user holds, or may hold, a stake.
        let winnings = winnings.retain(|id| positions.may_hold(id));

        let mut warnings = positions.failed;
        warnings.extend(winnings.failed);
        warnings.sort_by_key(|w| w.record_id);

        let snapshot = PortfolioSnapshot {
            address: Some(address),
            positions: positions.positions,
            total_winnings: winnings.total,
            as_of: generation,
            status: SnapshotStatus::Ready,
            warnings,
        };

        if state.last_good.address == snapshot.address {
            log_pool_regressions(&state.last_good, &snapshot);
        }

        counter!("portfolio_records_skipped_total").increment(snapshot.warnings.len() as u64);
        gauge!("portfolio_positions").set(snapshot.positions.len() as f64);

        if snapshot.has_warnings() {
            tracing::warn!(
                generation,
                skipped = snapshot.warnings.len(),
                "Portfolio published with skipped records"
            );
        }
        tracing::info!(
            generation,
            positions = snapshot.positions.len(),
            total_winnings = %snapshot.total_winnings,
            "Portfolio snapshot published"
        );

        state.last_good = Arc::new(snapshot.clone());
        self.store.publish(snapshot);
    }
}

fn superseded(state: &CoordinatorState, trigger: RefreshTrigger) -> RefreshOutcome {
    counter!("portfolio_refresh_superseded").increment(1);
    tracing::debug!(
        generation = state.generation,
        trigger = trigger.as_str(),
        "Refresh dropped: a newer request already took effect"
    );
    RefreshOutcome::Superseded(state.generation)
}

fn is_current(latest: u64, generation: u64) -> bool {
    latest == generation
}

/// Pools only grow until resolution. A shrink between two snapshots means
/// the reads straddled inconsistent ledger states.
fn log_pool_regressions(previous: &PortfolioSnapshot, next: &PortfolioSnapshot) {
    for pos in next.positions.iter().filter(|p| !p.record.resolved) {
        let Some(prev) = previous
            .positions
            .iter()
            .find(|p| p.record_id == pos.record_id && !p.record.resolved)
        else {
            continue;
        };
        if pos.record.total_pool < prev.record.total_pool {
            tracing::warn!(
                record_id = pos.record_id,
                previous = %prev.record.total_pool,
                current = %pos.record.total_pool,
                "Record pool shrank between scans"
            );
        }
    }
}
