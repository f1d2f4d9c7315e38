use std::sync::Arc;
use std::time::Duration;

use alloy::primitives::{Address, U256};
use futures_util::{stream, StreamExt};

use crate::ledger::{timed, LedgerClient, LedgerError};
use crate::models::{BetOption, Position, ScanStage, ScanWarning, Stakes};

/// Result of one position scan.
#[derive(Debug, Clone, Default)]
pub struct PositionScan {
    /// Ascending by record id.
    pub positions: Vec<Position>,
    /// Records that could not be read. Ascending by record id.
    pub failed: Vec<ScanWarning>,
    /// Upper bound (exclusive) the scan covered.
    pub record_count: u64,
}

impl PositionScan {
    /// Every record failed, so the scan says nothing about the portfolio.
    pub fn is_total_failure(&self) -> bool {
        self.record_count > 0 && self.failed.len() as u64 == self.record_count
    }

    /// The user holds a stake on `id`, or the lookup failed and it may.
    pub fn may_hold(&self, id: u64) -> bool {
        self.positions
            .binary_search_by_key(&id, |p| p.record_id)
            .is_ok()
            || self.failed.iter().any(|w| w.record_id == id)
    }
}

enum RecordLookup {
    Held(Position),
    NotHeld,
    Failed(ScanWarning),
}

/// Scans the ledger id space for records the user has a stake in.
#[derive(Clone)]
pub struct PositionAggregator {
    ledger: Arc<dyn LedgerClient>,
    concurrency: usize,
    call_timeout: Duration,
}

impl PositionAggregator {
    pub fn new(ledger: Arc<dyn LedgerClient>, concurrency: usize, call_timeout: Duration) -> Self {
        Self {
            ledger,
            concurrency: concurrency.max(1),
            call_timeout,
        }
    }

    /// Look up both stakes for every id in `0..record_count`, fetching the full
    /// record only where a stake is non-zero.
    ///
    /// At most `concurrency` records are in flight. A failing record is
    /// reported in `failed` and never aborts the scan.
    pub async fn scan(&self, user: Address, record_count: u64) -> PositionScan {
        let lookups: Vec<(u64, RecordLookup)> = stream::iter(0..record_count)
            .map(|id| async move { (id, self.lookup(user, id).await) })
            .buffer_unordered(self.concurrency)
            .collect()
            .await;

        let mut scan = PositionScan {
            record_count,
            ..PositionScan::default()
        };

        for (_, lookup) in sorted_by_id(lookups) {
            match lookup {
                RecordLookup::Held(position) => scan.positions.push(position),
                RecordLookup::NotHeld => {}
                RecordLookup::Failed(warning) => scan.failed.push(warning),
            }
        }

        tracing::debug!(
            user = %user,
            record_count,
            positions = scan.positions.len(),
            skipped = scan.failed.len(),
            "Position scan finished"
        );

        scan
    }

    async fn lookup(&self, user: Address, id: u64) -> RecordLookup {
        let stakes = match self.stakes(user, id).await {
            Ok(s) => s,
            Err(e) => return failed(id, ScanStage::Stake, &e),
        };

        if stakes.is_empty() {
            return RecordLookup::NotHeld;
        }

        let record = match timed(self.call_timeout, self.ledger.record(id)).await {
            Ok(r) => r,
            Err(e) => return failed(id, ScanStage::Record, &e),
        };

        if !record.pools_consistent() {
            tracing::debug!(
                record_id = id,
                total = %record.total_pool,
                yes = %record.pool(BetOption::OptionA),
                no = %record.pool(BetOption::OptionB),
                "Record pools do not sum to total"
            );
        }

        match Position::from_stakes(record, stakes) {
            Some(p) => RecordLookup::Held(p),
            None => RecordLookup::NotHeld,
        }
    }

    async fn stakes(&self, user: Address, id: u64) -> Result<Stakes, LedgerError> {
        let (a, b) = tokio::join!(
            self.stake(user, id, BetOption::OptionA),
            self.stake(user, id, BetOption::OptionB),
        );
        Ok(Stakes::new(a?, b?))
    }

    async fn stake(&self, user: Address, id: u64, option: BetOption) -> Result<U256, LedgerError> {
        timed(self.call_timeout, self.ledger.position(id, user, option)).await
    }
}

fn failed(id: u64, stage: ScanStage, e: &LedgerError) -> RecordLookup {
    tracing::warn!(record_id = id, stage = %stage, error = %e, "Skipping record in position scan");
    RecordLookup::Failed(ScanWarning {
        record_id: id,
        stage,
        reason: e.to_string(),
    })
}

/// Completion order of concurrent lookups is arbitrary; output order is not.
pub(crate) fn sorted_by_id<T>(mut items: Vec<(u64, T)>) -> Vec<(u64, T)> {
    items.sort_by_key(|(id, _)| *id);
    items
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sorted_by_id_restores_ascending_order() {
        let items = vec![(3, 'd'), (0, 'a'), (2, 'c'), (1, 'b')];
        let ids: Vec<u64> = sorted_by_id(items).into_iter().map(|(id, _)| id).collect();
        assert_eq!(ids, vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_total_failure_needs_every_record() {
        let warning = |id| ScanWarning {
            record_id: id,
            stage: ScanStage::Stake,
            reason: "down".into(),
        };
        let partial = PositionScan {
            positions: vec![],
            failed: vec![warning(0)],
            record_count: 2,
        };
        assert!(!partial.is_total_failure());

        let total = PositionScan {
            positions: vec![],
            failed: vec![warning(0), warning(1)],
            record_count: 2,
        };
        assert!(total.is_total_failure());

        assert!(!PositionScan::default().is_total_failure());
    }

    #[test]
    fn test_failed_lookup_may_hold() {
        let scan = PositionScan {
            positions: vec![],
            failed: vec![ScanWarning {
                record_id: 4,
                stage: ScanStage::Record,
                reason: "down".into(),
            }],
            record_count: 6,
        };
        assert!(scan.may_hold(4));
        assert!(!scan.may_hold(5));
    }
}
