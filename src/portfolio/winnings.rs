use std::sync::Arc;
use std::time::Duration;

use alloy::primitives::{Address, U256};
use futures_util::{stream, StreamExt};

use super::positions::sorted_by_id;
use crate::ledger::{timed, LedgerClient, LedgerError};
use crate::models::{ScanStage, ScanWarning};

#[derive(Debug, Clone, Default)]
pub struct WinningsSum {
    pub total: U256,
    /// Resolved records whose payout was read, ascending.
    pub payouts: Vec<(u64, U256)>,
    pub failed: Vec<ScanWarning>,
    pub record_count: u64,
}

impl WinningsSum {
    pub fn is_total_failure(&self) -> bool {
        self.record_count > 0 && self.failed.len() as u64 == self.record_count
    }

    /// Keep only the records `counted` accepts, payouts and warnings alike,
    /// and recompute the total.
    pub fn retain(mut self, counted: impl Fn(u64) -> bool) -> Self {
        self.payouts.retain(|(id, _)| counted(*id));
        self.failed.retain(|w| counted(w.record_id));
        self.total = self
            .payouts
            .iter()
            .fold(U256::ZERO, |acc, (_, amount)| acc.saturating_add(*amount));
        self
    }
}

enum WinningsLookup {
    Paid(U256),
    Unresolved,
    Failed(ScanWarning),
}

/// Sums the ledger-computed payouts over resolved records.
///
/// Payout math belongs to the ledger; this only adds up what it reports.
#[derive(Clone)]
pub struct WinningsAggregator {
    ledger: Arc<dyn LedgerClient>,
    concurrency: usize,
    call_timeout: Duration,
}

impl WinningsAggregator {
    pub fn new(ledger: Arc<dyn LedgerClient>, concurrency: usize, call_timeout: Duration) -> Self {
        Self {
            ledger,
            concurrency: concurrency.max(1),
            call_timeout,
        }
    }

    /// Unresolved records are skipped without a payout call. A failed lookup
    /// contributes zero and is reported in `failed`.
    pub async fn sum_winnings(&self, user: Address, record_count: u64) -> WinningsSum {
        let lookups: Vec<(u64, WinningsLookup)> = stream::iter(0..record_count)
            .map(|id| async move { (id, self.lookup(user, id).await) })
            .buffer_unordered(self.concurrency)
            .collect()
            .await;

        let mut sum = WinningsSum {
            record_count,
            ..WinningsSum::default()
        };

        for (id, lookup) in sorted_by_id(lookups) {
            match lookup {
                WinningsLookup::Paid(amount) => {
                    sum.total = sum.total.saturating_add(amount);
                    sum.payouts.push((id, amount));
                }
                WinningsLookup::Unresolved => {}
                WinningsLookup::Failed(warning) => sum.failed.push(warning),
            }
        }

        tracing::debug!(
            user = %user,
            record_count,
            total = %sum.total,
            resolved = sum.payouts.len(),
            skipped = sum.failed.len(),
            "Winnings sum finished"
        );

        sum
    }

    async fn lookup(&self, user: Address, id: u64) -> WinningsLookup {
        let record = match timed(self.call_timeout, self.ledger.record(id)).await {
            Ok(r) => r,
            Err(e) => return failed(id, ScanStage::Record, &e),
        };

        if !record.resolved {
            return WinningsLookup::Unresolved;
        }

        match timed(self.call_timeout, self.ledger.winnings(id, user)).await {
            Ok(amount) => WinningsLookup::Paid(amount),
            Err(e) => failed(id, ScanStage::Winnings, &e),
        }
    }
}

fn failed(id: u64, stage: ScanStage, e: &LedgerError) -> WinningsLookup {
    tracing::warn!(record_id = id, stage = %stage, error = %e, "Winnings for record counted as zero");
    WinningsLookup::Failed(ScanWarning {
        record_id: id,
        stage,
        reason: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn warning(id: u64) -> ScanWarning {
        ScanWarning {
            record_id: id,
            stage: ScanStage::Winnings,
            reason: "timed out".into(),
        }
    }

    #[test]
    fn test_retain_recomputes_total() {
        let sum = WinningsSum {
            total: U256::from(11),
            payouts: vec![(0, U256::from(4)), (2, U256::from(7))],
            failed: vec![warning(3), warning(5)],
            record_count: 6,
        };

        let kept = sum.retain(|id| id == 0 || id == 5);

        assert_eq!(kept.total, U256::from(4));
        assert_eq!(kept.payouts, vec![(0, U256::from(4))]);
        assert_eq!(kept.failed.len(), 1);
        assert_eq!(kept.failed[0].record_id, 5);
        assert_eq!(kept.record_count, 6);
    }
}
