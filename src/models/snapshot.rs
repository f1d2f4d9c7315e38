use alloy::primitives::{Address, U256};
use serde::Serialize;
use std::fmt;

use super::position::Position;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "reason", rename_all = "snake_case")]
pub enum SnapshotStatus {
    Idle,
    Loading,
    Ready,
    Failed(String),
}

impl SnapshotStatus {
    pub fn is_settled(&self) -> bool {
        matches!(self, SnapshotStatus::Ready | SnapshotStatus::Failed(_))
    }
}

/// Which remote read a per-record failure happened in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanStage {
    Stake,
    Record,
    Winnings,
}

impl fmt::Display for ScanStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScanStage::Stake => write!(f, "stake"),
            ScanStage::Record => write!(f, "record"),
            ScanStage::Winnings => write!(f, "winnings"),
        }
    }
}

/// A record skipped during a scan. Carried alongside a `Ready` snapshot as a
/// non-blocking notice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScanWarning {
    pub record_id: u64,
    pub stage: ScanStage,
    pub reason: String,
}

/// Immutable published view of one user's portfolio.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortfolioSnapshot {
    pub address: Option<Address>,
    /// Ascending by record id.
    pub positions: Vec<Position>,
    pub total_winnings: U256,
    /// Generation that produced this snapshot.
    pub as_of: u64,
    pub status: SnapshotStatus,
    pub warnings: Vec<ScanWarning>,
}

impl PortfolioSnapshot {
    pub fn idle() -> Self {
        Self {
            address: None,
            positions: Vec::new(),
            total_winnings: U256::ZERO,
            as_of: 0,
            status: SnapshotStatus::Idle,
            warnings: Vec::new(),
        }
    }

    /// The snapshot for "no active session": ready, empty, no scan performed.
    pub fn empty_ready(as_of: u64) -> Self {
        Self {
            as_of,
            status: SnapshotStatus::Ready,
            ..Self::idle()
        }
    }

    /// Same data, new generation and status. Used for `Loading` and `Failed`
    /// so the last good positions stay visible.
    pub fn restamp(&self, as_of: u64, status: SnapshotStatus) -> Self {
        Self {
            as_of,
            status,
            ..self.clone()
        }
    }

    pub fn active_positions(&self) -> impl Iterator<Item = &Position> {
        self.positions.iter().filter(|p| !p.is_resolved())
    }

    pub fn resolved_positions(&self) -> impl Iterator<Item = &Position> {
        self.positions.iter().filter(|p| p.is_resolved())
    }

    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }

    /// Equality ignoring the generation stamp.
    pub fn same_content(&self, other: &PortfolioSnapshot) -> bool {
        self.address == other.address
            && self.positions == other.positions
            && self.total_winnings == other.total_winnings
            && self.status == other.status
            && self.warnings == other.warnings
    }
}

impl Default for PortfolioSnapshot {
    fn default() -> Self {
        Self::idle()
    }
}
