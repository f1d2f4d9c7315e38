use alloy::primitives::U256;
use serde::Serialize;

use super::record::{BetOption, BetRecord};

/// The user's stake on each side of one record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Stakes {
    pub option_a: U256,
    pub option_b: U256,
}

impl Stakes {
    pub fn new(option_a: U256, option_b: U256) -> Self {
        Self { option_a, option_b }
    }

    pub fn get(&self, option: BetOption) -> U256 {
        match option {
            BetOption::OptionA => self.option_a,
            BetOption::OptionB => self.option_b,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.option_a.is_zero() && self.option_b.is_zero()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PositionOutcome {
    Pending,
    Won,
    Lost,
    /// Stakes on both sides of a resolved record.
    Mixed,
}

/// A user's stake(s) in one record, with the record as read during the scan.
///
/// Both option amounts are kept. A ledger that reports stakes on both sides
/// of one record yields a single double-sided position, never two positions
/// and never one side dropped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Position {
    pub record_id: u64,
    pub stakes: Stakes,
    pub record: BetRecord,
}

impl Position {
    /// Returns `None` when the user holds nothing on either side.
    pub fn from_stakes(record: BetRecord, stakes: Stakes) -> Option<Self> {
        if stakes.is_empty() {
            return None;
        }
        Some(Self {
            record_id: record.id,
            stakes,
            record,
        })
    }

    pub fn options_chosen(&self) -> Vec<BetOption> {
        BetOption::ALL
            .into_iter()
            .filter(|o| !self.stakes.get(*o).is_zero())
            .collect()
    }

    pub fn stake(&self, option: BetOption) -> U256 {
        self.stakes.get(option)
    }

    pub fn amount_staked(&self) -> U256 {
        self.stakes.option_a.saturating_add(self.stakes.option_b)
    }

    pub fn is_double_sided(&self) -> bool {
        !self.stakes.option_a.is_zero() && !self.stakes.option_b.is_zero()
    }

    pub fn is_resolved(&self) -> bool {
        self.record.resolved
    }

    pub fn outcome(&self) -> PositionOutcome {
        let Some(winner) = self.record.winner() else {
            return PositionOutcome::Pending;
        };
        if self.is_double_sided() {
            return PositionOutcome::Mixed;
        }
        if self.stake(winner).is_zero() {
            PositionOutcome::Lost
        } else {
            PositionOutcome::Won
        }
    }
}
