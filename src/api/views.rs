use alloy::primitives::utils::format_ether;
use alloy::primitives::U256;
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::models::{
    BetOption, BetRecord, PortfolioSnapshot, Position, PositionOutcome, ScanWarning,
    SnapshotStatus,
};

/// Amount rendered both exactly (wei) and for display (ether).
#[derive(Debug, Clone, Serialize)]
pub struct Amount {
    pub wei: String,
    pub ether: String,
}

impl From<U256> for Amount {
    fn from(v: U256) -> Self {
        Self {
            wei: v.to_string(),
            ether: format_ether(v),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RecordView {
    pub id: u64,
    pub creator: String,
    pub description: String,
    pub total_pool: Amount,
    pub option_a_pool: Amount,
    pub option_b_pool: Amount,
    pub created_at: Option<DateTime<Utc>>,
    pub ends_at: Option<DateTime<Utc>>,
    pub resolved: bool,
    pub winning_option: Option<BetOption>,
}

impl From<&BetRecord> for RecordView {
    fn from(r: &BetRecord) -> Self {
        Self {
            id: r.id,
            creator: r.creator.to_string(),
            description: r.description.clone(),
            total_pool: r.total_pool.into(),
            option_a_pool: r.option_a_pool.into(),
            option_b_pool: r.option_b_pool.into(),
            created_at: r.created_at_utc(),
            ends_at: r.ends_at_utc(),
            resolved: r.resolved,
            winning_option: r.winner(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PositionView {
    pub record_id: u64,
    pub options: Vec<BetOption>,
    pub stake_option_a: Amount,
    pub stake_option_b: Amount,
    pub amount_staked: Amount,
    pub double_sided: bool,
    pub outcome: PositionOutcome,
    pub record: RecordView,
}

impl From<&Position> for PositionView {
    fn from(p: &Position) -> Self {
        Self {
            record_id: p.record_id,
            options: p.options_chosen(),
            stake_option_a: p.stake(BetOption::OptionA).into(),
            stake_option_b: p.stake(BetOption::OptionB).into(),
            amount_staked: p.amount_staked().into(),
            double_sided: p.is_double_sided(),
            outcome: p.outcome(),
            record: (&p.record).into(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PortfolioView {
    pub address: Option<String>,
    pub status: SnapshotStatus,
    pub as_of: u64,
    pub active: Vec<PositionView>,
    pub resolved: Vec<PositionView>,
    pub total_winnings: Amount,
    pub warnings: Vec<ScanWarning>,
}

impl From<&PortfolioSnapshot> for PortfolioView {
    fn from(s: &PortfolioSnapshot) -> Self {
        Self {
            address: s.address.map(|a| a.to_string()),
            status: s.status.clone(),
            as_of: s.as_of,
            active: s.active_positions().map(PositionView::from).collect(),
            resolved: s.resolved_positions().map(PositionView::from).collect(),
            total_winnings: s.total_winnings.into(),
            warnings: s.warnings.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_amount_renders_wei_and_ether() {
        let amount = Amount::from(U256::from(1_500_000_000_000_000_000u128));
        assert_eq!(amount.wei, "1500000000000000000");
        assert!(amount.ether.starts_with("1.5"));
    }
}
