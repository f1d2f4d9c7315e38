use alloy::primitives::{Address, U256};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// BetOption: the side a wager is placed on
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BetOption {
    #[serde(alias = "yes")]
    OptionA,
    #[serde(alias = "no")]
    OptionB,
}

impl BetOption {
    pub const ALL: [BetOption; 2] = [BetOption::OptionA, BetOption::OptionB];

    /// Contract encoding: option 1 is "Yes", option 2 is "No".
    pub fn as_u8(self) -> u8 {
        match self {
            BetOption::OptionA => 1,
            BetOption::OptionB => 2,
        }
    }

    pub fn from_u8(v: u8) -> Option<Self> {
        match v {
            1 => Some(BetOption::OptionA),
            2 => Some(BetOption::OptionB),
            _ => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            BetOption::OptionA => "Yes",
            BetOption::OptionB => "No",
        }
    }
}

impl fmt::Display for BetOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

// ---------------------------------------------------------------------------
// WinningOption: resolution result, meaningful only once resolved
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WinningOption {
    #[default]
    Unset,
    OptionA,
    OptionB,
}

impl WinningOption {
    pub fn from_u8(v: u8) -> Option<Self> {
        match v {
            0 => Some(WinningOption::Unset),
            1 => Some(WinningOption::OptionA),
            2 => Some(WinningOption::OptionB),
            _ => None,
        }
    }

    pub fn as_option(self) -> Option<BetOption> {
        match self {
            WinningOption::Unset => None,
            WinningOption::OptionA => Some(BetOption::OptionA),
            WinningOption::OptionB => Some(BetOption::OptionB),
        }
    }
}

// ---------------------------------------------------------------------------
// BetRecord: one wager market as read from the ledger
// ---------------------------------------------------------------------------

/// Raw `bets(id)` tuple in contract field order, before validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawBetRecord {
    pub creator: Address,
    pub description: String,
    pub total_pool: U256,
    pub option1_pool: U256,
    pub option2_pool: U256,
    pub creation_time: U256,
    pub end_time: U256,
    pub is_resolved: bool,
    pub winning_option: u8,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RecordDecodeError {
    #[error("winning option {0} is outside 0..=2")]
    WinningOption(u8),

    #[error("{field} does not fit in u64 seconds")]
    Timestamp { field: &'static str },

    #[error("end time {ends_at} precedes creation time {created_at}")]
    EndsBeforeCreated { created_at: u64, ends_at: u64 },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BetRecord {
    pub id: u64,
    pub creator: Address,
    pub description: String,
    pub total_pool: U256,
    pub option_a_pool: U256,
    pub option_b_pool: U256,
    pub created_at: u64,
    pub ends_at: u64,
    pub resolved: bool,
    pub winning_option: WinningOption,
}

impl BetRecord {
    /// Validate a raw ledger tuple. Malformed tuples are rejected rather than
    /// clamped so a bad record never reaches a snapshot.
    pub fn from_raw(id: u64, raw: RawBetRecord) -> Result<Self, RecordDecodeError> {
        let winning_option = WinningOption::from_u8(raw.winning_option)
            .ok_or(RecordDecodeError::WinningOption(raw.winning_option))?;

        let created_at = u64::try_from(raw.creation_time)
            .map_err(|_| RecordDecodeError::Timestamp { field: "creationTime" })?;
        let ends_at = u64::try_from(raw.end_time)
            .map_err(|_| RecordDecodeError::Timestamp { field: "endTime" })?;

        if ends_at < created_at {
            return Err(RecordDecodeError::EndsBeforeCreated { created_at, ends_at });
        }

        Ok(Self {
            id,
            creator: raw.creator,
            description: raw.description,
            total_pool: raw.total_pool,
            option_a_pool: raw.option1_pool,
            option_b_pool: raw.option2_pool,
            created_at,
            ends_at,
            resolved: raw.is_resolved,
            winning_option,
        })
    }

    /// The winning side, only once the record is resolved.
    pub fn winner(&self) -> Option<BetOption> {
        if self.resolved {
            self.winning_option.as_option()
        } else {
            None
        }
    }

    pub fn pool(&self, option: BetOption) -> U256 {
        match option {
            BetOption::OptionA => self.option_a_pool,
            BetOption::OptionB => self.option_b_pool,
        }
    }

    pub fn pools_consistent(&self) -> bool {
        self.option_a_pool.checked_add(self.option_b_pool) == Some(self.total_pool)
    }

    pub fn created_at_utc(&self) -> Option<DateTime<Utc>> {
        i64::try_from(self.created_at)
            .ok()
            .and_then(|s| DateTime::from_timestamp(s, 0))
    }

    pub fn ends_at_utc(&self) -> Option<DateTime<Utc>> {
        i64::try_from(self.ends_at)
            .ok()
            .and_then(|s| DateTime::from_timestamp(s, 0))
    }
}

impl fmt::Display for BetRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Bet #{}: pool={} yes={} no={} resolved={}",
            self.id, self.total_pool, self.option_a_pool, self.option_b_pool, self.resolved,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw() -> RawBetRecord {
        RawBetRecord {
            creator: Address::ZERO,
            description: "Will it rain?".into(),
            total_pool: U256::from(30),
            option1_pool: U256::from(10),
            option2_pool: U256::from(20),
            creation_time: U256::from(1_700_000_000u64),
            end_time: U256::from(1_700_086_400u64),
            is_resolved: true,
            winning_option: 2,
        }
    }

    #[test]
    fn test_from_raw_valid() {
        let record = BetRecord::from_raw(7, raw()).unwrap();
        assert_eq!(record.id, 7);
        assert_eq!(record.winning_option, WinningOption::OptionB);
        assert_eq!(record.winner(), Some(BetOption::OptionB));
        assert!(record.pools_consistent());
        assert_eq!(record.pool(BetOption::OptionA), U256::from(10));
        assert_eq!(record.pool(BetOption::OptionB), U256::from(20));
        assert_eq!(record.created_at_utc().unwrap().timestamp(), 1_700_000_000);
    }

    #[test]
    fn test_from_raw_rejects_unknown_winning_option() {
        let mut r = raw();
        r.winning_option = 3;
        assert_eq!(
            BetRecord::from_raw(0, r),
            Err(RecordDecodeError::WinningOption(3))
        );
    }

    #[test]
    fn test_from_raw_rejects_end_before_creation() {
        let mut r = raw();
        r.end_time = U256::from(1u64);
        assert!(matches!(
            BetRecord::from_raw(0, r),
            Err(RecordDecodeError::EndsBeforeCreated { .. })
        ));
    }

    #[test]
    fn test_from_raw_rejects_oversized_timestamp() {
        let mut r = raw();
        r.end_time = U256::MAX;
        assert_eq!(
            BetRecord::from_raw(0, r),
            Err(RecordDecodeError::Timestamp { field: "endTime" })
        );
    }

    #[test]
    fn test_winner_hidden_until_resolved() {
        let mut r = raw();
        r.is_resolved = false;
        let record = BetRecord::from_raw(1, r).unwrap();
        assert_eq!(record.winner(), None);
    }

    #[test]
    fn test_pools_inconsistent_under_skew() {
        let mut r = raw();
        r.total_pool = U256::from(25);
        let record = BetRecord::from_raw(1, r).unwrap();
        assert!(!record.pools_consistent());
    }

    #[test]
    fn test_option_encoding() {
        assert_eq!(BetOption::from_u8(1), Some(BetOption::OptionA));
        assert_eq!(BetOption::from_u8(2), Some(BetOption::OptionB));
        assert_eq!(BetOption::from_u8(0), None);
        assert_eq!(BetOption::OptionB.as_u8(), 2);
    }
}
