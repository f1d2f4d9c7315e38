pub mod contract;

use std::future::Future;
use std::time::Duration;

use alloy::primitives::{Address, TxHash, U256};
use futures_util::future::BoxFuture;
use thiserror::Error;

use crate::models::{BetOption, BetRecord, RecordDecodeError};

pub use contract::ContractLedger;

#[derive(Debug, Clone, Error)]
pub enum LedgerError {
    #[error("ledger call failed: {0}")]
    Transport(String),

    #[error("ledger call timed out after {0:?}")]
    Timeout(Duration),

    #[error("malformed record {id}: {source}")]
    Decode {
        id: u64,
        #[source]
        source: RecordDecodeError,
    },

    #[error("record count {0} exceeds u64")]
    CountOverflow(U256),

    #[error("no signer configured: ledger is read-only")]
    ReadOnly,

    #[error("transaction {0} reverted")]
    Reverted(TxHash),
}

impl LedgerError {
    /// Network-level failure: the call may succeed if retried later.
    pub fn is_transport(&self) -> bool {
        matches!(self, LedgerError::Transport(_) | LedgerError::Timeout(_))
    }
}

/// Handle to a submitted write transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TxHandle(pub TxHash);

impl TxHandle {
    pub fn hash(&self) -> TxHash {
        self.0
    }
}

impl std::fmt::Display for TxHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Typed read/write access to the remote wager ledger.
///
/// Every call is an independent round trip: two reads issued back to back may
/// observe different ledger states. Calls carry no timeout of their own; wrap
/// them in [`timed`].
pub trait LedgerClient: Send + Sync {
    /// Number of records ever created; ids are `0..count`.
    fn record_count(&self) -> BoxFuture<'_, Result<u64, LedgerError>>;

    fn record(&self, id: u64) -> BoxFuture<'_, Result<BetRecord, LedgerError>>;

    /// Stake held by `user` on one side of record `id`.
    fn position(
        &self,
        id: u64,
        user: Address,
        option: BetOption,
    ) -> BoxFuture<'_, Result<U256, LedgerError>>;

    /// Payout the ledger computes for `user` on record `id`.
    fn winnings(&self, id: u64, user: Address) -> BoxFuture<'_, Result<U256, LedgerError>>;

    fn submit_wager(
        &self,
        id: u64,
        option: BetOption,
        amount: U256,
    ) -> BoxFuture<'_, Result<TxHandle, LedgerError>>;

    fn submit_record(&self, description: String) -> BoxFuture<'_, Result<TxHandle, LedgerError>>;

    /// Resolves once the transaction is mined; a reverted transaction is an error.
    fn await_confirmation(&self, tx: TxHandle) -> BoxFuture<'_, Result<(), LedgerError>>;

    /// Address writes are signed with, if any.
    fn signer_address(&self) -> Option<Address> {
        None
    }
}

/// Bound one ledger call. An elapsed call is reported as
/// [`LedgerError::Timeout`] and handled like any transport failure.
pub async fn timed<T, F>(timeout: Duration, fut: F) -> Result<T, LedgerError>
where
    F: Future<Output = Result<T, LedgerError>>,
{
    match tokio::time::timeout(timeout, fut).await {
        Ok(result) => result,
        Err(_) => Err(LedgerError::Timeout(timeout)),
    }
}
