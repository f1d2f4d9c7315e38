use std::str::FromStr;
use std::time::Duration;

use alloy::network::ReceiptResponse;
use alloy::primitives::{Address, U256};
use alloy::providers::{DynProvider, PendingTransactionBuilder, Provider, ProviderBuilder};
use alloy::signers::local::PrivateKeySigner;
use alloy::signers::Signer;
use alloy::sol;
use futures_util::future::BoxFuture;
use futures_util::FutureExt;

use super::{LedgerClient, LedgerError, TxHandle};
use crate::models::{BetOption, BetRecord, RawBetRecord};

sol! {
    #[sol(rpc)]
    contract BettingPool {
        function nextBetId() external view returns (uint256);

        function bets(uint256 betId) external view returns (
            address creator,
            string description,
            uint256 totalPool,
            uint256 option1Pool,
            uint256 option2Pool,
            uint256 creationTime,
            uint256 endTime,
            bool isResolved,
            uint8 winningOption
        );

        function userBets(uint256 betId, address user, uint8 option) external view returns (uint256);

        function calculateWinnings(uint256 betId, address user) external view returns (uint256);

        function createBet(string description) external;

        function placeBet(uint256 betId, uint8 option) external payable;
    }
}

/// Ledger client backed by the BetWin contract over JSON-RPC.
///
/// Read-only unless constructed with a private key.
pub struct ContractLedger {
    contract: BettingPool::BettingPoolInstance<DynProvider>,
    provider: DynProvider,
    signer_address: Option<Address>,
    confirmation_timeout: Duration,
}

impl ContractLedger {
    /// Connect to `rpc_url` and bind the contract at `contract_address`.
    ///
    /// `private_key` is a hex string with or without `0x`; it is parsed once
    /// and never stored.
    pub async fn connect(
        rpc_url: &str,
        contract_address: Address,
        private_key: Option<&str>,
        chain_id: Option<u64>,
        confirmation_timeout: Duration,
    ) -> anyhow::Result<Self> {
        let (provider, signer_address) = match private_key {
            Some(key) => {
                let signer = PrivateKeySigner::from_str(key)?.with_chain_id(chain_id);
                let address = signer.address();
                let provider = ProviderBuilder::new()
                    .wallet(signer)
                    .connect(rpc_url)
                    .await?
                    .erased();
                (provider, Some(address))
            }
            None => {
                let provider = ProviderBuilder::new().connect(rpc_url).await?.erased();
                (provider, None)
            }
        };

        tracing::info!(
            contract = %contract_address,
            signer = ?signer_address,
            "Ledger contract bound"
        );

        Ok(Self {
            contract: BettingPool::new(contract_address, provider.clone()),
            provider,
            signer_address,
            confirmation_timeout,
        })
    }

    fn require_signer(&self) -> Result<(), LedgerError> {
        if self.signer_address.is_none() {
            return Err(LedgerError::ReadOnly);
        }
        Ok(())
    }
}

fn transport<E: std::fmt::Display>(e: E) -> LedgerError {
    LedgerError::Transport(e.to_string())
}

impl LedgerClient for ContractLedger {
    fn record_count(&self) -> BoxFuture<'_, Result<u64, LedgerError>> {
        async move {
            let count = self.contract.nextBetId().call().await.map_err(transport)?;
            u64::try_from(count).map_err(|_| LedgerError::CountOverflow(count))
        }
        .boxed()
    }

    fn record(&self, id: u64) -> BoxFuture<'_, Result<BetRecord, LedgerError>> {
        async move {
            let bet = self
                .contract
                .bets(U256::from(id))
                .call()
                .await
                .map_err(transport)?;

            let raw = RawBetRecord {
                creator: bet.creator,
                description: bet.description,
                total_pool: bet.totalPool,
                option1_pool: bet.option1Pool,
                option2_pool: bet.option2Pool,
                creation_time: bet.creationTime,
                end_time: bet.endTime,
                is_resolved: bet.isResolved,
                winning_option: bet.winningOption,
            };

            BetRecord::from_raw(id, raw).map_err(|source| LedgerError::Decode { id, source })
        }
        .boxed()
    }

    fn position(
        &self,
        id: u64,
        user: Address,
        option: BetOption,
    ) -> BoxFuture<'_, Result<U256, LedgerError>> {
        async move {
            self.contract
                .userBets(U256::from(id), user, option.as_u8())
                .call()
                .await
                .map_err(transport)
        }
        .boxed()
    }

    fn winnings(&self, id: u64, user: Address) -> BoxFuture<'_, Result<U256, LedgerError>> {
        async move {
            self.contract
                .calculateWinnings(U256::from(id), user)
                .call()
                .await
                .map_err(transport)
        }
        .boxed()
    }

    fn submit_wager(
        &self,
        id: u64,
        option: BetOption,
        amount: U256,
    ) -> BoxFuture<'_, Result<TxHandle, LedgerError>> {
        async move {
            self.require_signer()?;
            let pending = self
                .contract
                .placeBet(U256::from(id), option.as_u8())
                .value(amount)
                .send()
                .await
                .map_err(transport)?;
            let tx = TxHandle(*pending.tx_hash());
            tracing::info!(record_id = id, option = %option, amount = %amount, tx = %tx, "Wager submitted");
            Ok::<_, LedgerError>(tx)
        }
        .boxed()
    }

    fn submit_record(&self, description: String) -> BoxFuture<'_, Result<TxHandle, LedgerError>> {
        async move {
            self.require_signer()?;
            let pending = self
                .contract
                .createBet(description)
                .send()
                .await
                .map_err(transport)?;
            let tx = TxHandle(*pending.tx_hash());
            tracing::info!(tx = %tx, "Record creation submitted");
            Ok::<_, LedgerError>(tx)
        }
        .boxed()
    }

    fn await_confirmation(&self, tx: TxHandle) -> BoxFuture<'_, Result<(), LedgerError>> {
        async move {
            let receipt = PendingTransactionBuilder::new(self.provider.root().clone(), tx.hash())
                .with_timeout(Some(self.confirmation_timeout))
                .get_receipt()
                .await
                .map_err(transport)?;

            if !receipt.status() {
                return Err(LedgerError::Reverted(tx.hash()));
            }
            tracing::info!(tx = %tx, block = ?receipt.block_number(), "Transaction confirmed");
            Ok(())
        }
        .boxed()
    }

    fn signer_address(&self) -> Option<Address> {
        self.signer_address
    }
}
