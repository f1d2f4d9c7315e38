use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use alloy::primitives::{Address, TxHash, U256};
use futures_util::future::BoxFuture;
use tokio::sync::watch;

use betwin_portfolio::ledger::{LedgerClient, LedgerError, TxHandle};
use betwin_portfolio::models::{BetOption, BetRecord, RawBetRecord};
use betwin_portfolio::portfolio::{PortfolioStore, RefreshCoordinator, Session};

#[allow(dead_code)]
pub const CALL_TIMEOUT: Duration = Duration::from_secs(2);

#[allow(dead_code)]
pub fn user() -> Address {
    Address::repeat_byte(0x11)
}

#[allow(dead_code)]
pub fn other_user() -> Address {
    Address::repeat_byte(0x22)
}

#[allow(dead_code)]
pub fn wei(n: u64) -> U256 {
    U256::from(n)
}

/// Well-formed raw record with the given pools.
#[allow(dead_code)]
pub fn raw_record(description: &str, pool_a: u64, pool_b: u64) -> RawBetRecord {
    RawBetRecord {
        creator: Address::repeat_byte(0xcc),
        description: description.into(),
        total_pool: U256::from(pool_a + pool_b),
        option1_pool: U256::from(pool_a),
        option2_pool: U256::from(pool_b),
        creation_time: U256::from(1_700_000_000u64),
        end_time: U256::from(1_700_086_400u64),
        is_resolved: false,
        winning_option: 0,
    }
}

#[allow(dead_code)]
pub fn resolved(mut raw: RawBetRecord, winner: BetOption) -> RawBetRecord {
    raw.is_resolved = true;
    raw.winning_option = winner.as_u8();
    raw
}

/// One-shot behaviour for the next `record_count` call.
#[derive(Clone, Copy)]
struct SlowCount {
    delay: Duration,
    fail: bool,
}

#[derive(Default)]
struct LedgerState {
    records: Vec<RawBetRecord>,
    stakes: HashMap<(u64, Address, BetOption), U256>,
    winnings: HashMap<(u64, Address), U256>,
    fail_count: bool,
    fail_records: HashSet<u64>,
    fail_positions: HashSet<u64>,
    fail_winnings: HashSet<u64>,
    delay: Option<Duration>,
    next_count: Option<SlowCount>,
    stalled_positions: HashSet<u64>,
    tx_counter: u8,
}

/// Call counters, one per ledger read.
#[derive(Default)]
pub struct CallCounts {
    pub record_count: AtomicUsize,
    pub record: AtomicUsize,
    pub position: AtomicUsize,
    pub winnings: AtomicUsize,
    positions_in_flight: AtomicUsize,
    pub max_positions_in_flight: AtomicUsize,
}

impl CallCounts {
    #[allow(dead_code)]
    pub fn total(&self) -> usize {
        self.record_count.load(Ordering::SeqCst)
            + self.record.load(Ordering::SeqCst)
            + self.position.load(Ordering::SeqCst)
            + self.winnings.load(Ordering::SeqCst)
    }
}

/// In-memory ledger with failure injection and a gate that can hold
/// position lookups until released.
pub struct FakeLedger {
    state: Mutex<LedgerState>,
    pub calls: CallCounts,
    gate: watch::Sender<bool>,
    signer: Option<Address>,
}

#[allow(dead_code)]
impl FakeLedger {
    pub fn new() -> Self {
        let (gate, _) = watch::channel(true);
        Self {
            state: Mutex::new(LedgerState::default()),
            calls: CallCounts::default(),
            gate,
            signer: None,
        }
    }

    pub fn with_signer(mut self, signer: Address) -> Self {
        self.signer = Some(signer);
        self
    }

    fn state(&self) -> std::sync::MutexGuard<'_, LedgerState> {
        self.state.lock().unwrap()
    }

    pub fn push_record(&self, raw: RawBetRecord) -> u64 {
        let mut s = self.state();
        s.records.push(raw);
        (s.records.len() - 1) as u64
    }

    pub fn set_stake(&self, id: u64, user: Address, option: BetOption, amount: u64) {
        self.state().stakes.insert((id, user, option), U256::from(amount));
    }

    pub fn set_winnings(&self, id: u64, user: Address, amount: u64) {
        self.state().winnings.insert((id, user), U256::from(amount));
    }

    pub fn fail_record_count(&self, fail: bool) {
        self.state().fail_count = fail;
    }

    pub fn fail_record(&self, id: u64) {
        self.state().fail_records.insert(id);
    }

    pub fn fail_position(&self, id: u64) {
        self.state().fail_positions.insert(id);
    }

    pub fn fail_winnings(&self, id: u64) {
        self.state().fail_winnings.insert(id);
    }

    pub fn set_delay(&self, delay: Duration) {
        self.state().delay = Some(delay);
    }

    /// The next record count read sleeps for `delay`, then answers or fails.
    pub fn slow_next_record_count(&self, delay: Duration, fail: bool) {
        self.state().next_count = Some(SlowCount { delay, fail });
    }

    /// Stake lookups for `id` never answer.
    pub fn stall_position(&self, id: u64) {
        self.state().stalled_positions.insert(id);
    }

    /// Hold every position lookup issued from now on.
    pub fn close_gate(&self) {
        self.gate.send_replace(false);
    }

    pub fn open_gate(&self) {
        self.gate.send_replace(true);
    }

    fn delay(&self) -> Option<Duration> {
        self.state().delay
    }

    fn transport(what: &str, id: u64) -> LedgerError {
        LedgerError::Transport(format!("injected {what} failure for record {id}"))
    }
}

impl LedgerClient for FakeLedger {
    fn record_count(&self) -> BoxFuture<'_, Result<u64, LedgerError>> {
        Box::pin(async move {
            self.calls.record_count.fetch_add(1, Ordering::SeqCst);
            let slow = self.state().next_count.take();
            if let Some(slow) = slow {
                tokio::time::sleep(slow.delay).await;
                if slow.fail {
                    return Err(LedgerError::Transport("injected slow record count failure".into()));
                }
            }
            let s = self.state();
            if s.fail_count {
                return Err(LedgerError::Transport("injected record count failure".into()));
            }
            Ok(s.records.len() as u64)
        })
    }

    fn record(&self, id: u64) -> BoxFuture<'_, Result<BetRecord, LedgerError>> {
        Box::pin(async move {
            self.calls.record.fetch_add(1, Ordering::SeqCst);
            let raw = {
                let s = self.state();
                if s.fail_records.contains(&id) {
                    return Err(Self::transport("record", id));
                }
                s.records
                    .get(id as usize)
                    .cloned()
                    .ok_or_else(|| Self::transport("missing record", id))?
            };
            BetRecord::from_raw(id, raw).map_err(|source| LedgerError::Decode { id, source })
        })
    }

    fn position(
        &self,
        id: u64,
        user: Address,
        option: BetOption,
    ) -> BoxFuture<'_, Result<U256, LedgerError>> {
        Box::pin(async move {
            self.calls.position.fetch_add(1, Ordering::SeqCst);
            let now = self.calls.positions_in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.calls
                .max_positions_in_flight
                .fetch_max(now, Ordering::SeqCst);

            let stalled = self.state().stalled_positions.contains(&id);
            if stalled {
                std::future::pending::<()>().await;
            }

            let mut gate = self.gate.subscribe();
            let _ = gate.wait_for(|open| *open).await;
            if let Some(delay) = self.delay() {
                tokio::time::sleep(delay).await;
            }

            let result = {
                let s = self.state();
                if s.fail_positions.contains(&id) {
                    Err(Self::transport("position", id))
                } else {
                    Ok(s.stakes.get(&(id, user, option)).copied().unwrap_or_default())
                }
            };
            self.calls.positions_in_flight.fetch_sub(1, Ordering::SeqCst);
            result
        })
    }

    fn winnings(&self, id: u64, user: Address) -> BoxFuture<'_, Result<U256, LedgerError>> {
        Box::pin(async move {
            self.calls.winnings.fetch_add(1, Ordering::SeqCst);
            let s = self.state();
            if s.fail_winnings.contains(&id) {
                return Err(Self::transport("winnings", id));
            }
            Ok(s.winnings.get(&(id, user)).copied().unwrap_or_default())
        })
    }

    fn submit_wager(
        &self,
        id: u64,
        option: BetOption,
        amount: U256,
    ) -> BoxFuture<'_, Result<TxHandle, LedgerError>> {
        Box::pin(async move {
            let signer = self.signer.ok_or(LedgerError::ReadOnly)?;
            let mut s = self.state();
            let stake = s.stakes.entry((id, signer, option)).or_default();
            *stake += amount;
            if let Some(raw) = s.records.get_mut(id as usize) {
                raw.total_pool += amount;
                match option {
                    BetOption::OptionA => raw.option1_pool += amount,
                    BetOption::OptionB => raw.option2_pool += amount,
                }
            }
            s.tx_counter += 1;
            Ok::<_, LedgerError>(TxHandle(TxHash::with_last_byte(s.tx_counter)))
        })
    }

    fn submit_record(&self, description: String) -> BoxFuture<'_, Result<TxHandle, LedgerError>> {
        Box::pin(async move {
            let signer = self.signer.ok_or(LedgerError::ReadOnly)?;
            let mut s = self.state();
            let mut raw = raw_record(&description, 0, 0);
            raw.creator = signer;
            s.records.push(raw);
            s.tx_counter += 1;
            Ok::<_, LedgerError>(TxHandle(TxHash::with_last_byte(s.tx_counter)))
        })
    }

    fn await_confirmation(&self, _tx: TxHandle) -> BoxFuture<'_, Result<(), LedgerError>> {
        Box::pin(async { Ok(()) })
    }

    fn signer_address(&self) -> Option<Address> {
        self.signer
    }
}

/// Coordinator over `ledger` with a fresh store.
#[allow(dead_code)]
pub fn coordinator(
    ledger: Arc<FakeLedger>,
    address: Option<Address>,
    concurrency: usize,
) -> RefreshCoordinator {
    coordinator_with_timeout(ledger, address, concurrency, CALL_TIMEOUT)
}

#[allow(dead_code)]
pub fn coordinator_with_timeout(
    ledger: Arc<FakeLedger>,
    address: Option<Address>,
    concurrency: usize,
    call_timeout: Duration,
) -> RefreshCoordinator {
    RefreshCoordinator::new(
        ledger,
        Session::new(address),
        PortfolioStore::new(),
        concurrency,
        call_timeout,
    )
}
