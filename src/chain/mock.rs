//! In-memory core chain used by unit tests.
//!
//! `FakeCore` implements every chain trait. Reads of the pool summary and the
//! native balance pop scripted values (the last one sticks), writes are
//! recorded in order, and a write only returns after a simulated finality
//! delay. Any read observed while a write is still in flight is counted as an
//! ordering violation.

use async_trait::async_trait;
use parking_lot::{Mutex, MutexGuard};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use crate::bridge::PoolSummary;
use crate::chain::{
    BridgeContract, Drip, EpochRewards, OracleContract, PosAccount, PosReader, PosStatus, TxReceipt,
};
use crate::error::{AppResult, ChainError};
use crate::oracle::{AccountStatus, RewardRecord};

/// A write recorded by the fake
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Submitted {
    TransferFromEspace,
    ClaimReward,
    HandleRedeem,
    UnstakeVotes(u64),
    StakeVotes,
    RewardInfo(RewardRecord),
    AccountInfo(AccountStatus),
}

/// Injected failure, keyed by contract/RPC method name
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Failure {
    /// Every read of the method fails
    Read(&'static str),
    /// Reads of the method fail once it has been read this many times
    ReadAfter(&'static str, usize),
    /// Submissions of the method fail before reaching the chain
    Submit(&'static str),
    /// Submissions of the method execute but revert
    Revert(&'static str),
}

#[derive(Debug, Default)]
pub struct FakeState {
    pub mapped_balance: Drip,
    pub pool_reward: Drip,
    pub acc_rewards: VecDeque<Drip>,
    pub redeem_len: u64,
    pub total_redeemed: Drip,
    pub stake_able: Drip,
    pub summaries: VecDeque<PoolSummary>,
    pub balances: VecDeque<Drip>,
    pub pos_epoch: u64,
    pub rewards: HashMap<u64, EpochRewards>,
    pub accounts: HashMap<String, PosAccount>,
    pub failures: Vec<Failure>,
    reads: HashMap<&'static str, usize>,
    submitted: Vec<Submitted>,
}

impl FakeState {
    fn read(&mut self, method: &'static str) -> AppResult<()> {
        let count = self.reads.entry(method).or_insert(0);
        let seen = *count;
        *count += 1;

        let fails = self.failures.iter().any(|f| match f {
            Failure::Read(m) => *m == method,
            Failure::ReadAfter(m, n) => *m == method && seen >= *n,
            _ => false,
        });
        if fails {
            return Err(ChainError::Transport(format!("injected read failure: {}", method)).into());
        }
        Ok(())
    }
}

fn next_sticky<T: Copy + Default>(queue: &mut VecDeque<T>) -> T {
    if queue.len() > 1 {
        queue.pop_front().unwrap_or_default()
    } else {
        queue.front().copied().unwrap_or_default()
    }
}

pub struct FakeCore {
    state: Mutex<FakeState>,
    finality_delay: Duration,
    in_flight: AtomicBool,
    violations: AtomicUsize,
    tx_counter: AtomicUsize,
}

impl FakeCore {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(FakeState::default()),
            finality_delay: Duration::from_millis(5),
            in_flight: AtomicBool::new(false),
            violations: AtomicUsize::new(0),
            tx_counter: AtomicUsize::new(0),
        }
    }

    pub fn state(&self) -> MutexGuard<'_, FakeState> {
        self.state.lock()
    }

    pub fn submitted(&self) -> Vec<Submitted> {
        self.state.lock().submitted.clone()
    }

    /// Reads that happened while a write was still awaiting finality
    pub fn ordering_violations(&self) -> usize {
        self.violations.load(Ordering::SeqCst)
    }

    pub fn reads_of(&self, method: &str) -> usize {
        self.state.lock().reads.get(method).copied().unwrap_or(0)
    }

    fn read<T>(&self, method: &'static str, f: impl FnOnce(&mut FakeState) -> T) -> AppResult<T> {
        if self.in_flight.load(Ordering::SeqCst) {
            self.violations.fetch_add(1, Ordering::SeqCst);
        }
        let mut state = self.state.lock();
        state.read(method)?;
        Ok(f(&mut state))
    }

    async fn submit(&self, method: &'static str, action: Submitted) -> AppResult<TxReceipt> {
        let (fails, reverts) = {
            let state = self.state.lock();
            (
                state.failures.contains(&Failure::Submit(method)),
                state.failures.contains(&Failure::Revert(method)),
            )
        };
        if fails {
            return Err(ChainError::Rpc {
                method: method.to_string(),
                code: -32000,
                message: "injected submit failure".to_string(),
            }
            .into());
        }

        self.in_flight.store(true, Ordering::SeqCst);
        tokio::time::sleep(self.finality_delay).await;
        self.state.lock().submitted.push(action);
        self.in_flight.store(false, Ordering::SeqCst);

        let n = self.tx_counter.fetch_add(1, Ordering::SeqCst);
        Ok(TxReceipt {
            transaction_hash: format!("0xfake{:04}", n),
            outcome_status: u64::from(reverts),
            epoch_number: Some(n as u64),
        })
    }
}

#[async_trait]
impl BridgeContract for FakeCore {
    async fn mapped_balance(&self) -> AppResult<Drip> {
        self.read("mappedBalance", |s| s.mapped_balance)
    }

    async fn pool_reward(&self) -> AppResult<Drip> {
        self.read("poolReward", |s| s.pool_reward)
    }

    async fn pool_acc_reward(&self) -> AppResult<Drip> {
        self.read("poolAccReward", |s| next_sticky(&mut s.acc_rewards))
    }

    async fn espace_redeem_len(&self) -> AppResult<u64> {
        self.read("eSpaceRedeemLen", |s| s.redeem_len)
    }

    async fn espace_pool_total_redeemed(&self) -> AppResult<Drip> {
        self.read("eSpacePoolTotalRedeemed", |s| s.total_redeemed)
    }

    async fn stake_able_balance(&self) -> AppResult<Drip> {
        self.read("stakeAbleBalance", |s| s.stake_able)
    }

    async fn pool_summary(&self) -> AppResult<PoolSummary> {
        self.read("poolSummary", |s| next_sticky(&mut s.summaries))
    }

    async fn native_balance(&self) -> AppResult<Drip> {
        self.read("getBalance", |s| next_sticky(&mut s.balances))
    }

    async fn transfer_from_espace(&self) -> AppResult<TxReceipt> {
        self.submit("transferFromEspace", Submitted::TransferFromEspace).await
    }

    async fn claim_reward(&self) -> AppResult<TxReceipt> {
        self.submit("claimReward", Submitted::ClaimReward).await
    }

    async fn handle_redeem(&self) -> AppResult<TxReceipt> {
        self.submit("handleRedeem", Submitted::HandleRedeem).await
    }

    async fn unstake_votes(&self, votes: u64) -> AppResult<TxReceipt> {
        self.submit("unstakeVotes", Submitted::UnstakeVotes(votes)).await
    }

    async fn stake_votes(&self) -> AppResult<TxReceipt> {
        self.submit("stakeVotes", Submitted::StakeVotes).await
    }
}

#[async_trait]
impl PosReader for FakeCore {
    async fn pos_status(&self) -> AppResult<PosStatus> {
        self.read("pos_getStatus", |s| PosStatus { epoch: s.pos_epoch })
    }

    async fn rewards_by_epoch(&self, epoch: u64) -> AppResult<Option<EpochRewards>> {
        self.read("pos_getRewardsByEpoch", |s| s.rewards.get(&epoch).cloned())
    }

    async fn account(&self, address: &str) -> AppResult<Option<PosAccount>> {
        self.read("pos_getAccount", |s| s.accounts.get(address).cloned())
    }
}

#[async_trait]
impl OracleContract for FakeCore {
    async fn update_pos_reward_info(&self, record: &RewardRecord) -> AppResult<TxReceipt> {
        self.submit("updatePoSRewardInfo", Submitted::RewardInfo(record.clone()))
            .await
    }

    async fn update_pos_account_info(&self, status: &AccountStatus) -> AppResult<TxReceipt> {
        self.submit("updatePoSAccountInfo", Submitted::AccountInfo(status.clone()))
            .await
    }
}
