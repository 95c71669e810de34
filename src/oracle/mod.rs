// PoS oracle feeding: republish validator reward and account telemetry
pub mod feeder;

pub use feeder::{AccountPublish, OracleFeeder, RewardPublish};

use serde::Serialize;

use crate::chain::pos::{AccountReward, PosAccount, VotesInQueue};
use crate::chain::Drip;

/// Reward earned by the pool's validator in one PoS epoch
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RewardRecord {
    pub epoch: u64,
    /// PoS validator address
    pub validator_address: String,
    /// Core-space address the reward is mapped to
    pub linked_address: String,
    pub reward: Drip,
}

impl RewardRecord {
    pub fn from_entry(epoch: u64, entry: &AccountReward) -> Self {
        Self {
            epoch,
            validator_address: entry.pos_address.clone(),
            linked_address: entry.pow_address.clone(),
            reward: entry.reward,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct QueuedVotes {
    pub end_block_number: u64,
    pub power: u64,
}

impl From<VotesInQueue> for QueuedVotes {
    fn from(q: VotesInQueue) -> Self {
        Self {
            end_block_number: q.end_block_number,
            power: q.power,
        }
    }
}

/// Validator account status as republished to the oracle
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AccountStatus {
    pub address: String,
    /// PoS epoch the status was observed in
    pub epoch: u64,
    pub block_number: u64,
    pub available_votes: u64,
    pub unlocked: u64,
    pub locked: u64,
    pub forfeited: u64,
    pub force_retired: bool,
    pub in_queue: Vec<QueuedVotes>,
    pub out_queue: Vec<QueuedVotes>,
}

impl AccountStatus {
    pub fn from_account(account: PosAccount, epoch: u64) -> Self {
        let status = account.status;
        Self {
            address: account.address,
            epoch,
            block_number: account.block_number,
            available_votes: status.available_votes,
            unlocked: status.unlocked,
            locked: status.locked,
            forfeited: status.forfeited,
            force_retired: status.force_retired.is_some_and(|block| block != 0),
            in_queue: status.in_queue.into_iter().map(QueuedVotes::from).collect(),
            out_queue: status.out_queue.into_iter().map(QueuedVotes::from).collect(),
        }
    }
}
