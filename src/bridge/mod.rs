// Bridge liquidity reconciliation
pub mod controller;
pub mod snapshot;

pub use controller::{
    ActionOutcome, ActionStatus, BridgeAction, CycleReport, RedeemReason, ReconciliationController,
};
pub use snapshot::SnapshotFetcher;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::chain::Drip;
use crate::error::{AppError, AppResult};

/// Drip per CFX
pub const DRIP_PER_CFX: Drip = 1_000_000_000_000_000_000;

/// CFX represented by one staking vote
pub const DEFAULT_VOTE_UNIT_CFX: u64 = 1000;

/// Staking position of the bridge in the PoS pool, in vote units
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolSummary {
    /// Total votes ever delegated and not yet withdrawn
    pub votes: u64,
    /// Votes free to unstake
    pub available: u64,
    /// Votes currently locked
    pub locked: u64,
    /// Votes that finished unlocking and can be withdrawn
    pub unlocked: u64,
}

impl PoolSummary {
    /// Votes requested to unstake that have not finished unlocking yet.
    ///
    /// Fails when `available + unlocked > votes`, which valid chain state never
    /// produces.
    pub fn unlocking(&self) -> AppResult<u64> {
        self.available
            .checked_add(self.unlocked)
            .and_then(|claimed| self.votes.checked_sub(claimed))
            .ok_or(AppError::InconsistentPoolSummary {
                votes: self.votes,
                available: self.available,
                unlocked: self.unlocked,
            })
    }
}

/// Everything one reconciliation cycle decides from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BridgeState {
    /// Value bridged from eSpace waiting to be transferred in
    pub mapped_balance: Drip,
    /// Claimable pool reward
    pub pool_reward: Drip,
    /// Reward accrued over the bridge's lifetime
    pub pool_acc_reward: Drip,
    /// Outstanding eSpace redemption requests
    pub espace_redeem_len: u64,
    /// Total value owed to eSpace redeemers
    pub espace_pool_total_redeemed: Drip,
    /// Idle balance eligible for staking
    pub stake_able_balance: Drip,
    pub pool_summary: PoolSummary,
    /// Native balance of the bridge contract
    pub balance: Drip,
}

/// Fixed exchange rate between votes and drip
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VoteUnit(Drip);

impl VoteUnit {
    pub fn from_cfx(cfx: u64) -> Self {
        Self(Drip::from(cfx) * DRIP_PER_CFX)
    }

    pub const fn from_drip(drip: Drip) -> Self {
        Self(drip)
    }

    pub fn drip(&self) -> Drip {
        self.0
    }

    /// Drip value of `votes`
    pub fn value_of(&self, votes: u64) -> Drip {
        Drip::from(votes).saturating_mul(self.0)
    }

    /// Votes needed to cover `shortfall`, rounded up so the result never
    /// under-provisions: `votes_for(s) * unit >= s`.
    pub fn votes_for(&self, shortfall: Drip) -> u64 {
        if self.0 == 0 {
            return 0;
        }
        u64::try_from(shortfall.div_ceil(self.0)).unwrap_or(u64::MAX)
    }
}

impl Default for VoteUnit {
    fn default() -> Self {
        Self::from_cfx(DEFAULT_VOTE_UNIT_CFX)
    }
}

/// Render a drip amount as CFX for log lines
pub fn format_cfx(drip: Drip) -> String {
    i128::try_from(drip)
        .ok()
        .and_then(|d| Decimal::try_from_i128_with_scale(d, 18).ok())
        .map(|cfx| cfx.normalize().to_string())
        .unwrap_or_else(|| format!("{} drip", drip))
}
