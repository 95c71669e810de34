use std::sync::Arc;
use tracing::{debug, instrument};

use crate::bridge::{format_cfx, BridgeState};
use crate::chain::BridgeContract;
use crate::error::AppResult;

/// Reads the bridge's observable state for one decision cycle.
///
/// Reads are issued one after another with no retries; the first failure
/// aborts the fetch and with it the cycle.
pub struct SnapshotFetcher {
    bridge: Arc<dyn BridgeContract>,
}

impl SnapshotFetcher {
    pub fn new(bridge: Arc<dyn BridgeContract>) -> Self {
        Self { bridge }
    }

    #[instrument(skip(self))]
    pub async fn fetch(&self) -> AppResult<BridgeState> {
        let state = BridgeState {
            mapped_balance: self.bridge.mapped_balance().await?,
            pool_reward: self.bridge.pool_reward().await?,
            pool_acc_reward: self.bridge.pool_acc_reward().await?,
            espace_redeem_len: self.bridge.espace_redeem_len().await?,
            espace_pool_total_redeemed: self.bridge.espace_pool_total_redeemed().await?,
            stake_able_balance: self.bridge.stake_able_balance().await?,
            pool_summary: self.bridge.pool_summary().await?,
            balance: self.bridge.native_balance().await?,
        };

        debug!(
            mapped_balance = %format_cfx(state.mapped_balance),
            pool_reward = %format_cfx(state.pool_reward),
            acc_reward = %format_cfx(state.pool_acc_reward),
            redeem_len = state.espace_redeem_len,
            total_redeemed = %format_cfx(state.espace_pool_total_redeemed),
            stake_able = %format_cfx(state.stake_able_balance),
            balance = %format_cfx(state.balance),
            votes = state.pool_summary.votes,
            available = state.pool_summary.available,
            locked = state.pool_summary.locked,
            unlocked = state.pool_summary.unlocked,
            "📊 Bridge snapshot"
        );

        Ok(state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bridge::PoolSummary;
    use crate::chain::mock::{FakeCore, Failure};

    #[tokio::test]
    async fn test_fetch_reads_every_field() {
        let core = Arc::new(FakeCore::new());
        {
            let mut state = core.state();
            state.mapped_balance = 5;
            state.pool_reward = 6;
            state.acc_rewards.push_back(7);
            state.redeem_len = 2;
            state.total_redeemed = 9;
            state.stake_able = 10;
            state.summaries.push_back(PoolSummary {
                votes: 4,
                available: 1,
                locked: 2,
                unlocked: 1,
            });
            state.balances.push_back(11);
        }

        let snapshot = SnapshotFetcher::new(core.clone()).fetch().await.unwrap();

        assert_eq!(snapshot.mapped_balance, 5);
        assert_eq!(snapshot.pool_reward, 6);
        assert_eq!(snapshot.pool_acc_reward, 7);
        assert_eq!(snapshot.espace_redeem_len, 2);
        assert_eq!(snapshot.espace_pool_total_redeemed, 9);
        assert_eq!(snapshot.stake_able_balance, 10);
        assert_eq!(snapshot.pool_summary.votes, 4);
        assert_eq!(snapshot.balance, 11);
        assert!(core.submitted().is_empty());
    }

    #[tokio::test]
    async fn test_read_failure_aborts_fetch() {
        let core = Arc::new(FakeCore::new());
        core.state().failures.push(Failure::Read("poolSummary"));

        let result = SnapshotFetcher::new(core.clone()).fetch().await;

        assert!(result.is_err());
        assert!(core.submitted().is_empty());
    }
}
