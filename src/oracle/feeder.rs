use serde::Serialize;
use std::sync::Arc;
use tracing::{info, instrument, warn};

use crate::chain::{OracleContract, PosReader, TxReceipt};
use crate::error::AppResult;
use crate::oracle::{AccountStatus, RewardRecord};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum RewardPublish {
    Published { epoch: u64, tx_hash: String, success: bool },
    /// The node has no reward data for the epoch
    NoRewardData { epoch: u64 },
    /// The epoch paid nothing to the pool
    NotFound { epoch: u64 },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum AccountPublish {
    Published { epoch: u64, tx_hash: String, success: bool },
    NoAccount,
}

/// Republishes the pool validator's PoS reward and account status to the
/// oracle contract
pub struct OracleFeeder {
    pos: Arc<dyn PosReader>,
    oracle: Arc<dyn OracleContract>,
    pool_address: String,
    pos_account: String,
}

impl OracleFeeder {
    pub fn new(
        pos: Arc<dyn PosReader>,
        oracle: Arc<dyn OracleContract>,
        pool_address: impl Into<String>,
        pos_account: impl Into<String>,
    ) -> Self {
        Self {
            pos,
            oracle,
            pool_address: pool_address.into(),
            pos_account: pos_account.into(),
        }
    }

    /// Publish the pool's reward for `epoch`, defaulting to the last
    /// completed epoch
    #[instrument(skip(self))]
    pub async fn publish_reward(&self, epoch: Option<u64>) -> AppResult<RewardPublish> {
        let epoch = match epoch {
            Some(epoch) => epoch,
            None => self.pos.pos_status().await?.epoch.saturating_sub(1),
        };
        info!(epoch, "🔄 Updating epoch reward info");

        let Some(rewards) = self.pos.rewards_by_epoch(epoch).await? else {
            info!(epoch, "⏭️ No reward data for epoch");
            return Ok(RewardPublish::NoRewardData { epoch });
        };

        let Some(entry) = rewards.find_by_linked(&self.pool_address) else {
            info!(epoch, pool = %self.pool_address, "⏭️ No reward info for pool");
            return Ok(RewardPublish::NotFound { epoch });
        };

        let record = RewardRecord::from_entry(epoch, entry);
        let receipt = self.oracle.update_pos_reward_info(&record).await?;
        log_receipt("updatePoSRewardInfo", epoch, &receipt);

        Ok(RewardPublish::Published {
            epoch,
            success: receipt.is_success(),
            tx_hash: receipt.transaction_hash,
        })
    }

    /// Publish the validator account status observed at the current epoch
    #[instrument(skip(self))]
    pub async fn publish_account(&self) -> AppResult<AccountPublish> {
        let epoch = self.pos.pos_status().await?.epoch;

        let Some(account) = self.pos.account(&self.pos_account).await? else {
            info!(account = %self.pos_account, "⏭️ PoS account not found");
            return Ok(AccountPublish::NoAccount);
        };

        let status = AccountStatus::from_account(account, epoch);
        let receipt = self.oracle.update_pos_account_info(&status).await?;
        log_receipt("updatePoSAccountInfo", epoch, &receipt);

        Ok(AccountPublish::Published {
            epoch,
            success: receipt.is_success(),
            tx_hash: receipt.transaction_hash,
        })
    }
}

fn log_receipt(method: &str, epoch: u64, receipt: &TxReceipt) {
    if receipt.is_success() {
        info!(epoch, tx_hash = %receipt.transaction_hash, "✓ {} {}", method, receipt.status_label());
    } else {
        warn!(epoch, tx_hash = %receipt.transaction_hash, "⚠️ {} {}", method, receipt.status_label());
    }
}
