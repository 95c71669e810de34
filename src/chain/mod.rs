pub mod address;
pub mod contracts;
pub mod pos;
pub mod rpc;

#[cfg(test)]
pub mod mock;

pub use contracts::{RpcBridgeContract, RpcOracleContract};
pub use pos::{EpochRewards, PosAccount, PosStatus};
pub use rpc::{JsonRpcClient, RpcConfig};

use async_trait::async_trait;
use serde::Deserialize;

use crate::bridge::PoolSummary;
use crate::error::AppResult;
use crate::oracle::{AccountStatus, RewardRecord};

/// Native amount in drip (10^-18 CFX)
pub type Drip = u128;

/// Execution receipt of a submitted transaction
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TxReceipt {
    pub transaction_hash: String,
    /// 0 = success, 1 = reverted, 2 = skipped
    #[serde(deserialize_with = "quantity::de_u64")]
    pub outcome_status: u64,
    #[serde(default, deserialize_with = "quantity::de_opt_u64")]
    pub epoch_number: Option<u64>,
}

impl TxReceipt {
    pub fn is_success(&self) -> bool {
        self.outcome_status == 0
    }

    pub fn status_label(&self) -> &'static str {
        if self.is_success() {
            "success"
        } else {
            "failed"
        }
    }
}

/// Bridge contract surface on core space.
///
/// Every write returns only after the transaction has been executed, so a read
/// issued after a write always observes its effect.
#[async_trait]
pub trait BridgeContract: Send + Sync {
    async fn mapped_balance(&self) -> AppResult<Drip>;

    async fn pool_reward(&self) -> AppResult<Drip>;

    async fn pool_acc_reward(&self) -> AppResult<Drip>;

    async fn espace_redeem_len(&self) -> AppResult<u64>;

    async fn espace_pool_total_redeemed(&self) -> AppResult<Drip>;

    async fn stake_able_balance(&self) -> AppResult<Drip>;

    async fn pool_summary(&self) -> AppResult<PoolSummary>;

    /// Native balance held by the bridge contract itself
    async fn native_balance(&self) -> AppResult<Drip>;

    async fn transfer_from_espace(&self) -> AppResult<TxReceipt>;

    async fn claim_reward(&self) -> AppResult<TxReceipt>;

    async fn handle_redeem(&self) -> AppResult<TxReceipt>;

    async fn unstake_votes(&self, votes: u64) -> AppResult<TxReceipt>;

    async fn stake_votes(&self) -> AppResult<TxReceipt>;
}

/// Read access to the PoS chain status RPC
#[async_trait]
pub trait PosReader: Send + Sync {
    async fn pos_status(&self) -> AppResult<PosStatus>;

    /// `None` when the node has no reward data for `epoch`
    async fn rewards_by_epoch(&self, epoch: u64) -> AppResult<Option<EpochRewards>>;

    /// `None` when the account is unknown
    async fn account(&self, address: &str) -> AppResult<Option<PosAccount>>;
}

/// PoS oracle contract writes
#[async_trait]
pub trait OracleContract: Send + Sync {
    async fn update_pos_reward_info(&self, record: &RewardRecord) -> AppResult<TxReceipt>;

    async fn update_pos_account_info(&self, status: &AccountStatus) -> AppResult<TxReceipt>;
}

/// Serde helpers for node quantities, which arrive as `0x` hex strings
/// (occasionally as plain JSON numbers).
pub mod quantity {
    use serde::{de::Error, Deserialize, Deserializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Number(u64),
    }

    pub fn parse(raw: &str) -> Result<u128, String> {
        let parsed = match raw.strip_prefix("0x") {
            Some("") => Ok(0),
            Some(hex) => u128::from_str_radix(hex, 16),
            None => raw.parse::<u128>(),
        };
        parsed.map_err(|e| format!("invalid quantity {:?}: {}", raw, e))
    }

    fn from_raw(raw: Raw) -> Result<u128, String> {
        match raw {
            Raw::Text(text) => parse(&text),
            Raw::Number(n) => Ok(u128::from(n)),
        }
    }

    pub fn de_u128<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u128, D::Error> {
        from_raw(Raw::deserialize(deserializer)?).map_err(D::Error::custom)
    }

    pub fn de_u64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
        let value = de_u128(deserializer)?;
        u64::try_from(value).map_err(|_| D::Error::custom(format!("quantity {} overflows u64", value)))
    }

    pub fn de_opt_u64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<u64>, D::Error> {
        match Option::<Raw>::deserialize(deserializer)? {
            None => Ok(None),
            Some(raw) => {
                let value = from_raw(raw).map_err(D::Error::custom)?;
                u64::try_from(value)
                    .map(Some)
                    .map_err(|_| D::Error::custom(format!("quantity {} overflows u64", value)))
            }
        }
    }
}
