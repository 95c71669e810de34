// PoS status RPC (`pos_*` namespace) wire types
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use crate::chain::address::parse_core_address;
use crate::chain::quantity;
use crate::chain::rpc::JsonRpcClient;
use crate::chain::{Drip, PosReader};
use crate::error::AppResult;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PosStatus {
    #[serde(deserialize_with = "quantity::de_u64")]
    pub epoch: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EpochRewards {
    #[serde(default)]
    pub account_rewards: Vec<AccountReward>,
}

impl EpochRewards {
    /// Entry whose linked core-space address is `pool`.
    ///
    /// Addresses are compared as raw bytes so hex, simple and verbose base32
    /// forms of the same account match; anything that does not parse falls
    /// back to case-insensitive text comparison.
    pub fn find_by_linked(&self, pool: &str) -> Option<&AccountReward> {
        let pool_bytes = parse_core_address(pool).ok();
        self.account_rewards.iter().find(|r| {
            match (pool_bytes, parse_core_address(&r.pow_address).ok()) {
                (Some(pool), Some(linked)) => pool == linked,
                _ => r.pow_address.eq_ignore_ascii_case(pool),
            }
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountReward {
    /// Validator address on the PoS chain
    pub pos_address: String,
    /// Core-space address the reward is paid to
    pub pow_address: String,
    #[serde(deserialize_with = "quantity::de_u128")]
    pub reward: Drip,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PosAccount {
    pub address: String,
    #[serde(deserialize_with = "quantity::de_u64")]
    pub block_number: u64,
    pub status: PosAccountStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PosAccountStatus {
    #[serde(deserialize_with = "quantity::de_u64")]
    pub available_votes: u64,
    #[serde(deserialize_with = "quantity::de_u64")]
    pub unlocked: u64,
    #[serde(deserialize_with = "quantity::de_u64")]
    pub locked: u64,
    #[serde(deserialize_with = "quantity::de_u64")]
    pub forfeited: u64,
    /// Block the account was force-retired at, if ever
    #[serde(default, deserialize_with = "quantity::de_opt_u64")]
    pub force_retired: Option<u64>,
    #[serde(default)]
    pub in_queue: Vec<VotesInQueue>,
    #[serde(default)]
    pub out_queue: Vec<VotesInQueue>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VotesInQueue {
    #[serde(deserialize_with = "quantity::de_u64")]
    pub end_block_number: u64,
    #[serde(deserialize_with = "quantity::de_u64")]
    pub power: u64,
}

#[async_trait]
impl PosReader for JsonRpcClient {
    async fn pos_status(&self) -> AppResult<PosStatus> {
        self.request_required("pos_getStatus", json!([])).await
    }

    async fn rewards_by_epoch(&self, epoch: u64) -> AppResult<Option<EpochRewards>> {
        debug!(epoch, "Fetching PoS rewards");
        self.request("pos_getRewardsByEpoch", json!([format!("{:#x}", epoch)]))
            .await
    }

    async fn account(&self, address: &str) -> AppResult<Option<PosAccount>> {
        self.request("pos_getAccount", json!([address])).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_status() {
        let status: PosStatus = serde_json::from_value(json!({
            "epoch": "0x2a",
            "latestCommitted": "0x1000",
            "latestVoted": null
        }))
        .unwrap();
        assert_eq!(status.epoch, 42);
    }

    #[test]
    fn test_decode_rewards_and_match_pool() {
        let rewards: EpochRewards = serde_json::from_value(json!({
            "powEpochHash": "0x00",
            "accountRewards": [
                {
                    "posAddress": "0xaa",
                    "powAddress": "CFX:TYPE.CONTRACT:ACC7UAWF5UBTNMEZVHU9DHC6SGHEA0403Y2DGPYFJP",
                    "reward": "0x3635c9adc5dea00000"
                },
                { "posAddress": "0xdd", "powAddress": "cfx:other", "reward": "0x1" }
            ]
        }))
        .unwrap();

        let found = rewards
            .find_by_linked("cfx:type.contract:acc7uawf5ubtnmezvhu9dhc6sghea0403y2dgpyfjp")
            .unwrap();
        assert_eq!(found.pos_address, "0xaa");
        assert_eq!(found.reward, 1_000_000_000_000_000_000_000);
        assert!(rewards.find_by_linked("cfx:missing").is_none());
    }

    #[test]
    fn test_match_pool_across_address_forms() {
        let rewards = EpochRewards {
            account_rewards: vec![AccountReward {
                pos_address: "0xaa".to_string(),
                pow_address: "cfx:acc7uawf5ubtnmezvhu9dhc6sghea0403y2dgpyfjp".to_string(),
                reward: 42,
            }],
        };

        for pool in [
            "0x85d80245dc02f5a89589e1f19c5c718e405b56cd",
            "0x85D80245DC02F5A89589E1F19C5C718E405B56CD",
            "cfx:type.contract:acc7uawf5ubtnmezvhu9dhc6sghea0403y2dgpyfjp",
        ] {
            assert_eq!(rewards.find_by_linked(pool).map(|r| r.reward), Some(42), "pool {}", pool);
        }
        assert!(rewards
            .find_by_linked("0x85d80245dc02f5a89589e1f19c5c718e405b56ce")
            .is_none());
    }

    #[test]
    fn test_rewards_without_list() {
        let rewards: EpochRewards = serde_json::from_value(json!({ "powEpochHash": "0x00" })).unwrap();
        assert!(rewards.account_rewards.is_empty());
    }

    #[test]
    fn test_decode_account() {
        let account: PosAccount = serde_json::from_value(json!({
            "address": "0x0b",
            "blockNumber": "0x64",
            "status": {
                "availableVotes": "0xa",
                "unlocked": "0x1",
                "locked": "0x2",
                "forfeited": "0x0",
                "forceRetired": null,
                "inQueue": [{ "endBlockNumber": "0x70", "power": "0x3" }],
                "outQueue": []
            }
        }))
        .unwrap();

        assert_eq!(account.block_number, 100);
        assert_eq!(account.status.available_votes, 10);
        assert_eq!(account.status.force_retired, None);
        assert_eq!(
            account.status.in_queue,
            vec![VotesInQueue { end_block_number: 112, power: 3 }]
        );
        assert!(account.status.out_queue.is_empty());
    }

    #[test]
    fn test_decode_force_retired_account() {
        let account: PosAccount = serde_json::from_value(json!({
            "address": "0x0b",
            "blockNumber": "0x1",
            "status": {
                "availableVotes": "0x0",
                "unlocked": "0x0",
                "locked": "0x0",
                "forfeited": "0x5",
                "forceRetired": "0x9"
            }
        }))
        .unwrap();

        assert_eq!(account.status.force_retired, Some(9));
        assert_eq!(account.status.forfeited, 5);
    }
}
