// Contract bindings over the JSON-RPC client
use alloy_primitives::{Address, B256, U256};
use alloy_sol_types::{sol, SolCall};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::instrument;

use crate::bridge::PoolSummary;
use crate::chain::address::{parse_core_address, parse_pos_address};
use crate::chain::{BridgeContract, Drip, JsonRpcClient, OracleContract, TxReceipt};
use crate::error::{AppError, AppResult};
use crate::oracle::{AccountStatus, QueuedVotes, RewardRecord};

sol! {
    interface IDxCFXBridge {
        function mappedBalance() external view returns (uint256 amount);
        function poolReward() external view returns (uint256 amount);
        function poolAccReward() external view returns (uint256 amount);
        function eSpaceRedeemLen() external view returns (uint256 len);
        function eSpacePoolTotalRedeemed() external view returns (uint256 amount);
        function stakeAbleBalance() external view returns (uint256 amount);
        function poolSummary() external view returns (
            uint256 votes,
            uint256 available,
            uint256 locked,
            uint256 unlocked
        );

        function transferFromEspace() external;
        function claimReward() external;
        function handleRedeem() external;
        function unstakeVotes(uint64 votes) external;
        function stakeVotes() external;
    }

    interface IPoSOracle {
        struct VotesInQueue {
            uint64 endBlockNumber;
            uint64 power;
        }

        function updatePoSRewardInfo(
            uint256 epoch,
            address pool,
            bytes32 posAddress,
            uint256 reward
        ) external;

        function updatePoSAccountInfo(
            bytes32 posAddress,
            uint64 epoch,
            uint64 blockNumber,
            uint64 availableVotes,
            uint64 unlocked,
            uint64 locked,
            uint64 forfeited,
            bool forceRetired,
            VotesInQueue[] inQueue,
            VotesInQueue[] outQueue
        ) external;
    }
}

fn to_drip(method: &str, value: U256) -> AppResult<Drip> {
    u128::try_from(value).map_err(|_| AppError::Decode(format!("{} result {} overflows u128", method, value)))
}

fn to_u64(method: &str, value: U256) -> AppResult<u64> {
    u64::try_from(value).map_err(|_| AppError::Decode(format!("{} result {} overflows u64", method, value)))
}

/// The core-space bridge contract
pub struct RpcBridgeContract {
    rpc: Arc<JsonRpcClient>,
    address: String,
}

impl RpcBridgeContract {
    pub fn new(rpc: Arc<JsonRpcClient>, address: impl Into<String>) -> Self {
        Self {
            rpc,
            address: address.into(),
        }
    }

    async fn read<C: SolCall + Send>(&self, call: C) -> AppResult<C::Return> {
        let raw = self.rpc.call(&self.address, &call.abi_encode()).await?;
        Ok(C::abi_decode_returns(&raw, true)?)
    }

    async fn send<C: SolCall + Send>(&self, call: C) -> AppResult<TxReceipt> {
        self.rpc.send_and_wait(&self.address, call.abi_encode()).await
    }
}

#[async_trait]
impl BridgeContract for RpcBridgeContract {
    async fn mapped_balance(&self) -> AppResult<Drip> {
        let ret = self.read(IDxCFXBridge::mappedBalanceCall {}).await?;
        to_drip("mappedBalance", ret.amount)
    }

    async fn pool_reward(&self) -> AppResult<Drip> {
        let ret = self.read(IDxCFXBridge::poolRewardCall {}).await?;
        to_drip("poolReward", ret.amount)
    }

    async fn pool_acc_reward(&self) -> AppResult<Drip> {
        let ret = self.read(IDxCFXBridge::poolAccRewardCall {}).await?;
        to_drip("poolAccReward", ret.amount)
    }

    async fn espace_redeem_len(&self) -> AppResult<u64> {
        let ret = self.read(IDxCFXBridge::eSpaceRedeemLenCall {}).await?;
        to_u64("eSpaceRedeemLen", ret.len)
    }

    async fn espace_pool_total_redeemed(&self) -> AppResult<Drip> {
        let ret = self.read(IDxCFXBridge::eSpacePoolTotalRedeemedCall {}).await?;
        to_drip("eSpacePoolTotalRedeemed", ret.amount)
    }

    async fn stake_able_balance(&self) -> AppResult<Drip> {
        let ret = self.read(IDxCFXBridge::stakeAbleBalanceCall {}).await?;
        to_drip("stakeAbleBalance", ret.amount)
    }

    async fn pool_summary(&self) -> AppResult<PoolSummary> {
        let raw = self
            .rpc
            .call(&self.address, &IDxCFXBridge::poolSummaryCall {}.abi_encode())
            .await?;
        decode_pool_summary(&raw)
    }

    async fn native_balance(&self) -> AppResult<Drip> {
        self.rpc.get_balance(&self.address).await
    }

    async fn transfer_from_espace(&self) -> AppResult<TxReceipt> {
        self.send(IDxCFXBridge::transferFromEspaceCall {}).await
    }

    async fn claim_reward(&self) -> AppResult<TxReceipt> {
        self.send(IDxCFXBridge::claimRewardCall {}).await
    }

    async fn handle_redeem(&self) -> AppResult<TxReceipt> {
        self.send(IDxCFXBridge::handleRedeemCall {}).await
    }

    async fn unstake_votes(&self, votes: u64) -> AppResult<TxReceipt> {
        self.send(IDxCFXBridge::unstakeVotesCall { votes }).await
    }

    async fn stake_votes(&self) -> AppResult<TxReceipt> {
        self.send(IDxCFXBridge::stakeVotesCall {}).await
    }
}

fn decode_pool_summary(raw: &[u8]) -> AppResult<PoolSummary> {
    let ret = <IDxCFXBridge::poolSummaryCall as SolCall>::abi_decode_returns(raw, true)
        .map_err(|e| AppError::Decode(format!("poolSummary decode failed: {}", e)))?;
    Ok(PoolSummary {
        votes: to_u64("poolSummary", ret.votes)?,
        available: to_u64("poolSummary", ret.available)?,
        locked: to_u64("poolSummary", ret.locked)?,
        unlocked: to_u64("poolSummary", ret.unlocked)?,
    })
}

/// The PoS oracle contract
pub struct RpcOracleContract {
    rpc: Arc<JsonRpcClient>,
    address: String,
}

impl RpcOracleContract {
    pub fn new(rpc: Arc<JsonRpcClient>, address: impl Into<String>) -> Self {
        Self {
            rpc,
            address: address.into(),
        }
    }
}

#[async_trait]
impl OracleContract for RpcOracleContract {
    #[instrument(skip(self, record), fields(epoch = record.epoch))]
    async fn update_pos_reward_info(&self, record: &RewardRecord) -> AppResult<TxReceipt> {
        let data = reward_info_call(record)?.abi_encode();
        self.rpc.send_and_wait(&self.address, data).await
    }

    #[instrument(skip(self, status), fields(epoch = status.epoch))]
    async fn update_pos_account_info(&self, status: &AccountStatus) -> AppResult<TxReceipt> {
        let data = account_info_call(status)?.abi_encode();
        self.rpc.send_and_wait(&self.address, data).await
    }
}

// The deployed oracle takes the linked pool before the validator
fn reward_info_call(record: &RewardRecord) -> AppResult<IPoSOracle::updatePoSRewardInfoCall> {
    Ok(IPoSOracle::updatePoSRewardInfoCall {
        epoch: U256::from(record.epoch),
        pool: Address::from(parse_core_address(&record.linked_address)?),
        posAddress: B256::from(parse_pos_address(&record.validator_address)?),
        reward: U256::from(record.reward),
    })
}

fn queue(votes: &[QueuedVotes]) -> Vec<IPoSOracle::VotesInQueue> {
    votes
        .iter()
        .map(|q| IPoSOracle::VotesInQueue {
            endBlockNumber: q.end_block_number,
            power: q.power,
        })
        .collect()
}

fn account_info_call(status: &AccountStatus) -> AppResult<IPoSOracle::updatePoSAccountInfoCall> {
    Ok(IPoSOracle::updatePoSAccountInfoCall {
        posAddress: B256::from(parse_pos_address(&status.address)?),
        epoch: status.epoch,
        blockNumber: status.block_number,
        availableVotes: status.available_votes,
        unlocked: status.unlocked,
        locked: status.locked,
        forfeited: status.forfeited,
        forceRetired: status.force_retired,
        inQueue: queue(&status.in_queue),
        outQueue: queue(&status.out_queue),
    })
}
