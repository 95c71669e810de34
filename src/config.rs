use config::{Environment, Source};
use serde::Deserialize;
use std::time::Duration;

use crate::bridge::VoteUnit;
use crate::chain::address::{parse_core_address, parse_pos_address};
use crate::chain::RpcConfig;
use crate::error::{AppError, AppResult};
use crate::scheduler::ScheduleConfig;

#[derive(Debug, Deserialize, Clone)]
pub struct KeeperConfig {
    pub cfx_rpc_url: String,
    /// Bridge contract on core space
    pub core_bridge: String,
    /// Pool core-space address, matched against reward entries
    pub pos_pool: String,
    /// Validator account on the PoS chain
    pub pos_pool_pos_account: String,
    pub pos_oracle: String,
    /// Node-managed account transactions are sent from
    pub operator_address: String,
    pub vote_unit_cfx: u64,
    pub reconcile_interval_secs: u64,
    pub reward_interval_secs: u64,
    pub account_interval_secs: u64,
    pub receipt_poll_millis: u64,
    pub receipt_timeout_secs: u64,
    pub rpc_timeout_secs: u64,
    pub reconcile_enabled: bool,
    pub oracle_enabled: bool,
}

impl KeeperConfig {
    pub fn from_env() -> AppResult<Self> {
        Self::from_source(Environment::default().try_parsing(true))
    }

    pub fn from_source<S>(source: S) -> AppResult<Self>
    where
        S: Source + Send + Sync + 'static,
    {
        let config: Self = config::Config::builder()
            .set_default("cfx_rpc_url", "https://test.confluxrpc.com")?
            .set_default("vote_unit_cfx", 1000)?
            .set_default("reconcile_interval_secs", 120)?
            .set_default("reward_interval_secs", 930)?
            .set_default("account_interval_secs", 810)?
            .set_default("receipt_poll_millis", 1000)?
            .set_default("receipt_timeout_secs", 300)?
            .set_default("rpc_timeout_secs", 30)?
            .set_default("reconcile_enabled", true)?
            .set_default("oracle_enabled", true)?
            .add_source(source)
            .build()?
            .try_deserialize()?;

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> AppResult<()> {
        for (key, value) in [
            ("CFX_RPC_URL", &self.cfx_rpc_url),
            ("CORE_BRIDGE", &self.core_bridge),
            ("POS_POOL", &self.pos_pool),
            ("POS_POOL_POS_ACCOUNT", &self.pos_pool_pos_account),
            ("POS_ORACLE", &self.pos_oracle),
            ("OPERATOR_ADDRESS", &self.operator_address),
        ] {
            if value.trim().is_empty() {
                return Err(AppError::Config(format!("{} must not be empty", key)));
            }
        }

        parse_core_address(&self.core_bridge)?;
        parse_core_address(&self.pos_pool)?;
        parse_core_address(&self.pos_oracle)?;
        parse_core_address(&self.operator_address)?;
        parse_pos_address(&self.pos_pool_pos_account)?;

        if self.vote_unit_cfx == 0 {
            return Err(AppError::Config("VOTE_UNIT_CFX must be positive".to_string()));
        }

        for (key, value) in [
            ("RECONCILE_INTERVAL_SECS", self.reconcile_interval_secs),
            ("REWARD_INTERVAL_SECS", self.reward_interval_secs),
            ("ACCOUNT_INTERVAL_SECS", self.account_interval_secs),
            ("RECEIPT_POLL_MILLIS", self.receipt_poll_millis),
            ("RECEIPT_TIMEOUT_SECS", self.receipt_timeout_secs),
            ("RPC_TIMEOUT_SECS", self.rpc_timeout_secs),
        ] {
            if value == 0 {
                return Err(AppError::Config(format!("{} must be positive", key)));
            }
        }

        Ok(())
    }

    pub fn vote_unit(&self) -> VoteUnit {
        VoteUnit::from_cfx(self.vote_unit_cfx)
    }

    pub fn rpc(&self) -> RpcConfig {
        RpcConfig {
            url: self.cfx_rpc_url.clone(),
            operator: self.operator_address.clone(),
            request_timeout: Duration::from_secs(self.rpc_timeout_secs),
            receipt_poll_interval: Duration::from_millis(self.receipt_poll_millis),
            receipt_timeout: Duration::from_secs(self.receipt_timeout_secs),
        }
    }

    pub fn schedule(&self) -> ScheduleConfig {
        ScheduleConfig {
            reconcile_interval: Duration::from_secs(self.reconcile_interval_secs),
            reward_interval: Duration::from_secs(self.reward_interval_secs),
            account_interval: Duration::from_secs(self.account_interval_secs),
            reconcile_enabled: self.reconcile_enabled,
            oracle_enabled: self.oracle_enabled,
        }
    }
}
