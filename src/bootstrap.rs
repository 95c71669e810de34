use std::sync::Arc;
use tracing::info;

use crate::bridge::ReconciliationController;
use crate::chain::{JsonRpcClient, RpcBridgeContract, RpcOracleContract};
use crate::config::KeeperConfig;
use crate::error::AppResult;
use crate::oracle::OracleFeeder;
use crate::scheduler::KeeperScheduler;

/// Everything the keeper runs on, wired from configuration
pub struct Keeper {
    pub controller: Arc<ReconciliationController>,
    pub feeder: Arc<OracleFeeder>,
    pub scheduler: KeeperScheduler,
}

pub fn initialize_keeper(config: &KeeperConfig) -> AppResult<Keeper> {
    info!("Initializing keeper components ...");

    // One client for every call so submissions share its lock
    let rpc = Arc::new(JsonRpcClient::new(config.rpc())?);
    info!(url = %config.cfx_rpc_url, operator = %config.operator_address, "✅ Core RPC client initialized");

    let bridge = Arc::new(RpcBridgeContract::new(rpc.clone(), config.core_bridge.clone()));
    let controller = Arc::new(ReconciliationController::new(bridge, config.vote_unit()));
    info!(bridge = %config.core_bridge, vote_unit_cfx = config.vote_unit_cfx, "✅ Reconciliation controller initialized");

    let oracle = Arc::new(RpcOracleContract::new(rpc.clone(), config.pos_oracle.clone()));
    let feeder = Arc::new(OracleFeeder::new(
        rpc,
        oracle,
        config.pos_pool.clone(),
        config.pos_pool_pos_account.clone(),
    ));
    info!(oracle = %config.pos_oracle, pool = %config.pos_pool, "✅ Oracle feeder initialized");

    let scheduler = KeeperScheduler::from_config(&config.schedule(), controller.clone(), feeder.clone());
    info!(jobs = ?scheduler.job_names(), "✅ Scheduler initialized");

    Ok(Keeper {
        controller,
        feeder,
        scheduler,
    })
}
