// Reconciliation controller - keeps the bridge liquid enough for redemptions
//
// Cycle order:
// 1. Pull value bridged from eSpace into core space
// 2. Claim accrued pool reward
// 3. Outstanding redemptions: withdraw unlocked votes, surface locked ones
//    until demand is covered, drain excess to redeemers
//    No redemptions: unstake enough votes to make accrued reward liquid
// 4. Stake idle balance
//
// Every write is awaited until executed before the next read, since later
// steps decide from state the earlier ones changed.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::bridge::{format_cfx, BridgeState, PoolSummary, SnapshotFetcher, VoteUnit};
use crate::chain::{BridgeContract, Drip, TxReceipt};
use crate::error::AppResult;

/// Why a `handleRedeem` was submitted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RedeemReason {
    /// Votes finished unlocking and can be withdrawn
    WithdrawUnlocked,
    /// Demand is not covered even after in-flight unlocks land
    SurfaceLocked,
    /// Balance already exceeds demand
    DrainExcess,
}

/// A state-changing call on the bridge contract
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum BridgeAction {
    TransferFromEspace,
    ClaimReward,
    HandleRedeem(RedeemReason),
    UnstakeVotes(u64),
    StakeVotes,
}

impl fmt::Display for BridgeAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BridgeAction::TransferFromEspace => write!(f, "cross cfx from eSpace to core space"),
            BridgeAction::ClaimReward => write!(f, "claim reward"),
            BridgeAction::HandleRedeem(reason) => write!(f, "handle redeem ({:?})", reason),
            BridgeAction::UnstakeVotes(votes) => write!(f, "unstake {} votes", votes),
            BridgeAction::StakeVotes => write!(f, "stake votes"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum ActionStatus {
    /// Executed on chain; `success` is false when the transaction reverted
    Executed { tx_hash: String, success: bool },
    /// Never executed (rejected, timed out, transport failure)
    Failed { error: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActionOutcome {
    pub action: BridgeAction,
    pub status: ActionStatus,
}

/// Result of one reconciliation cycle
#[derive(Debug, Clone, Serialize)]
pub struct CycleReport {
    pub cycle_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub actions: Vec<ActionOutcome>,
}

impl CycleReport {
    fn new() -> Self {
        Self {
            cycle_id: Uuid::new_v4(),
            started_at: Utc::now(),
            actions: Vec::new(),
        }
    }

    /// Actions in submission order
    pub fn submitted(&self) -> Vec<BridgeAction> {
        self.actions.iter().map(|outcome| outcome.action).collect()
    }

    pub fn failed_count(&self) -> usize {
        self.actions
            .iter()
            .filter(|outcome| !matches!(outcome.status, ActionStatus::Executed { success: true, .. }))
            .count()
    }
}

/// Inbound actions that precede any liquidity decision
pub fn plan_inbound(state: &BridgeState) -> Vec<BridgeAction> {
    let mut actions = Vec::new();
    if state.mapped_balance > 0 {
        actions.push(BridgeAction::TransferFromEspace);
    }
    if state.pool_reward > 0 {
        actions.push(BridgeAction::ClaimReward);
    }
    actions
}

/// `votes - available - unlocked`, clamped to zero when the summary is
/// inconsistent
pub fn unlocking_or_zero(summary: &PoolSummary) -> u64 {
    summary.unlocking().unwrap_or_else(|e| {
        warn!("⚠️ {}, treating unlocking as 0", e);
        0
    })
}

/// Whether locked votes must be surfaced because demand exceeds the balance
/// plus everything already unlocking
pub fn redemption_needs_unlock(
    summary: &PoolSummary,
    unlocking: u64,
    balance: Drip,
    total_need: Drip,
    unit: VoteUnit,
) -> bool {
    summary.locked > 0 && balance.saturating_add(unit.value_of(unlocking)) < total_need
}

/// Votes to unstake so accrued reward becomes payable, or `None` when the
/// balance plus in-flight unlocks already cover it
pub fn votes_to_unlock(
    acc_reward: Drip,
    balance: Drip,
    unlocking: u64,
    unit: VoteUnit,
) -> Option<u64> {
    if acc_reward <= balance {
        return None;
    }
    let covered = balance.saturating_add(unit.value_of(unlocking));
    if acc_reward <= covered {
        return None;
    }
    let votes = unit.votes_for(acc_reward - covered);
    (votes > 0).then_some(votes)
}

/// Whether the idle balance is worth staking
pub fn should_sweep(stake_able: Drip, unit: VoteUnit) -> bool {
    stake_able > unit.drip()
}

pub struct ReconciliationController {
    bridge: Arc<dyn BridgeContract>,
    fetcher: SnapshotFetcher,
    vote_unit: VoteUnit,
}

impl ReconciliationController {
    pub fn new(bridge: Arc<dyn BridgeContract>, vote_unit: VoteUnit) -> Self {
        Self {
            fetcher: SnapshotFetcher::new(bridge.clone()),
            bridge,
            vote_unit,
        }
    }

    /// Fetch a snapshot and reconcile against it.
    ///
    /// A failed snapshot aborts the cycle before anything is submitted.
    pub async fn run_cycle(&self) -> AppResult<CycleReport> {
        info!("🔄 Starting reconciliation cycle");
        let state = self.fetcher.fetch().await?;
        let report = self.reconcile(&state).await;

        info!(
            cycle_id = %report.cycle_id,
            actions = ?report.submitted(),
            failed = report.failed_count(),
            "✓ Reconciliation cycle completed"
        );
        Ok(report)
    }

    pub async fn reconcile(&self, state: &BridgeState) -> CycleReport {
        let mut report = CycleReport::new();

        for action in plan_inbound(state) {
            info!(
                mapped = %format_cfx(state.mapped_balance),
                reward = %format_cfx(state.pool_reward),
                "💰 {}",
                action
            );
            self.execute(action, &mut report).await;
        }

        if state.espace_redeem_len > 0 {
            self.handle_redemptions(state, &mut report).await;
        } else {
            self.handle_reward_liquidity(state, &mut report).await;
        }

        let stake_able = reread(
            "stakeAbleBalance",
            state.stake_able_balance,
            self.bridge.stake_able_balance(),
        )
        .await;
        if should_sweep(stake_able, self.vote_unit) {
            info!(stake_able = %format_cfx(stake_able), "📈 Staking idle balance");
            self.execute(BridgeAction::StakeVotes, &mut report).await;
        }

        report
    }

    async fn handle_redemptions(&self, state: &BridgeState, report: &mut CycleReport) {
        info!(redeem_len = state.espace_redeem_len, "📋 Outstanding eSpace redemptions");

        let summary = self
            .withdraw_unlocked(state.pool_summary, report)
            .await;

        let balance = reread("getBalance", state.balance, self.bridge.native_balance()).await;
        let unlocking = unlocking_or_zero(&summary);
        let total_need = reread(
            "eSpacePoolTotalRedeemed",
            state.espace_pool_total_redeemed,
            self.bridge.espace_pool_total_redeemed(),
        )
        .await;
        info!(
            balance = %format_cfx(balance),
            unlocking,
            total_need = %format_cfx(total_need),
            "Redemption demand"
        );

        if redemption_needs_unlock(&summary, unlocking, balance, total_need, self.vote_unit) {
            self.execute(BridgeAction::HandleRedeem(RedeemReason::SurfaceLocked), report)
                .await;
        }

        if balance > total_need {
            self.execute(BridgeAction::HandleRedeem(RedeemReason::DrainExcess), report)
                .await;
        }
    }

    async fn handle_reward_liquidity(&self, state: &BridgeState, report: &mut CycleReport) {
        let summary = self
            .withdraw_unlocked(state.pool_summary, report)
            .await;

        let balance = reread("getBalance", state.balance, self.bridge.native_balance()).await;
        let acc_reward = reread(
            "poolAccReward",
            state.pool_acc_reward,
            self.bridge.pool_acc_reward(),
        )
        .await;

        if acc_reward <= balance {
            return;
        }

        let unlocking = unlocking_or_zero(&summary);
        if let Some(votes) = votes_to_unlock(acc_reward, balance, unlocking, self.vote_unit) {
            info!(
                acc_reward = %format_cfx(acc_reward),
                balance = %format_cfx(balance),
                unlocking,
                votes,
                "🔓 Accrued reward not liquid, unstaking"
            );
            self.execute(BridgeAction::UnstakeVotes(votes), report).await;
        }
    }

    /// Withdraw unlocked votes if there are any and return the summary the
    /// next decision should use
    async fn withdraw_unlocked(&self, summary: PoolSummary, report: &mut CycleReport) -> PoolSummary {
        if summary.unlocked == 0 {
            return summary;
        }

        self.execute(BridgeAction::HandleRedeem(RedeemReason::WithdrawUnlocked), report)
            .await;
        reread("poolSummary", summary, self.bridge.pool_summary()).await
    }

    async fn execute(&self, action: BridgeAction, report: &mut CycleReport) {
        let result = match action {
            BridgeAction::TransferFromEspace => self.bridge.transfer_from_espace().await,
            BridgeAction::ClaimReward => self.bridge.claim_reward().await,
            BridgeAction::HandleRedeem(_) => self.bridge.handle_redeem().await,
            BridgeAction::UnstakeVotes(votes) => self.bridge.unstake_votes(votes).await,
            BridgeAction::StakeVotes => self.bridge.stake_votes().await,
        };

        let status = match result {
            Ok(receipt) => {
                log_receipt(&action, &receipt);
                ActionStatus::Executed {
                    success: receipt.is_success(),
                    tx_hash: receipt.transaction_hash,
                }
            }
            Err(e) => {
                error!(cycle_id = %report.cycle_id, "❌ {} error: {}", action, e);
                ActionStatus::Failed {
                    error: e.to_string(),
                }
            }
        };

        report.actions.push(ActionOutcome { action, status });
    }
}

fn log_receipt(action: &BridgeAction, receipt: &TxReceipt) {
    if receipt.is_success() {
        info!(
            tx_hash = %receipt.transaction_hash,
            "✓ {} status: {}",
            action,
            receipt.status_label()
        );
    } else {
        warn!(
            tx_hash = %receipt.transaction_hash,
            outcome = receipt.outcome_status,
            "⚠️ {} status: {}",
            action,
            receipt.status_label()
        );
    }
}

/// Re-read a value whose previous read may be stale; on failure keep the
/// stale value and let the next cycle correct any resulting misdecision
async fn reread<T, F>(what: &str, stale: T, read: F) -> T
where
    T: fmt::Debug,
    F: Future<Output = AppResult<T>>,
{
    match read.await {
        Ok(fresh) => fresh,
        Err(e) => {
            warn!("⚠️ Re-reading {} failed, using stale value {:?}: {}", what, stale, e);
            stale
        }
    }
}
