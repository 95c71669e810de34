// Keeper Scheduler - drives reconciliation and oracle publishing on fixed intervals
//
// Each job owns a re-entrancy guard: a tick that fires while the previous run
// is still in flight is skipped, never queued. Missed ticks are skipped too,
// so a stalled node does not cause a burst of runs once it recovers.

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::{interval, Duration, MissedTickBehavior};
use tracing::{error, info, warn};

use crate::bridge::ReconciliationController;
use crate::error::AppResult;
use crate::oracle::OracleFeeder;

/// A unit of recurring work
#[async_trait]
pub trait Job: Send + Sync {
    fn name(&self) -> &'static str;

    async fn run(&self) -> AppResult<()>;
}

pub struct ReconcileJob(pub Arc<ReconciliationController>);

#[async_trait]
impl Job for ReconcileJob {
    fn name(&self) -> &'static str {
        "reconcile"
    }

    async fn run(&self) -> AppResult<()> {
        self.0.run_cycle().await.map(|_| ())
    }
}

pub struct RewardPublishJob(pub Arc<OracleFeeder>);

#[async_trait]
impl Job for RewardPublishJob {
    fn name(&self) -> &'static str {
        "reward-publish"
    }

    async fn run(&self) -> AppResult<()> {
        let outcome = self.0.publish_reward(None).await?;
        info!(?outcome, "✓ Reward publish finished");
        Ok(())
    }
}

pub struct AccountPublishJob(pub Arc<OracleFeeder>);

#[async_trait]
impl Job for AccountPublishJob {
    fn name(&self) -> &'static str {
        "account-publish"
    }

    async fn run(&self) -> AppResult<()> {
        let outcome = self.0.publish_account().await?;
        info!(?outcome, "✓ Account publish finished");
        Ok(())
    }
}

/// A job bound to its interval and re-entrancy guard
pub struct ScheduledJob {
    job: Arc<dyn Job>,
    every: Duration,
    running: Arc<Mutex<()>>,
}

impl ScheduledJob {
    pub fn new(job: Arc<dyn Job>, every: Duration) -> Self {
        Self {
            job,
            every,
            running: Arc::new(Mutex::new(())),
        }
    }

    /// Start a run unless the previous one is still in flight
    pub fn tick(&self) -> Option<JoinHandle<()>> {
        let Ok(guard) = self.running.clone().try_lock_owned() else {
            warn!(job = self.job.name(), "⏭️ Previous run still in flight, skipping tick");
            return None;
        };

        let job = self.job.clone();
        Some(tokio::spawn(async move {
            let _guard = guard;
            if let Err(e) = job.run().await {
                error!(job = job.name(), "❌ {} failed: {}", job.name(), e);
            }
        }))
    }

    async fn run_forever(self) {
        let mut ticker = interval(self.every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        info!(job = self.job.name(), every_secs = self.every.as_secs(), "⏰ Job scheduled");
        loop {
            ticker.tick().await;
            self.tick();
        }
    }
}

/// Job intervals and toggles
#[derive(Debug, Clone)]
pub struct ScheduleConfig {
    pub reconcile_interval: Duration,
    pub reward_interval: Duration,
    pub account_interval: Duration,
    pub reconcile_enabled: bool,
    pub oracle_enabled: bool,
}

pub struct KeeperScheduler {
    jobs: Vec<ScheduledJob>,
}

impl KeeperScheduler {
    pub fn new() -> Self {
        Self { jobs: Vec::new() }
    }

    /// Scheduler with the keeper's standard jobs, honouring the toggles
    pub fn from_config(
        config: &ScheduleConfig,
        controller: Arc<ReconciliationController>,
        feeder: Arc<OracleFeeder>,
    ) -> Self {
        let mut scheduler = Self::new();
        if config.reconcile_enabled {
            scheduler = scheduler.with_job(Arc::new(ReconcileJob(controller)), config.reconcile_interval);
        }
        if config.oracle_enabled {
            scheduler = scheduler
                .with_job(Arc::new(RewardPublishJob(feeder.clone())), config.reward_interval)
                .with_job(Arc::new(AccountPublishJob(feeder)), config.account_interval);
        }
        scheduler
    }

    pub fn with_job(mut self, job: Arc<dyn Job>, every: Duration) -> Self {
        self.jobs.push(ScheduledJob::new(job, every));
        self
    }

    pub fn job_names(&self) -> Vec<&'static str> {
        self.jobs.iter().map(|j| j.job.name()).collect()
    }

    /// Start every job loop (runs in background)
    pub fn start(self) -> Vec<JoinHandle<()>> {
        self.jobs
            .into_iter()
            .map(|job| tokio::spawn(job.run_forever()))
            .collect()
    }
}

impl Default for KeeperScheduler {
    fn default() -> Self {
        Self::new()
    }
}
