mod bootstrap;
mod bridge;
mod chain;
mod config;
mod error;
mod oracle;
mod scheduler;

use clap::{Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::KeeperConfig;

#[derive(Parser)]
#[command(name = "keeper", about = "Conflux core-space bridge keeper")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run every enabled job until interrupted
    Run,
    /// Run a single reconciliation cycle
    ReconcileOnce,
    /// Publish the pool's PoS reward once
    PublishReward {
        /// Epoch to publish, defaults to the last completed one
        #[arg(long)]
        epoch: Option<u64>,
    },
    /// Publish the validator account status once
    PublishAccount,
}

// Initialize logging and tracing
fn init_tracing() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,keeper=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    init_tracing();

    let cli = Cli::parse();
    let config = KeeperConfig::from_env()?;
    let keeper = bootstrap::initialize_keeper(&config)?;

    match cli.command.unwrap_or(Command::Run) {
        Command::Run => {
            info!("🚀 Starting bridge keeper");
            let handles = keeper.scheduler.start();
            if handles.is_empty() {
                warn!("⚠️ Every job is disabled, nothing to run");
                return Ok(());
            }

            tokio::signal::ctrl_c().await?;
            info!("🛑 Shutting down");
            handles.iter().for_each(|h| h.abort());
        }
        Command::ReconcileOnce => {
            let report = keeper.controller.run_cycle().await?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Command::PublishReward { epoch } => {
            let outcome = keeper.feeder.publish_reward(epoch).await?;
            println!("{}", serde_json::to_string_pretty(&outcome)?);
        }
        Command::PublishAccount => {
            let outcome = keeper.feeder.publish_account().await?;
            println!("{}", serde_json::to_string_pretty(&outcome)?);
        }
    }

    Ok(())
}
