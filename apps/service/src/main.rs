use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use clap::Parser;
use tokio::time::{MissedTickBehavior, interval};

use pulsemon_service::config::Config;
use pulsemon_service::database::{LibsqlDatabase, initialize_database};
use pulsemon_service::monitoring::{CycleOrchestrator, HttpProber};
use pulsemon_service::notify::DownAlertNotifier;
use pulsemon_service::notify::email::HttpMailer;
use pulsemon_service::pool::open_pool;

#[derive(Debug, Parser)]
#[command(name = "pulsemon-service", about = "Periodic uptime probe runner")]
struct Args {
    /// Path to the TOML config file.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Override the database path from the config file.
    #[arg(long)]
    database: Option<PathBuf>,

    /// Run a single cycle and exit.
    #[arg(long)]
    once: bool,

    /// Override the seconds between cycles.
    #[arg(long)]
    interval_seconds: Option<u64>,
}

#[tokio::main]
async fn main() -> Result<()> {
    logger::init_tracing();

    let args = Args::parse();
    let config = Config::from_config(args.config.as_deref())
        .map_err(|error| anyhow!("failed to load config: {error:?}"))?;

    let database_path = args
        .database
        .map(|path| path.to_string_lossy().into_owned())
        .unwrap_or_else(|| config.database.path.clone());

    let pool = open_pool(&database_path)
        .await
        .with_context(|| format!("failed to open database at {database_path}"))?;

    {
        let conn = pool.get().await?;
        initialize_database(&conn).await?;
    }

    let database = Arc::new(LibsqlDatabase::new_from_pool(pool));
    let prober = Arc::new(HttpProber::new(config.probe.timeout_ms)?);
    let mailer = Arc::new(HttpMailer::new(
        config.email.api_url.clone(),
        config.email.api_key.clone(),
        config.email.from.clone(),
    )?);
    let notifier = Arc::new(DownAlertNotifier::new(database.clone(), mailer));

    let orchestrator = CycleOrchestrator::new(
        database,
        prober,
        notifier,
        config.probe.workers,
        config.probe.include_inactive,
    );

    if args.once {
        let summary = orchestrator.run_cycle().await?;
        tracing::info!(
            attempted = summary.attempted,
            succeeded = summary.succeeded,
            failed = summary.failed,
            "single cycle finished"
        );
        return Ok(());
    }

    let interval_seconds = args.interval_seconds.unwrap_or(config.cycle.interval_seconds).max(1);
    let mut timer = interval(Duration::from_secs(interval_seconds));
    timer.set_missed_tick_behavior(MissedTickBehavior::Delay);

    tracing::info!(interval_seconds, database = %database_path, "probe runner started");

    loop {
        tokio::select! {
            _ = timer.tick() => {
                if let Err(error) = orchestrator.run_cycle().await {
                    tracing::error!("cycle failed: {error:#}");
                }
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("shutting down");
                break;
            }
        }
    }

    Ok(())
}
