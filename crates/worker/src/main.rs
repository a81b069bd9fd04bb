//! `vigil-worker` -- metric alerting daemon.
//!
//! Polls every watched target on a fixed interval, keeps per-target alert
//! state in SQLite and delivers triggered, reminder and recovery
//! notifications by email, webhook and the in-process bus.
//!
//! # Environment variables
//!
//! | Variable             | Required | Default             | Description                          |
//! |----------------------|----------|---------------------|--------------------------------------|
//! | `VIGIL_TARGETS_FILE` | yes      | --                  | JSON file of targets and thresholds  |
//! | `VIGIL_METRICS_URL`  | yes      | --                  | Base URL of the metric collector     |
//! | `DATABASE_URL`       | no       | `sqlite://vigil.db` | Alert store location                 |
//! | `VIGIL_LOG_FORMAT`   | no       | `text`              | `json` for structured log lines      |
//!
//! Poll and reminder cadence, timeouts and queue sizes are read by
//! `MonitorConfig::from_env`; channel settings by `channels_from_env`.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use vigil_db::{AlertStore, SqliteAlertStore};
use vigil_events::{EventBus, Notifier};
use vigil_monitor::{HttpMetricSource, MetricSource, MonitorConfig, Scheduler};
use vigil_worker::channels::channels_from_env;
use vigil_worker::targets::TargetsFile;

const DEFAULT_DATABASE_URL: &str = "sqlite://vigil.db";

/// How long to wait for the scheduler and notifier to finish on shutdown.
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(30);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    // --- Configuration ---
    let targets_path: PathBuf = std::env::var("VIGIL_TARGETS_FILE")
        .context("VIGIL_TARGETS_FILE must be set")?
        .into();
    let metrics_url = std::env::var("VIGIL_METRICS_URL").context("VIGIL_METRICS_URL must be set")?;
    let database_url =
        std::env::var("DATABASE_URL").unwrap_or_else(|_| DEFAULT_DATABASE_URL.to_string());

    let targets_file = TargetsFile::load(&targets_path).await?;
    let config = targets_file.apply_defaults(MonitorConfig::from_env());
    tracing::info!(
        targets = targets_file.targets.len(),
        default_thresholds = config.default_thresholds.len(),
        poll_interval_secs = config.poll_interval.as_secs(),
        reminder_interval_secs = config.reminder_interval.as_secs(),
        "Loaded monitor configuration"
    );

    // --- Alert store ---
    let store = SqliteAlertStore::connect(&database_url)
        .await
        .context("Failed to open alert store")?;
    vigil_db::health_check(store.pool())
        .await
        .context("Alert store health check failed")?;
    tracing::info!("Alert store ready");
    let store: Arc<dyn AlertStore> = Arc::new(store);

    // --- Notifier ---
    let cancel = CancellationToken::new();
    let bus = Arc::new(EventBus::default());
    let channels = channels_from_env(bus.clone())?;
    let notifier = Notifier::new(channels, config.delivery_timeout);
    tracing::info!(channels = notifier.channel_count(), "Notifier configured");
    let notifier_cancel = CancellationToken::new();
    let (notifier_handle, notifier_task) =
        notifier.spawn(config.notify_queue_capacity, notifier_cancel.clone());

    // --- Scheduler ---
    let source: Arc<dyn MetricSource> =
        Arc::new(HttpMetricSource::new(metrics_url).context("Failed to build metric source")?);
    let scheduler = Arc::new(Scheduler::new(config, store, source, notifier_handle));
    scheduler.restore().await?;
    for target in targets_file.targets {
        let key = target.key();
        if let Err(e) = scheduler.add_target(target).await {
            tracing::error!(key = %key, error = %e, "Skipping invalid target");
        }
    }

    let scheduler_task = {
        let scheduler = scheduler.clone();
        let cancel = cancel.clone();
        tokio::spawn(async move { scheduler.run(cancel).await })
    };

    shutdown_signal().await;

    // Stop polling first, then let the notifier drain what was queued.
    cancel.cancel();
    if tokio::time::timeout(SHUTDOWN_TIMEOUT, scheduler_task).await.is_err() {
        tracing::warn!("Scheduler did not stop in time");
    }
    drop(scheduler);
    notifier_cancel.cancel();
    if tokio::time::timeout(SHUTDOWN_TIMEOUT, notifier_task).await.is_err() {
        tracing::warn!("Notifier did not drain in time");
    }

    tracing::info!("Shutdown complete");
    Ok(())
}

fn init_tracing() {
    let json = std::env::var("VIGIL_LOG_FORMAT").is_ok_and(|f| f.eq_ignore_ascii_case("json"));

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            "vigil_worker=info,vigil_monitor=info,vigil_events=info".into()
        }))
        .with(json.then(|| tracing_subscriber::fmt::layer().json()))
        .with((!json).then(tracing_subscriber::fmt::layer))
        .init();
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}
