//! craftwatch daemon: polls monitored game servers on a schedule.

use craftwatch::chart::ChartRenderer;
use craftwatch::config::{FileBindings, MonitorConfig};
use craftwatch::db::Store;
use craftwatch::probe::{CraftPinger, StatusProbe};
use craftwatch::scheduler::PollScheduler;
use craftwatch::service::StatusMonitor;

use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("craftwatch=info".parse()?),
        )
        .init();

    // Load configuration
    let cfg = MonitorConfig::load();
    tracing::info!(
        "Starting craftwatch (poll interval {}s)...",
        cfg.poll_interval_secs
    );
    tracing::info!("Using database at {}", cfg.db_path);

    // Initialize database
    let store = Arc::new(Store::new(&cfg.db_path)?);
    tracing::info!("Database initialized successfully");

    // Wire up the monitor facade
    let probe = StatusProbe::new(
        Arc::new(CraftPinger),
        Duration::from_secs(cfg.probe_timeout_secs),
    );
    let bindings = Arc::new(FileBindings::new(&cfg.bindings_path));
    let charts = ChartRenderer::new(&cfg.chart_dir)?;
    let monitor = StatusMonitor::new(store, probe, bindings, charts);

    // Start the poll scheduler
    let scheduler = PollScheduler::new(
        monitor.poller(),
        Duration::from_secs(cfg.poll_interval_secs),
    );
    scheduler.start();

    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutting down");
    scheduler.stop();

    Ok(())
}
