use anyhow::{Context, Result};
use tracing::{error, info};

use orderfeed_core::{Schedule, Scheduler, WindowResolver};
use orderfeed_runner::{build_runner, config_path, init_tracing, load, shutdown_signal};

/// Application version
const VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("Fatal error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    init_tracing();
    info!("orderfeed {} starting", VERSION);

    let config = load(&config_path())?;

    let resolver =
        WindowResolver::from_config(&config.window).context("Invalid window configuration")?;
    let schedule = Schedule::from_config(&config.schedule, config.window.timezone)
        .context("Invalid schedule configuration")?;
    let runner = build_runner(&config)?;

    info!(
        "Scheduling runs at minute {} of every {} hours ({})",
        config.schedule.minute, config.schedule.every_hours, config.window.timezone
    );

    let scheduler = Scheduler::new(schedule, resolver, runner);
    scheduler.start().await;

    shutdown_signal().await;
    info!("Shutdown signal received");

    scheduler.stop().await;
    info!("orderfeed stopped");
    Ok(())
}
