//! One-off run over an explicit or long lookback window.

use anyhow::Result;
use chrono::Utc;
use tracing::{error, info, warn};

use orderfeed_core::RunOutcome;
use orderfeed_runner::{backfill_window, build_runner, config_path, init_tracing, load};

#[tokio::main]
async fn main() {
    match run().await {
        Ok(RunOutcome::Failed { origin }) => {
            warn!("Backfill failed in {}; the operator has been notified", origin);
            std::process::exit(2);
        }
        Ok(_) => {}
        Err(e) => {
            error!("Fatal error: {:#}", e);
            std::process::exit(1);
        }
    }
}

async fn run() -> Result<RunOutcome> {
    init_tracing();

    let config = load(&config_path())?;
    let window = backfill_window(&config, Utc::now())?;
    let runner = build_runner(&config)?;

    info!(
        "Backfilling orders from {} to {}",
        window.start_iso(),
        window.end_iso()
    );
    let report = runner.run(window).await;
    info!(run_id = %report.run_id, outcome = ?report.outcome, "Backfill finished");

    Ok(report.outcome)
}
