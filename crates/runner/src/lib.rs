//! Composition root shared by the `orderfeed` daemon and the backfill binary.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{DateTime, TimeDelta, Utc};
use sha2::{Digest, Sha256};
use tokio::signal;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use orderfeed_core::{
    load_config, validate_config, Archiver, Config, MailgunMailer, Mailer, MwsOrderApi, OrderApi,
    PipelineRunner, SanitizedConfig, TimeWindow, WindowResolver, ZipArchiver,
};

/// Environment variable naming the config file.
pub const CONFIG_ENV: &str = "ORDERFEED_CONFIG";

/// Install the global tracing subscriber. `RUST_LOG` overrides the default
/// `info` filter; `ORDERFEED_LOG_FORMAT=json` switches to JSON lines.
pub fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info".into());

    let json = std::env::var("ORDERFEED_LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json"));
    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
}

pub fn config_path() -> PathBuf {
    std::env::var(CONFIG_ENV)
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("config.toml"))
}

/// Load and validate the configuration, logging a redacted copy.
pub fn load(path: &Path) -> Result<Config> {
    info!("Loading configuration from {:?}", path);
    let config =
        load_config(path).with_context(|| format!("Failed to load config from {:?}", path))?;
    validate_config(&config).context("Configuration validation failed")?;

    let sanitized = SanitizedConfig::from(&config);
    info!(
        fingerprint = %config_fingerprint(&config),
        "Configuration loaded: {}",
        serde_json::to_string(&sanitized).unwrap_or_default()
    );
    Ok(config)
}

/// Short hash identifying the effective configuration in logs.
pub fn config_fingerprint(config: &Config) -> String {
    let json = serde_json::to_string(config).unwrap_or_default();
    let hash = format!("{:x}", Sha256::digest(json.as_bytes()));
    hash[..16].to_string()
}

/// Build a runner backed by the marketplace API, Mailgun and zip archives.
pub fn build_runner(config: &Config) -> Result<Arc<PipelineRunner>> {
    let order_api: Arc<dyn OrderApi> = Arc::new(
        MwsOrderApi::new(config.marketplace.clone()).context("Failed to create order API client")?,
    );
    let mailer: Arc<dyn Mailer> =
        Arc::new(MailgunMailer::new(&config.mail).context("Failed to create mailer")?);
    let archiver: Arc<dyn Archiver> = Arc::new(ZipArchiver::new(config.output.remove_documents));

    info!(
        order_api = order_api.name(),
        mailer = mailer.name(),
        archiver = archiver.name(),
        output = %config.output.base_dir.display(),
        "Pipeline wired"
    );

    Ok(Arc::new(PipelineRunner::new(config, order_api, mailer, archiver)))
}

/// Window for a manual re-run. Explicit `[backfill]` bounds win; otherwise
/// the window runs from `lookback_days` to `lag_hours` before `now`.
pub fn backfill_window(config: &Config, now: DateTime<Utc>) -> Result<TimeWindow> {
    let resolver =
        WindowResolver::from_config(&config.window).context("Invalid window configuration")?;
    let backfill = &config.backfill;

    let start = match backfill.start {
        Some(start) => start.with_timezone(&Utc),
        None => now - TimeDelta::days(i64::from(backfill.lookback_days)),
    };
    let end = match backfill.end {
        Some(end) => end.with_timezone(&Utc),
        None => now - TimeDelta::hours(i64::from(backfill.lag_hours)),
    };

    resolver
        .resolve_between(start, end)
        .context("Invalid backfill window")
}

pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
