use super::{types::Config, ConfigError};

/// Validate configuration
/// Currently validates:
/// - Credentials and addresses are non-empty
/// - Window span and schedule cadence are usable
/// - Concurrency limits are non-zero
/// - Explicit backfill bounds are ordered
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    let required = [
        ("marketplace.seller_id", &config.marketplace.seller_id),
        ("marketplace.marketplace_id", &config.marketplace.marketplace_id),
        ("marketplace.access_key_id", &config.marketplace.access_key_id),
        ("marketplace.secret_key", &config.marketplace.secret_key),
        ("mail.domain", &config.mail.domain),
        ("mail.api_key", &config.mail.api_key),
        ("mail.recipient", &config.mail.recipient),
        ("mail.admin", &config.mail.admin),
    ];
    for (key, value) in required {
        if value.trim().is_empty() {
            return Err(ConfigError::ValidationError(format!("{} cannot be empty", key)));
        }
    }

    if config.window.lookback_hours == 0 {
        return Err(ConfigError::ValidationError(
            "window.lookback_hours cannot be 0".to_string(),
        ));
    }

    if config.schedule.minute >= 60 {
        return Err(ConfigError::ValidationError(format!(
            "schedule.minute must be below 60, got {}",
            config.schedule.minute
        )));
    }

    if !(1..=24).contains(&config.schedule.every_hours) {
        return Err(ConfigError::ValidationError(format!(
            "schedule.every_hours must be between 1 and 24, got {}",
            config.schedule.every_hours
        )));
    }

    if config.pipeline.max_concurrent_requests == 0 {
        return Err(ConfigError::ValidationError(
            "pipeline.max_concurrent_requests cannot be 0".to_string(),
        ));
    }

    if config.pipeline.max_concurrent_writes == 0 {
        return Err(ConfigError::ValidationError(
            "pipeline.max_concurrent_writes cannot be 0".to_string(),
        ));
    }

    if let (Some(start), Some(end)) = (config.backfill.start, config.backfill.end) {
        if start >= end {
            return Err(ConfigError::ValidationError(
                "backfill.start must be before backfill.end".to_string(),
            ));
        }
    }

    Ok(())
}
