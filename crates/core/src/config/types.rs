use chrono::{DateTime, FixedOffset};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    pub marketplace: MarketplaceConfig,
    pub mail: MailConfig,
    #[serde(default)]
    pub window: WindowConfig,
    #[serde(default)]
    pub schedule: ScheduleConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub pipeline: PipelineConfig,
    #[serde(default)]
    pub backfill: BackfillConfig,
}

/// Marketplace order API credentials and endpoint
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MarketplaceConfig {
    /// Orders API endpoint (e.g., "https://mws.amazonservices.com")
    #[serde(default = "default_marketplace_endpoint")]
    pub endpoint: String,
    pub seller_id: String,
    pub marketplace_id: String,
    pub access_key_id: String,
    pub secret_key: String,
    /// Request timeout in seconds (default: 30)
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

fn default_marketplace_endpoint() -> String {
    "https://mws.amazonservices.com".to_string()
}

fn default_timeout() -> u64 {
    30
}

/// Transactional mail settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MailConfig {
    /// Mailgun API base URL
    #[serde(default = "default_mail_base_url")]
    pub base_url: String,
    /// Sending domain; also used for the noreply sender address
    pub domain: String,
    pub api_key: String,
    /// Receives delivered batches and no-orders notices
    pub recipient: String,
    /// Receives error reports
    pub admin: String,
    /// Copy the admin on recipient messages
    #[serde(default = "default_true")]
    pub cc_admin: bool,
    #[serde(default = "default_error_subject_prefix")]
    pub error_subject_prefix: String,
    /// Request timeout in seconds (default: 30)
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

fn default_mail_base_url() -> String {
    "https://api.mailgun.net".to_string()
}

fn default_error_subject_prefix() -> String {
    "ORDER FEED ERROR".to_string()
}

fn default_true() -> bool {
    true
}

/// Time window for "new" orders
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WindowConfig {
    #[serde(default = "default_timezone")]
    pub timezone: Tz,
    /// Trailing lag so orders not yet visible in the source API are skipped
    #[serde(default = "default_lag_minutes")]
    pub lag_minutes: u32,
    #[serde(default = "default_lookback_hours")]
    pub lookback_hours: u32,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            timezone: default_timezone(),
            lag_minutes: default_lag_minutes(),
            lookback_hours: default_lookback_hours(),
        }
    }
}

fn default_timezone() -> Tz {
    chrono_tz::America::Los_Angeles
}

fn default_lag_minutes() -> u32 {
    5
}

fn default_lookback_hours() -> u32 {
    4
}

/// Trigger cadence, evaluated in `window.timezone`
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ScheduleConfig {
    /// Minute past the hour to fire at
    #[serde(default = "default_schedule_minute")]
    pub minute: u32,
    /// Fire on hours divisible by this value
    #[serde(default = "default_every_hours")]
    pub every_hours: u32,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            minute: default_schedule_minute(),
            every_hours: default_every_hours(),
        }
    }
}

fn default_schedule_minute() -> u32 {
    5
}

fn default_every_hours() -> u32 {
    4
}

/// Where batches are written
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OutputConfig {
    #[serde(default = "default_base_dir")]
    pub base_dir: PathBuf,
    /// Delete the XML documents once the archive exists
    #[serde(default)]
    pub remove_documents: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            base_dir: default_base_dir(),
            remove_documents: false,
        }
    }
}

fn default_base_dir() -> PathBuf {
    PathBuf::from("./files")
}

/// Stage tuning
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PipelineConfig {
    /// Concurrent line-item requests during enrichment
    #[serde(default = "default_max_concurrent_requests")]
    pub max_concurrent_requests: usize,
    /// Concurrent document writes during rendering
    #[serde(default = "default_max_concurrent_writes")]
    pub max_concurrent_writes: usize,
    /// Value of the "Issuing Office" header extrinsic
    #[serde(default = "default_issuing_office")]
    pub issuing_office: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_concurrent_requests: default_max_concurrent_requests(),
            max_concurrent_writes: default_max_concurrent_writes(),
            issuing_office: default_issuing_office(),
        }
    }
}

fn default_max_concurrent_requests() -> usize {
    8
}

fn default_max_concurrent_writes() -> usize {
    16
}

fn default_issuing_office() -> String {
    "Amazon".to_string()
}

/// Manual re-run window. Explicit bounds win over the relative defaults.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BackfillConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<DateTime<FixedOffset>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<DateTime<FixedOffset>>,
    #[serde(default = "default_backfill_lookback_days")]
    pub lookback_days: u32,
    #[serde(default = "default_backfill_lag_hours")]
    pub lag_hours: u32,
}

impl Default for BackfillConfig {
    fn default() -> Self {
        Self {
            start: None,
            end: None,
            lookback_days: default_backfill_lookback_days(),
            lag_hours: default_backfill_lag_hours(),
        }
    }
}

fn default_backfill_lookback_days() -> u32 {
    60
}

fn default_backfill_lag_hours() -> u32 {
    1
}

/// Sanitized config for startup logging (secrets redacted)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedConfig {
    pub marketplace: SanitizedMarketplaceConfig,
    pub mail: SanitizedMailConfig,
    pub window: WindowConfig,
    pub schedule: ScheduleConfig,
    pub output: OutputConfig,
    pub pipeline: PipelineConfig,
}

#[derive(Debug, Clone, Serialize)]
pub struct SanitizedMarketplaceConfig {
    pub endpoint: String,
    pub seller_id: String,
    pub marketplace_id: String,
    pub credentials_configured: bool,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct SanitizedMailConfig {
    pub base_url: String,
    pub domain: String,
    pub recipient: String,
    pub admin: String,
    pub cc_admin: bool,
    pub api_key_configured: bool,
}

impl From<&Config> for SanitizedConfig {
    fn from(config: &Config) -> Self {
        Self {
            marketplace: SanitizedMarketplaceConfig {
                endpoint: config.marketplace.endpoint.clone(),
                seller_id: config.marketplace.seller_id.clone(),
                marketplace_id: config.marketplace.marketplace_id.clone(),
                credentials_configured: !config.marketplace.access_key_id.is_empty()
                    && !config.marketplace.secret_key.is_empty(),
                timeout_secs: config.marketplace.timeout_secs,
            },
            mail: SanitizedMailConfig {
                base_url: config.mail.base_url.clone(),
                domain: config.mail.domain.clone(),
                recipient: config.mail.recipient.clone(),
                admin: config.mail.admin.clone(),
                cc_admin: config.mail.cc_admin,
                api_key_configured: !config.mail.api_key.is_empty(),
            },
            window: config.window.clone(),
            schedule: config.schedule.clone(),
            output: config.output.clone(),
            pipeline: config.pipeline.clone(),
        }
    }
}
