pub mod archive;
pub mod config;
pub mod document;
pub mod mailer;
pub mod notify;
pub mod orders;
pub mod pipeline;
pub mod report;
pub mod schedule;
pub mod testing;
pub mod window;

pub use archive::{ArchiveError, Archiver, ZipArchiver};
pub use config::{
    load_config, load_config_from_str, validate_config, Config, ConfigError, SanitizedConfig,
};
pub use mailer::{EmailMessage, MailgunMailer, Mailer, MailerError};
pub use notify::Notifier;
pub use orders::{MwsOrderApi, OrderApi, OrderApiError};
pub use pipeline::{PipelineError, PipelineRunner, RunOutcome, RunReport, StageOrigin};
pub use report::ErrorReporter;
pub use schedule::{Schedule, Scheduler};
pub use window::{TimeWindow, WindowResolver};
