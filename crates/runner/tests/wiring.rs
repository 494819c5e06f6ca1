//! Composition-root tests: config loading, wiring and backfill windows.

use std::io::Write;

use chrono::{DateTime, TimeDelta, TimeZone, Utc};
use tempfile::NamedTempFile;

use orderfeed_core::testing::fixtures;
use orderfeed_runner::{backfill_window, build_runner, config_fingerprint, load};

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 15, 20, 5, 0).unwrap()
}

// =============================================================================
// Backfill windows
// =============================================================================

#[test]
fn test_backfill_defaults_to_sixty_days_ending_an_hour_ago() {
    let tmp = tempfile::tempdir().unwrap();
    let config = fixtures::config(tmp.path());

    let window = backfill_window(&config, now()).unwrap();

    assert_eq!(window.end().with_timezone(&Utc), now() - TimeDelta::hours(1));
    assert_eq!(
        window.start().with_timezone(&Utc),
        now() - TimeDelta::days(60)
    );
    // Rendered in the configured zone (PST in mid-January).
    assert_eq!(window.start().offset().local_minus_utc(), -8 * 3600);
}

#[test]
fn test_backfill_explicit_bounds_win() {
    let tmp = tempfile::tempdir().unwrap();
    let mut config = fixtures::config(tmp.path());
    config.backfill.start = Some(DateTime::parse_from_rfc3339("2024-01-01T00:00:00-08:00").unwrap());
    config.backfill.end = Some(DateTime::parse_from_rfc3339("2024-01-02T00:00:00-08:00").unwrap());

    let window = backfill_window(&config, now()).unwrap();

    assert_eq!(window.start_label(), "01_01_24_00:00");
    assert_eq!(window.end_label(), "01_02_24_00:00");
    assert_eq!(window.batch_name(), "01_01_24_00:00__01_02_24_00:00");
}

#[test]
fn test_backfill_rejects_start_after_end() {
    let tmp = tempfile::tempdir().unwrap();
    let mut config = fixtures::config(tmp.path());
    config.backfill.start = Some(DateTime::parse_from_rfc3339("2024-03-15T12:30:00-07:00").unwrap());

    // `end` defaults to an hour before now, which is earlier than `start`.
    assert!(backfill_window(&config, now()).is_err());
}

// =============================================================================
// Wiring
// =============================================================================

#[test]
fn test_build_runner_with_valid_config() {
    let tmp = tempfile::tempdir().unwrap();
    assert!(build_runner(&fixtures::config(tmp.path())).is_ok());
}

#[test]
fn test_build_runner_rejects_missing_credentials() {
    let tmp = tempfile::tempdir().unwrap();
    let mut config = fixtures::config(tmp.path());
    config.marketplace.secret_key.clear();

    assert!(build_runner(&config).is_err());
}

#[test]
fn test_fingerprint_tracks_config_changes() {
    let tmp = tempfile::tempdir().unwrap();
    let config = fixtures::config(tmp.path());
    let mut changed = config.clone();
    changed.schedule.minute = 10;

    assert_eq!(config_fingerprint(&config), config_fingerprint(&config));
    assert_eq!(config_fingerprint(&config).len(), 16);
    assert_ne!(config_fingerprint(&config), config_fingerprint(&changed));
}

#[test]
fn test_load_validates_config() {
    let mut file = NamedTempFile::new().unwrap();
    write!(
        file,
        r#"
[marketplace]
seller_id = "SELLER"
marketplace_id = "ATVPDKIKX0DER"
access_key_id = "AKID"
secret_key = "secret"

[mail]
domain = "mg.example.com"
api_key = "key-123"
recipient = "orders@example.com"
admin = "admin@example.com"

[pipeline]
max_concurrent_requests = 0
"#
    )
    .unwrap();

    let err = load(file.path()).unwrap_err();
    assert!(format!("{:#}", err).contains("validation"));
}
