//! Time window resolution.
//!
//! A run exports the orders created inside a half-open interval
//! `[start, end)`. The interval trails "now" by a small lag because the
//! source API is only eventually consistent, and spans a fixed lookback.
//! Both bounds are rendered in the configured timezone, once as ISO-8601
//! for the API and once as a short label for subjects and file names.

use chrono::{DateTime, FixedOffset, SecondsFormat, SubsecRound, TimeDelta, Utc};
use chrono_tz::Tz;
use thiserror::Error;

use crate::config::WindowConfig;

/// Format of the human readable window labels, e.g. `03_15_24_13:00`.
pub const LABEL_FORMAT: &str = "%m_%d_%y_%H:%M";

/// Errors raised while building a window.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum WindowError {
    #[error("window lag cannot be negative")]
    NegativeLag,

    #[error("window lookback span must be at least one second")]
    EmptySpan,

    #[error("window start {start} is not before end {end}")]
    Inverted { start: String, end: String },
}

/// An immutable `[start, end)` interval with its display labels.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimeWindow {
    start: DateTime<FixedOffset>,
    end: DateTime<FixedOffset>,
    start_label: String,
    end_label: String,
}

impl TimeWindow {
    fn from_bounds(start: DateTime<Tz>, end: DateTime<Tz>) -> Self {
        Self {
            start_label: start.format(LABEL_FORMAT).to_string(),
            end_label: end.format(LABEL_FORMAT).to_string(),
            start: start.fixed_offset(),
            end: end.fixed_offset(),
        }
    }

    pub fn start(&self) -> DateTime<FixedOffset> {
        self.start
    }

    pub fn end(&self) -> DateTime<FixedOffset> {
        self.end
    }

    pub fn start_label(&self) -> &str {
        &self.start_label
    }

    pub fn end_label(&self) -> &str {
        &self.end_label
    }

    /// ISO-8601 start with numeric offset, e.g. `2024-03-15T09:00:00-07:00`.
    pub fn start_iso(&self) -> String {
        self.start.to_rfc3339_opts(SecondsFormat::Secs, false)
    }

    /// ISO-8601 end with numeric offset.
    pub fn end_iso(&self) -> String {
        self.end.to_rfc3339_opts(SecondsFormat::Secs, false)
    }

    /// Directory and archive stem for this window: `<start>__<end>`.
    pub fn batch_name(&self) -> String {
        format!("{}__{}", self.start_label, self.end_label)
    }

    /// Whether `instant` falls inside the half-open interval.
    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        self.start <= instant && instant < self.end
    }
}

/// Computes windows from an injected "now".
#[derive(Debug, Clone)]
pub struct WindowResolver {
    timezone: Tz,
    lag: TimeDelta,
    span: TimeDelta,
}

impl WindowResolver {
    pub fn new(timezone: Tz, lag: TimeDelta, span: TimeDelta) -> Result<Self, WindowError> {
        if lag < TimeDelta::zero() {
            return Err(WindowError::NegativeLag);
        }
        if span < TimeDelta::seconds(1) {
            return Err(WindowError::EmptySpan);
        }
        Ok(Self {
            timezone,
            lag,
            span,
        })
    }

    pub fn from_config(config: &WindowConfig) -> Result<Self, WindowError> {
        Self::new(
            config.timezone,
            TimeDelta::minutes(i64::from(config.lag_minutes)),
            TimeDelta::hours(i64::from(config.lookback_hours)),
        )
    }

    pub fn timezone(&self) -> Tz {
        self.timezone
    }

    /// Window ending `lag` before `now` and spanning `span`.
    ///
    /// Bounds are cut to whole seconds, the precision the API accepts.
    pub fn resolve(&self, now: DateTime<Utc>) -> TimeWindow {
        self.resolve_following(None, now)
    }

    /// Window for a scheduled trigger. It picks up at `previous_end` so that
    /// consecutive scheduled windows share a bound, whatever the wall clock
    /// did in between. Without a usable previous end it spans `span`.
    pub fn resolve_following(
        &self,
        previous_end: Option<DateTime<Utc>>,
        trigger: DateTime<Utc>,
    ) -> TimeWindow {
        let end = (trigger - self.lag).trunc_subsecs(0);
        let start = previous_end
            .map(|prev| prev.trunc_subsecs(0))
            .filter(|prev| *prev < end)
            .unwrap_or(end - self.span);
        TimeWindow::from_bounds(
            start.with_timezone(&self.timezone),
            end.with_timezone(&self.timezone),
        )
    }

    /// Window with explicit bounds, for manual and backfill runs.
    pub fn resolve_between(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<TimeWindow, WindowError> {
        let (start, end) = (start.trunc_subsecs(0), end.trunc_subsecs(0));
        if start >= end {
            return Err(WindowError::Inverted {
                start: start.to_rfc3339(),
                end: end.to_rfc3339(),
            });
        }
        Ok(TimeWindow::from_bounds(
            start.with_timezone(&self.timezone),
            end.with_timezone(&self.timezone),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn la_resolver() -> WindowResolver {
        WindowResolver::new(
            chrono_tz::America::Los_Angeles,
            TimeDelta::minutes(5),
            TimeDelta::hours(4),
        )
        .unwrap()
    }

    #[test]
    fn test_resolve_known_instant() {
        // 20:05Z is 13:05 in Los Angeles during daylight saving time.
        let now = Utc.with_ymd_and_hms(2024, 3, 15, 20, 5, 0).unwrap();
        let window = la_resolver().resolve(now);

        assert_eq!(window.start_label(), "03_15_24_09:00");
        assert_eq!(window.end_label(), "03_15_24_13:00");
        assert_eq!(window.start_iso(), "2024-03-15T09:00:00-07:00");
        assert_eq!(window.end_iso(), "2024-03-15T13:00:00-07:00");
        assert_eq!(window.batch_name(), "03_15_24_09:00__03_15_24_13:00");
    }

    #[test]
    fn test_resolve_uses_standard_time_offset_in_winter() {
        let now = Utc.with_ymd_and_hms(2024, 1, 10, 16, 5, 0).unwrap();
        let window = la_resolver().resolve(now);
        assert_eq!(window.end_iso(), "2024-01-10T08:00:00-08:00");
    }

    #[test]
    fn test_resolve_properties_hold_for_random_inputs() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..500 {
            let lag = TimeDelta::minutes(rng.random_range(0..120));
            let span = TimeDelta::minutes(rng.random_range(1..(60 * 24 * 30)));
            let secs = rng.random_range(946_684_800i64..2_000_000_000);
            let now = Utc.timestamp_opt(secs, 0).unwrap();

            let resolver =
                WindowResolver::new(chrono_tz::America::Los_Angeles, lag, span).unwrap();
            let window = resolver.resolve(now);

            assert!(window.start() < window.end());
            assert_eq!(window.end(), now - lag);
            assert_eq!(window.end() - window.start(), span);
        }
    }

    #[test]
    fn test_bounds_drop_subseconds() {
        let now = Utc.with_ymd_and_hms(2024, 3, 15, 20, 5, 0).unwrap() + TimeDelta::milliseconds(300);
        let window = la_resolver().resolve(now);

        assert_eq!(
            window.end().with_timezone(&Utc),
            Utc.with_ymd_and_hms(2024, 3, 15, 20, 0, 0).unwrap()
        );
        assert_eq!(window.end_iso(), "2024-03-15T13:00:00-07:00");
    }

    #[test]
    fn test_following_window_starts_at_previous_end() {
        let resolver = la_resolver();
        let first_trigger =
            Utc.with_ymd_and_hms(2024, 3, 15, 20, 5, 0).unwrap() + TimeDelta::milliseconds(300);
        let late_trigger =
            Utc.with_ymd_and_hms(2024, 3, 16, 0, 5, 1).unwrap() + TimeDelta::milliseconds(200);

        let first = resolver.resolve(first_trigger);
        let second =
            resolver.resolve_following(Some(first.end().with_timezone(&Utc)), late_trigger);

        assert_eq!(second.start(), first.end());
        assert_eq!(second.start_iso(), first.end_iso());
        assert_eq!(second.end_iso(), "2024-03-15T17:00:01-07:00");
    }

    #[test]
    fn test_following_ignores_previous_end_not_before_new_end() {
        let resolver = la_resolver();
        let trigger = Utc.with_ymd_and_hms(2024, 3, 15, 20, 5, 0).unwrap();
        let stale = Utc.with_ymd_and_hms(2024, 3, 15, 21, 0, 0).unwrap();

        assert_eq!(
            resolver.resolve_following(Some(stale), trigger),
            resolver.resolve(trigger)
        );
    }

    #[test]
    fn test_same_window_yields_same_batch_name() {
        let now = Utc.with_ymd_and_hms(2024, 6, 1, 12, 5, 0).unwrap();
        let resolver = la_resolver();
        assert_eq!(
            resolver.resolve(now).batch_name(),
            resolver.resolve(now).batch_name()
        );
        assert_eq!(resolver.resolve(now), resolver.resolve(now));
    }

    #[test]
    fn test_window_is_half_open() {
        let now = Utc.with_ymd_and_hms(2024, 6, 1, 12, 5, 0).unwrap();
        let window = la_resolver().resolve(now);
        let start = window.start().with_timezone(&Utc);
        let end = window.end().with_timezone(&Utc);

        assert!(window.contains(start));
        assert!(window.contains(end - TimeDelta::seconds(1)));
        assert!(!window.contains(end));
    }

    #[test]
    fn test_resolve_between_rejects_inverted_bounds() {
        let a = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let b = Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap();
        let resolver = la_resolver();

        assert!(resolver.resolve_between(a, b).is_ok());
        assert!(matches!(
            resolver.resolve_between(b, a),
            Err(WindowError::Inverted { .. })
        ));
        assert!(resolver.resolve_between(a, a).is_err());
    }

    #[test]
    fn test_new_rejects_bad_offsets() {
        let tz = chrono_tz::America::Los_Angeles;
        assert_eq!(
            WindowResolver::new(tz, TimeDelta::minutes(-1), TimeDelta::hours(1)).unwrap_err(),
            WindowError::NegativeLag
        );
        assert_eq!(
            WindowResolver::new(tz, TimeDelta::zero(), TimeDelta::zero()).unwrap_err(),
            WindowError::EmptySpan
        );
    }
}
