//! Periodic run triggering.
//!
//! `Schedule` computes trigger instants (minute `M` of every `N`th local
//! hour, like the cron line `M */N * * *`). `Scheduler` owns the background
//! loop that sleeps until the next trigger and starts a run. Each run's
//! window is derived from its trigger instant and starts where the previous
//! scheduled window ended, so a DST change or a late wake-up leaves no gap.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{DateTime, LocalResult, NaiveDate, TimeZone, Utc};
use chrono_tz::Tz;
use thiserror::Error;
use tokio::sync::{broadcast, Mutex};
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::config::ScheduleConfig;
use crate::pipeline::{PipelineRunner, RunOutcome};
use crate::window::WindowResolver;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ScheduleError {
    #[error("minute must be in 0..60, got {0}")]
    InvalidMinute(u32),

    #[error("every_hours must be in 1..=24, got {0}")]
    InvalidInterval(u32),
}

/// Trigger times in a fixed timezone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Schedule {
    timezone: Tz,
    minute: u32,
    every_hours: u32,
}

impl Schedule {
    pub fn new(timezone: Tz, minute: u32, every_hours: u32) -> Result<Self, ScheduleError> {
        if minute >= 60 {
            return Err(ScheduleError::InvalidMinute(minute));
        }
        if every_hours == 0 || every_hours > 24 {
            return Err(ScheduleError::InvalidInterval(every_hours));
        }
        Ok(Self {
            timezone,
            minute,
            every_hours,
        })
    }

    pub fn from_config(config: &ScheduleConfig, timezone: Tz) -> Result<Self, ScheduleError> {
        Self::new(timezone, config.minute, config.every_hours)
    }

    pub fn timezone(&self) -> Tz {
        self.timezone
    }

    /// First trigger strictly after `now`.
    ///
    /// Local times skipped by a DST change never fire; local times repeated
    /// by one fire once, at their first occurrence.
    pub fn next_after(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        let mut date = now.with_timezone(&self.timezone).date_naive();

        // Two days always contain a trigger; the third covers a DST gap
        // swallowing the last one of the day.
        for _ in 0..3 {
            if let Some(next) = self.first_on(date, now) {
                return Some(next);
            }
            date = date.succ_opt()?;
        }
        None
    }

    fn first_on(&self, date: NaiveDate, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        (0..24)
            .step_by(self.every_hours as usize)
            .filter_map(|hour| date.and_hms_opt(hour, self.minute, 0))
            .filter_map(|naive| match self.timezone.from_local_datetime(&naive) {
                LocalResult::None => None,
                local => local.earliest(),
            })
            .map(|local| local.with_timezone(&Utc))
            .find(|instant| *instant > now)
    }
}

/// Runs the pipeline on a schedule until stopped.
pub struct Scheduler {
    schedule: Schedule,
    resolver: WindowResolver,
    runner: Arc<PipelineRunner>,
    running: Arc<AtomicBool>,
    shutdown_tx: broadcast::Sender<()>,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl Scheduler {
    pub fn new(schedule: Schedule, resolver: WindowResolver, runner: Arc<PipelineRunner>) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);
        Self {
            schedule,
            resolver,
            runner,
            running: Arc::new(AtomicBool::new(false)),
            shutdown_tx,
            handle: Mutex::new(None),
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Start the scheduler (spawns the trigger loop).
    pub async fn start(&self) {
        if self.running.swap(true, Ordering::SeqCst) {
            warn!("Scheduler already running");
            return;
        }

        let schedule = self.schedule;
        let resolver = self.resolver.clone();
        let runner = Arc::clone(&self.runner);
        let running = Arc::clone(&self.running);
        let mut shutdown_rx = self.shutdown_tx.subscribe();

        let handle = tokio::spawn(async move {
            info!("Scheduler loop started");
            let mut previous_end: Option<DateTime<Utc>> = None;
            loop {
                let now = Utc::now();
                let Some(next) = schedule.next_after(now) else {
                    error!("No upcoming trigger time; scheduler stopping");
                    break;
                };
                let wait = (next - now).to_std().unwrap_or_default();
                info!(
                    "Next run at {}",
                    next.with_timezone(&schedule.timezone()).to_rfc3339()
                );

                tokio::select! {
                    _ = shutdown_rx.recv() => {
                        info!("Scheduler loop received shutdown signal");
                        break;
                    }
                    _ = tokio::time::sleep(wait) => {
                        if !running.load(Ordering::Relaxed) {
                            break;
                        }
                        let window = resolver.resolve_following(previous_end, next);
                        let end = window.end().with_timezone(&Utc);
                        let report = runner.run(window).await;
                        // A failed window is folded into the next one.
                        if matches!(
                            report.outcome,
                            RunOutcome::Delivered { .. } | RunOutcome::NoOrders
                        ) {
                            previous_end = Some(end);
                        }
                        info!(
                            run_id = %report.run_id,
                            outcome = ?report.outcome,
                            "Scheduled run complete"
                        );
                    }
                }
            }
            running.store(false, Ordering::SeqCst);
            info!("Scheduler loop stopped");
        });
        *self.handle.lock().await = Some(handle);
    }

    /// Stop the scheduler and wait for the loop to exit. A run already in
    /// progress finishes first.
    pub async fn stop(&self) {
        if !self.running.swap(false, Ordering::SeqCst) {
            warn!("Scheduler not running");
            return;
        }
        info!("Stopping scheduler");
        let _ = self.shutdown_tx.send(());

        if let Some(handle) = self.handle.lock().await.take() {
            if let Err(e) = handle.await {
                error!("Scheduler loop ended abnormally: {}", e);
            }
        }
    }
}
