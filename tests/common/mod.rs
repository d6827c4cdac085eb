//! Common test utilities for integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};
use daily_spark::delivery::{BackgroundHandler, DeliveryError, RegistrationError};
use daily_spark::{
    DeliveryChannel, KeepAlive, MemoryStore, NotificationPayload, NotificationPlatform,
    PermissionState, PlaybackOutcome, Preferences, QuoteCatalog, ReminderClock, Settings,
    SparkServerHandler,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub type Shown = Arc<Mutex<Vec<NotificationPayload>>>;

/// Platform that records every notification instead of showing it
pub struct RecordingPlatform {
    answer: PermissionState,
    registration_fails: bool,
    pub direct: Shown,
    pub background: Shown,
    pub prompts: AtomicUsize,
    /// How long a direct notification takes to reach the server
    pub show_delay: Duration,
}

impl RecordingPlatform {
    /// Grants permission when asked and registers a background handler
    pub fn granting() -> Self {
        Self::new(PermissionState::Granted, false)
    }

    pub fn new(answer: PermissionState, registration_fails: bool) -> Self {
        Self {
            answer,
            registration_fails,
            direct: Arc::new(Mutex::new(Vec::new())),
            background: Arc::new(Mutex::new(Vec::new())),
            prompts: AtomicUsize::new(0),
            show_delay: Duration::ZERO,
        }
    }

    /// Platform whose direct notifications block for `delay`
    pub fn slow(answer: PermissionState, registration_fails: bool, delay: Duration) -> Self {
        Self {
            show_delay: delay,
            ..Self::new(answer, registration_fails)
        }
    }

    pub fn direct_count(&self) -> usize {
        self.direct.lock().unwrap().len()
    }

    pub fn background_count(&self) -> usize {
        self.background.lock().unwrap().len()
    }

    pub fn total(&self) -> usize {
        self.direct_count() + self.background_count()
    }

    pub fn prompt_count(&self) -> usize {
        self.prompts.load(Ordering::SeqCst)
    }
}

struct RecordingHandler {
    shown: Shown,
}

impl BackgroundHandler for RecordingHandler {
    fn is_valid(&self) -> bool {
        true
    }

    fn show(&self, payload: &NotificationPayload) -> Result<(), DeliveryError> {
        self.shown.lock().unwrap().push(payload.clone());
        Ok(())
    }
}

#[async_trait]
impl NotificationPlatform for RecordingPlatform {
    fn initial_permission(&self) -> PermissionState {
        PermissionState::Default
    }

    async fn request_permission(&self) -> PermissionState {
        self.prompts.fetch_add(1, Ordering::SeqCst);
        self.answer
    }

    async fn register_background_handler(
        &self,
    ) -> Result<Box<dyn BackgroundHandler>, RegistrationError> {
        if self.registration_fails {
            return Err(RegistrationError::Failed(
                "notification worker failed to start".to_string(),
            ));
        }
        Ok(Box::new(RecordingHandler {
            shown: self.background.clone(),
        }))
    }

    fn show(&self, payload: &NotificationPayload) -> Result<(), DeliveryError> {
        if !self.show_delay.is_zero() {
            std::thread::sleep(self.show_delay);
        }
        self.direct.lock().unwrap().push(payload.clone());
        Ok(())
    }
}

/// Keep-alive with a fixed answer that counts start attempts
pub struct FixedKeepAlive {
    pub outcome: PlaybackOutcome,
    pub starts: AtomicUsize,
}

impl FixedKeepAlive {
    pub fn new(outcome: PlaybackOutcome) -> Self {
        Self {
            outcome,
            starts: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl KeepAlive for FixedKeepAlive {
    async fn start(&self) -> PlaybackOutcome {
        self.starts.fetch_add(1, Ordering::SeqCst);
        self.outcome
    }
}

pub fn at(date: NaiveDate, hour: u32, minute: u32) -> NaiveDateTime {
    date.and_hms_opt(hour, minute, 0).unwrap()
}

pub fn day(month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, month, day).unwrap()
}

/// Channel over `platform` with permission already granted
pub async fn granted_channel(platform: Arc<RecordingPlatform>) -> Arc<DeliveryChannel> {
    let channel = Arc::new(DeliveryChannel::new(platform));
    channel.request_permission().await;
    channel
}

/// Clock over an in-memory store with the given reminder time
pub fn clock_with(
    channel: Arc<DeliveryChannel>,
    reminder_time: &str,
    now: NaiveDateTime,
) -> ReminderClock {
    let mut prefs = Preferences::new(MemoryStore::new());
    prefs.set_reminder_time(reminder_time.parse().unwrap());
    ReminderClock::new_at(prefs, QuoteCatalog::builtin(), channel, None, now)
}

/// Settings whose poller only evaluates once during a test
pub fn test_settings() -> Settings {
    let mut settings = Settings::with_state_file("unused.toml");
    settings.poll_interval = Duration::from_secs(60);
    settings
}

/// Server over an in-memory store that already recorded today's notification,
/// so the wall clock can never trigger the daily delivery during a test
pub async fn quiet_server(
    platform: Arc<RecordingPlatform>,
    keep_alive: Arc<FixedKeepAlive>,
) -> SparkServerHandler {
    let mut prefs = Preferences::new(MemoryStore::new());
    prefs.set_last_notified(daily_spark::schedule::local_date_today());
    let server = SparkServerHandler::from_parts(&test_settings(), prefs, platform, keep_alive).await;
    server.background_setup().await;
    server
}
