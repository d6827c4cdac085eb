//! Reminder clock
//!
//! Re-evaluated on a fixed interval. Each tick derives the lock state and the
//! daily quote from the wall clock and the stored preferences, and fires the
//! daily notification at most once per calendar day.
//!
//! The delivery trigger is stricter than the unlock rule: it needs the current
//! minute to *equal* the reminder time. A tick that never lands in that minute
//! (suspended process, time changed) skips the day's notification; it is not
//! retried later.

use chrono::{NaiveDate, NaiveDateTime};
use log::{debug, info};
use std::fmt;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::delivery::{DeliveryChannel, DeliveryResult, NotificationPayload, TEST_MESSAGE};
use crate::quote::QuoteCatalog;
use crate::schedule::{self, ReminderTime};
use crate::storage::Preferences;

/// Default polling interval
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(15);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LockState {
    /// Before today's reminder time
    Locked,
    /// At or after today's reminder time
    Unlocked,
}

impl fmt::Display for LockState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            LockState::Locked => "locked",
            LockState::Unlocked => "unlocked",
        })
    }
}

/// Read-only view of the clock published after every evaluation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClockSnapshot {
    pub today: NaiveDate,
    pub now: ReminderTime,
    pub reminder_time: ReminderTime,
    pub lock: LockState,
    pub quote: String,
    pub last_notified: Option<NaiveDate>,
}

impl ClockSnapshot {
    /// What the presentation should show: the quote once unlocked, a teaser before
    pub fn display_text(&self) -> String {
        match self.lock {
            LockState::Locked => format!("Inspiration unlocks at {}", self.reminder_time),
            LockState::Unlocked => format!("\"{}\"", self.quote),
        }
    }

    pub fn notified_today(&self) -> bool {
        self.last_notified == Some(self.today)
    }
}

/// Result of one evaluation
#[derive(Debug, Clone)]
pub struct TickReport {
    pub snapshot: ClockSnapshot,
    /// Set when the daily trigger fired on this tick
    pub delivery: Option<DeliveryResult>,
}

/// A notification the clock decided to send, delivered after the clock is released
pub struct PendingDelivery {
    reason: String,
    payload: NotificationPayload,
    channel: Arc<DeliveryChannel>,
}

impl PendingDelivery {
    pub fn payload(&self) -> &NotificationPayload {
        &self.payload
    }

    pub async fn deliver(self) -> DeliveryResult {
        let result = self.channel.deliver(&self.payload).await;
        info!("{}: {:?}", self.reason, result);
        result
    }
}

pub struct ReminderClock {
    prefs: Preferences,
    catalog: QuoteCatalog,
    channel: Arc<DeliveryChannel>,
    icon: Option<String>,
    snapshot_tx: watch::Sender<ClockSnapshot>,
}

impl ReminderClock {
    /// Create a clock whose initial state reflects the current wall clock
    pub fn new(
        prefs: Preferences,
        catalog: QuoteCatalog,
        channel: Arc<DeliveryChannel>,
        icon: Option<String>,
    ) -> Self {
        Self::new_at(prefs, catalog, channel, icon, schedule::local_now())
    }

    /// Create a clock whose initial state reflects `now`. Nothing is delivered.
    pub fn new_at(
        prefs: Preferences,
        catalog: QuoteCatalog,
        channel: Arc<DeliveryChannel>,
        icon: Option<String>,
        now: NaiveDateTime,
    ) -> Self {
        let initial = Self::evaluate(&prefs, &catalog, now);
        let (snapshot_tx, _) = watch::channel(initial);
        Self {
            prefs,
            catalog,
            channel,
            icon,
            snapshot_tx,
        }
    }

    fn evaluate(prefs: &Preferences, catalog: &QuoteCatalog, now: NaiveDateTime) -> ClockSnapshot {
        let today = now.date();
        let current = ReminderTime::from_time(now.time());
        let reminder_time = prefs.reminder_time();
        let lock = if current >= reminder_time {
            LockState::Unlocked
        } else {
            LockState::Locked
        };

        ClockSnapshot {
            today,
            now: current,
            reminder_time,
            lock,
            quote: catalog.select(today).to_string(),
            last_notified: prefs.last_notified(),
        }
    }

    /// Receive every snapshot published from now on
    pub fn subscribe(&self) -> watch::Receiver<ClockSnapshot> {
        self.snapshot_tx.subscribe()
    }

    pub fn snapshot(&self) -> ClockSnapshot {
        self.snapshot_tx.borrow().clone()
    }

    pub fn reminder_time(&self) -> ReminderTime {
        self.prefs.reminder_time()
    }

    /// Store a new reminder time. It takes effect on the next evaluation.
    ///
    /// Does not touch the last-notified day, so moving the time after
    /// today's notification fired does not produce a second one.
    pub fn set_reminder_time(&mut self, time: ReminderTime) {
        info!("Reminder time set to {}", time);
        self.prefs.set_reminder_time(time);
    }

    /// Evaluate at the current wall-clock time. See [`advance_at`](Self::advance_at).
    pub fn advance(&mut self) -> (ClockSnapshot, Option<PendingDelivery>) {
        self.advance_at(schedule::local_now())
    }

    /// Evaluate the clock at `now` and publish the snapshot.
    ///
    /// When the daily trigger fires the day is recorded right away and the
    /// notification is returned for the caller to deliver, so nothing slow
    /// runs while the clock is borrowed.
    pub fn advance_at(&mut self, now: NaiveDateTime) -> (ClockSnapshot, Option<PendingDelivery>) {
        let mut snapshot = Self::evaluate(&self.prefs, &self.catalog, now);

        let mut pending = None;
        if snapshot.now == snapshot.reminder_time && snapshot.last_notified != Some(snapshot.today)
        {
            self.prefs.set_last_notified(snapshot.today);
            snapshot.last_notified = Some(snapshot.today);
            pending = Some(PendingDelivery {
                reason: format!(
                    "Daily reminder for {} at {}",
                    snapshot.today, snapshot.reminder_time
                ),
                payload: NotificationPayload::branded(snapshot.quote.clone(), self.icon.clone()),
                channel: self.channel.clone(),
            });
        }

        let previous = self.snapshot_tx.send_replace(snapshot.clone());
        if previous.lock != snapshot.lock {
            info!("Quote {} at {} {}", snapshot.lock, snapshot.today, snapshot.now);
        } else {
            debug!("Tick at {} {}: {}", snapshot.today, snapshot.now, snapshot.lock);
        }

        (snapshot, pending)
    }

    pub async fn tick(&mut self) -> TickReport {
        self.tick_at(schedule::local_now()).await
    }

    /// Evaluate the clock at `now` and deliver anything it triggered
    pub async fn tick_at(&mut self, now: NaiveDateTime) -> TickReport {
        let (snapshot, pending) = self.advance_at(now);
        let delivery = match pending {
            Some(pending) => Some(pending.deliver().await),
            None => None,
        };
        TickReport { snapshot, delivery }
    }

    /// The diagnostic message, ignoring both the time and the date gate.
    /// The last-notified day is left untouched.
    pub fn test_delivery(&self) -> PendingDelivery {
        PendingDelivery {
            reason: "Test notification".to_string(),
            payload: NotificationPayload::branded(TEST_MESSAGE, self.icon.clone()),
            channel: self.channel.clone(),
        }
    }

    pub async fn send_test(&self) -> DeliveryResult {
        self.test_delivery().deliver().await
    }
}

/// Periodic evaluation task. Ticks never overlap: the next one waits for the
/// previous delivery. The task is aborted on drop.
pub struct Poller {
    handle: JoinHandle<()>,
}

impl Poller {
    /// Start ticking `clock` every `period`, beginning immediately.
    /// Must be called from within a Tokio runtime.
    pub fn spawn(clock: Arc<Mutex<ReminderClock>>, period: Duration) -> Self {
        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                interval.tick().await;
                let (_, pending) = clock.lock().unwrap().advance();
                if let Some(pending) = pending {
                    pending.deliver().await;
                }
            }
        });
        Self { handle }
    }

    pub fn is_running(&self) -> bool {
        !self.handle.is_finished()
    }
}

impl Drop for Poller {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
