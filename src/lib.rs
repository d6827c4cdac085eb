//! Daily Spark MCP Server Library
//!
//! This library provides a Model Context Protocol (MCP) server for a daily
//! reminder: at a chosen time of day it unlocks a rotating quote and fires a
//! local desktop notification, at most once per calendar day.
//!
//! # Architecture
//!
//! The library follows a 3-layer architecture:
//! - **MCP Layer**: `SparkServerHandler` - exposes status and user actions to a client
//! - **Domain Layer**: `clock`, `quote`, `delivery`, `keepalive` - reminder logic and its collaborators
//! - **Persistence Layer**: `storage` module - TOML-backed preferences
//!
//! # Example
//!
//! ```no_run
//! use daily_spark::{Settings, SparkServerHandler};
//! use anyhow::Result;
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<()> {
//!     let settings = Settings::with_state_file("spark.toml");
//!     let handler = SparkServerHandler::new(&settings).await?;
//!     // Use handler with MCP server...
//!     Ok(())
//! }
//! ```

pub mod clock;
pub mod config;
pub mod delivery;
mod formatting;
mod handlers;
pub mod keepalive;
pub mod quote;
pub mod schedule;
pub mod storage;
mod validation;

use anyhow::Result;
use log::info;
use mcp_attr::Result as McpResult;
use mcp_attr::server::{McpServer, mcp_server};
use std::sync::{Arc, Mutex};
use tokio::task::JoinHandle;

// Re-export commonly used types
pub use clock::{ClockSnapshot, LockState, PendingDelivery, Poller, ReminderClock};
pub use config::{Args, Settings};
pub use delivery::{
    DeliveryChannel, DeliveryChannelState, DeliveryResult, DesktopPlatform, NotificationPayload,
    NotificationPlatform, PermissionState,
};
pub use keepalive::{KeepAlive, KeepAliveStatus, PlaybackOutcome};
pub use quote::QuoteCatalog;
pub use schedule::ReminderTime;
pub use storage::{MemoryStore, PreferenceStore, Preferences, Storage};

/// Application name reported to the notification server
pub const APP_NAME: &str = "Daily Spark";

/// MCP Server handler for the daily reminder
///
/// Owns the reminder clock and its polling task. Clients change preferences
/// and trigger user actions through the tools; the clock keeps running in the
/// background for as long as the handler lives.
pub struct SparkServerHandler {
    pub(crate) clock: Arc<Mutex<ReminderClock>>,
    pub(crate) channel: Arc<DeliveryChannel>,
    pub(crate) keep_alive: Arc<dyn KeepAlive>,
    pub(crate) keep_alive_status: Mutex<KeepAliveStatus>,
    registration: tokio::sync::Mutex<Option<JoinHandle<DeliveryChannelState>>>,
    poller: Poller,
}

impl SparkServerHandler {
    /// Create a handler backed by the preferences file and the desktop
    /// notification server. Must be called from within a Tokio runtime.
    ///
    /// # Example
    /// ```no_run
    /// # use daily_spark::{Settings, SparkServerHandler};
    /// # async fn run() -> anyhow::Result<()> {
    /// let handler = SparkServerHandler::new(&Settings::with_state_file("spark.toml")).await?;
    /// # Ok(())
    /// # }
    /// ```
    pub async fn new(settings: &Settings) -> Result<Self> {
        let storage = Storage::open(&settings.state_file)?;
        let platform = Arc::new(DesktopPlatform::new(
            APP_NAME,
            settings.open_url.clone(),
            settings.notifications_enabled,
        ));

        let keep_alive: Arc<dyn KeepAlive> = match settings
            .keep_alive_cmd
            .as_deref()
            .and_then(keepalive::InhibitorKeepAlive::from_command_line)
        {
            Some(inhibitor) => Arc::new(inhibitor),
            None => Arc::new(keepalive::DisabledKeepAlive),
        };

        Ok(Self::from_parts(settings, Preferences::new(storage), platform, keep_alive).await)
    }

    /// Assemble a handler from explicit collaborators
    ///
    /// Starts background-handler registration without waiting for it and
    /// starts the polling task, which evaluates the clock right away.
    pub async fn from_parts(
        settings: &Settings,
        prefs: Preferences,
        platform: Arc<dyn NotificationPlatform>,
        keep_alive: Arc<dyn KeepAlive>,
    ) -> Self {
        let channel = Arc::new(DeliveryChannel::new(platform));
        if settings.request_permission {
            channel.request_permission().await;
        }

        let registration = {
            let channel = channel.clone();
            tokio::spawn(async move { channel.initialize_background_handler().await })
        };

        let clock = Arc::new(Mutex::new(ReminderClock::new(
            prefs,
            settings.catalog.clone(),
            channel.clone(),
            settings.icon.clone(),
        )));
        let poller = Poller::spawn(clock.clone(), settings.poll_interval);
        info!(
            "Reminder clock started (every {}s)",
            settings.poll_interval.as_secs()
        );

        Self {
            clock,
            channel,
            keep_alive,
            keep_alive_status: Mutex::new(KeepAliveStatus::Idle),
            registration: tokio::sync::Mutex::new(Some(registration)),
            poller,
        }
    }

    /// Wait for background-handler registration to finish and return the channel state
    pub async fn background_setup(&self) -> DeliveryChannelState {
        let pending = self.registration.lock().await.take();
        match pending {
            Some(task) => task.await.unwrap_or(DeliveryChannelState::Error),
            None => self.channel.state(),
        }
    }

    /// Latest published clock state
    pub fn snapshot(&self) -> ClockSnapshot {
        self.clock.lock().unwrap().snapshot()
    }

    /// Receive a snapshot after every evaluation
    pub fn subscribe(&self) -> tokio::sync::watch::Receiver<ClockSnapshot> {
        self.clock.lock().unwrap().subscribe()
    }

    pub fn is_polling(&self) -> bool {
        self.poller.is_running()
    }
}

/// Daily inspiration reminder.
///
/// At the configured reminder time each day the daily quote unlocks and a
/// desktop notification carrying it is sent (once per day). Before that time
/// the quote stays locked.
///
/// Key concepts:
/// - **reminder time**: 24h HH:MM, default 08:00
/// - **locked/unlocked**: whether today's reminder time has passed
/// - **activate**: saves the time, asks for notification permission, keeps the app awake
/// - **test_notification**: sends a diagnostic notification right away
#[mcp_server]
impl McpServer for SparkServerHandler {
    /// **Status**: Today's quote (or when it unlocks), reminder time, and the
    /// permission / background / installed indicators.
    #[tool]
    async fn status(&self) -> McpResult<String> {
        self.handle_status().await
    }

    /// **Activate**: Save the reminder time, request notification permission
    /// and start the keep-alive. Call this once after choosing a time.
    #[tool]
    async fn activate(
        &self,
        /// Reminder time HH:MM (24h). Empty keeps the current time.
        time: Option<String>,
    ) -> McpResult<String> {
        self.handle_activate(time).await
    }

    /// **Reminder time**: Change the time of day the quote unlocks and the notification fires.
    /// A notification already sent today is not repeated.
    #[tool]
    async fn set_reminder_time(
        &self,
        /// Reminder time HH:MM (24h), e.g. "08:00"
        time: String,
    ) -> McpResult<String> {
        self.handle_set_reminder_time(time).await
    }

    /// **Test**: Send a diagnostic notification now, regardless of time and of today's notification.
    #[tool]
    async fn test_notification(&self) -> McpResult<String> {
        self.handle_test_notification().await
    }

    /// **Quote**: Today's quote if unlocked, otherwise when it unlocks.
    #[tool]
    async fn today_quote(&self) -> McpResult<String> {
        self.handle_today_quote().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::delivery::{BackgroundHandler, DeliveryError, RegistrationError};
    use async_trait::async_trait;
    use std::time::Duration;
    use tempfile::NamedTempFile;

    /// Direct-only platform that grants permission
    struct DirectPlatform;

    #[async_trait]
    impl NotificationPlatform for DirectPlatform {
        fn initial_permission(&self) -> PermissionState {
            PermissionState::Default
        }

        async fn request_permission(&self) -> PermissionState {
            PermissionState::Granted
        }

        async fn register_background_handler(
            &self,
        ) -> std::result::Result<Box<dyn BackgroundHandler>, RegistrationError> {
            Err(RegistrationError::Unsupported("test".into()))
        }

        fn show(&self, _payload: &NotificationPayload) -> std::result::Result<(), DeliveryError> {
            Ok(())
        }
    }

    async fn get_test_handler(temp_file: &NamedTempFile) -> SparkServerHandler {
        let mut settings = Settings::with_state_file(temp_file.path());
        settings.poll_interval = Duration::from_secs(60);
        let storage = Storage::open(temp_file.path()).unwrap();
        SparkServerHandler::from_parts(
            &settings,
            Preferences::new(storage),
            Arc::new(DirectPlatform),
            Arc::new(keepalive::DisabledKeepAlive),
        )
        .await
    }

    #[tokio::test]
    async fn test_reminder_time_persists_across_handlers() {
        let temp_file = NamedTempFile::new().unwrap();

        let handler = get_test_handler(&temp_file).await;
        let result = handler.set_reminder_time("19:30".to_string()).await.unwrap();
        assert!(result.contains("19:30"));
        drop(handler);

        let handler2 = get_test_handler(&temp_file).await;
        assert_eq!(handler2.snapshot().reminder_time.to_string(), "19:30");
        let status = handler2.status().await.unwrap();
        assert!(status.contains("Reminder time: 19:30"));
    }

    #[tokio::test]
    async fn test_activate_tool() {
        let temp_file = NamedTempFile::new().unwrap();
        let handler = get_test_handler(&temp_file).await;

        let result = handler.activate(Some("07:15".to_string())).await.unwrap();
        assert!(result.contains("See you at 07:15"));
        // DisabledKeepAlive never starts
        assert!(result.contains("Keep-alive: denied"));
        assert_eq!(handler.background_setup().await, DeliveryChannelState::Error);

        let result = handler.test_notification().await.unwrap();
        assert!(result.contains("sent directly"));
    }

    #[tokio::test]
    async fn test_today_quote_tool() {
        let temp_file = NamedTempFile::new().unwrap();
        let handler = get_test_handler(&temp_file).await;

        let snapshot = handler.snapshot();
        let quote = handler.today_quote().await.unwrap();
        match snapshot.lock {
            LockState::Unlocked => assert_eq!(quote, snapshot.quote),
            LockState::Locked => assert!(quote.starts_with("Inspiration unlocks at")),
        }
    }
}
