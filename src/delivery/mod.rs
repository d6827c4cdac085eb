//! Notification delivery
//!
//! A [`DeliveryChannel`] sits between the reminder clock and whatever actually
//! puts a notification on screen. It prefers a background handler (a worker
//! that keeps running while the client is not focused) and falls back to
//! showing notifications directly when no handler could be set up or the one
//! it had has stopped.
//!
//! Nothing here returns an error to the caller. Setup failures become
//! [`DeliveryChannelState::Error`], missing permission turns `deliver` into a
//! no-op, and show failures are reported as [`DeliveryResult::Failed`].

pub mod desktop;

use async_trait::async_trait;
use log::{debug, info, warn};
use std::fmt;
use std::sync::{Arc, Mutex};
use thiserror::Error;

pub use desktop::DesktopPlatform;

/// Title of every reminder notification
pub const NOTIFICATION_TITLE: &str = "Your daily inspiration ✨";
/// Body of the manual test notification
pub const TEST_MESSAGE: &str = "System check: your notifications are working! 🚀";
/// Vibration pattern in milliseconds (on, off, on)
pub const VIBRATION_PATTERN: [u32; 3] = [200, 100, 200];

/// Notification permission as reported by the platform
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PermissionState {
    /// Never decided
    Default,
    Granted,
    Denied,
}

impl fmt::Display for PermissionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            PermissionState::Default => "default",
            PermissionState::Granted => "granted",
            PermissionState::Denied => "denied",
        })
    }
}

/// Lifecycle of the background handler, independent of permission
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeliveryChannelState {
    Uninitialized,
    Active,
    Error,
    PermissionDenied,
}

impl fmt::Display for DeliveryChannelState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            DeliveryChannelState::Uninitialized => "uninitialized",
            DeliveryChannelState::Active => "active",
            DeliveryChannelState::Error => "error",
            DeliveryChannelState::PermissionDenied => "permission-denied",
        })
    }
}

/// Outcome of a single `deliver` call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryResult {
    /// Accepted by the background handler, which shows it asynchronously
    Background,
    /// Shown directly by the foreground fallback
    Foreground,
    /// Not attempted because permission is not granted
    Suppressed(PermissionState),
    /// Both paths were tried and failed
    Failed,
}

impl DeliveryResult {
    pub fn is_shown(&self) -> bool {
        matches!(self, DeliveryResult::Background | DeliveryResult::Foreground)
    }
}

/// Everything needed to render one notification
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationPayload {
    pub title: String,
    pub body: String,
    /// Icon name or path
    pub icon: Option<String>,
    /// Vibration pattern in milliseconds, honored only where the platform can vibrate
    pub vibrate: Vec<u32>,
    /// Keep the notification until the user dismisses it
    pub require_interaction: bool,
}

impl NotificationPayload {
    /// Branded payload with the standard options
    pub fn branded(body: impl Into<String>, icon: Option<String>) -> Self {
        Self {
            title: NOTIFICATION_TITLE.to_string(),
            body: body.into(),
            icon,
            vibrate: VIBRATION_PATTERN.to_vec(),
            require_interaction: true,
        }
    }
}

#[derive(Debug, Error)]
pub enum RegistrationError {
    #[error("background notifications are not supported here: {0}")]
    Unsupported(String),
    #[error("notification permission was denied")]
    PermissionDenied,
    #[error("background handler registration failed: {0}")]
    Failed(String),
}

#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("notification server unavailable: {0}")]
    Unavailable(String),
    #[error("background handler has stopped")]
    HandlerStopped,
}

/// A running background handler
pub trait BackgroundHandler: Send + Sync {
    /// Whether the handler can still accept notifications
    fn is_valid(&self) -> bool;

    /// Hand a notification over. Must not block.
    ///
    /// `Ok` means the handler accepted the payload, not that it is on screen
    /// yet. A handler that later fails to show it reports that through
    /// [`is_valid`](Self::is_valid), so the next delivery takes the direct path.
    fn show(&self, payload: &NotificationPayload) -> Result<(), DeliveryError>;
}

/// The host's notification facilities
#[async_trait]
pub trait NotificationPlatform: Send + Sync {
    /// Permission known at start-up, without prompting
    fn initial_permission(&self) -> PermissionState;

    /// Ask the user (or the host) for permission. Prompts at most once per call.
    async fn request_permission(&self) -> PermissionState;

    async fn register_background_handler(
        &self,
    ) -> Result<Box<dyn BackgroundHandler>, RegistrationError>;

    /// Show a notification directly, bypassing any background handler.
    /// May block on the notification server; called from the blocking pool.
    fn show(&self, payload: &NotificationPayload) -> Result<(), DeliveryError>;

    /// Whether the client runs as an installed, standalone app
    fn is_standalone(&self) -> bool {
        false
    }
}

struct ChannelInner {
    state: DeliveryChannelState,
    permission: PermissionState,
    background: Option<Box<dyn BackgroundHandler>>,
}

/// Two-tier delivery with cached permission
pub struct DeliveryChannel {
    platform: Arc<dyn NotificationPlatform>,
    inner: Mutex<ChannelInner>,
}

impl DeliveryChannel {
    pub fn new(platform: Arc<dyn NotificationPlatform>) -> Self {
        let permission = platform.initial_permission();
        Self {
            platform,
            inner: Mutex::new(ChannelInner {
                state: DeliveryChannelState::Uninitialized,
                permission,
                background: None,
            }),
        }
    }

    pub fn state(&self) -> DeliveryChannelState {
        self.inner.lock().unwrap().state
    }

    pub fn permission(&self) -> PermissionState {
        self.inner.lock().unwrap().permission
    }

    pub fn is_standalone(&self) -> bool {
        self.platform.is_standalone()
    }

    /// Ask the platform for permission and cache the answer
    pub async fn request_permission(&self) -> PermissionState {
        let permission = self.platform.request_permission().await;

        let mut inner = self.inner.lock().unwrap();
        if inner.permission != permission {
            info!("Notification permission: {} -> {}", inner.permission, permission);
        }
        inner.permission = permission;
        permission
    }

    /// Try to register a background handler. Never fails; the resulting
    /// state tells whether delivery will go through the handler or the
    /// direct fallback.
    pub async fn initialize_background_handler(&self) -> DeliveryChannelState {
        let result = self.platform.register_background_handler().await;

        let mut inner = self.inner.lock().unwrap();
        match result {
            Ok(handler) => {
                info!("Background notification handler registered");
                inner.background = Some(handler);
                inner.state = DeliveryChannelState::Active;
            }
            Err(RegistrationError::PermissionDenied) => {
                warn!("Background handler refused: permission denied, using direct notifications");
                inner.background = None;
                inner.state = DeliveryChannelState::PermissionDenied;
            }
            Err(e) => {
                warn!("{}, using direct notifications", e);
                inner.background = None;
                inner.state = DeliveryChannelState::Error;
            }
        }
        inner.state
    }

    /// Show a notification if permission is granted.
    ///
    /// Never prompts. Uses the background handler while it is valid and the
    /// direct path otherwise. The direct path talks to the notification
    /// server on the blocking pool, so a slow server only delays this call.
    pub async fn deliver(&self, payload: &NotificationPayload) -> DeliveryResult {
        {
            let mut inner = self.inner.lock().unwrap();

            if inner.permission != PermissionState::Granted {
                debug!(
                    "Notification suppressed, permission is {}: {}",
                    inner.permission, payload.body
                );
                return DeliveryResult::Suppressed(inner.permission);
            }

            if let Some(handler) = inner.background.as_ref() {
                let outcome = if handler.is_valid() {
                    handler.show(payload)
                } else {
                    Err(DeliveryError::HandlerStopped)
                };
                match outcome {
                    Ok(()) => {
                        info!("Notification handed to background handler");
                        return DeliveryResult::Background;
                    }
                    Err(e) => {
                        warn!("Background delivery failed ({}), falling back", e);
                        inner.background = None;
                        inner.state = DeliveryChannelState::Error;
                    }
                }
            }
        }

        let platform = self.platform.clone();
        let direct = payload.clone();
        match tokio::task::spawn_blocking(move || platform.show(&direct)).await {
            Ok(Ok(())) => {
                info!("Notification delivered directly");
                DeliveryResult::Foreground
            }
            Ok(Err(e)) => {
                warn!("Notification could not be shown: {}", e);
                DeliveryResult::Failed
            }
            Err(e) => {
                warn!("Direct notification did not complete: {}", e);
                DeliveryResult::Failed
            }
        }
    }
}
