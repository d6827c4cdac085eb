//! freedesktop.org notification backend
//!
//! The background handler is a dedicated worker thread that owns the
//! connection to the notification server. It reports ready as soon as the
//! server answers, without waiting for a first notification, and from then on
//! shows every payload it receives. Shown notifications get a watcher that
//! reacts to a click: the server dismisses the notification and the watcher
//! brings the application back by opening its root URL. Without a URL a click
//! only dismisses. At most [`MAX_CLICK_WATCHERS`] notifications are watched at
//! once; the rest are shown unwatched.

use async_trait::async_trait;
use log::{debug, info, warn};
use notify_rust::{Notification, Timeout, Urgency};
use std::process::{Command, Stdio};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, mpsc};
use std::thread;
use std::time::Duration;
use tokio::sync::oneshot;

use super::{
    BackgroundHandler, DeliveryError, NotificationPayload, NotificationPlatform, PermissionState,
    RegistrationError,
};

const REGISTRATION_TIMEOUT: Duration = Duration::from_secs(5);
const CLICK_ACTION: &str = "default";
/// Notifications waiting for a click at the same time, one thread each
pub const MAX_CLICK_WATCHERS: usize = 4;

/// Desktop notifications through the session's notification server
pub struct DesktopPlatform {
    app_name: String,
    open_url: Option<String>,
    enabled: bool,
}

impl DesktopPlatform {
    /// # Arguments
    /// * `app_name` - Application name shown by the notification server
    /// * `open_url` - Opened when a notification is clicked
    /// * `enabled` - `false` makes the platform report permission as denied
    pub fn new(app_name: impl Into<String>, open_url: Option<String>, enabled: bool) -> Self {
        Self {
            app_name: app_name.into(),
            open_url,
            enabled,
        }
    }
}

#[async_trait]
impl NotificationPlatform for DesktopPlatform {
    fn initial_permission(&self) -> PermissionState {
        if self.enabled {
            PermissionState::Default
        } else {
            PermissionState::Denied
        }
    }

    async fn request_permission(&self) -> PermissionState {
        if !self.enabled {
            return PermissionState::Denied;
        }

        // Desktops have no prompt; a reachable notification server is the grant.
        match tokio::task::spawn_blocking(notify_rust::get_server_information).await {
            Ok(Ok(server)) => {
                debug!("Notification server: {} {}", server.name, server.version);
                PermissionState::Granted
            }
            Ok(Err(e)) => {
                warn!("No notification server answered: {}", e);
                PermissionState::Default
            }
            Err(e) => {
                warn!("Permission probe did not complete: {}", e);
                PermissionState::Default
            }
        }
    }

    async fn register_background_handler(
        &self,
    ) -> Result<Box<dyn BackgroundHandler>, RegistrationError> {
        if !self.enabled {
            return Err(RegistrationError::PermissionDenied);
        }
        let worker = NotificationWorker::spawn(self.app_name.clone(), self.open_url.clone()).await?;
        Ok(Box::new(worker))
    }

    fn show(&self, payload: &NotificationPayload) -> Result<(), DeliveryError> {
        build_notification(&self.app_name, payload)
            .show()
            .map(|_| ())
            .map_err(|e| DeliveryError::Unavailable(e.to_string()))
    }

    fn is_standalone(&self) -> bool {
        // Set by systemd for every unit it starts
        std::env::var_os("INVOCATION_ID").is_some()
    }
}

fn build_notification(app_name: &str, payload: &NotificationPayload) -> Notification {
    let mut notification = Notification::new();
    notification
        .appname(app_name)
        .summary(&payload.title)
        .body(&payload.body)
        .action(CLICK_ACTION, "Open");
    if let Some(ref icon) = payload.icon {
        notification.icon(icon);
    }
    if payload.require_interaction {
        notification.timeout(Timeout::Never).urgency(Urgency::Critical);
    }
    notification
}

/// Worker thread holding the notification server connection
struct NotificationWorker {
    sender: mpsc::Sender<NotificationPayload>,
    thread: thread::JoinHandle<()>,
    healthy: Arc<AtomicBool>,
}

impl NotificationWorker {
    async fn spawn(app_name: String, open_url: Option<String>) -> Result<Self, RegistrationError> {
        let (ready_tx, ready_rx) = oneshot::channel::<Result<String, String>>();
        let (sender, receiver) = mpsc::channel::<NotificationPayload>();
        let healthy = Arc::new(AtomicBool::new(true));

        let worker_health = healthy.clone();
        let thread = thread::Builder::new()
            .name("spark-notify".to_string())
            .spawn(move || {
                match notify_rust::get_server_information() {
                    Ok(server) => {
                        let _ = ready_tx.send(Ok(server.name));
                    }
                    Err(e) => {
                        let _ = ready_tx.send(Err(e.to_string()));
                        return;
                    }
                }

                let watchers = WatcherSlots::new(MAX_CLICK_WATCHERS);
                serve(receiver, &worker_health, |payload| {
                    show_and_watch(&app_name, payload, open_url.clone(), &watchers)
                });
                debug!("Notification worker stopped");
            })
            .map_err(|e| RegistrationError::Failed(e.to_string()))?;

        match tokio::time::timeout(REGISTRATION_TIMEOUT, ready_rx).await {
            Ok(Ok(Ok(server))) => {
                info!("Notification worker ready (server: {})", server);
                Ok(Self {
                    sender,
                    thread,
                    healthy,
                })
            }
            Ok(Ok(Err(e))) => Err(RegistrationError::Unsupported(e)),
            Ok(Err(_)) => Err(RegistrationError::Failed(
                "worker exited before becoming ready".to_string(),
            )),
            Err(_) => Err(RegistrationError::Failed(
                "timed out waiting for the notification server".to_string(),
            )),
        }
    }
}

impl BackgroundHandler for NotificationWorker {
    fn is_valid(&self) -> bool {
        self.healthy.load(Ordering::SeqCst) && !self.thread.is_finished()
    }

    fn show(&self, payload: &NotificationPayload) -> Result<(), DeliveryError> {
        self.sender
            .send(payload.clone())
            .map_err(|_| DeliveryError::HandlerStopped)
    }
}

/// Show queued payloads until the sender is gone. The first payload that
/// cannot be shown marks the worker unhealthy.
fn serve(
    receiver: mpsc::Receiver<NotificationPayload>,
    healthy: &AtomicBool,
    mut show: impl FnMut(&NotificationPayload) -> bool,
) {
    for payload in receiver {
        if !show(&payload) && healthy.swap(false, Ordering::SeqCst) {
            warn!("Notification worker unhealthy, later notifications go direct");
        }
    }
}

/// Bounded number of click watchers
struct WatcherSlots {
    live: Arc<AtomicUsize>,
    limit: usize,
}

/// Held by a watcher thread for as long as it waits
struct WatcherSlot {
    live: Arc<AtomicUsize>,
}

impl WatcherSlots {
    fn new(limit: usize) -> Self {
        Self {
            live: Arc::new(AtomicUsize::new(0)),
            limit,
        }
    }

    fn try_acquire(&self) -> Option<WatcherSlot> {
        self.live
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| {
                (n < self.limit).then_some(n + 1)
            })
            .ok()
            .map(|_| WatcherSlot {
                live: self.live.clone(),
            })
    }
}

impl Drop for WatcherSlot {
    fn drop(&mut self) {
        self.live.fetch_sub(1, Ordering::SeqCst);
    }
}

fn show_and_watch(
    app_name: &str,
    payload: &NotificationPayload,
    open_url: Option<String>,
    watchers: &WatcherSlots,
) -> bool {
    let handle = match build_notification(app_name, payload).show() {
        Ok(handle) => handle,
        Err(e) => {
            warn!("Worker could not show notification: {}", e);
            return false;
        }
    };

    let Some(slot) = watchers.try_acquire() else {
        debug!(
            "{} notifications already await a click, not watching this one",
            MAX_CLICK_WATCHERS
        );
        return true;
    };

    // Blocks until the notification is clicked or closed
    let watcher = thread::Builder::new()
        .name("spark-notify-click".to_string())
        .spawn(move || {
            let _slot = slot;
            handle.wait_for_action(|action| {
                if action == CLICK_ACTION {
                    open_client(open_url.as_deref());
                }
            });
        });
    if let Err(e) = watcher {
        warn!("Click handling unavailable for this notification: {}", e);
    }
    true
}

/// Command that brings the application forward after a click
fn click_command(open_url: Option<&str>) -> Option<Command> {
    let url = open_url?;
    let mut command = Command::new("xdg-open");
    command.arg(url).stdout(Stdio::null()).stderr(Stdio::null());
    Some(command)
}

fn open_client(open_url: Option<&str>) {
    let Some(mut command) = click_command(open_url) else {
        info!("Notification clicked and dismissed, no application URL configured");
        return;
    };

    info!("Notification clicked, opening the application");
    if let Err(e) = command.spawn() {
        warn!("Failed to open application: {}", e);
    }
}
