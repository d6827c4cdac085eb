//! Formatting helper functions for the MCP tools
//!
//! Renders the clock snapshot and the status indicators as plain text.

use crate::clock::{ClockSnapshot, LockState};
use crate::delivery::{DeliveryChannelState, DeliveryResult, PermissionState};
use crate::keepalive::KeepAliveStatus;

/// Status indicators shown next to the quote
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Indicators {
    pub permission: PermissionState,
    pub channel: DeliveryChannelState,
    pub keep_alive: KeepAliveStatus,
    pub standalone: bool,
}

impl Indicators {
    /// Single background indicator: an active keep-alive wins, then a
    /// failed background handler, then the keep-alive status.
    pub fn background(&self) -> &'static str {
        match (self.keep_alive, self.channel) {
            (KeepAliveStatus::Active, _) => "active",
            (_, DeliveryChannelState::Error) => "error",
            (KeepAliveStatus::Denied, _) => "denied",
            (KeepAliveStatus::Idle, _) => "idle",
        }
    }
}

fn yes_no(value: bool) -> &'static str {
    if value { "yes" } else { "no" }
}

/// Format the full status board
///
/// # Arguments
/// * `snapshot` - Latest clock snapshot
/// * `indicators` - Permission, background and install indicators
pub fn format_status(snapshot: &ClockSnapshot, indicators: &Indicators) -> String {
    let mut result = String::new();

    result.push_str(&format!("{}\n\n", snapshot.display_text()));
    result.push_str(&format!(
        "Reminder time: {} ({})\n",
        snapshot.reminder_time, snapshot.lock
    ));
    result.push_str(&format!(
        "Today: {} (notified: {})\n",
        snapshot.today,
        yes_no(snapshot.notified_today())
    ));
    result.push_str(&format!("Permission: {}\n", indicators.permission));
    result.push_str(&format!(
        "Background: {} (handler: {}, keep-alive: {})\n",
        indicators.background(),
        indicators.channel,
        indicators.keep_alive
    ));
    result.push_str(&format!("Installed: {}\n", yes_no(indicators.standalone)));

    result
}

/// Format today's quote or the locked teaser
pub fn format_quote(snapshot: &ClockSnapshot) -> String {
    match snapshot.lock {
        LockState::Unlocked => snapshot.quote.clone(),
        LockState::Locked => snapshot.display_text(),
    }
}

/// Describe a delivery outcome for the client
pub fn format_delivery(result: DeliveryResult) -> String {
    match result {
        DeliveryResult::Background => "Notification sent via background handler".to_string(),
        DeliveryResult::Foreground => "Notification sent directly".to_string(),
        DeliveryResult::Suppressed(permission) => format!(
            "Notification not sent: permission is {}. Enable notifications and run activate again.",
            permission
        ),
        DeliveryResult::Failed => {
            "Notification could not be shown. Check that a notification server is running."
                .to_string()
        }
    }
}
