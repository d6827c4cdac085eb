//! Activation handler for the daily reminder server

use crate::SparkServerHandler;
use crate::keepalive::{KeepAliveStatus, PlaybackOutcome};
use crate::validation;
use log::info;
use mcp_attr::Result as McpResult;

impl SparkServerHandler {
    /// **Activate**: The explicit user gesture that enables everything.
    ///
    /// 1. Request notification permission
    /// 2. Start the keep-alive (recorded as `denied` when refused)
    /// 3. Persist the reminder time and re-evaluate
    ///
    /// None of the steps fail the call; their outcome is reported back.
    pub async fn handle_activate(&self, time: Option<String>) -> McpResult<String> {
        let time = match validation::non_empty(time) {
            Some(t) => Some(validation::parse_reminder_time(&t)?),
            None => None,
        };

        let permission = self.channel.request_permission().await;

        let keep_alive = match self.keep_alive.start().await {
            PlaybackOutcome::Started => KeepAliveStatus::Active,
            PlaybackOutcome::Blocked => KeepAliveStatus::Denied,
        };
        *self.keep_alive_status.lock().unwrap() = keep_alive;

        let (snapshot, pending) = {
            let mut clock = self.clock.lock().unwrap();
            let time = time.unwrap_or_else(|| clock.reminder_time());
            clock.set_reminder_time(time);
            clock.advance()
        };
        if let Some(pending) = pending {
            pending.deliver().await;
        }
        info!(
            "Activated for {} (permission: {}, keep-alive: {})",
            snapshot.reminder_time, permission, keep_alive
        );

        Ok(format!(
            "Activated! See you at {} ✨\nPermission: {}\nKeep-alive: {}",
            snapshot.reminder_time, permission, keep_alive
        ))
    }
}
