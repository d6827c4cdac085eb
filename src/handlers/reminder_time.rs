//! Reminder time handler

use crate::SparkServerHandler;
use crate::validation;
use mcp_attr::Result as McpResult;

impl SparkServerHandler {
    /// **Reminder time**: Persist a new time and re-evaluate right away.
    ///
    /// The last-notified day is kept, so a notification already sent today
    /// is not repeated even if the new time is the current minute.
    pub async fn handle_set_reminder_time(&self, time: String) -> McpResult<String> {
        let time = validation::parse_reminder_time(&time)?;

        let (snapshot, pending) = {
            let mut clock = self.clock.lock().unwrap();
            clock.set_reminder_time(time);
            clock.advance()
        };
        if let Some(pending) = pending {
            pending.deliver().await;
        }

        Ok(format!(
            "Reminder time set to {} (quote {})",
            snapshot.reminder_time, snapshot.lock
        ))
    }
}
