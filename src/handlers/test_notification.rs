//! Test notification handler

use crate::SparkServerHandler;
use crate::delivery::PermissionState;
use crate::formatting;
use mcp_attr::Result as McpResult;

impl SparkServerHandler {
    /// **Test**: Ask for permission if it is not granted yet, then deliver the
    /// diagnostic message. Ignores the reminder time and today's record.
    pub async fn handle_test_notification(&self) -> McpResult<String> {
        if self.channel.permission() != PermissionState::Granted {
            self.channel.request_permission().await;
        }

        let pending = self.clock.lock().unwrap().test_delivery();
        let result = pending.deliver().await;
        Ok(formatting::format_delivery(result))
    }
}
