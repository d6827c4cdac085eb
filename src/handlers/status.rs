//! Status handler for the daily reminder server

use crate::SparkServerHandler;
use crate::formatting::{self, Indicators};
use mcp_attr::Result as McpResult;

impl SparkServerHandler {
    /// Current values of the permission, background and install indicators
    pub(crate) fn indicators(&self) -> Indicators {
        Indicators {
            permission: self.channel.permission(),
            channel: self.channel.state(),
            keep_alive: *self.keep_alive_status.lock().unwrap(),
            standalone: self.channel.is_standalone(),
        }
    }

    /// **Status**: Render the latest clock snapshot with all indicators.
    /// Reads the published snapshot; does not evaluate the clock.
    pub async fn handle_status(&self) -> McpResult<String> {
        let snapshot = self.snapshot();
        Ok(formatting::format_status(&snapshot, &self.indicators()))
    }
}
