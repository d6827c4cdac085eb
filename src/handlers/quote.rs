//! Today's quote handler

use crate::SparkServerHandler;
use crate::formatting;
use mcp_attr::Result as McpResult;

impl SparkServerHandler {
    pub async fn handle_today_quote(&self) -> McpResult<String> {
        Ok(formatting::format_quote(&self.snapshot()))
    }
}
