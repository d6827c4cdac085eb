//! Validation helper functions for the MCP tools
//!
//! Converts raw tool arguments into domain values, producing client-visible
//! `INVALID_PARAMS` errors for bad input.

use mcp_attr::Result as McpResult;

use crate::schedule::ReminderTime;

/// Parse and validate a reminder time parameter
///
/// # Arguments
/// * `time_str` - Time of day in 24h `HH:MM` format
///
/// # Returns
/// Result containing the parsed ReminderTime or error
pub fn parse_reminder_time(time_str: &str) -> McpResult<ReminderTime> {
    time_str.parse::<ReminderTime>().map_err(|message| {
        mcp_attr::Error::new(mcp_attr::ErrorCode::INVALID_PARAMS).with_message(message, true)
    })
}

/// Treat an absent or blank optional parameter as not provided
pub fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}
