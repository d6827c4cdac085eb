//! MCP tool handlers for the daily reminder server
//!
//! Each handler is in a separate file. Tool methods in `lib.rs` delegate here.

pub mod activate;
pub mod quote;
pub mod reminder_time;
pub mod status;
pub mod test_notification;
