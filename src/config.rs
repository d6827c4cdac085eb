//! Command-line configuration

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

use crate::keepalive::DEFAULT_KEEP_ALIVE_COMMAND;
use crate::quote::QuoteCatalog;

/// Daily Spark MCP Server - unlocks a daily quote at your chosen time and sends a reminder notification
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path to the preferences file (TOML)
    pub state_file: PathBuf,

    /// Seconds between reminder evaluations
    #[arg(long, default_value_t = 15, value_parser = clap::value_parser!(u64).range(1..=60))]
    pub poll_secs: u64,

    /// Quote catalog file (TOML with a `quotes` array); the built-in catalog is used otherwise
    #[arg(long)]
    pub quotes: Option<PathBuf>,

    /// Notification icon name or path
    #[arg(long, default_value = "starred")]
    pub icon: String,

    /// URL opened when a notification is clicked
    #[arg(long)]
    pub open_url: Option<String>,

    /// Command kept running while activated so the host does not suspend the process
    #[arg(long, default_value = DEFAULT_KEEP_ALIVE_COMMAND)]
    pub keep_alive_cmd: String,

    /// Never start the keep-alive command
    #[arg(long)]
    pub no_keep_alive: bool,

    /// Request notification permission at start-up instead of waiting for activation
    #[arg(long)]
    pub request_permission: bool,

    /// Report notification permission as denied
    #[arg(long)]
    pub disable_notifications: bool,

    /// Default log filter (overridden by RUST_LOG)
    #[arg(long, default_value = "info")]
    pub log_level: String,
}

/// Resolved runtime settings
#[derive(Debug, Clone)]
pub struct Settings {
    pub state_file: PathBuf,
    pub poll_interval: Duration,
    pub catalog: QuoteCatalog,
    pub icon: Option<String>,
    pub open_url: Option<String>,
    /// `None` disables the keep-alive
    pub keep_alive_cmd: Option<String>,
    pub request_permission: bool,
    pub notifications_enabled: bool,
}

impl Settings {
    pub fn from_args(args: &Args) -> Result<Self> {
        let catalog = match args.quotes {
            Some(ref path) => QuoteCatalog::load(path)?,
            None => QuoteCatalog::builtin(),
        };

        let icon = Some(args.icon.trim().to_string()).filter(|i| !i.is_empty());
        let keep_alive_cmd = if args.no_keep_alive || args.keep_alive_cmd.trim().is_empty() {
            None
        } else {
            Some(args.keep_alive_cmd.clone())
        };

        Ok(Self {
            state_file: args.state_file.clone(),
            poll_interval: Duration::from_secs(args.poll_secs),
            catalog,
            icon,
            open_url: args.open_url.clone(),
            keep_alive_cmd,
            request_permission: args.request_permission,
            notifications_enabled: !args.disable_notifications,
        })
    }

    /// Defaults for a given state file
    pub fn with_state_file(state_file: impl Into<PathBuf>) -> Self {
        Self {
            state_file: state_file.into(),
            poll_interval: crate::clock::DEFAULT_POLL_INTERVAL,
            catalog: QuoteCatalog::builtin(),
            icon: Some("starred".to_string()),
            open_url: None,
            keep_alive_cmd: Some(DEFAULT_KEEP_ALIVE_COMMAND.to_string()),
            request_permission: false,
            notifications_enabled: true,
        }
    }
}
