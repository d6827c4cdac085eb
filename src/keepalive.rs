//! Background keep-alive
//!
//! Best effort only: holds an idle/sleep inhibitor so the host keeps the
//! process scheduled while nobody is looking at it. It must be started from an
//! explicit user activation, and a refusal is recorded as `denied` without
//! affecting the reminder clock.

use async_trait::async_trait;
use log::{info, warn};
use std::fmt;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::{Child, Command};
use tokio::sync::Mutex;

/// Default inhibitor; blocks idle suspend until the child is killed
pub const DEFAULT_KEEP_ALIVE_COMMAND: &str =
    "systemd-inhibit --what=idle:sleep --who=daily-spark --why=daily-reminder --mode=block sleep infinity";

/// How long a freshly started inhibitor must survive to count as started
const STARTUP_GRACE: Duration = Duration::from_millis(500);

/// Result of one start attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackOutcome {
    Started,
    Blocked,
}

/// Keep-alive status shown to the user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeepAliveStatus {
    Idle,
    Active,
    Denied,
}

impl fmt::Display for KeepAliveStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            KeepAliveStatus::Idle => "idle",
            KeepAliveStatus::Active => "active",
            KeepAliveStatus::Denied => "denied",
        })
    }
}

#[async_trait]
pub trait KeepAlive: Send + Sync {
    /// Start (or confirm) the keep-alive. Calling it again while running is a no-op.
    async fn start(&self) -> PlaybackOutcome;
}

/// Never starts; used with `--no-keep-alive`
pub struct DisabledKeepAlive;

#[async_trait]
impl KeepAlive for DisabledKeepAlive {
    async fn start(&self) -> PlaybackOutcome {
        PlaybackOutcome::Blocked
    }
}

/// Keeps a long-running inhibitor child process alive
pub struct InhibitorKeepAlive {
    program: String,
    args: Vec<String>,
    child: Mutex<Option<Child>>,
}

impl InhibitorKeepAlive {
    /// Build from a whitespace-separated command line
    pub fn from_command_line(command: &str) -> Option<Self> {
        let mut parts = command.split_whitespace().map(str::to_string);
        let program = parts.next()?;
        Some(Self {
            program,
            args: parts.collect(),
            child: Mutex::new(None),
        })
    }
}

#[async_trait]
impl KeepAlive for InhibitorKeepAlive {
    async fn start(&self) -> PlaybackOutcome {
        let mut slot = self.child.lock().await;

        if let Some(child) = slot.as_mut() {
            match child.try_wait() {
                Ok(None) => return PlaybackOutcome::Started,
                Ok(Some(status)) => info!("Keep-alive exited ({}), restarting", status),
                Err(e) => warn!("Keep-alive state unknown ({}), restarting", e),
            }
            *slot = None;
        }

        let mut child = match Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
        {
            Ok(child) => child,
            Err(e) => {
                warn!("Keep-alive '{}' could not start: {}", self.program, e);
                return PlaybackOutcome::Blocked;
            }
        };

        // An inhibitor that is refused exits right away
        match tokio::time::timeout(STARTUP_GRACE, child.wait()).await {
            Ok(Ok(status)) => {
                warn!("Keep-alive '{}' was refused ({})", self.program, status);
                PlaybackOutcome::Blocked
            }
            Ok(Err(e)) => {
                warn!("Keep-alive '{}' failed: {}", self.program, e);
                PlaybackOutcome::Blocked
            }
            Err(_) => {
                info!("Keep-alive '{}' running", self.program);
                *slot = Some(child);
                PlaybackOutcome::Started
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_command_line() {
        let keep_alive = InhibitorKeepAlive::from_command_line(DEFAULT_KEEP_ALIVE_COMMAND).unwrap();
        assert_eq!(keep_alive.program, "systemd-inhibit");
        assert_eq!(keep_alive.args.last().map(String::as_str), Some("infinity"));
        assert!(InhibitorKeepAlive::from_command_line("   ").is_none());
    }

    #[tokio::test]
    async fn test_disabled_is_blocked() {
        assert_eq!(DisabledKeepAlive.start().await, PlaybackOutcome::Blocked);
    }

    #[tokio::test]
    async fn test_missing_program_is_blocked() {
        let keep_alive =
            InhibitorKeepAlive::from_command_line("/nonexistent/daily-spark-inhibitor").unwrap();
        assert_eq!(keep_alive.start().await, PlaybackOutcome::Blocked);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_immediate_exit_is_blocked() {
        let keep_alive = InhibitorKeepAlive::from_command_line("false").unwrap();
        assert_eq!(keep_alive.start().await, PlaybackOutcome::Blocked);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_long_running_child_is_started_once() {
        let keep_alive = InhibitorKeepAlive::from_command_line("sleep 30").unwrap();
        assert_eq!(keep_alive.start().await, PlaybackOutcome::Started);
        assert_eq!(keep_alive.start().await, PlaybackOutcome::Started);
    }
}
