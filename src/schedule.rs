//! Time-of-day and calendar-day values used by the reminder
//!
//! Reminder times and notification dates are kept as structured values and
//! only turned into strings at the storage boundary, so comparisons never
//! depend on locale formatting.

use chrono::{Local, NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use std::fmt;
use std::str::FromStr;

/// Storage format for calendar days (ISO 8601)
pub const DAY_FORMAT: &str = "%Y-%m-%d";

/// Get the current date in local timezone
pub fn local_date_today() -> NaiveDate {
    Local::now().date_naive()
}

/// Get the current wall-clock time in local timezone
pub fn local_now() -> NaiveDateTime {
    Local::now().naive_local()
}

/// Format a calendar day for storage (`YYYY-MM-DD`)
pub fn format_day(day: NaiveDate) -> String {
    day.format(DAY_FORMAT).to_string()
}

/// Parse a stored calendar day. Anything that is not `YYYY-MM-DD` is treated as absent.
pub fn parse_day(value: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), DAY_FORMAT).ok()
}

/// A wall-clock time of day with minute precision
///
/// Ordering is chronological within a day, which is what the lock decision
/// needs: `now >= reminder` means the quote is unlocked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ReminderTime {
    hour: u8,
    minute: u8,
}

impl ReminderTime {
    /// Create a reminder time, returning `None` for anything outside 00:00..=23:59
    pub const fn new(hour: u8, minute: u8) -> Option<Self> {
        if hour < 24 && minute < 60 {
            Some(Self { hour, minute })
        } else {
            None
        }
    }

    /// Truncate a clock reading to the minute it falls in
    pub fn from_time(time: NaiveTime) -> Self {
        Self {
            hour: time.hour() as u8,
            minute: time.minute() as u8,
        }
    }

    pub fn hour(&self) -> u8 {
        self.hour
    }

    pub fn minute(&self) -> u8 {
        self.minute
    }
}

impl Default for ReminderTime {
    fn default() -> Self {
        Self { hour: 8, minute: 0 }
    }
}

impl fmt::Display for ReminderTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hour, self.minute)
    }
}

impl FromStr for ReminderTime {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || {
            format!(
                "Invalid reminder time '{}'. Use 24h HH:MM (e.g., '08:00', '21:30')",
                s
            )
        };

        let (hour, minute) = s.trim().split_once(':').ok_or_else(invalid)?;
        // Digits only: `u8::from_str` would also take a leading '+'
        let digits = |part: &str| part.bytes().all(|b| b.is_ascii_digit());
        if !(1..=2).contains(&hour.len()) || minute.len() != 2 {
            return Err(invalid());
        }
        if !digits(hour) || !digits(minute) {
            return Err(invalid());
        }

        let hour: u8 = hour.parse().map_err(|_| invalid())?;
        let minute: u8 = minute.parse().map_err(|_| invalid())?;
        Self::new(hour, minute).ok_or_else(invalid)
    }
}
