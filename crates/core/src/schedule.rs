//! Recurring liquidation window.
//!
//! Liquidation is only allowed inside a repeating window: starting at
//! `start_time`, each `repeated_period` seconds open for `duration` seconds.
//! A zero `duration` keeps liquidation permanently disabled; a zero
//! `repeated_period` is rejected when the schedule is installed.

use serde::{Deserialize, Serialize};

/// Schedule configuration failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ScheduleError {
    #[error("invalid repeated period")]
    InvalidRepeatedPeriod,
}

/// Repeating liquidation window, all fields in Unix seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiquidationSchedule {
    pub start_time: u64,
    pub repeated_period: u64,
    pub duration: u64,
}

impl LiquidationSchedule {
    pub fn new(start_time: u64, repeated_period: u64, duration: u64) -> Result<Self, ScheduleError> {
        if repeated_period == 0 {
            return Err(ScheduleError::InvalidRepeatedPeriod);
        }
        Ok(Self {
            start_time,
            repeated_period,
            duration,
        })
    }

    /// Whether the window is open at `now`.
    pub fn is_enabled(&self, now: u64) -> bool {
        if now < self.start_time {
            return false;
        }
        (now - self.start_time) % self.repeated_period < self.duration
    }

    /// Start of the first window at or after `now`, for logging.
    pub fn next_window_start(&self, now: u64) -> u64 {
        if now <= self.start_time {
            return self.start_time;
        }
        let elapsed = now - self.start_time;
        let periods = elapsed / self.repeated_period;
        if elapsed % self.repeated_period < self.duration {
            now
        } else {
            self.start_time + (periods + 1) * self.repeated_period
        }
    }
}
