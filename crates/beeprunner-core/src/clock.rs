//! Wall-clock abstraction.
//!
//! Both engines read time exclusively through [`Clock`], so tests can
//! substitute a [`ManualClock`] and step time deterministically.

use std::cell::Cell;

use chrono::{DateTime, NaiveDate, Utc};

pub trait Clock {
    /// Milliseconds since the Unix epoch.
    fn now_ms(&self) -> u64;

    /// Calendar date (UTC) of `now_ms()`.
    fn today(&self) -> NaiveDate {
        DateTime::<Utc>::from_timestamp_millis(self.now_ms() as i64)
            .unwrap_or_default()
            .date_naive()
    }
}

/// The real wall clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> u64 {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as u64
    }
}

/// A clock that only moves when told to.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: Cell<u64>,
}

impl ManualClock {
    pub fn new(start_ms: u64) -> Self {
        Self {
            now: Cell::new(start_ms),
        }
    }

    pub fn set(&self, ms: u64) {
        self.now.set(ms);
    }

    pub fn advance(&self, ms: u64) {
        self.now.set(self.now.get().saturating_add(ms));
    }

    /// Advance by fractional seconds, rounded to the nearest millisecond.
    pub fn advance_secs(&self, secs: f64) {
        self.advance((secs * 1000.0).round() as u64);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> u64 {
        self.now.get()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manual_clock_advances() {
        let clock = ManualClock::new(1_000);
        clock.advance(250);
        clock.advance_secs(1.5);
        assert_eq!(clock.now_ms(), 2_750);
    }

    #[test]
    fn today_uses_utc_date() {
        // 2024-03-01T23:59:59Z
        let clock = ManualClock::new(1_709_337_599_000);
        assert_eq!(clock.today(), NaiveDate::from_ymd_opt(2024, 3, 1).unwrap());
        clock.advance(1_000);
        assert_eq!(clock.today(), NaiveDate::from_ymd_opt(2024, 3, 2).unwrap());
    }
}
