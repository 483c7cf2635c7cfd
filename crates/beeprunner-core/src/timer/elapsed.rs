//! Elapsed time with pause accounting.
//!
//! Elapsed time is always recomputed from a start stamp rather than
//! accumulated per tick, so late or jittery ticks never cause drift.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElapsedWindow {
    started_at_ms: Option<u64>,
    accumulated_pause_ms: u64,
    pause_started_at_ms: Option<u64>,
}

impl ElapsedWindow {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a fresh window at `now`. Clears pause accounting.
    pub fn start(&mut self, now_ms: u64) {
        self.started_at_ms = Some(now_ms);
        self.accumulated_pause_ms = 0;
        self.pause_started_at_ms = None;
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }

    /// Mark a pause start. Ignored if already paused.
    pub fn begin_pause(&mut self, now_ms: u64) {
        if self.pause_started_at_ms.is_none() {
            self.pause_started_at_ms = Some(now_ms);
        }
    }

    /// Close the open pause, folding its length into the accumulator.
    /// Returns the pause length (0 if no pause was open).
    pub fn end_pause(&mut self, now_ms: u64) -> u64 {
        match self.pause_started_at_ms.take() {
            Some(since) => {
                let paused = now_ms.saturating_sub(since);
                self.accumulated_pause_ms = self.accumulated_pause_ms.saturating_add(paused);
                paused
            }
            None => 0,
        }
    }

    pub fn is_started(&self) -> bool {
        self.started_at_ms.is_some()
    }

    pub fn is_paused(&self) -> bool {
        self.pause_started_at_ms.is_some()
    }

    pub fn started_at_ms(&self) -> Option<u64> {
        self.started_at_ms
    }

    pub fn accumulated_pause_ms(&self) -> u64 {
        self.accumulated_pause_ms
    }

    /// Time since start net of pauses. An open pause freezes the value.
    pub fn elapsed_ms(&self, now_ms: u64) -> u64 {
        let Some(start) = self.started_at_ms else {
            return 0;
        };
        let open_pause = self
            .pause_started_at_ms
            .map(|since| now_ms.saturating_sub(since))
            .unwrap_or(0);
        now_ms
            .saturating_sub(start)
            .saturating_sub(self.accumulated_pause_ms)
            .saturating_sub(open_pause)
    }

    pub fn elapsed_secs(&self, now_ms: u64) -> f64 {
        self.elapsed_ms(now_ms) as f64 / 1000.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unstarted_window_reports_zero() {
        let w = ElapsedWindow::new();
        assert_eq!(w.elapsed_ms(5_000), 0);
        assert!(!w.is_started());
    }

    #[test]
    fn pauses_are_excluded() {
        let mut w = ElapsedWindow::new();
        w.start(1_000);
        assert_eq!(w.elapsed_ms(2_500), 1_500);

        w.begin_pause(2_500);
        assert_eq!(w.elapsed_ms(10_000), 1_500);
        assert_eq!(w.end_pause(10_000), 7_500);
        assert_eq!(w.accumulated_pause_ms(), 7_500);

        assert_eq!(w.elapsed_ms(11_000), 2_500);
        assert!((w.elapsed_secs(11_000) - 2.5).abs() < 1e-9);
    }

    #[test]
    fn restart_clears_pause_accounting() {
        let mut w = ElapsedWindow::new();
        w.start(0);
        w.begin_pause(100);
        w.end_pause(600);
        w.start(1_000);
        assert_eq!(w.accumulated_pause_ms(), 0);
        assert_eq!(w.elapsed_ms(1_200), 200);
    }

    #[test]
    fn double_pause_keeps_first_stamp() {
        let mut w = ElapsedWindow::new();
        w.start(0);
        w.begin_pause(100);
        w.begin_pause(300);
        assert_eq!(w.end_pause(400), 300);
        assert_eq!(w.end_pause(500), 0);
    }

    #[test]
    fn clock_going_backwards_saturates() {
        let mut w = ElapsedWindow::new();
        w.start(5_000);
        assert_eq!(w.elapsed_ms(4_000), 0);
    }
}
