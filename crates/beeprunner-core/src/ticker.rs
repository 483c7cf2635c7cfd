//! Recurring-callback capability.
//!
//! Engines do not own threads. They arm a [`Ticker`] when they become
//! active and disarm it when they stop; whoever drives the engine calls
//! its `tick()` at the armed period for as long as the ticker stays armed.

use std::cell::{Cell, RefCell};
use std::time::Duration;

pub trait Ticker {
    /// Start (or re-period) the recurring tick.
    fn arm(&self, period: Duration);

    /// Stop ticking. Must be safe to call when already disarmed.
    fn disarm(&self);

    /// The armed period, or `None` when disarmed.
    fn period(&self) -> Option<Duration>;

    fn is_armed(&self) -> bool {
        self.period().is_some()
    }
}

/// Ticker state holder with no timer of its own.
///
/// Tests step it by hand; the CLI polls it from a tokio interval loop.
#[derive(Debug, Default)]
pub struct ManualTicker {
    period: Cell<Option<Duration>>,
    history: RefCell<Vec<Option<Duration>>>,
}

impl ManualTicker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every arm/disarm transition, in order (`None` = disarm).
    pub fn history(&self) -> Vec<Option<Duration>> {
        self.history.borrow().clone()
    }
}

impl Ticker for ManualTicker {
    fn arm(&self, period: Duration) {
        self.period.set(Some(period));
        self.history.borrow_mut().push(Some(period));
    }

    fn disarm(&self) {
        if self.period.take().is_some() {
            self.history.borrow_mut().push(None);
        }
    }

    fn period(&self) -> Option<Duration> {
        self.period.get()
    }
}
