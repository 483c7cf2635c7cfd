//! The capabilities an engine is built with.

use std::rc::Rc;

use crate::audio::AudioCues;
use crate::clock::Clock;
use crate::storage::WorkoutStore;
use crate::ticker::Ticker;

/// Shared handles to audio, storage, clock and ticker.
///
/// Engines are single-threaded, so handles are `Rc`. Give each engine its
/// own ticker: an engine disarms its ticker when dropped.
#[derive(Clone)]
pub struct Collaborators {
    pub audio: Rc<dyn AudioCues>,
    pub store: Rc<dyn WorkoutStore>,
    pub clock: Rc<dyn Clock>,
    pub ticker: Rc<dyn Ticker>,
}

impl Collaborators {
    pub fn new(
        audio: Rc<dyn AudioCues>,
        store: Rc<dyn WorkoutStore>,
        clock: Rc<dyn Clock>,
        ticker: Rc<dyn Ticker>,
    ) -> Self {
        Self {
            audio,
            store,
            clock,
            ticker,
        }
    }

    /// Same collaborators with a different ticker.
    pub fn with_ticker(&self, ticker: Rc<dyn Ticker>) -> Self {
        Self {
            ticker,
            ..self.clone()
        }
    }
}
