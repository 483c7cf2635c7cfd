//! Audio cue capability.
//!
//! Cues are fire-and-forget. The engines never inspect a playback result.

use std::cell::{Cell, RefCell};

use serde::{Deserialize, Serialize};

use crate::error::AudioError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Cue {
    /// Per-rep beep.
    Beep,
    /// Calibration countdown tick.
    CountdownBeep,
    /// Workout start / calibration "go".
    Start,
    LevelUp,
    Complete,
}

/// One tone of a cue pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tone {
    pub frequency_hz: u32,
    pub duration_ms: u32,
    /// Silence before this tone.
    pub gap_before_ms: u32,
}

const fn tone(frequency_hz: u32, duration_ms: u32, gap_before_ms: u32) -> Tone {
    Tone {
        frequency_hz,
        duration_ms,
        gap_before_ms,
    }
}

const BEEP: [Tone; 1] = [tone(800, 200, 0)];
const COUNTDOWN_BEEP: [Tone; 1] = [tone(600, 500, 0)];
const START: [Tone; 2] = [tone(800, 200, 0), tone(800, 200, 200)];
const LEVEL_UP: [Tone; 1] = [tone(1000, 300, 0)];
const COMPLETE: [Tone; 3] = [tone(800, 200, 0), tone(1000, 200, 300), tone(1200, 200, 300)];

impl Cue {
    /// Tone pattern a synthesizer should render for this cue.
    pub fn tones(self) -> &'static [Tone] {
        match self {
            Cue::Beep => &BEEP,
            Cue::CountdownBeep => &COUNTDOWN_BEEP,
            Cue::Start => &START,
            Cue::LevelUp => &LEVEL_UP,
            Cue::Complete => &COMPLETE,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Cue::Beep => "beep",
            Cue::CountdownBeep => "countdown",
            Cue::Start => "start",
            Cue::LevelUp => "level up",
            Cue::Complete => "complete",
        }
    }
}

pub trait AudioCues {
    /// Prepare the output device. Idempotent.
    fn initialize(&self) -> Result<(), AudioError>;

    fn play(&self, cue: Cue);
}

/// Plays nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct SilentAudio;

impl AudioCues for SilentAudio {
    fn initialize(&self) -> Result<(), AudioError> {
        Ok(())
    }

    fn play(&self, _cue: Cue) {}
}

/// Records every cue it is asked to play.
#[derive(Debug, Default)]
pub struct RecordingAudio {
    cues: RefCell<Vec<Cue>>,
    init_calls: Cell<u32>,
    fail_init: bool,
}

impl RecordingAudio {
    pub fn new() -> Self {
        Self::default()
    }

    /// A recorder whose `initialize` always errors.
    pub fn failing_init() -> Self {
        Self {
            fail_init: true,
            ..Self::default()
        }
    }

    pub fn cues(&self) -> Vec<Cue> {
        self.cues.borrow().clone()
    }

    pub fn count(&self, cue: Cue) -> usize {
        self.cues.borrow().iter().filter(|c| **c == cue).count()
    }

    pub fn init_calls(&self) -> u32 {
        self.init_calls.get()
    }

    pub fn clear(&self) {
        self.cues.borrow_mut().clear();
    }
}

impl AudioCues for RecordingAudio {
    fn initialize(&self) -> Result<(), AudioError> {
        self.init_calls.set(self.init_calls.get() + 1);
        if self.fail_init {
            return Err(AudioError::InitFailed("no output device".into()));
        }
        Ok(())
    }

    fn play(&self, cue: Cue) {
        self.cues.borrow_mut().push(cue);
    }
}
