//! Terminal plumbing shared by the interactive commands.

use std::io::{IsTerminal, Write};
use std::rc::Rc;
use std::time::Duration;

use beeprunner_core::storage::AudioConfig;
use beeprunner_core::{
    AudioCues, AudioError, Collaborators, Cue, Database, ManualTicker, SystemClock, Ticker,
};
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};
use tokio::time::{Interval, MissedTickBehavior};

/// Audio cues as terminal bells, one per tone.
pub struct TerminalAudio {
    enabled: bool,
}

impl TerminalAudio {
    pub fn new(config: &AudioConfig) -> Self {
        Self {
            enabled: config.enabled && config.volume > 0,
        }
    }
}

impl AudioCues for TerminalAudio {
    fn initialize(&self) -> Result<(), AudioError> {
        if self.enabled && !std::io::stderr().is_terminal() {
            return Err(AudioError::InitFailed("stderr is not a terminal".into()));
        }
        Ok(())
    }

    fn play(&self, cue: Cue) {
        tracing::debug!(cue = cue.label(), "cue");
        if !self.enabled {
            return;
        }
        let bells = "\x07".repeat(cue.tones().len());
        let mut err = std::io::stderr();
        let _ = err.write_all(bells.as_bytes());
        let _ = err.flush();
    }
}

/// Collaborators for a live session: terminal audio, wall clock, and a
/// ticker the event loop polls.
pub fn live_collaborators(
    db: Rc<Database>,
    audio: &AudioConfig,
) -> (Collaborators, Rc<ManualTicker>) {
    let ticker = Rc::new(ManualTicker::new());
    let collab = Collaborators::new(
        Rc::new(TerminalAudio::new(audio)),
        db,
        Rc::new(SystemClock),
        ticker.clone(),
    );
    (collab, ticker)
}

/// Follows a [`ManualTicker`] with a tokio interval.
pub struct TickSource {
    ticker: Rc<ManualTicker>,
    current: Option<(Duration, Interval)>,
}

impl TickSource {
    pub fn new(ticker: Rc<ManualTicker>) -> Self {
        Self {
            ticker,
            current: None,
        }
    }

    /// Resolves on the next tick; pends forever while disarmed.
    pub async fn next(&mut self) {
        let period = self.ticker.period();
        let stale = match (&self.current, period) {
            (Some((running, _)), Some(wanted)) => *running != wanted,
            (None, Some(_)) | (Some(_), None) => true,
            (None, None) => false,
        };
        if stale {
            self.current = period.map(|p| {
                let mut interval = tokio::time::interval_at(tokio::time::Instant::now() + p, p);
                interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
                (p, interval)
            });
        }
        match self.current.as_mut() {
            Some((_, interval)) => {
                interval.tick().await;
            }
            None => std::future::pending::<()>().await,
        }
    }

    pub fn is_armed(&self) -> bool {
        self.ticker.is_armed()
    }
}

pub type StdinLines = Lines<BufReader<Stdin>>;

pub fn stdin_lines() -> StdinLines {
    BufReader::new(tokio::io::stdin()).lines()
}

/// Redraw the status line in place.
pub fn status(line: &str) {
    let mut out = std::io::stdout();
    let _ = write!(out, "\r\x1b[2K{line}");
    let _ = out.flush();
}

/// End the status line so the next output starts fresh.
pub fn end_status() {
    println!();
}

pub fn runtime() -> std::io::Result<tokio::runtime::Runtime> {
    tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()
}

pub fn format_secs(secs: f64) -> String {
    format!("{secs:.1}s")
}
