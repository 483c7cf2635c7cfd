//! Workout history browsing and aggregates.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::Serialize;

use crate::error::DatabaseError;
use crate::models::{WorkoutMode, WorkoutSession};
use crate::storage::WorkoutStore;

/// Sessions plotted in the level trend.
pub const TREND_LEN: usize = 20;

/// Newest-first history, grown one page at a time.
///
/// Each load re-queries with a larger limit; a page is assumed to have
/// more behind it when it came back full.
#[derive(Debug, Clone)]
pub struct HistoryPager {
    mode: Option<WorkoutMode>,
    page_size: u32,
    limit: u32,
    sessions: Vec<WorkoutSession>,
    has_more: bool,
}

impl HistoryPager {
    pub fn new(mode: Option<WorkoutMode>, page_size: u32) -> Self {
        let page_size = page_size.max(1);
        Self {
            mode,
            page_size,
            limit: page_size,
            sessions: Vec::new(),
            has_more: true,
        }
    }

    pub fn mode(&self) -> Option<WorkoutMode> {
        self.mode
    }

    pub fn sessions(&self) -> &[WorkoutSession] {
        &self.sessions
    }

    pub fn has_more(&self) -> bool {
        self.has_more
    }

    /// Reload the first page.
    pub fn refresh(&mut self, store: &dyn WorkoutStore) -> Result<&[WorkoutSession], DatabaseError> {
        self.limit = self.page_size;
        self.load(store)?;
        Ok(&self.sessions)
    }

    /// Extend by one page. Returns false when there was nothing more.
    pub fn load_more(&mut self, store: &dyn WorkoutStore) -> Result<bool, DatabaseError> {
        if !self.has_more {
            return Ok(false);
        }
        let before = self.sessions.len();
        self.limit = self.limit.saturating_add(self.page_size);
        self.load(store)?;
        Ok(self.sessions.len() > before)
    }

    fn load(&mut self, store: &dyn WorkoutStore) -> Result<(), DatabaseError> {
        self.sessions = store.workout_history(self.mode, self.limit)?;
        self.has_more = self.sessions.len() == self.limit as usize;
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TrendPoint {
    pub date: NaiveDate,
    pub session_id: i64,
    pub max_level: u32,
}

/// Aggregates over a set of sessions, for calendar and graph views.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct HistorySummary {
    pub total_workouts: usize,
    pub total_reps: u64,
    pub total_minutes: u64,
    pub best_level: Option<u32>,
    pub average_level: Option<f64>,
    /// Session count per calendar day.
    pub per_day: BTreeMap<NaiveDate, usize>,
    /// Oldest first, at most [`TREND_LEN`] points.
    pub level_trend: Vec<TrendPoint>,
}

impl HistorySummary {
    pub fn from_sessions(sessions: &[WorkoutSession]) -> Self {
        if sessions.is_empty() {
            return Self::default();
        }

        let mut per_day = BTreeMap::new();
        for s in sessions {
            *per_day.entry(s.date).or_insert(0) += 1;
        }

        let mut chronological: Vec<&WorkoutSession> = sessions.iter().collect();
        chronological.sort_by_key(|s| (s.date, s.created_at, s.id));
        let skip = chronological.len().saturating_sub(TREND_LEN);
        let level_trend = chronological[skip..]
            .iter()
            .map(|s| TrendPoint {
                date: s.date,
                session_id: s.id,
                max_level: s.max_level,
            })
            .collect();

        let level_sum: u64 = sessions.iter().map(|s| u64::from(s.max_level)).sum();

        Self {
            total_workouts: sessions.len(),
            total_reps: sessions.iter().map(|s| u64::from(s.total_reps)).sum(),
            total_minutes: sessions.iter().map(|s| u64::from(s.duration_minutes)).sum(),
            best_level: sessions.iter().map(|s| s.max_level).max(),
            average_level: Some(level_sum as f64 / sessions.len() as f64),
            per_day,
            level_trend,
        }
    }

    pub fn workouts_on(&self, date: NaiveDate) -> usize {
        self.per_day.get(&date).copied().unwrap_or(0)
    }
}
