//! SM-2 spaced repetition scheduling.
//!
//! Grades (0-5):
//! - 0: complete blackout
//! - 1: wrong, but the answer was recognised
//! - 2: wrong, but the answer seemed easy once shown
//! - 3: correct with serious difficulty
//! - 4: correct after hesitation
//! - 5: perfect recall
//!
//! Everything here is pure: the caller supplies `now` and gets a new state
//! back. Serializing concurrent reviews of one card is the store's job.

use crate::domain::model::{Grade, ScheduleState, MIN_EASINESS_FACTOR};
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

/// Upper bound on a single interval; keeps `due_at` representable.
pub const MAX_INTERVAL_DAYS: u32 = 36_500;

/// Computes the schedule that follows a review with the given grade.
pub fn grade(state: &ScheduleState, grade: Grade, now: DateTime<Utc>) -> ScheduleState {
    let (repetitions, interval_days) = if grade.is_pass() {
        let interval = match state.repetitions {
            0 => 1,
            1 => 6,
            _ => grown_interval(state.interval_days, state.easiness_factor),
        };
        (state.repetitions.saturating_add(1), interval)
    } else {
        (0, 1)
    };

    ScheduleState {
        repetitions,
        interval_days,
        easiness_factor: next_easiness(state.easiness_factor, grade),
        due_at: Some(
            now.checked_add_signed(Duration::days(i64::from(interval_days)))
                .unwrap_or(DateTime::<Utc>::MAX_UTC),
        ),
    }
}

/// EF' = EF + (0.1 - (5-q) * (0.08 + (5-q) * 0.02)), never below 1.3.
pub fn next_easiness(easiness_factor: f64, grade: Grade) -> f64 {
    let miss = f64::from(Grade::MAX - grade.value());
    let next = easiness_factor + (0.1 - miss * (0.08 + miss * 0.02));
    next.max(MIN_EASINESS_FACTOR)
}

fn grown_interval(interval_days: u32, easiness_factor: f64) -> u32 {
    let grown = (f64::from(interval_days) * easiness_factor).round();
    grown.clamp(0.0, f64::from(MAX_INTERVAL_DAYS)) as u32
}

/// A card with no due date has never been reviewed and is always due.
pub fn is_due(state: &ScheduleState, now: DateTime<Utc>) -> bool {
    state.due_at.map_or(true, |due| due <= now)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IntervalPreview {
    pub grade: u8,
    pub interval_days: u32,
}

/// The interval each grade would produce, for labelling grade buttons.
pub fn preview(state: &ScheduleState, now: DateTime<Utc>) -> Vec<IntervalPreview> {
    Grade::all()
        .map(|g| IntervalPreview {
            grade: g.value(),
            interval_days: grade(state, g, now).interval_days,
        })
        .collect()
}
