//! SM-2 review scheduling.
//!
//! The transition is a pure function of `(state, grade, reviewed_at)`, so
//! a flashcard's stored schedule can always be reproduced by folding its
//! review ledger from the initial state.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::card::Grade;

pub const INITIAL_EASE: f64 = 2.5;
pub const MINIMUM_EASE: f64 = 1.3;

/// Fixed ease penalty applied on failing recall.
const LAPSE_PENALTY: f64 = 0.2;

/// Interval for the first success after creation or a lapse.
const FIRST_INTERVAL_DAYS: u32 = 1;
/// Interval for the second consecutive success.
const SECOND_INTERVAL_DAYS: u32 = 6;
/// Upper bound on the interval. Growth is geometric and independent of
/// elapsed time, so a long run of top grades would otherwise push the
/// due date past what date arithmetic can represent.
pub const MAX_INTERVAL_DAYS: u32 = 36_500;

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ScheduleState {
    pub repetitions: u32,
    pub ease_factor: f64,
    pub interval_days: u32,
    pub due_at: DateTime<Utc>,
    pub last_reviewed_at: Option<DateTime<Utc>>,
}

impl ScheduleState {
    /// State of a freshly created flashcard: due immediately.
    pub fn new(now: DateTime<Utc>) -> Self {
        ScheduleState {
            repetitions: 0,
            ease_factor: INITIAL_EASE,
            interval_days: 0,
            due_at: now,
            last_reviewed_at: None,
        }
    }

    /// Apply one review. Early reviews of a not-yet-due card go through
    /// the same transition; there is no "too early" rejection.
    pub fn review(&self, grade: Grade, reviewed_at: DateTime<Utc>) -> ScheduleState {
        let (repetitions, ease_factor, interval_days) = if grade.is_passing() {
            let ease = (self.ease_factor + ease_delta(grade)).max(MINIMUM_EASE);
            let repetitions = self.repetitions + 1;
            let interval = match repetitions {
                1 => FIRST_INTERVAL_DAYS,
                2 => SECOND_INTERVAL_DAYS,
                _ => ((self.interval_days as f64 * ease).ceil() as u32).min(MAX_INTERVAL_DAYS),
            };
            (repetitions, ease, interval)
        } else {
            let ease = (self.ease_factor - LAPSE_PENALTY).max(MINIMUM_EASE);
            (0, ease, FIRST_INTERVAL_DAYS)
        };

        ScheduleState {
            repetitions,
            ease_factor,
            interval_days,
            due_at: reviewed_at + Duration::days(interval_days as i64),
            last_reviewed_at: Some(reviewed_at),
        }
    }

    /// Fold a review ledger back into the current schedule.
    pub fn replay<I>(created_at: DateTime<Utc>, reviews: I) -> ScheduleState
    where
        I: IntoIterator<Item = (Grade, DateTime<Utc>)>,
    {
        reviews
            .into_iter()
            .fold(ScheduleState::new(created_at), |state, (grade, at)| {
                state.review(grade, at)
            })
    }
}

// SM-2 ease adjustment for successful recall:
// q=3 -> -0.14, q=4 -> 0.0, q=5 -> +0.1. No upper bound.
fn ease_delta(grade: Grade) -> f64 {
    let q = grade.value() as f64;
    0.1 - (5.0 - q) * (0.08 + (5.0 - q) * 0.02)
}
