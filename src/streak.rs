//! Consecutive-day learning streaks.
//!
//! Days are fixed UTC calendar days. The state is derived: it is never
//! stored on its own, only recomputed from the daily-activity ledger.

use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreakState {
    pub current_streak: u32,
    pub longest_streak: u32,
    pub last_active_date: Option<NaiveDate>,
}

impl StreakState {
    /// Record activity on a day. Idempotent per day: a repeated day
    /// leaves the state unchanged, a gap of more than one day restarts
    /// the run at 1.
    pub fn record(&self, day: NaiveDate) -> StreakState {
        let current_streak = match self.last_active_date {
            None => 1,
            Some(last) if day <= last => return *self,
            Some(last) if Some(day) == last.checked_add_days(Days::new(1)) => {
                self.current_streak + 1
            }
            Some(_) => 1,
        };

        StreakState {
            current_streak,
            longest_streak: self.longest_streak.max(current_streak),
            last_active_date: Some(day),
        }
    }

    /// Fold an activity-day ledger. Days may arrive in any order; runs
    /// are counted over the sorted, deduplicated sequence.
    pub fn from_days<I>(days: I) -> StreakState
    where
        I: IntoIterator<Item = NaiveDate>,
    {
        let mut days: Vec<NaiveDate> = days.into_iter().collect();
        days.sort_unstable();
        days.dedup();
        days.into_iter()
            .fold(StreakState::default(), |state, day| state.record(day))
    }

    /// The streak as seen on `today`: the recorded run only counts while
    /// it ends today or yesterday.
    pub fn current_as_of(&self, today: NaiveDate) -> u32 {
        match self.last_active_date {
            Some(last) if last == today => self.current_streak,
            Some(last) if last.checked_add_days(Days::new(1)) == Some(today) => {
                self.current_streak
            }
            _ => 0,
        }
    }
}
