//! Daily streak tracking.
//!
//! A streak counts consecutive days with at least one completed attempt,
//! measured in the learner's own timezone so late-evening practice isn't
//! penalized by server UTC. The transition is a pure function applied by
//! the orchestrator; the resulting counter and date live on
//! [`LearnerState`](crate::learner::LearnerState).
//!
//! # Rules
//!
//! - Same local day as the last activity: no change.
//! - Exactly the next day: streak grows by one.
//! - Any longer gap (or first ever activity): streak restarts at 1.

use chrono::{FixedOffset, NaiveDate};

use crate::types::Timestamp;

/// Result of applying one activity to a streak.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StreakUpdate {
    /// The streak counter after the activity.
    pub daily_streak: u32,

    /// The local date of the most recent counted activity.
    pub last_active_date: NaiveDate,

    /// True when this activity was newly counted: the streak grew or
    /// restarted. False for repeat activity on an already-counted day.
    pub extended: bool,
}

/// Converts an instant to the learner's local calendar date.
///
/// Offsets are validated to ±14 hours at configuration time; an
/// out-of-range offset falls back to UTC rather than failing a read.
pub fn local_date(at: Timestamp, utc_offset_minutes: i32) -> NaiveDate {
    match FixedOffset::east_opt(utc_offset_minutes * 60) {
        Some(offset) => at.to_utc().with_timezone(&offset).date_naive(),
        None => at.to_utc().date_naive(),
    }
}

/// Applies one activity on `today` to the current streak.
///
/// A `today` earlier than the recorded date (out-of-order delivery,
/// device clock skew) leaves the streak untouched rather than rewinding
/// it.
pub fn record_activity(
    daily_streak: u32,
    last_active_date: Option<NaiveDate>,
    today: NaiveDate,
) -> StreakUpdate {
    match last_active_date {
        Some(last) if last >= today => StreakUpdate {
            daily_streak,
            last_active_date: last,
            extended: false,
        },
        Some(last) if last.succ_opt() == Some(today) => StreakUpdate {
            daily_streak: daily_streak.saturating_add(1),
            last_active_date: today,
            extended: true,
        },
        _ => StreakUpdate {
            daily_streak: 1,
            last_active_date: today,
            extended: true,
        },
    }
}
