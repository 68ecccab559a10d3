//! Type definitions for learners.
//!
//! A **learner** is the unit of isolation in Stryde. [`LearnerState`] is the
//! single mutable per-learner record: hearts, lifetime XP, streak, and the
//! lifetime counters that quests and achievements match against. Everything
//! else (XP log, grants, assignments, unlocks, standings) is keyed by the
//! learner's ID and appended or upserted alongside it.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::types::{LearnerId, Timestamp};

// ============================================================================
// LearnerState — The mutable per-learner record
// ============================================================================

/// The single mutable record for one learner.
///
/// Every mutation goes through an atomic compare-and-swap on [`version`]:
/// the storage layer rejects a write whose expected version no longer
/// matches, and the orchestrator re-reads and retries. This is what makes
/// concurrent event application per learner serializable without any
/// in-process locking.
///
/// # Derived fields
///
/// `level` is a cached denormalization of `total_xp` through the configured
/// level curve. It is recomputed on every XP write and never incremented
/// on its own, so concurrent awards converge to the correct level in any
/// commit order.
///
/// [`version`]: LearnerState::version
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LearnerState {
    /// Unique identifier (UUID v7, time-ordered).
    pub id: LearnerId,

    /// Display name chosen at creation.
    pub display_name: String,

    /// Optimistic concurrency counter, incremented on every committed write.
    pub version: u64,

    /// Hearts currently held, in `[0, cap]` as of `last_heart_regen_at`.
    pub hearts: u32,

    /// Regeneration anchor: accrued hearts are computed from the elapsed
    /// time since this instant. Advanced by whole intervals only, so the
    /// remainder keeps counting toward the next heart.
    pub last_heart_regen_at: Timestamp,

    /// Lifetime XP. Non-decreasing except by administrative adjustment.
    pub total_xp: u64,

    /// Cached level, always equal to `level_curve.level_for_xp(total_xp)`.
    pub level: u32,

    /// Consecutive active days, counted in the learner's local timezone.
    pub daily_streak: u32,

    /// Learner-local calendar date of the most recent counted activity.
    pub last_active_date: Option<NaiveDate>,

    /// Fixed UTC offset in minutes used for the learner's day boundaries.
    pub utc_offset_minutes: i32,

    /// Lifetime count of completed attempts.
    pub attempts_completed: u64,

    /// Lifetime count of correct answers across all attempts.
    pub correct_answers: u64,

    /// Lifetime count of attempts finished without a single mistake.
    pub perfect_attempts: u64,

    /// Lifetime count of completed quests.
    pub quests_completed: u64,

    /// When this learner was created.
    pub joined_at: Timestamp,
}

impl LearnerState {
    /// Creates a fresh learner record with full hearts and no history.
    pub fn new(
        id: LearnerId,
        display_name: String,
        utc_offset_minutes: i32,
        heart_cap: u32,
        joined_at: Timestamp,
    ) -> Self {
        Self {
            id,
            display_name,
            version: 0,
            hearts: heart_cap,
            last_heart_regen_at: joined_at,
            total_xp: 0,
            level: 1,
            daily_streak: 0,
            last_active_date: None,
            utc_offset_minutes,
            attempts_completed: 0,
            correct_answers: 0,
            perfect_attempts: 0,
            quests_completed: 0,
            joined_at,
        }
    }
}

// ============================================================================
// NewLearner — Input for create_learner_with()
// ============================================================================

/// Input for creating a learner via
/// [`Stryde::create_learner_with()`](crate::Stryde::create_learner_with).
///
/// The `id`, `joined_at`, and initial hearts are set by the engine.
#[derive(Clone, Debug)]
pub struct NewLearner {
    /// Display name (non-empty, max 100 chars).
    pub display_name: String,

    /// Fixed UTC offset in minutes for day boundaries. `None` uses the
    /// configured default.
    pub utc_offset_minutes: Option<i32>,
}

impl Default for NewLearner {
    fn default() -> Self {
        Self {
            display_name: String::new(),
            utc_offset_minutes: None,
        }
    }
}

// ============================================================================
// ProfileSnapshot — Read model for UI display
// ============================================================================

/// Point-in-time view of a learner's progression for display.
///
/// All values are derived at read time from a single consistent storage
/// snapshot: hearts include lazily accrued regeneration, and the level
/// fields come from the configured curve. Reading a profile never writes.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ProfileSnapshot {
    /// The learner this profile describes.
    pub learner_id: LearnerId,

    /// Display name.
    pub display_name: String,

    /// Hearts after applying lazy regeneration at the read instant.
    pub hearts: u32,

    /// Seconds until the next heart accrues, or `None` at the cap.
    pub next_heart_in_seconds: Option<u64>,

    /// Current level.
    pub level: u32,

    /// Lifetime XP.
    pub total_xp: u64,

    /// XP accumulated within the current level.
    pub current_xp: u64,

    /// XP still needed for the next level, or `None` at a stepped curve's
    /// maximum level.
    pub xp_to_next_level: Option<u64>,

    /// Consecutive active days as of the last counted activity.
    pub daily_streak: u32,

    /// When this learner was created.
    pub joined_at: Timestamp,
}
