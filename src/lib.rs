//! # Stryde
//!
//! Embedded progression and economy engine for gamified learning products.
//!
//! Stryde keeps every learner's hearts, XP, level, daily streak, quests,
//! achievements, and weekly league standing consistent under concurrent
//! gameplay events, with no background timers: everything is derived from
//! stored timestamps and counters at the moment of read or write.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use stryde::{Stryde, Config, AttemptEvent, Timestamp};
//!
//! // Open or create an engine database
//! let engine = Stryde::open("./stryde.db", Config::default())?;
//!
//! // Create a learner
//! let learner = engine.create_learner("maya", Timestamp::now())?;
//!
//! // Report a completed quiz attempt; the engine spends no hearts here,
//! // it awards XP, advances the streak, progresses quests, evaluates
//! // achievements, and feeds the weekly league, all in one atomic commit.
//! let outcome = engine.apply_attempt(AttemptEvent {
//!     learner_id: learner.id,
//!     attempt_id: "attempt-001".to_string(),
//!     topic: Some("fractions".to_string()),
//!     correct_count: 9,
//!     incorrect_count: 1,
//!     xp: 20,
//!     occurred_at: Timestamp::now(),
//! })?;
//! println!("awarded {} XP, streak {}", outcome.xp_awarded, outcome.streak);
//!
//! // Clean up
//! engine.close()?;
//! ```
//!
//! ## Key Concepts
//!
//! ### Hearts
//!
//! A capped allowance spent on mistakes and refilled by elapsed time.
//! Regeneration is lazy: hearts are reconciled from `last_heart_regen_at`
//! whenever the learner is read or mutated, so correctness never depends
//! on a scheduler.
//!
//! ### XP and Levels
//!
//! Every XP change appends an immutable ledger entry. The level is a pure
//! function of lifetime XP through the configured [`LevelCurve`], recomputed
//! on every write and never incremented on its own. One-time rewards (quest
//! completions, achievement unlocks, masterclass modules) are keyed so a
//! duplicate grant is a no-op, not a double award.
//!
//! ### Streaks
//!
//! Consecutive active days counted in the learner's own timezone, so
//! practice just before local midnight still counts for that day.
//!
//! ### Quests and Achievements
//!
//! Quests are bounded objectives with declarative matchers over attempt
//! events; achievements are predicate rules over lifetime statistics. Both
//! reward XP exactly once.
//!
//! ### Leagues
//!
//! Weekly competitive cohorts. XP earned during a season accumulates on a
//! per-season standing; ranks are computed on read from a consistent
//! snapshot, and an externally scheduled rollover closes each season with
//! promotions and demotions.
//!
//! ## Concurrency
//!
//! Every mutation commits through a compare-and-swap on the learner's
//! version counter and is retried on conflict, so two devices finishing
//! attempts at the same moment can never lose an update.
//!
//! ## Thread Safety
//!
//! `Stryde` is `Send + Sync` and can be shared across threads using `Arc`.
//! The underlying storage uses MVCC for concurrent reads with exclusive
//! write locking.

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]
#![deny(unsafe_op_in_unsafe_fn)]

// ============================================================================
// Module declarations
// ============================================================================

mod attempt;
mod config;
mod engine;
mod error;
mod events;
mod types;

pub mod storage;

// Domain modules: pure rule cores are public, stateful operations hang off
// `Stryde`.
pub mod achievements;
pub mod hearts;
pub mod learner;
pub mod league;
pub mod quests;
pub mod streak;
pub mod xp;

// ============================================================================
// Public API re-exports
// ============================================================================

// Main engine interface
pub use engine::Stryde;

// Orchestrator input and output
pub use attempt::{AttemptEvent, AttemptOutcome};

// Configuration
pub use config::{Config, HeartsConfig, LeagueConfig, LevelCurve, SyncMode};

// Error handling
pub use error::{NotFoundError, Result, StorageError, StrydeError, ValidationError};

// Core types
pub use types::{
    AchievementId, LearnerId, LeagueId, QuestId, SeasonId, Timestamp, XpEntryId,
};

// Domain types
pub use achievements::{
    AchievementCatalog, AchievementDefinition, AchievementRule, AchievementSnapshot,
    AchievementUnlock, StatsSnapshot,
};
pub use learner::{LearnerState, NewLearner, ProfileSnapshot};
pub use league::{
    LeagueStanding, Movement, Placement, RankedStanding, RolloverOutcome, RolloverPlan,
    StandingSnapshot,
};
pub use quests::{
    QuestAssignment, QuestCatalog, QuestDefinition, QuestMatcher, QuestProgressSnapshot,
};
pub use xp::{RewardOutcome, XpLogEntry, XpReason};

// Milestone notifications
pub use events::{EventStream, EventSubscriber, ProgressionEvent};

// Storage (for advanced users)
pub use storage::StoreMetadata;

// ============================================================================
// Prelude module for convenient imports
// ============================================================================

/// Convenient imports for common Stryde usage.
///
/// ```rust
/// use stryde::prelude::*;
/// ```
pub mod prelude {
    pub use crate::attempt::{AttemptEvent, AttemptOutcome};
    pub use crate::config::{Config, LevelCurve, SyncMode};
    pub use crate::engine::Stryde;
    pub use crate::error::{Result, StrydeError};
    pub use crate::events::ProgressionEvent;
    pub use crate::learner::{NewLearner, ProfileSnapshot};
    pub use crate::types::{AchievementId, LearnerId, LeagueId, QuestId, SeasonId, Timestamp};
}
