//! Type definitions for achievements.
//!
//! Achievements are permanent badges awarded when a learner's lifetime
//! statistics first satisfy a rule from the JSON catalog. Rules are
//! predicate trees over a [`StatsSnapshot`], so the content team can
//! compose conditions without code changes.
//!
//! # Catalog format
//!
//! ```json
//! [
//!   {
//!     "id": "first-perfect",
//!     "title": "Flawless",
//!     "rule": { "kind": "perfect_attempts_at_least", "count": 1 },
//!     "reward_xp": 25
//!   },
//!   {
//!     "id": "night-owl",
//!     "title": "???",
//!     "secret": true,
//!     "rule": {
//!       "kind": "all_of",
//!       "rules": [
//!         { "kind": "streak_at_least", "days": 30 },
//!         { "kind": "level_at_least", "level": 10 }
//!       ]
//!     },
//!     "reward_xp": 100
//!   }
//! ]
//! ```
//!
//! Like quest matchers, rules use internally tagged serde and only pass
//! through JSON; they are configuration, never stored rows.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::error::{Result, StrydeError, ValidationError};
use crate::learner::LearnerState;
use crate::storage::schema::{MAX_NAME_LENGTH, MAX_SLUG_LENGTH, MAX_XP_AMOUNT};
use crate::types::{AchievementId, LearnerId, Timestamp};

// ============================================================================
// StatsSnapshot — The facts achievement rules match against
// ============================================================================

/// The lifetime statistics achievement rules are evaluated against.
///
/// All fields are monotonically non-decreasing under normal operation,
/// which is what makes unlocks permanent: once a rule is satisfied it
/// stays satisfied (administrative XP removal is the one exception, and
/// unlocks deliberately do not revert).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatsSnapshot {
    /// Lifetime XP.
    pub total_xp: u64,

    /// Current level.
    pub level: u32,

    /// Consecutive active days.
    pub daily_streak: u32,

    /// Lifetime completed attempts.
    pub attempts_completed: u64,

    /// Lifetime correct answers.
    pub correct_answers: u64,

    /// Lifetime perfect attempts.
    pub perfect_attempts: u64,

    /// Lifetime completed quests.
    pub quests_completed: u64,
}

impl StatsSnapshot {
    /// Captures the rule-relevant statistics from a learner record.
    pub fn from_state(state: &LearnerState) -> Self {
        Self {
            total_xp: state.total_xp,
            level: state.level,
            daily_streak: state.daily_streak,
            attempts_completed: state.attempts_completed,
            correct_answers: state.correct_answers,
            perfect_attempts: state.perfect_attempts,
            quests_completed: state.quests_completed,
        }
    }
}

// ============================================================================
// AchievementRule — Composable predicate tree
// ============================================================================

/// Predicate tree over a [`StatsSnapshot`].
///
/// Leaves compare one statistic against a threshold; `AllOf`/`AnyOf`
/// compose them. Every leaf is monotonic in its statistic, so composed
/// rules are monotonic too.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AchievementRule {
    /// Lifetime XP reached the given amount.
    TotalXpAtLeast {
        /// Required lifetime XP.
        amount: u64,
    },

    /// Level reached the given value.
    LevelAtLeast {
        /// Required level.
        level: u32,
    },

    /// Daily streak reached the given length.
    StreakAtLeast {
        /// Required consecutive days.
        days: u32,
    },

    /// Completed attempts reached the given count.
    AttemptsAtLeast {
        /// Required attempt count.
        count: u64,
    },

    /// Correct answers reached the given count.
    CorrectAnswersAtLeast {
        /// Required correct answer count.
        count: u64,
    },

    /// Perfect attempts reached the given count.
    PerfectAttemptsAtLeast {
        /// Required perfect attempt count.
        count: u64,
    },

    /// Completed quests reached the given count.
    QuestsCompletedAtLeast {
        /// Required completed quest count.
        count: u64,
    },

    /// Every sub-rule must hold.
    AllOf {
        /// Sub-rules, all required.
        rules: Vec<AchievementRule>,
    },

    /// At least one sub-rule must hold.
    AnyOf {
        /// Sub-rules, any sufficient.
        rules: Vec<AchievementRule>,
    },
}

impl AchievementRule {
    /// Evaluates this rule against the given statistics.
    pub fn satisfied_by(&self, stats: &StatsSnapshot) -> bool {
        match self {
            Self::TotalXpAtLeast { amount } => stats.total_xp >= *amount,
            Self::LevelAtLeast { level } => stats.level >= *level,
            Self::StreakAtLeast { days } => stats.daily_streak >= *days,
            Self::AttemptsAtLeast { count } => stats.attempts_completed >= *count,
            Self::CorrectAnswersAtLeast { count } => stats.correct_answers >= *count,
            Self::PerfectAttemptsAtLeast { count } => stats.perfect_attempts >= *count,
            Self::QuestsCompletedAtLeast { count } => stats.quests_completed >= *count,
            Self::AllOf { rules } => rules.iter().all(|r| r.satisfied_by(stats)),
            Self::AnyOf { rules } => rules.iter().any(|r| r.satisfied_by(stats)),
        }
    }

    fn validate(&self) -> std::result::Result<(), ValidationError> {
        match self {
            Self::AllOf { rules } | Self::AnyOf { rules } => {
                if rules.is_empty() {
                    return Err(ValidationError::invalid_field(
                        "achievement.rule",
                        "composite rule must have at least one sub-rule",
                    ));
                }
                for rule in rules {
                    rule.validate()?;
                }
                Ok(())
            }
            _ => Ok(()),
        }
    }
}

// ============================================================================
// AchievementDefinition — One catalog entry
// ============================================================================

/// One achievement in the catalog.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AchievementDefinition {
    /// Stable slug identifying this achievement ("first-perfect").
    pub id: AchievementId,

    /// Display title.
    pub title: String,

    /// Optional longer description for UI.
    #[serde(default)]
    pub description: Option<String>,

    /// Secret achievements are hidden from listings until unlocked.
    #[serde(default)]
    pub secret: bool,

    /// When this rule first holds, the achievement unlocks.
    pub rule: AchievementRule,

    /// XP issued once on unlock.
    pub reward_xp: u64,
}

// ============================================================================
// AchievementCatalog — The full set of defined achievements
// ============================================================================

/// The full set of defined achievements, in authoring order.
///
/// Deserializes directly from a JSON array of definitions.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AchievementCatalog {
    definitions: Vec<AchievementDefinition>,
}

impl AchievementCatalog {
    /// Creates a catalog from already-built definitions.
    pub fn from_definitions(definitions: Vec<AchievementDefinition>) -> Self {
        Self { definitions }
    }

    /// Parses a catalog from its JSON document.
    ///
    /// # Errors
    /// Returns a configuration error if the JSON is malformed.
    pub fn from_json_str(json: &str) -> Result<Self> {
        serde_json::from_str(json)
            .map_err(|e| StrydeError::config(format!("achievement catalog: {}", e)))
    }

    /// Looks up an achievement by ID.
    pub fn get(&self, id: &AchievementId) -> Option<&AchievementDefinition> {
        self.definitions.iter().find(|d| &d.id == id)
    }

    /// Iterates definitions in authoring order.
    pub fn iter(&self) -> impl Iterator<Item = &AchievementDefinition> {
        self.definitions.iter()
    }

    /// Number of defined achievements.
    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    /// Returns true if no achievements are defined.
    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    pub(crate) fn validate(&self) -> std::result::Result<(), ValidationError> {
        let mut seen = HashSet::new();
        for def in &self.definitions {
            if def.id.as_str().is_empty() {
                return Err(ValidationError::required_field("achievement.id"));
            }
            if def.id.as_str().len() > MAX_SLUG_LENGTH {
                return Err(ValidationError::field_too_long(
                    "achievement.id",
                    def.id.as_str().len(),
                    MAX_SLUG_LENGTH,
                ));
            }
            if !seen.insert(def.id.as_str()) {
                return Err(ValidationError::invalid_field(
                    "achievement.id",
                    format!("duplicate achievement id '{}'", def.id),
                ));
            }
            if def.title.is_empty() {
                return Err(ValidationError::required_field("achievement.title"));
            }
            if def.title.len() > MAX_NAME_LENGTH {
                return Err(ValidationError::field_too_long(
                    "achievement.title",
                    def.title.len(),
                    MAX_NAME_LENGTH,
                ));
            }
            if def.reward_xp > MAX_XP_AMOUNT {
                return Err(ValidationError::invalid_field(
                    "achievement.reward_xp",
                    format!(
                        "achievement '{}' reward {} exceeds max {}",
                        def.id, def.reward_xp, MAX_XP_AMOUNT
                    ),
                ));
            }
            def.rule.validate()?;
        }
        Ok(())
    }
}

// ============================================================================
// AchievementUnlock — One permanent unlock row
// ============================================================================

/// One permanent unlock: this learner earned this achievement.
///
/// Unlock rows are never deleted (except by full learner deletion) and
/// never updated; writing one is idempotent.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AchievementUnlock {
    /// The learner who unlocked the achievement.
    pub learner_id: LearnerId,

    /// The achievement that was unlocked.
    pub achievement_id: AchievementId,

    /// When the unlock happened.
    pub unlocked_at: Timestamp,
}

// ============================================================================
// AchievementSnapshot — Read model for UI display
// ============================================================================

/// Point-in-time view of one achievement for display.
///
/// Listings include every non-secret achievement (locked or not) plus any
/// secret ones the learner has already unlocked.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AchievementSnapshot {
    /// The achievement described.
    pub achievement_id: AchievementId,

    /// Display title from the catalog.
    pub title: String,

    /// Longer description from the catalog, if any.
    pub description: Option<String>,

    /// Whether the catalog marks this achievement secret.
    pub secret: bool,

    /// XP issued on unlock.
    pub reward_xp: u64,

    /// Whether this learner has unlocked it.
    pub unlocked: bool,

    /// When the unlock happened, if it has.
    pub unlocked_at: Option<Timestamp>,
}
