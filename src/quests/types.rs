//! Type definitions for quests.
//!
//! Quests are time-boxed objectives defined in a JSON catalog authored by
//! the content team. A [`QuestDefinition`] pairs a [`QuestMatcher`] (which
//! attempt facts count) with a requirement and a completion reward. Per
//! learner, a [`QuestAssignment`] accumulates clamped progress and latches
//! `completed` exactly once.
//!
//! # Catalog format
//!
//! ```json
//! [
//!   {
//!     "id": "daily-correct-10",
//!     "title": "Sharp Ear",
//!     "description": "Answer 10 exercises correctly",
//!     "matcher": { "kind": "correct_answers" },
//!     "requirement": 10,
//!     "reward_xp": 50
//!   },
//!   {
//!     "id": "grammar-grind",
//!     "title": "Grammar Grind",
//!     "matcher": { "kind": "topic_attempts", "topic": "past-tense" },
//!     "requirement": 5,
//!     "reward_xp": 120
//!   }
//! ]
//! ```
//!
//! Matchers use internally tagged serde, which only round-trips through
//! self-describing formats. That is fine: catalogs live in [`Config`]
//! (loaded from JSON) and are never written to storage.
//!
//! [`Config`]: crate::Config

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::attempt::AttemptEvent;
use crate::error::{Result, StrydeError, ValidationError};
use crate::storage::schema::{MAX_NAME_LENGTH, MAX_SLUG_LENGTH, MAX_XP_AMOUNT};
use crate::types::{LearnerId, QuestId, Timestamp};

// ============================================================================
// QuestMatcher — Which attempt facts count toward a quest
// ============================================================================

/// Predicate mapping one attempt event to a progress contribution.
///
/// Contributions are per-event deltas: the quest tracker sums them into the
/// assignment's progress and clamps at the requirement.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum QuestMatcher {
    /// Each correct answer counts 1.
    CorrectAnswers,

    /// Each completed attempt counts 1.
    AttemptsCompleted,

    /// Each attempt finished without a single mistake counts 1.
    PerfectAttempts,

    /// Each XP point earned by the attempt itself counts 1.
    ///
    /// Bonus rewards (quest completions, achievement unlocks) do not
    /// count, so completing one quest can never feed another.
    XpEarned,

    /// Each completed attempt in the given topic counts 1.
    TopicAttempts {
        /// Topic slug the attempt must carry.
        topic: String,
    },

    /// Each correct answer in the given topic counts 1.
    TopicCorrectAnswers {
        /// Topic slug the attempt must carry.
        topic: String,
    },
}

impl QuestMatcher {
    /// Returns this event's progress contribution.
    pub fn contribution(&self, event: &AttemptEvent) -> u64 {
        match self {
            Self::CorrectAnswers => u64::from(event.correct_count),
            Self::AttemptsCompleted => 1,
            Self::PerfectAttempts => u64::from(event.is_perfect()),
            Self::XpEarned => event.xp,
            Self::TopicAttempts { topic } => u64::from(event.topic.as_deref() == Some(topic)),
            Self::TopicCorrectAnswers { topic } => {
                if event.topic.as_deref() == Some(topic) {
                    u64::from(event.correct_count)
                } else {
                    0
                }
            }
        }
    }
}

// ============================================================================
// QuestDefinition — One catalog entry
// ============================================================================

/// One quest in the catalog.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestDefinition {
    /// Stable slug identifying this quest ("daily-correct-10").
    pub id: QuestId,

    /// Display title.
    pub title: String,

    /// Optional longer description for UI.
    #[serde(default)]
    pub description: Option<String>,

    /// Which attempt facts count toward this quest.
    pub matcher: QuestMatcher,

    /// Progress needed to complete the quest. Progress clamps here.
    pub requirement: u64,

    /// XP issued once on completion.
    pub reward_xp: u64,
}

// ============================================================================
// QuestCatalog — The full set of defined quests
// ============================================================================

/// The full set of defined quests, in authoring order.
///
/// Deserializes directly from a JSON array of definitions.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QuestCatalog {
    definitions: Vec<QuestDefinition>,
}

impl QuestCatalog {
    /// Creates a catalog from already-built definitions.
    pub fn from_definitions(definitions: Vec<QuestDefinition>) -> Self {
        Self { definitions }
    }

    /// Parses a catalog from its JSON document.
    ///
    /// # Errors
    /// Returns a configuration error if the JSON is malformed. Semantic
    /// problems (duplicate ids, zero requirements) surface later through
    /// [`Config::validate()`](crate::Config::validate).
    pub fn from_json_str(json: &str) -> Result<Self> {
        serde_json::from_str(json)
            .map_err(|e| StrydeError::config(format!("quest catalog: {}", e)))
    }

    /// Looks up a quest by ID.
    pub fn get(&self, id: &QuestId) -> Option<&QuestDefinition> {
        self.definitions.iter().find(|d| &d.id == id)
    }

    /// Iterates definitions in authoring order.
    pub fn iter(&self) -> impl Iterator<Item = &QuestDefinition> {
        self.definitions.iter()
    }

    /// Number of defined quests.
    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    /// Returns true if no quests are defined.
    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    pub(crate) fn validate(&self) -> std::result::Result<(), ValidationError> {
        let mut seen = HashSet::new();
        for def in &self.definitions {
            if def.id.as_str().is_empty() {
                return Err(ValidationError::required_field("quest.id"));
            }
            if def.id.as_str().len() > MAX_SLUG_LENGTH {
                return Err(ValidationError::field_too_long(
                    "quest.id",
                    def.id.as_str().len(),
                    MAX_SLUG_LENGTH,
                ));
            }
            if !seen.insert(def.id.as_str()) {
                return Err(ValidationError::invalid_field(
                    "quest.id",
                    format!("duplicate quest id '{}'", def.id),
                ));
            }
            if def.title.is_empty() {
                return Err(ValidationError::required_field("quest.title"));
            }
            if def.title.len() > MAX_NAME_LENGTH {
                return Err(ValidationError::field_too_long(
                    "quest.title",
                    def.title.len(),
                    MAX_NAME_LENGTH,
                ));
            }
            if def.requirement == 0 {
                return Err(ValidationError::invalid_field(
                    "quest.requirement",
                    format!("quest '{}' must require at least 1", def.id),
                ));
            }
            if def.reward_xp > MAX_XP_AMOUNT {
                return Err(ValidationError::invalid_field(
                    "quest.reward_xp",
                    format!(
                        "quest '{}' reward {} exceeds max {}",
                        def.id, def.reward_xp, MAX_XP_AMOUNT
                    ),
                ));
            }
        }
        Ok(())
    }
}

// ============================================================================
// QuestAssignment — Per-learner quest progress
// ============================================================================

/// Per-learner progress on one assigned quest.
///
/// `progress` never exceeds the quest's requirement and `completed` never
/// reverts to false once set. The completion reward is issued through the
/// one-time grant machinery, so a replayed completion cannot double-pay.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestAssignment {
    /// The learner this assignment belongs to.
    pub learner_id: LearnerId,

    /// The quest being tracked.
    pub quest_id: QuestId,

    /// Accumulated progress, clamped at the quest's requirement.
    pub progress: u64,

    /// Whether the requirement has been reached. Latches true.
    pub completed: bool,

    /// When the quest was assigned.
    pub assigned_at: Timestamp,

    /// When the requirement was reached, if it has been.
    pub completed_at: Option<Timestamp>,
}

impl QuestAssignment {
    /// Creates a fresh assignment with zero progress.
    pub fn new(learner_id: LearnerId, quest_id: QuestId, assigned_at: Timestamp) -> Self {
        Self {
            learner_id,
            quest_id,
            progress: 0,
            completed: false,
            assigned_at,
            completed_at: None,
        }
    }
}

// ============================================================================
// QuestProgressSnapshot — Read model for UI display
// ============================================================================

/// Point-in-time view of one assigned quest for display.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestProgressSnapshot {
    /// The quest being tracked.
    pub quest_id: QuestId,

    /// Display title from the catalog.
    pub title: String,

    /// Longer description from the catalog, if any.
    pub description: Option<String>,

    /// Accumulated progress, clamped at `requirement`.
    pub progress: u64,

    /// Progress needed to complete the quest.
    pub requirement: u64,

    /// Whether the quest is complete.
    pub completed: bool,

    /// XP issued on completion.
    pub reward_xp: u64,

    /// When the quest was assigned.
    pub assigned_at: Timestamp,

    /// When the requirement was reached, if it has been.
    pub completed_at: Option<Timestamp>,
}

impl QuestProgressSnapshot {
    /// Builds a snapshot by joining an assignment with its catalog entry.
    pub(crate) fn from_parts(definition: &QuestDefinition, assignment: &QuestAssignment) -> Self {
        Self {
            quest_id: assignment.quest_id.clone(),
            title: definition.title.clone(),
            description: definition.description.clone(),
            progress: assignment.progress,
            requirement: definition.requirement,
            completed: assignment.completed,
            reward_xp: definition.reward_xp,
            assigned_at: assignment.assigned_at,
            completed_at: assignment.completed_at,
        }
    }
}
