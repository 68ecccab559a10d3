//! Type definitions for the XP ledger.
//!
//! Every XP change appends one immutable [`XpLogEntry`] carrying a typed
//! [`XpReason`]. Reasons split into two families:
//!
//! - **Repeatable** ([`Attempt`](XpReason::Attempt),
//!   [`AdminAdjust`](XpReason::AdminAdjust)) — may occur any number of times.
//! - **One-time** (quest completions, achievement unlocks, masterclass
//!   modules) — keyed by [`grant_key()`](XpReason::grant_key) and issued at
//!   most once per learner, no matter how often the triggering call repeats.

use serde::{Deserialize, Serialize};

use crate::types::{AchievementId, LearnerId, QuestId, Timestamp, XpEntryId};

// ============================================================================
// XpReason — Why XP changed, with per-variant payload
// ============================================================================

/// The cause of an XP ledger entry, with structured payload per variant.
///
/// One-time variants map to a stable grant key; the storage layer records
/// the key on first issue and reports any later attempt as already granted.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum XpReason {
    /// A completed exercise attempt. Repeatable.
    Attempt {
        /// Caller-supplied attempt identifier, kept for audit.
        attempt_id: String,
        /// Topic or skill the attempt belonged to, if any.
        topic: Option<String>,
    },

    /// Completion bonus for a quest. One-time per quest.
    QuestComplete {
        /// The quest that was completed.
        quest_id: QuestId,
    },

    /// Unlock bonus for an achievement. One-time per achievement.
    AchievementUnlock {
        /// The achievement that was unlocked.
        achievement_id: AchievementId,
    },

    /// Finishing a masterclass module. One-time per module.
    MasterclassModule {
        /// The module that was finished.
        module_id: String,
    },

    /// Administrative correction. Repeatable.
    AdminAdjust {
        /// Operator-supplied justification, kept for audit.
        note: String,
    },
}

impl XpReason {
    /// Returns the one-time grant key for this reason, or `None` if the
    /// reason is repeatable.
    ///
    /// Keys are `family/identifier` so distinct reward families can never
    /// collide even when identifiers overlap.
    pub fn grant_key(&self) -> Option<String> {
        match self {
            Self::Attempt { .. } | Self::AdminAdjust { .. } => None,
            Self::QuestComplete { quest_id } => Some(format!("quest_complete/{}", quest_id)),
            Self::AchievementUnlock { achievement_id } => {
                Some(format!("achievement_unlock/{}", achievement_id))
            }
            Self::MasterclassModule { module_id } => {
                Some(format!("masterclass_module/{}", module_id))
            }
        }
    }

    /// Returns a short static label for logging.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Attempt { .. } => "attempt",
            Self::QuestComplete { .. } => "quest_complete",
            Self::AchievementUnlock { .. } => "achievement_unlock",
            Self::MasterclassModule { .. } => "masterclass_module",
            Self::AdminAdjust { .. } => "admin_adjust",
        }
    }
}

// ============================================================================
// XpLogEntry — One immutable ledger row
// ============================================================================

/// One immutable XP ledger entry.
///
/// Entries are append-only: they are never updated or deleted (except by
/// full learner deletion), which makes the ledger a complete audit trail.
/// `total_after` snapshots the lifetime XP that resulted from this entry,
/// so audits don't need to replay the whole ledger.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct XpLogEntry {
    /// Unique identifier (UUID v7, time-ordered).
    pub id: XpEntryId,

    /// The learner whose XP changed.
    pub learner_id: LearnerId,

    /// XP delta. Signed for ledger arithmetic, but engine operations
    /// validate deltas as non-negative before recording.
    pub amount: i64,

    /// Why the XP changed.
    pub reason: XpReason,

    /// Lifetime XP immediately after this entry was applied.
    pub total_after: u64,

    /// When this entry was recorded.
    pub recorded_at: Timestamp,
}

// ============================================================================
// RewardOutcome — Result of a one-time award
// ============================================================================

/// Result of attempting a one-time reward.
///
/// "Already granted" is an expected, frequent outcome (retries, double
/// taps, replayed events), so it is a variant here rather than an error.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RewardOutcome {
    /// The reward was issued now; carries the ledger entry that was created.
    Granted(XpLogEntry),

    /// The reward had already been issued by an earlier call. No state
    /// changed.
    AlreadyGranted,
}

impl RewardOutcome {
    /// Returns true if the reward was issued by this call.
    pub fn is_granted(&self) -> bool {
        matches!(self, Self::Granted(_))
    }

    /// Returns true if the reward had already been issued earlier.
    pub fn is_already_granted(&self) -> bool {
        matches!(self, Self::AlreadyGranted)
    }

    /// Returns the ledger entry if the reward was issued by this call.
    pub fn entry(&self) -> Option<&XpLogEntry> {
        match self {
            Self::Granted(entry) => Some(entry),
            Self::AlreadyGranted => None,
        }
    }
}
