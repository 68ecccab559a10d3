//! Achievement evaluation: permanent badges over lifetime statistics.
//!
//! The evaluator is a pure filter over the catalog. After each applied
//! attempt the orchestrator snapshots the learner's statistics, subtracts
//! what is already unlocked, and keeps the definitions whose rule holds:
//!
//! ```text
//! StatsSnapshot ──▶ rule.satisfied_by()? ──▶ not yet unlocked? ──▶ unlock
//! ```
//!
//! Because every leaf rule is monotonic in its statistic, an achievement
//! that unlocks stays earned even if a later adjustment lowers the stat.
//! Unlock rows are permanent and their rewards go through the one-time
//! grant machinery.
//!
//! Evaluation runs once per applied event, over stats that already include
//! the event's attempt XP and quest rewards. Bonuses granted by the unlocks
//! themselves feed the stats seen by the next event rather than
//! re-triggering evaluation within the same one.

pub mod types;

pub use types::{
    AchievementCatalog, AchievementDefinition, AchievementRule, AchievementSnapshot,
    AchievementUnlock, StatsSnapshot,
};

use std::collections::{HashMap, HashSet};

use crate::engine::Stryde;
use crate::error::Result;
use crate::types::{AchievementId, LearnerId, Timestamp};

// ============================================================================
// Pure evaluation
// ============================================================================

/// Returns the catalog entries newly satisfied by `stats`.
///
/// Already unlocked achievements are skipped, so the result contains only
/// fresh unlocks, in catalog authoring order. Secret achievements evaluate
/// like any other; secrecy affects listings only.
pub fn evaluate<'a>(
    stats: &StatsSnapshot,
    unlocked: &HashSet<AchievementId>,
    catalog: &'a AchievementCatalog,
) -> Vec<&'a AchievementDefinition> {
    catalog
        .iter()
        .filter(|def| !unlocked.contains(&def.id))
        .filter(|def| def.rule.satisfied_by(stats))
        .collect()
}

// ============================================================================
// Facade operations
// ============================================================================

impl Stryde {
    /// Lists achievements for display.
    ///
    /// Contains every non-secret achievement, locked or not, plus the
    /// secret ones this learner has already unlocked. Locked secrets are
    /// omitted entirely so listings don't leak their existence.
    ///
    /// # Errors
    ///
    /// `NotFound` if the learner doesn't exist.
    pub fn achievements(&self, learner: LearnerId) -> Result<Vec<AchievementSnapshot>> {
        self.require_learner(learner)?;

        let unlocked_at: HashMap<AchievementId, Timestamp> = self
            .store()
            .list_unlocks(learner)?
            .into_iter()
            .map(|u| (u.achievement_id, u.unlocked_at))
            .collect();

        let mut snapshots = Vec::new();
        for def in self.config().achievements.iter() {
            let unlocked_at = unlocked_at.get(&def.id).copied();
            if def.secret && unlocked_at.is_none() {
                continue;
            }
            snapshots.push(AchievementSnapshot {
                achievement_id: def.id.clone(),
                title: def.title.clone(),
                description: def.description.clone(),
                secret: def.secret,
                reward_xp: def.reward_xp,
                unlocked: unlocked_at.is_some(),
                unlocked_at,
            });
        }
        Ok(snapshots)
    }
}
