//! Experience ledger: awards, level derivation, and the append-only
//! audit trail.
//!
//! Lifetime XP (`total_xp`) only ever grows. Level is **never** stored as
//! an independently incremented counter: every award recomputes it as a
//! pure function of `total_xp` through the configured [`LevelCurve`], so
//! concurrent awards converge to the correct level no matter how the
//! storage layer orders them.
//!
//! # Award Flow
//!
//! ```text
//!             repeatable (attempt, admin)
//! award ────▶ apply to state ────▶ XpLogEntry appended
//!     │
//!     │       one-time (quest, achievement, masterclass)
//!     └─────▶ grant key free? ──yes──▶ apply + append + record key
//!                     │
//!                     no──▶ RewardOutcome::AlreadyGranted (no change)
//! ```
//!
//! One-time rewards are keyed by [`XpReason::grant_key`]; the key row
//! commits in the same transaction as the ledger entry, so duplicate
//! delivery of the same logical event can never double-grant.

pub mod types;

pub use types::{RewardOutcome, XpLogEntry, XpReason};

use tracing::{debug, info, instrument};

use crate::config::LevelCurve;
use crate::engine::Stryde;
use crate::error::{Result, ValidationError};
use crate::events::ProgressionEvent;
use crate::learner::LearnerState;
use crate::storage::schema::{MAX_NOTE_LENGTH, MAX_SLUG_LENGTH, MAX_XP_AMOUNT};
use crate::storage::{EventBatch, ProgressionStore};
use crate::types::{LearnerId, Timestamp, XpEntryId};

// ============================================================================
// Pure transitions
// ============================================================================

/// Applies an XP award to the working state.
///
/// Bumps `total_xp` and recomputes `level` from the curve. Levels only
/// move through this recomputation.
pub fn apply_award(state: &mut LearnerState, amount: u64, curve: &LevelCurve) {
    state.total_xp = state.total_xp.saturating_add(amount);
    state.level = curve.level_for_xp(state.total_xp);
}

/// XP accumulated within the current level band.
///
/// Derived on read as `total_xp - threshold(level)`; never stored.
pub fn current_xp(state: &LearnerState, curve: &LevelCurve) -> u64 {
    let threshold = curve.xp_for_level(state.level).unwrap_or(0);
    state.total_xp.saturating_sub(threshold)
}

/// Applies an award and builds the matching ledger entry.
pub(crate) fn record_award(
    state: &mut LearnerState,
    amount: u64,
    reason: XpReason,
    curve: &LevelCurve,
    at: Timestamp,
) -> XpLogEntry {
    apply_award(state, amount, curve);
    XpLogEntry {
        id: XpEntryId::new(),
        learner_id: state.id,
        amount: amount as i64,
        reason,
        total_after: state.total_xp,
        recorded_at: at,
    }
}

/// Result of staging a one-time reward against a working state.
#[derive(Debug)]
pub(crate) enum StagedAward {
    /// Key was free: the state was mutated and this entry plus grant key
    /// belong in the commit batch.
    Fresh {
        grant_key: String,
        entry: XpLogEntry,
    },
    /// Key already recorded by an earlier commit. State untouched.
    AlreadyGranted,
}

/// Stages a one-time reward if its grant key is still free.
///
/// The duplicate check reads committed grants; a concurrent grant of the
/// same key bumps the learner version and fails this batch's commit, so
/// the retry re-reads and lands on `AlreadyGranted`.
///
/// # Errors
///
/// Rejects reasons without a grant key (repeatable reasons are awarded
/// directly, not staged).
pub(crate) fn stage_one_time(
    store: &dyn ProgressionStore,
    state: &mut LearnerState,
    reason: XpReason,
    amount: u64,
    curve: &LevelCurve,
    at: Timestamp,
) -> Result<StagedAward> {
    let grant_key = match reason.grant_key() {
        Some(key) => key,
        None => {
            return Err(ValidationError::invalid_field(
                "reason",
                format!("'{}' is repeatable, not a one-time grant", reason.label()),
            )
            .into())
        }
    };

    if store.get_grant(state.id, &grant_key)?.is_some() {
        debug!(learner = %state.id, key = %grant_key, "Reward already granted");
        return Ok(StagedAward::AlreadyGranted);
    }

    let entry = record_award(state, amount, reason, curve, at);
    Ok(StagedAward::Fresh { grant_key, entry })
}

// ============================================================================
// Facade operations
// ============================================================================

impl Stryde {
    /// Applies a privileged XP correction (`AdminXpAdjustment`).
    ///
    /// The adjustment is repeatable (no grant key) and fully audited: the
    /// returned [`XpLogEntry`] carries the operator's note.
    ///
    /// # Errors
    ///
    /// - Validation: negative `amount`, `amount` above the per-award
    ///   maximum, empty or oversized `note`
    /// - `NotFound` if the learner doesn't exist
    #[instrument(skip(self, note))]
    pub fn admin_adjust_xp(
        &self,
        learner: LearnerId,
        amount: i64,
        note: &str,
        now: Timestamp,
    ) -> Result<XpLogEntry> {
        if amount < 0 {
            return Err(ValidationError::negative_amount("amount", amount).into());
        }
        if amount as u64 > MAX_XP_AMOUNT {
            return Err(ValidationError::invalid_field(
                "amount",
                format!("exceeds per-award maximum of {}", MAX_XP_AMOUNT),
            )
            .into());
        }
        if note.trim().is_empty() {
            return Err(ValidationError::required_field("note").into());
        }
        if note.len() > MAX_NOTE_LENGTH {
            return Err(ValidationError::field_too_long("note", note.len(), MAX_NOTE_LENGTH).into());
        }

        let (entry, old_level, state_after) = self.commit_with_retry(learner, |mut state| {
            let expected = state.version;
            let old_level = state.level;
            let entry = record_award(
                &mut state,
                amount as u64,
                XpReason::AdminAdjust {
                    note: note.to_string(),
                },
                &self.config().level_curve,
                now,
            );
            state.version += 1;

            let outcome = (entry.clone(), old_level, (state.level, state.total_xp));
            let mut batch = EventBatch::new(expected, state);
            batch.xp_entries.push(entry);
            Ok((batch, outcome))
        })?;

        let (new_level, total_xp) = state_after;
        if new_level > old_level {
            self.publish_all(vec![ProgressionEvent::LevelUp {
                learner_id: learner,
                level: new_level,
                total_xp,
            }]);
        }

        info!(learner = %learner, amount, "XP adjusted");
        Ok(entry)
    }

    /// Issues the one-time reward for finishing a masterclass module.
    ///
    /// Repeat calls for the same `module_id` return
    /// [`RewardOutcome::AlreadyGranted`] without changing any state, which
    /// makes client retries and double-taps safe.
    #[instrument(skip(self))]
    pub fn complete_masterclass_module(
        &self,
        learner: LearnerId,
        module_id: &str,
        xp: u64,
        now: Timestamp,
    ) -> Result<RewardOutcome> {
        if module_id.trim().is_empty() {
            return Err(ValidationError::required_field("module_id").into());
        }
        if module_id.len() > MAX_SLUG_LENGTH {
            return Err(
                ValidationError::field_too_long("module_id", module_id.len(), MAX_SLUG_LENGTH)
                    .into(),
            );
        }
        if xp > MAX_XP_AMOUNT {
            return Err(ValidationError::invalid_field(
                "xp",
                format!("exceeds per-award maximum of {}", MAX_XP_AMOUNT),
            )
            .into());
        }

        let (outcome, old_level, state_after) = self.commit_with_retry(learner, |mut state| {
            let expected = state.version;
            let old_level = state.level;

            let staged = stage_one_time(
                self.store(),
                &mut state,
                XpReason::MasterclassModule {
                    module_id: module_id.to_string(),
                },
                xp,
                &self.config().level_curve,
                now,
            )?;

            state.version += 1;
            let level_after = (state.level, state.total_xp);
            let mut batch = EventBatch::new(expected, state);

            let outcome = match staged {
                StagedAward::Fresh { grant_key, entry } => {
                    batch.grants.push((grant_key, entry.id));
                    batch.xp_entries.push(entry.clone());
                    RewardOutcome::Granted(entry)
                }
                StagedAward::AlreadyGranted => RewardOutcome::AlreadyGranted,
            };

            Ok((batch, (outcome, old_level, level_after)))
        })?;

        let (new_level, total_xp) = state_after;
        if outcome.is_granted() && new_level > old_level {
            self.publish_all(vec![ProgressionEvent::LevelUp {
                learner_id: learner,
                level: new_level,
                total_xp,
            }]);
        }

        debug!(
            learner = %learner,
            module = module_id,
            granted = outcome.is_granted(),
            "Masterclass module processed"
        );
        Ok(outcome)
    }

    /// Reads the XP audit trail, newest entries first.
    pub fn xp_log(&self, learner: LearnerId, limit: usize) -> Result<Vec<XpLogEntry>> {
        self.require_learner(learner)?;
        self.store().list_xp_entries(learner, limit)
    }
}
