//! Hearts resource ledger with lazy time-based regeneration.
//!
//! Hearts are a capped allowance that refills one heart per fixed interval.
//! There is no background timer: every read or spend first *reconciles* the
//! stored counter against the clock, so correctness depends only on stored
//! timestamps.
//!
//! # Regeneration Timeline
//!
//! ```text
//! last_regen_at                                now
//!      │◀── interval ──▶│◀── interval ──▶│◀─ 5m ─▶│
//!      ▼                ▼                ▼        ▼
//!   hearts=2         hearts=3         hearts=4   (remainder kept:
//!                                                 next heart in 25m)
//! ```
//!
//! Two full intervals elapsed: the counter gains 2 and `last_regen_at`
//! advances by exactly `2 * interval`, preserving partial progress toward
//! the next heart. While the counter sits at the cap, `last_regen_at` is
//! pinned to `now` so no backlog accrues.

use tracing::{debug, info, instrument};

use crate::config::HeartsConfig;
use crate::engine::Stryde;
use crate::error::{Result, StrydeError};
use crate::learner::{LearnerState, ProfileSnapshot};
use crate::storage::EventBatch;
use crate::types::{LearnerId, Timestamp};

// ============================================================================
// Pure transitions
// ============================================================================

/// Reconciles `state.hearts` against the clock.
///
/// Grants one heart per full regeneration interval elapsed since
/// `last_heart_regen_at`, clamped at the cap. `last_heart_regen_at` advances
/// by whole intervals only (never past `now`), so the remainder keeps
/// counting toward the next heart. At the cap, `last_heart_regen_at` is
/// pinned to `now`.
///
/// Calling this twice with the same `now` is a no-op the second time.
/// A `now` before `last_heart_regen_at` (clock skew) regenerates nothing.
pub fn regenerate(state: &mut LearnerState, now: Timestamp, config: &HeartsConfig) {
    if state.hearts >= config.cap {
        // A lowered cap clamps stored hearts on the next reconciliation.
        state.hearts = config.cap;
        state.last_heart_regen_at = now;
        return;
    }

    let elapsed_ms = now.as_millis() - state.last_heart_regen_at.as_millis();
    if elapsed_ms <= 0 {
        return;
    }

    let interval_ms = config.regen_interval_millis();
    let intervals = elapsed_ms / interval_ms;
    if intervals == 0 {
        return;
    }

    let gained = u32::try_from(intervals).unwrap_or(u32::MAX);
    state.hearts = state.hearts.saturating_add(gained).min(config.cap);
    state.last_heart_regen_at = Timestamp::from_millis(
        state.last_heart_regen_at.as_millis() + intervals * interval_ms,
    );
}

/// Spends one heart after reconciling regeneration.
///
/// # Errors
///
/// Returns [`StrydeError::HeartsExhausted`] when the reconciled counter is
/// zero. `state` may have been reconciled in place, but callers only persist
/// on success so the stored row is unchanged on failure.
pub fn spend(state: &mut LearnerState, now: Timestamp, config: &HeartsConfig) -> Result<()> {
    regenerate(state, now, config);

    if state.hearts == 0 {
        return Err(StrydeError::hearts_exhausted(state.id));
    }

    // Spending from a full counter starts the next cycle at the spend
    // instant (the at-cap pin above already moved last_regen_at to now).
    state.hearts -= 1;
    Ok(())
}

/// Administrative override: refill to the cap and restart the cycle at `now`.
pub fn force_reset(state: &mut LearnerState, now: Timestamp, config: &HeartsConfig) {
    state.hearts = config.cap;
    state.last_heart_regen_at = now;
}

/// Seconds until the next heart arrives, `None` at the cap.
///
/// Call after [`regenerate`] so the stored timestamp is current; an overdue
/// timestamp clamps to zero rather than going negative.
pub fn next_heart_in_seconds(
    state: &LearnerState,
    now: Timestamp,
    config: &HeartsConfig,
) -> Option<u64> {
    if state.hearts >= config.cap {
        return None;
    }

    let ready_at = state.last_heart_regen_at.as_millis() + config.regen_interval_millis();
    let remaining_ms = (ready_at - now.as_millis()).max(0);
    // Ceiling: a countdown should never show 0s while a wait remains.
    Some(((remaining_ms + 999) / 1000) as u64)
}

// ============================================================================
// Facade operations
// ============================================================================

impl Stryde {
    /// Spends one heart for `learner`, reconciling regeneration first.
    ///
    /// Returns the learner's profile after the spend. The mutation commits
    /// through the per-learner version check and retries on a lost race.
    ///
    /// # Errors
    ///
    /// - [`StrydeError::HeartsExhausted`] if the reconciled counter is zero
    ///   (nothing is persisted)
    /// - `NotFound` if the learner doesn't exist
    #[instrument(skip(self))]
    pub fn spend_heart(&self, learner: LearnerId, now: Timestamp) -> Result<ProfileSnapshot> {
        let snapshot = self.commit_with_retry(learner, |mut state| {
            let expected = state.version;
            spend(&mut state, now, &self.config().hearts)?;
            state.version += 1;
            let snapshot = crate::learner::build_profile(&state, now, self.config());
            Ok((EventBatch::new(expected, state), snapshot))
        })?;

        debug!(learner = %learner, hearts = snapshot.hearts, "Heart spent");
        Ok(snapshot)
    }

    /// Privileged refill to the cap (`AdminHeartReset`).
    ///
    /// Bypasses normal accrual; the caller is trusted to have checked
    /// privilege.
    #[instrument(skip(self))]
    pub fn admin_reset_hearts(
        &self,
        learner: LearnerId,
        now: Timestamp,
    ) -> Result<ProfileSnapshot> {
        let snapshot = self.commit_with_retry(learner, |mut state| {
            let expected = state.version;
            force_reset(&mut state, now, &self.config().hearts);
            state.version += 1;
            let snapshot = crate::learner::build_profile(&state, now, self.config());
            Ok((EventBatch::new(expected, state), snapshot))
        })?;

        info!(learner = %learner, "Hearts force reset");
        Ok(snapshot)
    }
}
