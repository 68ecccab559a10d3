//! Learner lifecycle and profile reads.
//!
//! Learners are created with full hearts, zero XP, and no streak, then
//! mutated exclusively through versioned event commits. [`ProfileSnapshot`]
//! is the read model: it reconciles heart regeneration and derives the
//! level fields at read time from one consistent storage snapshot, without
//! writing anything back.

pub mod types;

pub use types::{LearnerState, NewLearner, ProfileSnapshot};

use tracing::{info, instrument};

use crate::config::Config;
use crate::engine::Stryde;
use crate::error::{Result, ValidationError};
use crate::storage::schema::MAX_NAME_LENGTH;
use crate::storage::EventBatch;
use crate::types::{LearnerId, Timestamp};

/// Builds the display read model from a state row.
///
/// Regeneration applies to a local copy; the caller's row and the stored
/// row stay untouched. Safe to call on an already reconciled state, since
/// reconciling twice at the same instant changes nothing.
pub(crate) fn build_profile(
    state: &LearnerState,
    now: Timestamp,
    config: &Config,
) -> ProfileSnapshot {
    let mut reconciled = state.clone();
    crate::hearts::regenerate(&mut reconciled, now, &config.hearts);

    let next_heart_in_seconds =
        crate::hearts::next_heart_in_seconds(&reconciled, now, &config.hearts);
    let current_xp = crate::xp::current_xp(&reconciled, &config.level_curve);
    let xp_to_next_level = config.level_curve.xp_to_next(reconciled.total_xp);

    ProfileSnapshot {
        learner_id: reconciled.id,
        hearts: reconciled.hearts,
        next_heart_in_seconds,
        level: reconciled.level,
        total_xp: reconciled.total_xp,
        current_xp,
        xp_to_next_level,
        daily_streak: reconciled.daily_streak,
        joined_at: reconciled.joined_at,
        display_name: reconciled.display_name,
    }
}

fn validate_new_learner(input: &NewLearner) -> Result<()> {
    if input.display_name.trim().is_empty() {
        return Err(ValidationError::required_field("display_name").into());
    }
    if input.display_name.len() > MAX_NAME_LENGTH {
        return Err(ValidationError::field_too_long(
            "display_name",
            input.display_name.len(),
            MAX_NAME_LENGTH,
        )
        .into());
    }
    if let Some(offset) = input.utc_offset_minutes {
        // ±14 hours covers every real-world UTC offset
        if offset.abs() > 14 * 60 {
            return Err(ValidationError::invalid_field(
                "utc_offset_minutes",
                "must be within ±840 (14 hours)",
            )
            .into());
        }
    }
    Ok(())
}

// ============================================================================
// Facade operations
// ============================================================================

impl Stryde {
    /// Creates a learner with the configured default timezone.
    #[instrument(skip(self, display_name))]
    pub fn create_learner(&self, display_name: &str, at: Timestamp) -> Result<LearnerState> {
        self.create_learner_with(
            NewLearner {
                display_name: display_name.to_string(),
                utc_offset_minutes: None,
            },
            at,
        )
    }

    /// Creates a learner from explicit input.
    ///
    /// The new learner starts with full hearts, zero XP at level 1, and no
    /// streak. Day boundaries use the input offset, falling back to
    /// [`Config::default_utc_offset_minutes`].
    ///
    /// # Errors
    ///
    /// Validation: empty or oversized `display_name`, offset outside
    /// ±14 hours.
    #[instrument(skip(self, input))]
    pub fn create_learner_with(&self, input: NewLearner, at: Timestamp) -> Result<LearnerState> {
        validate_new_learner(&input)?;

        let offset = input
            .utc_offset_minutes
            .unwrap_or(self.config().default_utc_offset_minutes);
        let state = LearnerState::new(
            LearnerId::new(),
            input.display_name,
            offset,
            self.config().hearts.cap,
            at,
        );
        self.store().insert_learner(&state)?;

        info!(learner = %state.id, name = %state.display_name, "Learner created");
        Ok(state)
    }

    /// Fetches the raw state row, or `None` if the learner doesn't exist.
    pub fn get_learner(&self, learner: LearnerId) -> Result<Option<LearnerState>> {
        self.store().get_learner(learner)
    }

    /// Reads the learner's profile as of `now`.
    ///
    /// Hearts include lazily accrued regeneration and the level fields come
    /// from the configured curve. This is a pure read: nothing is written,
    /// so repeated calls at the same instant return the same snapshot.
    ///
    /// # Errors
    ///
    /// `NotFound` if the learner doesn't exist.
    pub fn profile(&self, learner: LearnerId, now: Timestamp) -> Result<ProfileSnapshot> {
        let state = self.require_learner(learner)?;
        Ok(build_profile(&state, now, self.config()))
    }

    /// Changes the fixed UTC offset used for the learner's day boundaries.
    ///
    /// Applies to activity recorded after this call; days already counted
    /// keep the dates they were recorded under.
    #[instrument(skip(self))]
    pub fn set_timezone(
        &self,
        learner: LearnerId,
        utc_offset_minutes: i32,
    ) -> Result<LearnerState> {
        if utc_offset_minutes.abs() > 14 * 60 {
            return Err(ValidationError::invalid_field(
                "utc_offset_minutes",
                "must be within ±840 (14 hours)",
            )
            .into());
        }

        let updated = self.commit_with_retry(learner, |mut state| {
            let expected = state.version;
            state.utc_offset_minutes = utc_offset_minutes;
            state.version += 1;
            let updated = state.clone();
            Ok((EventBatch::new(expected, state), updated))
        })?;

        info!(learner = %learner, offset = utc_offset_minutes, "Timezone updated");
        Ok(updated)
    }

    /// Hard-deletes a learner and every row keyed by them.
    ///
    /// Removes the state row, XP log, grant keys, quest assignments,
    /// achievement unlocks, and league standings in one transaction.
    /// Returns `false` if the learner didn't exist.
    #[instrument(skip(self))]
    pub fn delete_learner(&self, learner: LearnerId) -> Result<bool> {
        let deleted = self.store().delete_learner(learner)?;
        if deleted {
            info!(learner = %learner, "Learner deleted");
        }
        Ok(deleted)
    }
}
