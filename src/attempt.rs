//! Attempt orchestration: the single gameplay entry point.
//!
//! The quiz subsystem reports each completed attempt as one
//! [`AttemptEvent`]; [`Stryde::apply_attempt()`] runs the full progression
//! pipeline over it and commits everything atomically:
//!
//! ```text
//! AttemptEvent
//!     │ validate
//!     ▼
//! ┌─ build (pure, re-run on version conflict) ─────────────────────┐
//! │ 1. hearts lazy regeneration up to occurred_at                  │
//! │ 2. attempt XP ──▶ ledger entry, level recompute                │
//! │ 3. streak transition + lifetime counters                       │
//! │ 4. quest progress ──▶ one-time completion rewards              │
//! │ 5. achievement evaluation ──▶ one-time unlock rewards          │
//! │ 6. weekly league XP for the total awarded                      │
//! └──────────────────────────────────▶ EventBatch ──▶ commit (CAS) │
//!                                                         │
//!              milestone events + AttemptOutcome ◀────────┘
//! ```
//!
//! The build phase is side-effect free: a lost version race re-reads the
//! learner and reruns it, so nothing staged by an abandoned iteration can
//! leak. Mistakes during the quiz spend hearts live through
//! [`spend_heart`](Stryde::spend_heart); `incorrect_count` here only feeds
//! the statistics achievements match against.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use crate::achievements::{self, AchievementUnlock, StatsSnapshot};
use crate::engine::Stryde;
use crate::error::{Result, ValidationError};
use crate::events::ProgressionEvent;
use crate::hearts;
use crate::learner::{self, ProfileSnapshot};
use crate::league::{self, LeagueStanding, StandingSnapshot};
use crate::quests;
use crate::storage::schema::{
    MAX_ANSWER_COUNT, MAX_SLUG_LENGTH, MAX_TOPIC_LENGTH, MAX_XP_AMOUNT,
};
use crate::storage::EventBatch;
use crate::streak;
use crate::types::{AchievementId, LearnerId, QuestId, Timestamp, XpEntryId};
use crate::xp::{self, StagedAward, XpReason};

// ============================================================================
// AttemptEvent — Input from the quiz subsystem
// ============================================================================

/// One completed gameplay attempt, as reported by the quiz subsystem.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttemptEvent {
    /// The learner who completed the attempt.
    pub learner_id: LearnerId,

    /// Caller-supplied attempt identifier, kept on the XP ledger for audit.
    pub attempt_id: String,

    /// Topic or skill the attempt belonged to, if any.
    pub topic: Option<String>,

    /// Questions answered correctly.
    pub correct_count: u32,

    /// Questions answered incorrectly.
    pub incorrect_count: u32,

    /// Base XP earned by the attempt itself, before any bonus rewards.
    pub xp: u64,

    /// When the attempt finished.
    pub occurred_at: Timestamp,
}

impl AttemptEvent {
    /// True when the attempt had at least one answer and no mistakes.
    pub fn is_perfect(&self) -> bool {
        self.incorrect_count == 0 && self.correct_count > 0
    }
}

// ============================================================================
// AttemptOutcome — Consolidated result
// ============================================================================

/// Everything one applied attempt changed, for the caller to render.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AttemptOutcome {
    /// The learner's profile after the commit.
    pub profile: ProfileSnapshot,

    /// Total XP awarded by this event: attempt XP plus any quest and
    /// achievement rewards granted now.
    pub xp_awarded: u64,

    /// The new level when this event crossed a threshold.
    pub leveled_up_to: Option<u32>,

    /// Daily streak after the event.
    pub streak: u32,

    /// True when this event grew or restarted the streak.
    pub streak_extended: bool,

    /// Quests this event completed, in assignment processing order.
    pub completed_quests: Vec<QuestId>,

    /// Achievements this event unlocked, in catalog order.
    pub unlocked: Vec<AchievementId>,

    /// The learner's league standing after the event, if competing.
    pub standing: Option<StandingSnapshot>,
}

/// Commit-phase result captured inside the retry closure.
struct AppliedAttempt {
    profile: ProfileSnapshot,
    xp_awarded: u64,
    leveled_up_to: Option<u32>,
    total_xp: u64,
    streak: u32,
    streak_extended: bool,
    completions: Vec<(QuestId, u64)>,
    unlocked: Vec<(AchievementId, String, u64)>,
    standing: Option<LeagueStanding>,
}

fn validate_event(event: &AttemptEvent) -> Result<()> {
    if event.attempt_id.trim().is_empty() {
        return Err(ValidationError::required_field("attempt_id").into());
    }
    if event.attempt_id.len() > MAX_SLUG_LENGTH {
        return Err(ValidationError::field_too_long(
            "attempt_id",
            event.attempt_id.len(),
            MAX_SLUG_LENGTH,
        )
        .into());
    }
    if let Some(topic) = &event.topic {
        if topic.len() > MAX_TOPIC_LENGTH {
            return Err(
                ValidationError::field_too_long("topic", topic.len(), MAX_TOPIC_LENGTH).into(),
            );
        }
    }
    if event.correct_count > MAX_ANSWER_COUNT || event.incorrect_count > MAX_ANSWER_COUNT {
        return Err(ValidationError::invalid_field(
            "correct_count/incorrect_count",
            format!("exceeds per-attempt maximum of {}", MAX_ANSWER_COUNT),
        )
        .into());
    }
    if event.xp > MAX_XP_AMOUNT {
        return Err(ValidationError::invalid_field(
            "xp",
            format!("exceeds per-award maximum of {}", MAX_XP_AMOUNT),
        )
        .into());
    }
    Ok(())
}

// ============================================================================
// Facade operation
// ============================================================================

impl Stryde {
    /// Applies one completed gameplay attempt.
    ///
    /// Runs the whole progression pipeline (hearts regeneration, XP,
    /// streak, quests, achievements, league) and commits the result as a
    /// single atomic batch. Milestone events publish to subscribers only
    /// after the commit succeeds.
    ///
    /// Replaying an event is safe: one-time rewards are keyed and won't
    /// re-grant, though the repeatable attempt XP is awarded again, so
    /// callers should only retry calls whose outcome they never observed.
    ///
    /// # Errors
    ///
    /// - Validation: blank or oversized `attempt_id`/`topic`, out-of-range
    ///   counts or `xp`
    /// - `NotFound` if the learner doesn't exist
    /// - `Conflict` when retries are exhausted under heavy contention
    #[instrument(skip(self, event), fields(learner = %event.learner_id, attempt = %event.attempt_id))]
    pub fn apply_attempt(&self, event: AttemptEvent) -> Result<AttemptOutcome> {
        validate_event(&event)?;

        let config = self.config();
        let at = event.occurred_at;

        let applied = self.commit_with_retry(event.learner_id, |mut state| {
            let expected = state.version;
            state.version += 1;

            // 1. Reconcile hearts up to the event instant.
            hearts::regenerate(&mut state, at, &config.hearts);

            // 2. Attempt XP, always repeatable.
            let level_before = state.level;
            let mut xp_entries = Vec::new();
            let mut grants: Vec<(String, XpEntryId)> = Vec::new();
            let mut xp_awarded = 0u64;
            if event.xp > 0 {
                let entry = xp::record_award(
                    &mut state,
                    event.xp,
                    XpReason::Attempt {
                        attempt_id: event.attempt_id.clone(),
                        topic: event.topic.clone(),
                    },
                    &config.level_curve,
                    at,
                );
                xp_awarded += event.xp;
                xp_entries.push(entry);
            }

            // 3. Streak transition in the learner's local day, then the
            //    lifetime counters quests and achievements match against.
            let today = streak::local_date(at, state.utc_offset_minutes);
            let update = streak::record_activity(state.daily_streak, state.last_active_date, today);
            state.daily_streak = update.daily_streak;
            state.last_active_date = Some(update.last_active_date);

            state.attempts_completed = state.attempts_completed.saturating_add(1);
            state.correct_answers = state
                .correct_answers
                .saturating_add(u64::from(event.correct_count));
            if event.is_perfect() {
                state.perfect_attempts = state.perfect_attempts.saturating_add(1);
            }

            // 4. Quest progress and one-time completion rewards.
            let assignments = self.store().list_assignments(state.id)?;
            let progress = quests::progress_assignments(assignments, &config.quests, &event, at);
            let mut completions: Vec<(QuestId, u64)> = Vec::new();
            for definition in &progress.completed {
                state.quests_completed = state.quests_completed.saturating_add(1);
                let staged = xp::stage_one_time(
                    self.store(),
                    &mut state,
                    XpReason::QuestComplete {
                        quest_id: definition.id.clone(),
                    },
                    definition.reward_xp,
                    &config.level_curve,
                    at,
                )?;
                let granted = match staged {
                    StagedAward::Fresh { grant_key, entry } => {
                        xp_awarded = xp_awarded.saturating_add(definition.reward_xp);
                        grants.push((grant_key, entry.id));
                        xp_entries.push(entry);
                        definition.reward_xp
                    }
                    StagedAward::AlreadyGranted => 0,
                };
                completions.push((definition.id.clone(), granted));
            }

            // 5. Achievement evaluation over the updated statistics.
            let unlocked_set: HashSet<AchievementId> = self
                .store()
                .list_unlocks(state.id)?
                .into_iter()
                .map(|unlock| unlock.achievement_id)
                .collect();
            let stats = StatsSnapshot::from_state(&state);
            let mut unlocks: Vec<AchievementUnlock> = Vec::new();
            let mut unlocked: Vec<(AchievementId, String, u64)> = Vec::new();
            for definition in achievements::evaluate(&stats, &unlocked_set, &config.achievements) {
                unlocks.push(AchievementUnlock {
                    learner_id: state.id,
                    achievement_id: definition.id.clone(),
                    unlocked_at: at,
                });
                let staged = xp::stage_one_time(
                    self.store(),
                    &mut state,
                    XpReason::AchievementUnlock {
                        achievement_id: definition.id.clone(),
                    },
                    definition.reward_xp,
                    &config.level_curve,
                    at,
                )?;
                let granted = match staged {
                    StagedAward::Fresh { grant_key, entry } => {
                        xp_awarded = xp_awarded.saturating_add(definition.reward_xp);
                        grants.push((grant_key, entry.id));
                        xp_entries.push(entry);
                        definition.reward_xp
                    }
                    StagedAward::AlreadyGranted => 0,
                };
                unlocked.push((definition.id.clone(), definition.title.clone(), granted));
            }

            // 6. Weekly league XP for everything this event awarded.
            let standing = league::stage_weekly_xp(self.store(), &state, xp_awarded, at)?;

            let applied = AppliedAttempt {
                profile: learner::build_profile(&state, at, config),
                xp_awarded,
                leveled_up_to: (state.level > level_before).then_some(state.level),
                total_xp: state.total_xp,
                streak: state.daily_streak,
                streak_extended: update.extended,
                completions,
                unlocked,
                standing: standing.clone(),
            };

            let mut batch = EventBatch::new(expected, state);
            batch.xp_entries = xp_entries;
            batch.grants = grants;
            batch.assignments = progress.changed;
            batch.unlocks = unlocks;
            batch.standing = standing;
            Ok((batch, applied))
        })?;

        let mut milestones = Vec::new();
        if let Some(level) = applied.leveled_up_to {
            milestones.push(ProgressionEvent::LevelUp {
                learner_id: event.learner_id,
                level,
                total_xp: applied.total_xp,
            });
        }
        for (quest_id, reward_xp) in &applied.completions {
            milestones.push(ProgressionEvent::QuestCompleted {
                learner_id: event.learner_id,
                quest_id: quest_id.clone(),
                reward_xp: *reward_xp,
            });
        }
        for (achievement_id, title, reward_xp) in &applied.unlocked {
            milestones.push(ProgressionEvent::AchievementUnlocked {
                learner_id: event.learner_id,
                achievement_id: achievement_id.clone(),
                title: title.clone(),
                reward_xp: *reward_xp,
            });
        }
        if applied.streak_extended {
            milestones.push(ProgressionEvent::StreakExtended {
                learner_id: event.learner_id,
                daily_streak: applied.streak,
            });
        }
        self.publish_all(milestones);

        let standing = match &applied.standing {
            Some(row) => Some(self.snapshot_for(row)?),
            None => None,
        };

        info!(
            xp_awarded = applied.xp_awarded,
            leveled_up = applied.leveled_up_to.is_some(),
            completed_quests = applied.completions.len(),
            unlocked = applied.unlocked.len(),
            "Attempt applied"
        );

        Ok(AttemptOutcome {
            profile: applied.profile,
            xp_awarded: applied.xp_awarded,
            leveled_up_to: applied.leveled_up_to,
            streak: applied.streak,
            streak_extended: applied.streak_extended,
            completed_quests: applied.completions.into_iter().map(|(id, _)| id).collect(),
            unlocked: applied.unlocked.into_iter().map(|(id, _, _)| id).collect(),
            standing,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::achievements::{AchievementCatalog, AchievementDefinition, AchievementRule};
    use crate::config::{Config, LevelCurve};
    use crate::quests::{QuestCatalog, QuestDefinition, QuestMatcher};
    use crate::types::LeagueId;
    use tempfile::tempdir;

    // 2025-01-06, the Monday of ISO week 2 of 2025.
    const WEEK2_MONDAY_MS: i64 = 1_736_121_600_000;
    const DAY_MS: i64 = 24 * 60 * 60 * 1000;

    fn pipeline_config() -> Config {
        Config {
            level_curve: LevelCurve::Stepped(vec![0, 100, 250, 500]),
            quests: QuestCatalog::from_definitions(vec![QuestDefinition {
                id: QuestId::new("daily-correct-10"),
                title: "Get 10 answers right".into(),
                description: None,
                matcher: QuestMatcher::CorrectAnswers,
                requirement: 10,
                reward_xp: 50,
            }]),
            achievements: AchievementCatalog::from_definitions(vec![AchievementDefinition {
                id: AchievementId::new("first-steps"),
                title: "First Steps".into(),
                description: None,
                secret: false,
                rule: AchievementRule::AttemptsAtLeast { count: 1 },
                reward_xp: 30,
            }]),
            ..Default::default()
        }
    }

    fn attempt(learner: LearnerId, id: &str, correct: u32, incorrect: u32, xp: u64) -> AttemptEvent {
        AttemptEvent {
            learner_id: learner,
            attempt_id: id.into(),
            topic: None,
            correct_count: correct,
            incorrect_count: incorrect,
            xp,
            occurred_at: Timestamp::from_millis(WEEK2_MONDAY_MS),
        }
    }

    #[test]
    fn test_is_perfect_requires_answers() {
        let learner = LearnerId::new();
        assert!(attempt(learner, "a-1", 5, 0, 10).is_perfect());
        assert!(!attempt(learner, "a-2", 5, 1, 10).is_perfect());
        assert!(!attempt(learner, "a-3", 0, 0, 0).is_perfect());
    }

    #[test]
    fn test_apply_attempt_runs_full_pipeline() {
        let dir = tempdir().unwrap();
        let engine = Stryde::open(dir.path().join("test.db"), pipeline_config()).unwrap();
        let sub = engine.subscribe();

        let now = Timestamp::from_millis(WEEK2_MONDAY_MS);
        let learner = engine.create_learner("maya", now).unwrap();
        engine
            .assign_quest(learner.id, &QuestId::new("daily-correct-10"), now)
            .unwrap();

        let outcome = engine
            .apply_attempt(attempt(learner.id, "a-1", 10, 0, 40))
            .unwrap();

        // 40 attempt + 50 quest + 30 achievement
        assert_eq!(outcome.xp_awarded, 120);
        assert_eq!(outcome.leveled_up_to, Some(2));
        assert_eq!(outcome.profile.total_xp, 120);
        assert_eq!(outcome.profile.level, 2);
        assert_eq!(outcome.profile.current_xp, 20);
        assert_eq!(outcome.streak, 1);
        assert!(outcome.streak_extended);
        assert_eq!(outcome.completed_quests, vec![QuestId::new("daily-correct-10")]);
        assert_eq!(outcome.unlocked, vec![AchievementId::new("first-steps")]);
        assert!(outcome.standing.is_none());

        // Ledger has one entry per award
        let log = engine.xp_log(learner.id, 10).unwrap();
        assert_eq!(log.len(), 3);

        // Milestones published after commit: level-up, quest, achievement, streak
        let kinds: Vec<&str> = std::iter::from_fn(|| sub.try_recv())
            .map(|e| e.kind())
            .collect();
        assert_eq!(
            kinds,
            vec![
                "level_up",
                "quest_completed",
                "achievement_unlocked",
                "streak_extended"
            ]
        );

        engine.close().unwrap();
    }

    #[test]
    fn test_apply_attempt_replay_skips_one_time_rewards() {
        let dir = tempdir().unwrap();
        let engine = Stryde::open(dir.path().join("test.db"), pipeline_config()).unwrap();

        let now = Timestamp::from_millis(WEEK2_MONDAY_MS);
        let learner = engine.create_learner("maya", now).unwrap();
        engine
            .assign_quest(learner.id, &QuestId::new("daily-correct-10"), now)
            .unwrap();

        let first = engine
            .apply_attempt(attempt(learner.id, "a-1", 10, 0, 40))
            .unwrap();
        assert_eq!(first.xp_awarded, 120);

        // Same event again: attempt XP repeats, quest is inert, the
        // achievement is already unlocked.
        let second = engine
            .apply_attempt(attempt(learner.id, "a-1", 10, 0, 40))
            .unwrap();
        assert_eq!(second.xp_awarded, 40);
        assert!(second.completed_quests.is_empty());
        assert!(second.unlocked.is_empty());
        assert_eq!(second.profile.total_xp, 160);

        engine.close().unwrap();
    }

    #[test]
    fn test_apply_attempt_same_day_does_not_extend_streak() {
        let dir = tempdir().unwrap();
        let engine = Stryde::open(dir.path().join("test.db"), pipeline_config()).unwrap();

        let learner = engine
            .create_learner("maya", Timestamp::from_millis(WEEK2_MONDAY_MS))
            .unwrap();

        let first = engine
            .apply_attempt(attempt(learner.id, "a-1", 3, 2, 10))
            .unwrap();
        assert_eq!(first.streak, 1);
        assert!(first.streak_extended);

        let second = engine
            .apply_attempt(attempt(learner.id, "a-2", 4, 1, 10))
            .unwrap();
        assert_eq!(second.streak, 1);
        assert!(!second.streak_extended);

        // The next local day extends
        let mut next_day = attempt(learner.id, "a-3", 5, 0, 10);
        next_day.occurred_at = Timestamp::from_millis(WEEK2_MONDAY_MS + DAY_MS);
        let third = engine.apply_attempt(next_day).unwrap();
        assert_eq!(third.streak, 2);
        assert!(third.streak_extended);

        engine.close().unwrap();
    }

    #[test]
    fn test_apply_attempt_accumulates_statistics() {
        let dir = tempdir().unwrap();
        let engine = Stryde::open(dir.path().join("test.db"), pipeline_config()).unwrap();

        let now = Timestamp::from_millis(WEEK2_MONDAY_MS);
        let learner = engine.create_learner("maya", now).unwrap();

        engine
            .apply_attempt(attempt(learner.id, "a-1", 8, 2, 10))
            .unwrap();
        engine
            .apply_attempt(attempt(learner.id, "a-2", 5, 0, 10))
            .unwrap();

        let state = engine.get_learner(learner.id).unwrap().unwrap();
        assert_eq!(state.attempts_completed, 2);
        assert_eq!(state.correct_answers, 13);
        assert_eq!(state.perfect_attempts, 1);

        engine.close().unwrap();
    }

    #[test]
    fn test_apply_attempt_feeds_league_standing() {
        let dir = tempdir().unwrap();
        let engine = Stryde::open(dir.path().join("test.db"), pipeline_config()).unwrap();

        let now = Timestamp::from_millis(WEEK2_MONDAY_MS);
        let learner = engine.create_learner("maya", now).unwrap();
        let league = LeagueId::new();
        engine.join_league(learner.id, league, 0, now).unwrap();

        let outcome = engine
            .apply_attempt(attempt(learner.id, "a-1", 10, 0, 40))
            .unwrap();

        let standing = outcome.standing.unwrap();
        assert_eq!(standing.league_id, league);
        // Weekly XP counts the full award: attempt + quest-less bonuses
        assert_eq!(standing.weekly_xp, outcome.xp_awarded);
        assert_eq!(standing.rank, 1);
        assert_eq!(standing.league_size, 1);

        engine.close().unwrap();
    }

    #[test]
    fn test_apply_attempt_regenerates_hearts_first() {
        let dir = tempdir().unwrap();
        let engine = Stryde::open(dir.path().join("test.db"), pipeline_config()).unwrap();

        let start = Timestamp::from_millis(WEEK2_MONDAY_MS);
        let learner = engine.create_learner("maya", start).unwrap();
        engine.spend_heart(learner.id, start).unwrap();
        engine.spend_heart(learner.id, start).unwrap();

        // 65 minutes later: two regen intervals have elapsed
        let mut event = attempt(learner.id, "a-1", 2, 3, 10);
        event.occurred_at = Timestamp::from_millis(WEEK2_MONDAY_MS + 65 * 60 * 1000);
        let outcome = engine.apply_attempt(event).unwrap();

        assert_eq!(outcome.profile.hearts, 5);
        assert!(outcome.profile.next_heart_in_seconds.is_none());

        engine.close().unwrap();
    }

    #[test]
    fn test_apply_attempt_validates_input() {
        let dir = tempdir().unwrap();
        let engine = Stryde::open(dir.path().join("test.db"), pipeline_config()).unwrap();

        let now = Timestamp::from_millis(WEEK2_MONDAY_MS);
        let learner = engine.create_learner("maya", now).unwrap();

        let blank = AttemptEvent {
            attempt_id: "  ".into(),
            ..attempt(learner.id, "x", 1, 0, 10)
        };
        assert!(engine.apply_attempt(blank).unwrap_err().is_validation());

        let oversized_xp = attempt(learner.id, "a-1", 1, 0, MAX_XP_AMOUNT + 1);
        assert!(engine.apply_attempt(oversized_xp).unwrap_err().is_validation());

        let long_topic = AttemptEvent {
            topic: Some("t".repeat(MAX_TOPIC_LENGTH + 1)),
            ..attempt(learner.id, "a-2", 1, 0, 10)
        };
        assert!(engine.apply_attempt(long_topic).unwrap_err().is_validation());

        let absurd_counts = attempt(learner.id, "a-3", MAX_ANSWER_COUNT + 1, 0, 10);
        assert!(engine.apply_attempt(absurd_counts).unwrap_err().is_validation());

        // Nothing was recorded by the rejected events
        let state = engine.get_learner(learner.id).unwrap().unwrap();
        assert_eq!(state.attempts_completed, 0);
        assert_eq!(state.total_xp, 0);

        engine.close().unwrap();
    }

    #[test]
    fn test_apply_attempt_unknown_learner() {
        let dir = tempdir().unwrap();
        let engine = Stryde::open(dir.path().join("test.db"), pipeline_config()).unwrap();

        let err = engine
            .apply_attempt(attempt(LearnerId::new(), "a-1", 1, 0, 10))
            .unwrap_err();
        assert!(err.is_not_found());

        engine.close().unwrap();
    }

    #[test]
    fn test_apply_attempt_zero_xp_still_counts_activity() {
        let dir = tempdir().unwrap();
        let engine = Stryde::open(dir.path().join("test.db"), pipeline_config()).unwrap();

        let now = Timestamp::from_millis(WEEK2_MONDAY_MS);
        let learner = engine.create_learner("maya", now).unwrap();

        let outcome = engine
            .apply_attempt(attempt(learner.id, "a-1", 0, 2, 0))
            .unwrap();

        assert_eq!(outcome.xp_awarded, 30); // the first-attempt achievement
        assert_eq!(outcome.streak, 1);
        assert_eq!(outcome.unlocked, vec![AchievementId::new("first-steps")]);

        // No attempt entry for a zero award, just the achievement's
        let log = engine.xp_log(learner.id, 10).unwrap();
        assert_eq!(log.len(), 1);

        engine.close().unwrap();
    }

    #[test]
    fn test_quest_reward_feeds_same_event_achievements() {
        // An achievement gated on quest completions unlocks in the same
        // event that completes the quest.
        let mut config = pipeline_config();
        config.achievements = AchievementCatalog::from_definitions(vec![AchievementDefinition {
            id: AchievementId::new("quest-hunter"),
            title: "Quest Hunter".into(),
            description: None,
            secret: false,
            rule: AchievementRule::QuestsCompletedAtLeast { count: 1 },
            reward_xp: 25,
        }]);

        let dir = tempdir().unwrap();
        let engine = Stryde::open(dir.path().join("test.db"), config).unwrap();

        let now = Timestamp::from_millis(WEEK2_MONDAY_MS);
        let learner = engine.create_learner("maya", now).unwrap();
        engine
            .assign_quest(learner.id, &QuestId::new("daily-correct-10"), now)
            .unwrap();

        let outcome = engine
            .apply_attempt(attempt(learner.id, "a-1", 10, 0, 5))
            .unwrap();

        assert_eq!(outcome.completed_quests.len(), 1);
        assert_eq!(outcome.unlocked, vec![AchievementId::new("quest-hunter")]);
        assert_eq!(outcome.xp_awarded, 5 + 50 + 25);

        engine.close().unwrap();
    }
}
