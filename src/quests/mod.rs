//! Quest tracking: declarative objectives fed by attempt events.
//!
//! Quests never poll. Progress moves only when an attempt event is applied,
//! and each [`QuestMatcher`] turns the event into a per-event contribution
//! that the tracker sums into the assignment:
//!
//! ```text
//! AttemptEvent ──▶ matcher.contribution() ──▶ progress += n (clamp at req)
//!                                                   │
//!                                          progress == requirement?
//!                                                   │
//!                              completed latches, reward staged one-time
//! ```
//!
//! Progress clamps at the requirement and completion latches: once a quest
//! is complete, later events cannot move it, and the completion reward is
//! issued through the grant machinery so a replayed event cannot pay twice.

pub mod types;

pub use types::{
    QuestAssignment, QuestCatalog, QuestDefinition, QuestMatcher, QuestProgressSnapshot,
};

use tracing::{debug, info, instrument, warn};

use crate::attempt::AttemptEvent;
use crate::engine::Stryde;
use crate::error::{Result, ValidationError};
use crate::types::{LearnerId, QuestId, Timestamp};

// ============================================================================
// Pure transitions
// ============================================================================

/// Applies one attempt event to an assignment.
///
/// Progress clamps at the requirement and `completed` latches, so an
/// already complete assignment ignores the event entirely. Returns `true`
/// when this event is the one that completed the quest.
pub fn apply_event(
    assignment: &mut QuestAssignment,
    definition: &QuestDefinition,
    event: &AttemptEvent,
    at: Timestamp,
) -> bool {
    if assignment.completed {
        return false;
    }

    let contribution = definition.matcher.contribution(event);
    if contribution == 0 {
        return false;
    }

    assignment.progress = assignment
        .progress
        .saturating_add(contribution)
        .min(definition.requirement);

    if assignment.progress >= definition.requirement {
        assignment.completed = true;
        assignment.completed_at = Some(at);
        return true;
    }
    false
}

/// Changed assignments and fresh completions from one attempt event.
#[derive(Debug, Default)]
pub(crate) struct QuestProgressOutcome {
    /// Assignments whose progress moved, including freshly completed ones.
    pub changed: Vec<QuestAssignment>,

    /// Catalog entries for the quests this event completed.
    pub completed: Vec<QuestDefinition>,
}

/// Runs one attempt event across all of a learner's assignments.
///
/// Assignments pointing at quests no longer in the catalog are skipped.
pub(crate) fn progress_assignments(
    assignments: Vec<QuestAssignment>,
    catalog: &QuestCatalog,
    event: &AttemptEvent,
    at: Timestamp,
) -> QuestProgressOutcome {
    let mut outcome = QuestProgressOutcome::default();

    for mut assignment in assignments {
        let definition = match catalog.get(&assignment.quest_id) {
            Some(definition) => definition,
            None => {
                warn!(
                    quest = %assignment.quest_id,
                    "Assignment references a quest missing from the catalog, skipping"
                );
                continue;
            }
        };

        let before = assignment.progress;
        let completed_now = apply_event(&mut assignment, definition, event, at);

        if completed_now {
            debug!(quest = %assignment.quest_id, "Quest completed");
            outcome.completed.push(definition.clone());
        }
        if assignment.progress != before {
            outcome.changed.push(assignment);
        }
    }

    outcome
}

// ============================================================================
// Facade operations
// ============================================================================

impl Stryde {
    /// Assigns a catalog quest to a learner.
    ///
    /// Idempotent: re-assigning an already assigned quest returns the
    /// stored progress untouched, so duplicate assignment requests are
    /// harmless.
    ///
    /// # Errors
    ///
    /// - Validation if the quest id is not in the configured catalog
    /// - `NotFound` if the learner doesn't exist
    #[instrument(skip(self))]
    pub fn assign_quest(
        &self,
        learner: LearnerId,
        quest: &QuestId,
        at: Timestamp,
    ) -> Result<QuestProgressSnapshot> {
        let definition = match self.config().quests.get(quest) {
            Some(definition) => definition,
            None => return Err(ValidationError::unknown_quest(quest).into()),
        };
        self.require_learner(learner)?;

        if let Some(existing) = self.store().get_assignment(learner, quest)? {
            debug!(learner = %learner, quest = %quest, "Quest already assigned");
            return Ok(QuestProgressSnapshot::from_parts(definition, &existing));
        }

        let fresh = QuestAssignment::new(learner, quest.clone(), at);
        self.store().insert_assignment(&fresh)?;

        info!(learner = %learner, quest = %quest, "Quest assigned");
        Ok(QuestProgressSnapshot::from_parts(definition, &fresh))
    }

    /// Lists the learner's assigned quests with their catalog data.
    ///
    /// Assignments whose quest has been removed from the catalog are
    /// omitted.
    pub fn quest_progress(&self, learner: LearnerId) -> Result<Vec<QuestProgressSnapshot>> {
        self.require_learner(learner)?;

        let assignments = self.store().list_assignments(learner)?;
        let catalog = &self.config().quests;

        let mut snapshots = Vec::with_capacity(assignments.len());
        for assignment in &assignments {
            match catalog.get(&assignment.quest_id) {
                Some(definition) => {
                    snapshots.push(QuestProgressSnapshot::from_parts(definition, assignment));
                }
                None => warn!(
                    quest = %assignment.quest_id,
                    "Assignment references a quest missing from the catalog, skipping"
                ),
            }
        }
        Ok(snapshots)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::storage::EventBatch;
    use tempfile::tempdir;

    fn quest(id: &str, matcher: QuestMatcher, requirement: u64) -> QuestDefinition {
        QuestDefinition {
            id: QuestId::new(id),
            title: format!("Quest {}", id),
            description: None,
            matcher,
            requirement,
            reward_xp: 50,
        }
    }

    fn attempt(correct: u32, incorrect: u32, topic: Option<&str>, xp: u64) -> AttemptEvent {
        AttemptEvent {
            learner_id: LearnerId::new(),
            attempt_id: "a-1".into(),
            topic: topic.map(String::from),
            correct_count: correct,
            incorrect_count: incorrect,
            xp,
            occurred_at: Timestamp::now(),
        }
    }

    fn catalog_config() -> Config {
        Config {
            quests: QuestCatalog::from_definitions(vec![
                quest("daily-correct-10", QuestMatcher::CorrectAnswers, 10),
                quest(
                    "grammar-grind",
                    QuestMatcher::TopicAttempts {
                        topic: "past-tense".into(),
                    },
                    5,
                ),
            ]),
            ..Default::default()
        }
    }

    // ====================================================================
    // apply_event
    // ====================================================================

    #[test]
    fn test_progress_clamps_at_requirement() {
        // 7/10 progress plus 5 correct answers: clamp at 10, complete.
        let definition = quest("q", QuestMatcher::CorrectAnswers, 10);
        let mut assignment =
            QuestAssignment::new(LearnerId::new(), QuestId::new("q"), Timestamp::now());
        assignment.progress = 7;

        let at = Timestamp::from_millis(5_000);
        let completed = apply_event(&mut assignment, &definition, &attempt(5, 0, None, 20), at);

        assert!(completed);
        assert_eq!(assignment.progress, 10);
        assert!(assignment.completed);
        assert_eq!(assignment.completed_at, Some(at));
    }

    #[test]
    fn test_completed_assignment_latches() {
        let definition = quest("q", QuestMatcher::CorrectAnswers, 10);
        let mut assignment =
            QuestAssignment::new(LearnerId::new(), QuestId::new("q"), Timestamp::now());
        assignment.progress = 10;
        assignment.completed = true;
        assignment.completed_at = Some(Timestamp::from_millis(1_000));

        let completed = apply_event(
            &mut assignment,
            &definition,
            &attempt(5, 0, None, 20),
            Timestamp::from_millis(2_000),
        );

        assert!(!completed);
        assert_eq!(assignment.progress, 10);
        assert_eq!(assignment.completed_at, Some(Timestamp::from_millis(1_000)));
    }

    #[test]
    fn test_zero_contribution_leaves_assignment_alone() {
        let definition = quest(
            "q",
            QuestMatcher::TopicAttempts {
                topic: "plurals".into(),
            },
            5,
        );
        let mut assignment =
            QuestAssignment::new(LearnerId::new(), QuestId::new("q"), Timestamp::now());
        assignment.progress = 3;

        let completed = apply_event(
            &mut assignment,
            &definition,
            &attempt(4, 0, Some("past-tense"), 20),
            Timestamp::now(),
        );

        assert!(!completed);
        assert_eq!(assignment.progress, 3);
        assert!(!assignment.completed);
    }

    #[test]
    fn test_partial_progress_does_not_complete() {
        let definition = quest("q", QuestMatcher::CorrectAnswers, 10);
        let mut assignment =
            QuestAssignment::new(LearnerId::new(), QuestId::new("q"), Timestamp::now());

        let completed = apply_event(&mut assignment, &definition, &attempt(4, 1, None, 20), Timestamp::now());

        assert!(!completed);
        assert_eq!(assignment.progress, 4);
        assert!(!assignment.completed);
        assert!(assignment.completed_at.is_none());
    }

    // ====================================================================
    // progress_assignments
    // ====================================================================

    #[test]
    fn test_progress_assignments_applies_to_each_matching_quest() {
        let catalog = QuestCatalog::from_definitions(vec![
            quest("correct", QuestMatcher::CorrectAnswers, 10),
            quest(
                "grammar",
                QuestMatcher::TopicAttempts {
                    topic: "past-tense".into(),
                },
                5,
            ),
        ]);

        let learner = LearnerId::new();
        let now = Timestamp::now();
        let mut first = QuestAssignment::new(learner, QuestId::new("correct"), now);
        first.progress = 7;
        let mut second = QuestAssignment::new(learner, QuestId::new("grammar"), now);
        second.progress = 4;

        let outcome = progress_assignments(
            vec![first, second],
            &catalog,
            &attempt(5, 0, Some("past-tense"), 20),
            now,
        );

        assert_eq!(outcome.changed.len(), 2);
        assert_eq!(outcome.completed.len(), 2);
        assert!(outcome.changed.iter().all(|a| a.completed));
    }

    #[test]
    fn test_progress_assignments_skips_unmatched_and_dangling() {
        let catalog =
            QuestCatalog::from_definitions(vec![quest("correct", QuestMatcher::CorrectAnswers, 10)]);

        let learner = LearnerId::new();
        let now = Timestamp::now();
        let unmatched = QuestAssignment::new(learner, QuestId::new("correct"), now);
        let dangling = QuestAssignment::new(learner, QuestId::new("removed-quest"), now);

        // Zero correct answers: no contribution to the correct-answers quest
        let outcome = progress_assignments(
            vec![unmatched, dangling],
            &catalog,
            &attempt(0, 3, None, 5),
            now,
        );

        assert!(outcome.changed.is_empty());
        assert!(outcome.completed.is_empty());
    }

    // ====================================================================
    // Facade operations
    // ====================================================================

    #[test]
    fn test_assign_quest_starts_at_zero() {
        let dir = tempdir().unwrap();
        let engine = Stryde::open(dir.path().join("test.db"), catalog_config()).unwrap();

        let learner = engine.create_learner("kim", Timestamp::now()).unwrap();
        let snapshot = engine
            .assign_quest(learner.id, &QuestId::new("daily-correct-10"), Timestamp::now())
            .unwrap();

        assert_eq!(snapshot.progress, 0);
        assert_eq!(snapshot.requirement, 10);
        assert!(!snapshot.completed);

        engine.close().unwrap();
    }

    #[test]
    fn test_assign_quest_idempotent_preserves_progress() {
        let dir = tempdir().unwrap();
        let engine = Stryde::open(dir.path().join("test.db"), catalog_config()).unwrap();

        let now = Timestamp::now();
        let learner = engine.create_learner("kim", now).unwrap();
        let quest_id = QuestId::new("daily-correct-10");
        engine.assign_quest(learner.id, &quest_id, now).unwrap();

        // Advance stored progress through a committed batch
        let mut advanced = QuestAssignment::new(learner.id, quest_id.clone(), now);
        advanced.progress = 4;
        let mut state = engine.get_learner(learner.id).unwrap().unwrap();
        let expected = state.version;
        state.version += 1;
        let mut batch = EventBatch::new(expected, state);
        batch.assignments.push(advanced);
        assert!(engine.store().commit_event(&batch).unwrap());

        let snapshot = engine.assign_quest(learner.id, &quest_id, Timestamp::now()).unwrap();
        assert_eq!(snapshot.progress, 4);

        engine.close().unwrap();
    }

    #[test]
    fn test_assign_quest_unknown_id() {
        let dir = tempdir().unwrap();
        let engine = Stryde::open(dir.path().join("test.db"), catalog_config()).unwrap();

        let learner = engine.create_learner("kim", Timestamp::now()).unwrap();
        let err = engine
            .assign_quest(learner.id, &QuestId::new("nope"), Timestamp::now())
            .unwrap_err();
        assert!(err.is_validation());

        engine.close().unwrap();
    }

    #[test]
    fn test_assign_quest_unknown_learner() {
        let dir = tempdir().unwrap();
        let engine = Stryde::open(dir.path().join("test.db"), catalog_config()).unwrap();

        let err = engine
            .assign_quest(LearnerId::new(), &QuestId::new("daily-correct-10"), Timestamp::now())
            .unwrap_err();
        assert!(err.is_not_found());

        engine.close().unwrap();
    }

    #[test]
    fn test_quest_progress_lists_assigned() {
        let dir = tempdir().unwrap();
        let engine = Stryde::open(dir.path().join("test.db"), catalog_config()).unwrap();

        let now = Timestamp::now();
        let learner = engine.create_learner("kim", now).unwrap();
        engine
            .assign_quest(learner.id, &QuestId::new("daily-correct-10"), now)
            .unwrap();
        engine
            .assign_quest(learner.id, &QuestId::new("grammar-grind"), now)
            .unwrap();

        let progress = engine.quest_progress(learner.id).unwrap();
        assert_eq!(progress.len(), 2);
        assert!(progress.iter().any(|p| p.title == "Quest daily-correct-10"));

        engine.close().unwrap();
    }

    #[test]
    fn test_quest_progress_requires_learner() {
        let dir = tempdir().unwrap();
        let engine = Stryde::open(dir.path().join("test.db"), catalog_config()).unwrap();

        let err = engine.quest_progress(LearnerId::new()).unwrap_err();
        assert!(err.is_not_found());

        engine.close().unwrap();
    }

    // ====================================================================
    // Property-based tests
    // ====================================================================

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        fn arb_matcher() -> impl Strategy<Value = QuestMatcher> {
            prop_oneof![
                Just(QuestMatcher::CorrectAnswers),
                Just(QuestMatcher::AttemptsCompleted),
                Just(QuestMatcher::PerfectAttempts),
                Just(QuestMatcher::XpEarned),
                Just(QuestMatcher::TopicAttempts {
                    topic: "past-tense".into(),
                }),
            ]
        }

        fn arb_event() -> impl Strategy<Value = AttemptEvent> {
            (
                0u32..20,
                0u32..20,
                prop::option::of(prop_oneof![
                    Just("past-tense".to_string()),
                    Just("plurals".to_string()),
                ]),
                0u64..100,
            )
                .prop_map(|(correct, incorrect, topic, xp)| AttemptEvent {
                    learner_id: LearnerId::new(),
                    attempt_id: "a-prop".into(),
                    topic,
                    correct_count: correct,
                    incorrect_count: incorrect,
                    xp,
                    occurred_at: Timestamp::from_millis(1_000),
                })
        }

        proptest! {
            // Property: progress clamps at the requirement, completion
            // latches, and at most one event reports completing the quest
            #[test]
            fn prop_progress_clamps_and_completion_latches(
                matcher in arb_matcher(),
                requirement in 1u64..50,
                events in prop::collection::vec(arb_event(), 1..40),
            ) {
                let definition = quest("prop-quest", matcher, requirement);
                let mut assignment = QuestAssignment::new(
                    LearnerId::new(),
                    QuestId::new("prop-quest"),
                    Timestamp::from_millis(0),
                );

                let mut completions = 0u32;
                let mut first_completed_at: Option<Timestamp> = None;
                for (i, event) in events.iter().enumerate() {
                    let at = Timestamp::from_millis(1 + i as i64);
                    let completed_now = apply_event(&mut assignment, &definition, event, at);

                    if completed_now {
                        completions += 1;
                        first_completed_at = assignment.completed_at;
                    }
                    prop_assert!(assignment.progress <= requirement);
                    prop_assert_eq!(assignment.completed, assignment.progress == requirement);
                    if assignment.completed {
                        prop_assert_eq!(assignment.completed_at, first_completed_at);
                    }
                }
                prop_assert!(completions <= 1);
            }

            // Property: a fresh assignment ends at exactly
            // min(requirement, summed contributions)
            #[test]
            fn prop_progress_totals_contributions(
                matcher in arb_matcher(),
                requirement in 1u64..200,
                events in prop::collection::vec(arb_event(), 0..40),
            ) {
                let total: u64 = events.iter().map(|e| matcher.contribution(e)).sum();
                let definition = quest("prop-quest", matcher, requirement);
                let mut assignment = QuestAssignment::new(
                    LearnerId::new(),
                    QuestId::new("prop-quest"),
                    Timestamp::from_millis(0),
                );

                for (i, event) in events.iter().enumerate() {
                    apply_event(&mut assignment, &definition, event, Timestamp::from_millis(i as i64));
                }

                prop_assert_eq!(assignment.progress, total.min(requirement));
                prop_assert_eq!(assignment.completed, total >= requirement);
            }
        }
    }
}
