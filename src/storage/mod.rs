//! Storage layer abstractions for the progression engine.
//!
//! This module provides a trait-based abstraction over the storage engine,
//! allowing different backends to be used (e.g., redb, mock for testing).
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                       Stryde                                 │
//! │                          │                                   │
//! │                          ▼                                   │
//! │              ┌──────────────────────┐                       │
//! │              │   ProgressionStore   │  ← Trait              │
//! │              └──────────────────────┘                       │
//! │                          ▲                                   │
//! │                          │                                   │
//! │                   ┌──────┴──────┐                           │
//! │                   │  RedbStore  │                           │
//! │                   └─────────────┘                           │
//! │                       (prod)                                 │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Write Discipline
//!
//! Every mutation of a learner's state goes through [`EventBatch`] and
//! [`ProgressionStore::commit_event`], which applies a compare-and-swap on
//! the learner's `version` counter. Two concurrent events for the same
//! learner cannot both commit against the same prior version, so deltas are
//! never lost and one-time grant checks performed before the commit stay
//! valid at commit time.

pub mod redb;
pub mod schema;

pub use self::redb::RedbStore;
pub use schema::{StoreMetadata, SCHEMA_VERSION};

use std::path::Path;

use crate::achievements::AchievementUnlock;
use crate::config::Config;
use crate::error::Result;
use crate::learner::LearnerState;
use crate::league::LeagueStanding;
use crate::quests::QuestAssignment;
use crate::types::{LearnerId, LeagueId, QuestId, SeasonId, XpEntryId};
use crate::xp::XpLogEntry;

/// A consistent set of writes produced by one engine operation.
///
/// The batch is committed atomically: either every row lands or none do.
/// `expected_version` must equal the stored learner's `version` at commit
/// time; `learner.version` carries the incremented value that replaces it.
///
/// Because every learner mutation increments the version, the CAS serializes
/// all writers for a learner, including administrative adjustments.
#[derive(Clone, Debug)]
pub struct EventBatch {
    /// Version the stored learner row must still have for the commit to apply.
    pub expected_version: u64,

    /// The replacement learner state, with `version` already incremented.
    pub learner: LearnerState,

    /// XP audit log entries to append.
    pub xp_entries: Vec<XpLogEntry>,

    /// One-time grant keys to record, each pointing at its log entry.
    pub grants: Vec<(String, XpEntryId)>,

    /// Quest assignments to upsert (progress advances, completion latches).
    pub assignments: Vec<QuestAssignment>,

    /// Achievement unlocks to insert.
    pub unlocks: Vec<AchievementUnlock>,

    /// League standing to upsert for the learner's current season.
    pub standing: Option<LeagueStanding>,
}

impl EventBatch {
    /// Creates a batch replacing `expected_version` with the given state.
    ///
    /// The caller is responsible for having incremented `learner.version`.
    pub fn new(expected_version: u64, learner: LearnerState) -> Self {
        Self {
            expected_version,
            learner,
            xp_entries: Vec::new(),
            grants: Vec::new(),
            assignments: Vec::new(),
            unlocks: Vec::new(),
            standing: None,
        }
    }
}

/// Storage engine trait for the progression engine.
///
/// This trait defines the contract that any storage backend must implement.
/// The primary implementation is [`RedbStore`].
///
/// # Thread Safety
///
/// Implementations must be `Send + Sync` to allow the engine to be shared
/// across threads. The engine handles internal synchronization.
pub trait ProgressionStore: Send + Sync {
    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Returns the store metadata.
    ///
    /// The metadata includes schema version and open/create timestamps.
    fn metadata(&self) -> &StoreMetadata;

    /// Closes the store, flushing any pending writes.
    ///
    /// This method consumes the store. After calling `close()`, the store
    /// cannot be used.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend supports reporting flush failures.
    /// Note: the current redb backend flushes on drop (infallible), so
    /// this always returns `Ok(())` for [`RedbStore`].
    fn close(self: Box<Self>) -> Result<()>;

    /// Returns the path to the database file, if applicable.
    fn path(&self) -> Option<&Path>;

    // =========================================================================
    // Learner Rows
    // =========================================================================

    /// Inserts a freshly created learner.
    ///
    /// Learner ids are UUIDv7 so collisions do not occur in practice; an
    /// existing row with the same id is overwritten.
    ///
    /// # Errors
    ///
    /// Returns an error if the transaction or serialization fails.
    fn insert_learner(&self, state: &LearnerState) -> Result<()>;

    /// Retrieves a learner's state by id.
    ///
    /// Returns `None` if no learner with the given id exists.
    fn get_learner(&self, id: LearnerId) -> Result<Option<LearnerState>>;

    /// Permanently deletes a learner and everything keyed to them.
    ///
    /// Cascades across all tables in a single transaction:
    /// - the learner row
    /// - XP log entries and the by-learner index
    /// - grant rows
    /// - quest assignments
    /// - achievement unlocks
    /// - standing rows and their league index entries
    ///
    /// Returns `true` if the learner existed and was deleted.
    fn delete_learner(&self, id: LearnerId) -> Result<bool>;

    // =========================================================================
    // Event Commit
    // =========================================================================

    /// Atomically applies an [`EventBatch`] under a version check.
    ///
    /// Compares the stored learner's `version` against
    /// `batch.expected_version` inside the write transaction. On mismatch
    /// the transaction is abandoned and `Ok(false)` is returned so the
    /// caller can re-read and retry. On match, all rows in the batch are
    /// written and the commit returns `Ok(true)`.
    ///
    /// # Errors
    ///
    /// Returns an error if the learner row is missing or the transaction
    /// fails. A lost race is not an error.
    fn commit_event(&self, batch: &EventBatch) -> Result<bool>;

    // =========================================================================
    // XP Audit Log
    // =========================================================================

    /// Retrieves a single XP log entry by id.
    fn get_xp_entry(&self, id: XpEntryId) -> Result<Option<XpLogEntry>>;

    /// Lists the most recent XP log entries for a learner, newest first.
    ///
    /// Reads the by-learner index (which sorts chronologically) and fetches
    /// at most `limit` entries from the tail.
    fn list_xp_entries(&self, learner: LearnerId, limit: usize) -> Result<Vec<XpLogEntry>>;

    /// Looks up a one-time grant by key.
    ///
    /// Returns the id of the XP log entry that granted the reward, or
    /// `None` if the reward has not been granted.
    fn get_grant(&self, learner: LearnerId, key: &str) -> Result<Option<XpEntryId>>;

    // =========================================================================
    // Quest Assignments
    // =========================================================================

    /// Inserts a quest assignment if none exists for the pair.
    ///
    /// Returns `true` if the assignment was created, `false` if one already
    /// existed (the existing row is left untouched).
    fn insert_assignment(&self, assignment: &QuestAssignment) -> Result<bool>;

    /// Retrieves a quest assignment for a learner.
    fn get_assignment(&self, learner: LearnerId, quest: &QuestId)
        -> Result<Option<QuestAssignment>>;

    /// Lists all quest assignments for a learner.
    fn list_assignments(&self, learner: LearnerId) -> Result<Vec<QuestAssignment>>;

    // =========================================================================
    // Achievement Unlocks
    // =========================================================================

    /// Lists all achievement unlocks for a learner.
    fn list_unlocks(&self, learner: LearnerId) -> Result<Vec<AchievementUnlock>>;

    // =========================================================================
    // League Standings
    // =========================================================================

    /// Inserts a standing row if none exists for (learner, season).
    ///
    /// Also records the league index entry. Returns `true` if the row was
    /// created, `false` if the learner already has a standing this season.
    fn insert_standing(&self, standing: &LeagueStanding) -> Result<bool>;

    /// Retrieves a learner's standing for a season.
    fn get_standing(&self, learner: LearnerId, season: SeasonId)
        -> Result<Option<LeagueStanding>>;

    /// Retrieves a learner's most recent standing across all seasons.
    ///
    /// Season keys encode `year * 100 + week` and sort ascending, so this
    /// is the standing for the latest season the learner appears in. Used
    /// to inherit the league when auto-creating a new season's row.
    fn latest_standing(&self, learner: LearnerId) -> Result<Option<LeagueStanding>>;

    /// Lists all standings in a league for a season, joined with each
    /// learner's display name.
    ///
    /// The index read and every row fetch happen inside one read
    /// transaction, so the result is a consistent snapshot.
    fn list_league_rows(
        &self,
        league: LeagueId,
        season: SeasonId,
    ) -> Result<Vec<(LeagueStanding, String)>>;

    /// Atomically closes one season's rows and opens the next season's.
    ///
    /// Stamps `final_rank` on each closed row and inserts each opened row
    /// (plus its league index entry) unless a row for that
    /// (learner, season) already exists. The skip makes rollover retries
    /// safe: a retry arriving after learners have earned XP in the new
    /// season will not reset their weekly totals.
    fn commit_rollover(
        &self,
        closed: &[LeagueStanding],
        opened: &[LeagueStanding],
    ) -> Result<()>;
}

/// Opens a storage engine at the given path.
///
/// This is a convenience function that creates a [`RedbStore`] instance.
/// For more control, use `RedbStore::open()` directly.
///
/// # Arguments
///
/// * `path` - Path to the database file (created if it doesn't exist)
/// * `config` - Engine configuration
///
/// # Errors
///
/// Returns an error if:
/// - The database file is corrupted
/// - The database is locked by another process
/// - Schema version doesn't match
pub fn open_store(path: impl AsRef<Path>, config: &Config) -> Result<Box<dyn ProgressionStore>> {
    let store = RedbStore::open(path, config)?;
    Ok(Box::new(store))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_open_store() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.db");

        let config = Config::default();
        let store = open_store(&path, &config).unwrap();

        assert_eq!(store.metadata().schema_version, SCHEMA_VERSION);
        assert!(store.path().is_some());

        store.close().unwrap();
    }

    #[test]
    fn test_store_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<RedbStore>();
    }

    #[test]
    fn test_event_batch_new() {
        let state = LearnerState::new(
            LearnerId::new(),
            "kim".into(),
            0,
            5,
            crate::types::Timestamp::now(),
        );
        let batch = EventBatch::new(0, state.clone());

        assert_eq!(batch.expected_version, 0);
        assert_eq!(batch.learner.id, state.id);
        assert!(batch.xp_entries.is_empty());
        assert!(batch.grants.is_empty());
        assert!(batch.standing.is_none());
    }
}
