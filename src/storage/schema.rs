//! Database schema definitions and versioning.
//!
//! This module defines the table structure for the redb storage engine.
//! All table definitions are compile-time constants to ensure consistency.
//!
//! # Schema Versioning
//!
//! The schema version is stored in the metadata table. When opening an
//! existing database, we check the version and fail if it doesn't match.
//! Migration support will be added in a future release.
//!
//! # Table Layout
//!
//! ```text
//! metadata              &str                -> &[u8]      StoreMetadata (bincode)
//! learners              &[u8; 16]           -> &[u8]      LearnerState (bincode)
//! xp_log                &[u8; 16]           -> &[u8]      XpLogEntry (bincode), key is entry id
//! xp_log_by_learner     &[u8; 16]           -> &[u8; 24]  multimap; value [ts_be | entry_id]
//! grants                (&[u8; 16], &str)   -> &[u8; 16]  (learner, grant key) -> entry id
//! quest_assignments     (&[u8; 16], &str)   -> &[u8]      QuestAssignment (bincode)
//! achievement_unlocks   (&[u8; 16], &str)   -> &[u8]      AchievementUnlock (bincode)
//! standings             (&[u8; 16], u32)    -> &[u8]      LeagueStanding (bincode), key (learner, season)
//! standings_by_league   (&[u8; 16], u32)    -> &[u8; 16]  multimap; (league, season) -> learner id
//! ```
//!
//! The grants table is the idempotency ledger: one-time rewards insert their
//! grant key here in the same transaction as the XP log entry, so a duplicate
//! grant attempt sees the existing row and becomes a no-op.

use redb::{MultimapTableDefinition, TableDefinition};
use serde::{Deserialize, Serialize};

use crate::types::Timestamp;

/// Current schema version.
///
/// Increment this when making breaking changes to the schema.
/// The database will refuse to open if versions don't match.
pub const SCHEMA_VERSION: u32 = 1;

/// Maximum length of a quest/achievement identifier or attempt id.
pub const MAX_SLUG_LENGTH: usize = 64;

/// Maximum length of a display name or catalog title.
pub const MAX_NAME_LENGTH: usize = 100;

/// Maximum length of a topic tag on an attempt.
pub const MAX_TOPIC_LENGTH: usize = 100;

/// Maximum length of an administrative adjustment note.
pub const MAX_NOTE_LENGTH: usize = 500;

/// Maximum XP accepted in a single award or adjustment.
pub const MAX_XP_AMOUNT: u64 = 10_000;

/// Maximum correct or incorrect answers accepted on a single attempt.
pub const MAX_ANSWER_COUNT: u32 = 1_000;

// ============================================================================
// Table Definitions
// ============================================================================

/// Metadata table for database-level information.
///
/// Stores schema version, creation time, and other database-wide settings.
/// Key is a string identifier, value is serialized data.
pub const METADATA_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("metadata");

/// Learner state table.
///
/// Key: LearnerId as 16-byte UUID
/// Value: bincode-serialized LearnerState struct
pub const LEARNERS_TABLE: TableDefinition<&[u8; 16], &[u8]> = TableDefinition::new("learners");

/// XP audit log table.
///
/// Key: XpEntryId as 16-byte UUID
/// Value: bincode-serialized XpLogEntry struct
///
/// Entries are immutable once written.
pub const XP_LOG_TABLE: TableDefinition<&[u8; 16], &[u8]> = TableDefinition::new("xp_log");

/// Index: XP log entries by learner, ordered by time.
///
/// Key: LearnerId as 16-byte UUID
/// Value: [timestamp_be: 8 bytes][entry_id: 16 bytes] = 24 bytes
///
/// The big-endian timestamp prefix makes multimap values sort
/// chronologically, so "recent entries for learner X" is a tail read.
pub const XP_LOG_BY_LEARNER_TABLE: MultimapTableDefinition<&[u8; 16], &[u8; 24]> =
    MultimapTableDefinition::new("xp_log_by_learner");

/// One-time reward grants.
///
/// Key: (LearnerId bytes, grant key such as "quest_complete/daily-10")
/// Value: XpEntryId of the log entry that granted the reward
///
/// Presence of a row means the reward was already issued.
pub const GRANTS_TABLE: TableDefinition<(&[u8; 16], &str), &[u8; 16]> =
    TableDefinition::new("grants");

/// Quest assignments.
///
/// Key: (LearnerId bytes, quest id)
/// Value: bincode-serialized QuestAssignment struct
pub const ASSIGNMENTS_TABLE: TableDefinition<(&[u8; 16], &str), &[u8]> =
    TableDefinition::new("quest_assignments");

/// Achievement unlocks.
///
/// Key: (LearnerId bytes, achievement id)
/// Value: bincode-serialized AchievementUnlock struct
///
/// Existence of the row is the unlock; inserts are idempotent.
pub const UNLOCKS_TABLE: TableDefinition<(&[u8; 16], &str), &[u8]> =
    TableDefinition::new("achievement_unlocks");

/// League standings, one row per learner per season.
///
/// Key: (LearnerId bytes, season as YYYYWW)
/// Value: bincode-serialized LeagueStanding struct
///
/// Rollover writes new rows for the next season; closed rows are kept.
pub const STANDINGS_TABLE: TableDefinition<(&[u8; 16], u32), &[u8]> =
    TableDefinition::new("standings");

/// Index: league membership per season.
///
/// Key: (LeagueId bytes, season as YYYYWW)
/// Value: LearnerId as 16-byte UUID
///
/// Rank computation reads one multimap key to find the cohort, then
/// fetches each standing row inside the same read transaction.
pub const STANDINGS_BY_LEAGUE_TABLE: MultimapTableDefinition<(&[u8; 16], u32), &[u8; 16]> =
    MultimapTableDefinition::new("standings_by_league");

// ============================================================================
// Store Metadata
// ============================================================================

/// Store metadata kept in the metadata table.
///
/// This is serialized with bincode and stored under the key "store_metadata".
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StoreMetadata {
    /// Schema version for compatibility checking.
    pub schema_version: u32,

    /// Timestamp when the store was created.
    pub created_at: Timestamp,

    /// Last time the store was opened (updated on each open).
    pub last_opened_at: Timestamp,
}

impl StoreMetadata {
    /// Creates new metadata for a fresh store.
    pub fn new() -> Self {
        let now = Timestamp::now();
        Self {
            schema_version: SCHEMA_VERSION,
            created_at: now,
            last_opened_at: now,
        }
    }

    /// Updates the last_opened_at timestamp.
    pub fn touch(&mut self) {
        self.last_opened_at = Timestamp::now();
    }

    /// Checks if this metadata is compatible with the current schema.
    pub fn is_compatible(&self) -> bool {
        self.schema_version == SCHEMA_VERSION
    }
}

impl Default for StoreMetadata {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Key Encoding Helpers
// ============================================================================

/// Encodes an XP log reference for the per-learner index.
///
/// Format: [timestamp_be: 8 bytes][entry_id: 16 bytes] = 24 bytes
///
/// The timestamp comes first so lexicographic ordering of multimap values
/// matches time ordering. Timestamps before the Unix epoch are not expected.
#[inline]
pub fn encode_log_ref(recorded_at: Timestamp, entry_id: &[u8; 16]) -> [u8; 24] {
    let mut value = [0u8; 24];
    value[..8].copy_from_slice(&recorded_at.to_be_bytes());
    value[8..24].copy_from_slice(entry_id);
    value
}

/// Decodes an XP log reference back into its timestamp and entry id.
#[inline]
pub fn decode_log_ref(value: &[u8; 24]) -> (Timestamp, [u8; 16]) {
    let mut ts_bytes = [0u8; 8];
    ts_bytes.copy_from_slice(&value[..8]);
    let mut id_bytes = [0u8; 16];
    id_bytes.copy_from_slice(&value[8..24]);
    (Timestamp::from_millis(i64::from_be_bytes(ts_bytes)), id_bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_version() {
        assert_eq!(SCHEMA_VERSION, 1);
    }

    #[test]
    fn test_store_metadata_new() {
        let meta = StoreMetadata::new();
        assert_eq!(meta.schema_version, SCHEMA_VERSION);
        assert!(meta.is_compatible());
        assert_eq!(meta.created_at, meta.last_opened_at);
    }

    #[test]
    fn test_store_metadata_touch() {
        let mut meta = StoreMetadata::new();
        let original = meta.last_opened_at;
        std::thread::sleep(std::time::Duration::from_millis(1));
        meta.touch();
        assert!(meta.last_opened_at > original);
    }

    #[test]
    fn test_store_metadata_serialization() {
        let meta = StoreMetadata::new();
        let bytes = bincode::serialize(&meta).unwrap();
        let restored: StoreMetadata = bincode::deserialize(&bytes).unwrap();
        assert_eq!(meta.schema_version, restored.schema_version);
        assert_eq!(meta.created_at, restored.created_at);
    }

    #[test]
    fn test_encode_log_ref_roundtrip() {
        let entry_id = [7u8; 16];
        let ts = Timestamp::from_millis(1234567890);

        let value = encode_log_ref(ts, &entry_id);
        let (decoded_ts, decoded_id) = decode_log_ref(&value);

        assert_eq!(decoded_ts, ts);
        assert_eq!(decoded_id, entry_id);
    }

    #[test]
    fn test_log_ref_ordering() {
        let entry_id = [1u8; 16];
        let v1 = encode_log_ref(Timestamp::from_millis(1000), &entry_id);
        let v2 = encode_log_ref(Timestamp::from_millis(2000), &entry_id);

        // Lexicographic ordering should match timestamp ordering
        assert!(v1 < v2);
    }

    #[test]
    fn test_log_ref_ties_break_on_entry_id() {
        let ts = Timestamp::from_millis(1000);
        let v1 = encode_log_ref(ts, &[1u8; 16]);
        let v2 = encode_log_ref(ts, &[2u8; 16]);

        assert!(v1 < v2);
        assert_ne!(v1, v2);
    }
}
