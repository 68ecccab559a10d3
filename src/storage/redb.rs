//! redb storage engine implementation.
//!
//! This module provides the primary storage backend for Stryde using
//! [redb](https://docs.rs/redb), a pure Rust embedded key-value store.
//!
//! # Features
//!
//! - ACID transactions with MVCC
//! - Single-writer, multiple-reader concurrency
//! - Automatic crash recovery
//! - Zero external dependencies (pure Rust)
//!
//! # File Layout
//!
//! When you open a database at `./stryde.db`, redb creates:
//! - `./stryde.db` - Main database file
//! - `./stryde.db.lock` - Lock file for writer coordination (may not be visible)

use std::path::{Path, PathBuf};

use ::redb::{Database, Durability, ReadableTable, WriteTransaction};
use tracing::{debug, info, instrument, warn};

use crate::config::Config;
use crate::error::{NotFoundError, Result, StorageError};
use crate::learner::LearnerState;
use crate::league::LeagueStanding;
use crate::quests::QuestAssignment;
use crate::types::{LearnerId, LeagueId, QuestId, SeasonId, XpEntryId};
use crate::xp::XpLogEntry;

use super::schema::{
    decode_log_ref, encode_log_ref, StoreMetadata, ASSIGNMENTS_TABLE, GRANTS_TABLE,
    LEARNERS_TABLE, METADATA_TABLE, SCHEMA_VERSION, STANDINGS_BY_LEAGUE_TABLE, STANDINGS_TABLE,
    UNLOCKS_TABLE, XP_LOG_BY_LEARNER_TABLE, XP_LOG_TABLE,
};
use super::{EventBatch, ProgressionStore};
use crate::achievements::AchievementUnlock;

/// Metadata key in the metadata table.
const METADATA_KEY: &str = "store_metadata";

/// redb storage engine wrapper.
///
/// This struct holds the redb database handle and cached metadata.
/// It implements [`ProgressionStore`] for use with the engine.
///
/// # Thread Safety
///
/// `RedbStore` is `Send + Sync`. redb handles internal synchronization
/// using MVCC for readers and exclusive locking for writers.
#[derive(Debug)]
pub struct RedbStore {
    /// The redb database handle.
    db: Database,

    /// Cached store metadata.
    metadata: StoreMetadata,

    /// Path to the database file.
    path: PathBuf,

    /// Durability applied to every write transaction, from the configured
    /// sync mode.
    durability: Durability,
}

impl RedbStore {
    /// Opens or creates a database at the given path.
    ///
    /// If the database doesn't exist, it will be created and initialized.
    /// If it exists, the stored metadata is validated against the current
    /// schema version.
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the database file
    /// * `config` - Engine configuration
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The database file is corrupted
    /// - The database is locked by another process
    /// - Schema version doesn't match
    #[instrument(skip(config), fields(path = %path.as_ref().display()))]
    pub fn open(path: impl AsRef<Path>, config: &Config) -> Result<Self> {
        let path = path.as_ref();
        let db_exists = path.exists();

        debug!(db_exists = db_exists, "Opening storage engine");

        let durability = if config.sync_mode.is_fast() {
            Durability::Eventual
        } else {
            Durability::Immediate
        };

        // Create or open the database
        let db = Self::create_database(path, config)?;

        if db_exists {
            // Validate existing database
            Self::open_existing(db, path.to_path_buf(), durability)
        } else {
            // Initialize new database
            Self::initialize_new(db, path.to_path_buf(), durability)
        }
    }

    /// Creates the redb database with appropriate settings.
    fn create_database(path: &Path, _config: &Config) -> Result<Database> {
        let builder = Database::builder();

        // Note: redb 2.x doesn't have set_cache_size, it manages memory internally
        // The cache_size_mb config will be used for future optimizations

        // Note: redb doesn't expose a typed error variant for lock conflicts,
        // so we detect them via error message string matching. This may need
        // updating if redb changes its error messages in a future version.
        let db = builder.create(path).map_err(|e| {
            if e.to_string().contains("locked") {
                StorageError::DatabaseLocked
            } else {
                StorageError::Redb(e.to_string())
            }
        })?;

        debug!("Database file opened successfully");
        Ok(db)
    }

    /// Initializes a new database with tables and metadata.
    #[instrument(skip(db, durability), fields(path = %path.display()))]
    fn initialize_new(db: Database, path: PathBuf, durability: Durability) -> Result<Self> {
        info!("Initializing new database");

        let metadata = StoreMetadata::new();

        // Create all tables and write metadata in a single transaction
        let write_txn = db.begin_write().map_err(StorageError::from)?;

        {
            // Create the metadata table and write metadata
            let mut meta_table = write_txn.open_table(METADATA_TABLE)?;
            let metadata_bytes = bincode::serialize(&metadata)
                .map_err(|e| StorageError::serialization(e.to_string()))?;
            meta_table.insert(METADATA_KEY, metadata_bytes.as_slice())?;

            // Create other tables (they're created on first access)
            let _ = write_txn.open_table(LEARNERS_TABLE)?;
            let _ = write_txn.open_table(XP_LOG_TABLE)?;
            let _ = write_txn.open_multimap_table(XP_LOG_BY_LEARNER_TABLE)?;
            let _ = write_txn.open_table(GRANTS_TABLE)?;
            let _ = write_txn.open_table(ASSIGNMENTS_TABLE)?;
            let _ = write_txn.open_table(UNLOCKS_TABLE)?;
            let _ = write_txn.open_table(STANDINGS_TABLE)?;
            let _ = write_txn.open_multimap_table(STANDINGS_BY_LEAGUE_TABLE)?;
        }

        write_txn.commit().map_err(StorageError::from)?;

        info!(schema_version = SCHEMA_VERSION, "Database initialized");

        Ok(Self {
            db,
            metadata,
            path,
            durability,
        })
    }

    /// Opens and validates an existing database.
    #[instrument(skip(db, durability), fields(path = %path.display()))]
    fn open_existing(db: Database, path: PathBuf, durability: Durability) -> Result<Self> {
        info!("Opening existing database");

        // Read metadata from the database
        let read_txn = db.begin_read().map_err(StorageError::from)?;

        let metadata = {
            let meta_table = read_txn.open_table(METADATA_TABLE).map_err(|e| {
                StorageError::corrupted(format!("Cannot open metadata table: {}", e))
            })?;

            let metadata_bytes = meta_table
                .get(METADATA_KEY)
                .map_err(StorageError::from)?
                .ok_or_else(|| StorageError::corrupted("Missing store metadata"))?;

            bincode::deserialize::<StoreMetadata>(metadata_bytes.value())
                .map_err(|e| StorageError::corrupted(format!("Invalid metadata format: {}", e)))?
        };

        drop(read_txn);

        // Validate schema version
        if metadata.schema_version != SCHEMA_VERSION {
            warn!(
                expected = SCHEMA_VERSION,
                found = metadata.schema_version,
                "Schema version mismatch"
            );
            return Err(StorageError::SchemaVersionMismatch {
                expected: SCHEMA_VERSION,
                found: metadata.schema_version,
            }
            .into());
        }

        // Update last_opened_at timestamp
        let mut metadata = metadata;
        metadata.touch();

        let write_txn = db.begin_write().map_err(StorageError::from)?;
        {
            let mut meta_table = write_txn.open_table(METADATA_TABLE)?;
            let metadata_bytes = bincode::serialize(&metadata)
                .map_err(|e| StorageError::serialization(e.to_string()))?;
            meta_table.insert(METADATA_KEY, metadata_bytes.as_slice())?;
        }
        write_txn.commit().map_err(StorageError::from)?;

        info!(
            schema_version = metadata.schema_version,
            "Database opened successfully"
        );

        Ok(Self {
            db,
            metadata,
            path,
            durability,
        })
    }

    /// Returns a reference to the underlying redb database.
    ///
    /// This is for internal use by other engine modules and tests.
    #[inline]
    #[allow(dead_code)] // Exercised by raw-transaction tests
    pub(crate) fn database(&self) -> &Database {
        &self.db
    }

    /// Begins a write transaction with the configured durability.
    fn begin_write(&self) -> Result<WriteTransaction> {
        let mut write_txn = self.db.begin_write().map_err(StorageError::from)?;
        write_txn.set_durability(self.durability);
        Ok(write_txn)
    }
}

impl ProgressionStore for RedbStore {
    // =========================================================================
    // Lifecycle
    // =========================================================================

    fn metadata(&self) -> &StoreMetadata {
        &self.metadata
    }

    #[instrument(skip(self))]
    fn close(self: Box<Self>) -> Result<()> {
        info!("Closing storage engine");

        // redb flushes all data durably on drop. Since `Database::drop` is
        // infallible, this method currently always returns Ok(()). The Result
        // return type is retained for API forward-compatibility if a future
        // storage backend can report flush errors.
        drop(self.db);

        info!("Storage engine closed");
        Ok(())
    }

    fn path(&self) -> Option<&Path> {
        Some(&self.path)
    }

    // =========================================================================
    // Learner Rows
    // =========================================================================

    fn insert_learner(&self, state: &LearnerState) -> Result<()> {
        let bytes =
            bincode::serialize(state).map_err(|e| StorageError::serialization(e.to_string()))?;

        let write_txn = self.begin_write()?;
        {
            let mut table = write_txn.open_table(LEARNERS_TABLE)?;
            table.insert(state.id.as_bytes(), bytes.as_slice())?;
        }
        write_txn.commit().map_err(StorageError::from)?;

        debug!(id = %state.id, name = %state.display_name, "Learner saved");
        Ok(())
    }

    fn get_learner(&self, id: LearnerId) -> Result<Option<LearnerState>> {
        let read_txn = self.db.begin_read().map_err(StorageError::from)?;
        let table = read_txn.open_table(LEARNERS_TABLE)?;

        match table.get(id.as_bytes())? {
            Some(value) => {
                let state: LearnerState = bincode::deserialize(value.value())
                    .map_err(|e| StorageError::serialization(e.to_string()))?;
                Ok(Some(state))
            }
            None => Ok(None),
        }
    }

    fn delete_learner(&self, id: LearnerId) -> Result<bool> {
        let id_bytes = id.as_bytes();
        let write_txn = self.begin_write()?;

        let existed;
        {
            let mut learners = write_txn.open_table(LEARNERS_TABLE)?;
            existed = learners.remove(id_bytes)?.is_some();
        }
        if !existed {
            // Dropping the transaction rolls it back; nothing was written.
            return Ok(false);
        }

        // XP log entries and their index
        let mut entry_ids: Vec<[u8; 16]> = Vec::new();
        {
            let mut index = write_txn.open_multimap_table(XP_LOG_BY_LEARNER_TABLE)?;
            for item in index.remove_all(id_bytes)? {
                let guard = item.map_err(StorageError::from)?;
                let (_, entry_id) = decode_log_ref(guard.value());
                entry_ids.push(entry_id);
            }
        }
        {
            let mut log = write_txn.open_table(XP_LOG_TABLE)?;
            for entry_id in &entry_ids {
                log.remove(entry_id)?;
            }
        }

        // Grant rows
        {
            let mut grants = write_txn.open_table(GRANTS_TABLE)?;
            let mut keys = Vec::new();
            for item in grants.range((id_bytes, "")..)? {
                let (key, _) = item.map_err(StorageError::from)?;
                let (kid, grant_key) = key.value();
                if kid != id_bytes {
                    break;
                }
                keys.push(grant_key.to_string());
            }
            for key in &keys {
                grants.remove((id_bytes, key.as_str()))?;
            }
        }

        // Quest assignments
        {
            let mut assignments = write_txn.open_table(ASSIGNMENTS_TABLE)?;
            let mut keys = Vec::new();
            for item in assignments.range((id_bytes, "")..)? {
                let (key, _) = item.map_err(StorageError::from)?;
                let (kid, quest_id) = key.value();
                if kid != id_bytes {
                    break;
                }
                keys.push(quest_id.to_string());
            }
            for key in &keys {
                assignments.remove((id_bytes, key.as_str()))?;
            }
        }

        // Achievement unlocks
        {
            let mut unlocks = write_txn.open_table(UNLOCKS_TABLE)?;
            let mut keys = Vec::new();
            for item in unlocks.range((id_bytes, "")..)? {
                let (key, _) = item.map_err(StorageError::from)?;
                let (kid, achievement_id) = key.value();
                if kid != id_bytes {
                    break;
                }
                keys.push(achievement_id.to_string());
            }
            for key in &keys {
                unlocks.remove((id_bytes, key.as_str()))?;
            }
        }

        // Standings and their league index entries
        let mut standing_keys: Vec<(u32, [u8; 16])> = Vec::new();
        {
            let mut standings = write_txn.open_table(STANDINGS_TABLE)?;
            for item in standings.range((id_bytes, 0u32)..)? {
                let (key, value) = item.map_err(StorageError::from)?;
                let (kid, season) = key.value();
                if kid != id_bytes {
                    break;
                }
                let standing: LeagueStanding = bincode::deserialize(value.value())
                    .map_err(|e| StorageError::serialization(e.to_string()))?;
                standing_keys.push((season, *standing.league_id.as_bytes()));
            }
            for (season, _) in &standing_keys {
                standings.remove((id_bytes, *season))?;
            }
        }
        {
            let mut index = write_txn.open_multimap_table(STANDINGS_BY_LEAGUE_TABLE)?;
            for (season, league) in &standing_keys {
                index.remove((league, *season), id_bytes)?;
            }
        }

        write_txn.commit().map_err(StorageError::from)?;

        debug!(
            id = %id,
            xp_entries = entry_ids.len(),
            standings = standing_keys.len(),
            "Learner deleted"
        );
        Ok(true)
    }

    // =========================================================================
    // Event Commit
    // =========================================================================

    fn commit_event(&self, batch: &EventBatch) -> Result<bool> {
        let learner_id = batch.learner.id;
        let id_bytes = learner_id.as_bytes();

        // Serialize everything up front so a bad record can never leave a
        // partially written transaction behind.
        let learner_bytes = bincode::serialize(&batch.learner)
            .map_err(|e| StorageError::serialization(e.to_string()))?;

        let mut entry_rows = Vec::with_capacity(batch.xp_entries.len());
        for entry in &batch.xp_entries {
            let bytes = bincode::serialize(entry)
                .map_err(|e| StorageError::serialization(e.to_string()))?;
            entry_rows.push((entry, bytes));
        }

        let mut assignment_rows = Vec::with_capacity(batch.assignments.len());
        for assignment in &batch.assignments {
            let bytes = bincode::serialize(assignment)
                .map_err(|e| StorageError::serialization(e.to_string()))?;
            assignment_rows.push((assignment, bytes));
        }

        let mut unlock_rows = Vec::with_capacity(batch.unlocks.len());
        for unlock in &batch.unlocks {
            let bytes = bincode::serialize(unlock)
                .map_err(|e| StorageError::serialization(e.to_string()))?;
            unlock_rows.push((unlock, bytes));
        }

        let standing_row = match &batch.standing {
            Some(standing) => Some((
                standing,
                bincode::serialize(standing)
                    .map_err(|e| StorageError::serialization(e.to_string()))?,
            )),
            None => None,
        };

        let write_txn = self.begin_write()?;

        {
            let mut learners = write_txn.open_table(LEARNERS_TABLE)?;

            let stored_version = match learners.get(id_bytes)? {
                Some(value) => {
                    let stored: LearnerState = bincode::deserialize(value.value())
                        .map_err(|e| StorageError::serialization(e.to_string()))?;
                    stored.version
                }
                None => return Err(NotFoundError::learner(learner_id).into()),
            };

            if stored_version != batch.expected_version {
                debug!(
                    learner = %learner_id,
                    expected = batch.expected_version,
                    found = stored_version,
                    "Version check failed, batch abandoned"
                );
                // Dropping the transaction rolls it back.
                return Ok(false);
            }

            learners.insert(id_bytes, learner_bytes.as_slice())?;
        }

        if !entry_rows.is_empty() {
            {
                let mut log = write_txn.open_table(XP_LOG_TABLE)?;
                for (entry, bytes) in &entry_rows {
                    log.insert(entry.id.as_bytes(), bytes.as_slice())?;
                }
            }
            {
                let mut index = write_txn.open_multimap_table(XP_LOG_BY_LEARNER_TABLE)?;
                for (entry, _) in &entry_rows {
                    index.insert(
                        id_bytes,
                        &encode_log_ref(entry.recorded_at, entry.id.as_bytes()),
                    )?;
                }
            }
        }

        if !batch.grants.is_empty() {
            let mut grants = write_txn.open_table(GRANTS_TABLE)?;
            for (key, entry_id) in &batch.grants {
                grants.insert((id_bytes, key.as_str()), entry_id.as_bytes())?;
            }
        }

        if !assignment_rows.is_empty() {
            let mut assignments = write_txn.open_table(ASSIGNMENTS_TABLE)?;
            for (assignment, bytes) in &assignment_rows {
                assignments.insert(
                    (id_bytes, assignment.quest_id.as_str()),
                    bytes.as_slice(),
                )?;
            }
        }

        if !unlock_rows.is_empty() {
            let mut unlocks = write_txn.open_table(UNLOCKS_TABLE)?;
            for (unlock, bytes) in &unlock_rows {
                unlocks.insert(
                    (id_bytes, unlock.achievement_id.as_str()),
                    bytes.as_slice(),
                )?;
            }
        }

        if let Some((standing, bytes)) = &standing_row {
            {
                let mut standings = write_txn.open_table(STANDINGS_TABLE)?;
                standings.insert((id_bytes, standing.season.as_u32()), bytes.as_slice())?;
            }
            {
                let mut index = write_txn.open_multimap_table(STANDINGS_BY_LEAGUE_TABLE)?;
                index.insert(
                    (standing.league_id.as_bytes(), standing.season.as_u32()),
                    id_bytes,
                )?;
            }
        }

        write_txn.commit().map_err(StorageError::from)?;

        debug!(
            learner = %learner_id,
            version = batch.learner.version,
            entries = batch.xp_entries.len(),
            grants = batch.grants.len(),
            "Event batch committed"
        );
        Ok(true)
    }

    // =========================================================================
    // XP Audit Log
    // =========================================================================

    fn get_xp_entry(&self, id: XpEntryId) -> Result<Option<XpLogEntry>> {
        let read_txn = self.db.begin_read().map_err(StorageError::from)?;
        let table = read_txn.open_table(XP_LOG_TABLE)?;

        match table.get(id.as_bytes())? {
            Some(value) => {
                let entry: XpLogEntry = bincode::deserialize(value.value())
                    .map_err(|e| StorageError::serialization(e.to_string()))?;
                Ok(Some(entry))
            }
            None => Ok(None),
        }
    }

    fn list_xp_entries(&self, learner: LearnerId, limit: usize) -> Result<Vec<XpLogEntry>> {
        let read_txn = self.db.begin_read().map_err(StorageError::from)?;
        let index = read_txn.open_multimap_table(XP_LOG_BY_LEARNER_TABLE)?;
        let log = read_txn.open_table(XP_LOG_TABLE)?;

        // Multimap values iterate in ascending byte order, which the
        // timestamp prefix makes chronological.
        let mut refs: Vec<[u8; 24]> = Vec::new();
        for item in index.get(learner.as_bytes())? {
            let guard = item.map_err(StorageError::from)?;
            refs.push(*guard.value());
        }

        let mut entries = Vec::with_capacity(limit.min(refs.len()));
        for value in refs.iter().rev().take(limit) {
            let (_, entry_id) = decode_log_ref(value);
            match log.get(&entry_id)? {
                Some(v) => {
                    let entry: XpLogEntry = bincode::deserialize(v.value())
                        .map_err(|e| StorageError::serialization(e.to_string()))?;
                    entries.push(entry);
                }
                None => {
                    warn!(learner = %learner, "Dangling XP log index entry");
                }
            }
        }

        Ok(entries)
    }

    fn get_grant(&self, learner: LearnerId, key: &str) -> Result<Option<XpEntryId>> {
        let read_txn = self.db.begin_read().map_err(StorageError::from)?;
        let table = read_txn.open_table(GRANTS_TABLE)?;

        match table.get((learner.as_bytes(), key))? {
            Some(value) => Ok(Some(XpEntryId::from_bytes(*value.value()))),
            None => Ok(None),
        }
    }

    // =========================================================================
    // Quest Assignments
    // =========================================================================

    fn insert_assignment(&self, assignment: &QuestAssignment) -> Result<bool> {
        let bytes = bincode::serialize(assignment)
            .map_err(|e| StorageError::serialization(e.to_string()))?;
        let id_bytes = assignment.learner_id.as_bytes();
        let quest_id = assignment.quest_id.as_str();

        let write_txn = self.begin_write()?;
        let created;
        {
            let mut table = write_txn.open_table(ASSIGNMENTS_TABLE)?;
            let exists = table.get((id_bytes, quest_id))?.is_some();
            if exists {
                created = false;
            } else {
                table.insert((id_bytes, quest_id), bytes.as_slice())?;
                created = true;
            }
        }
        write_txn.commit().map_err(StorageError::from)?;

        if created {
            debug!(learner = %assignment.learner_id, quest = quest_id, "Quest assigned");
        }
        Ok(created)
    }

    fn get_assignment(
        &self,
        learner: LearnerId,
        quest: &QuestId,
    ) -> Result<Option<QuestAssignment>> {
        let read_txn = self.db.begin_read().map_err(StorageError::from)?;
        let table = read_txn.open_table(ASSIGNMENTS_TABLE)?;

        match table.get((learner.as_bytes(), quest.as_str()))? {
            Some(value) => {
                let assignment: QuestAssignment = bincode::deserialize(value.value())
                    .map_err(|e| StorageError::serialization(e.to_string()))?;
                Ok(Some(assignment))
            }
            None => Ok(None),
        }
    }

    fn list_assignments(&self, learner: LearnerId) -> Result<Vec<QuestAssignment>> {
        let id_bytes = learner.as_bytes();
        let read_txn = self.db.begin_read().map_err(StorageError::from)?;
        let table = read_txn.open_table(ASSIGNMENTS_TABLE)?;

        let mut assignments = Vec::new();
        for item in table.range((id_bytes, "")..)? {
            let (key, value) = item.map_err(StorageError::from)?;
            let (kid, _) = key.value();
            if kid != id_bytes {
                break;
            }
            let assignment: QuestAssignment = bincode::deserialize(value.value())
                .map_err(|e| StorageError::serialization(e.to_string()))?;
            assignments.push(assignment);
        }

        Ok(assignments)
    }

    // =========================================================================
    // Achievement Unlocks
    // =========================================================================

    fn list_unlocks(&self, learner: LearnerId) -> Result<Vec<AchievementUnlock>> {
        let id_bytes = learner.as_bytes();
        let read_txn = self.db.begin_read().map_err(StorageError::from)?;
        let table = read_txn.open_table(UNLOCKS_TABLE)?;

        let mut unlocks = Vec::new();
        for item in table.range((id_bytes, "")..)? {
            let (key, value) = item.map_err(StorageError::from)?;
            let (kid, _) = key.value();
            if kid != id_bytes {
                break;
            }
            let unlock: AchievementUnlock = bincode::deserialize(value.value())
                .map_err(|e| StorageError::serialization(e.to_string()))?;
            unlocks.push(unlock);
        }

        Ok(unlocks)
    }

    // =========================================================================
    // League Standings
    // =========================================================================

    fn insert_standing(&self, standing: &LeagueStanding) -> Result<bool> {
        let bytes = bincode::serialize(standing)
            .map_err(|e| StorageError::serialization(e.to_string()))?;
        let id_bytes = standing.learner_id.as_bytes();
        let season = standing.season.as_u32();

        let write_txn = self.begin_write()?;
        let created;
        {
            let mut table = write_txn.open_table(STANDINGS_TABLE)?;
            let exists = table.get((id_bytes, season))?.is_some();
            if exists {
                created = false;
            } else {
                table.insert((id_bytes, season), bytes.as_slice())?;
                created = true;
            }
        }
        if created {
            let mut index = write_txn.open_multimap_table(STANDINGS_BY_LEAGUE_TABLE)?;
            index.insert((standing.league_id.as_bytes(), season), id_bytes)?;
        }
        write_txn.commit().map_err(StorageError::from)?;

        if created {
            debug!(
                learner = %standing.learner_id,
                league = %standing.league_id,
                season = %standing.season,
                "Standing created"
            );
        }
        Ok(created)
    }

    fn get_standing(
        &self,
        learner: LearnerId,
        season: SeasonId,
    ) -> Result<Option<LeagueStanding>> {
        let read_txn = self.db.begin_read().map_err(StorageError::from)?;
        let table = read_txn.open_table(STANDINGS_TABLE)?;

        match table.get((learner.as_bytes(), season.as_u32()))? {
            Some(value) => {
                let standing: LeagueStanding = bincode::deserialize(value.value())
                    .map_err(|e| StorageError::serialization(e.to_string()))?;
                Ok(Some(standing))
            }
            None => Ok(None),
        }
    }

    fn latest_standing(&self, learner: LearnerId) -> Result<Option<LeagueStanding>> {
        let read_txn = self.db.begin_read().map_err(StorageError::from)?;
        let table = read_txn.open_table(STANDINGS_TABLE)?;
        let id_bytes = learner.as_bytes();

        // Seasons sort ascending within the learner prefix, so the last
        // row in the bounded range is the most recent one.
        let mut range = table.range((id_bytes, 0u32)..=(id_bytes, u32::MAX))?;
        match range.next_back() {
            Some(item) => {
                let (_, value) = item.map_err(StorageError::from)?;
                let standing: LeagueStanding = bincode::deserialize(value.value())
                    .map_err(|e| StorageError::serialization(e.to_string()))?;
                Ok(Some(standing))
            }
            None => Ok(None),
        }
    }

    fn list_league_rows(
        &self,
        league: LeagueId,
        season: SeasonId,
    ) -> Result<Vec<(LeagueStanding, String)>> {
        let read_txn = self.db.begin_read().map_err(StorageError::from)?;
        let index = read_txn.open_multimap_table(STANDINGS_BY_LEAGUE_TABLE)?;
        let standings = read_txn.open_table(STANDINGS_TABLE)?;
        let learners = read_txn.open_table(LEARNERS_TABLE)?;

        let mut rows = Vec::new();
        for item in index.get((league.as_bytes(), season.as_u32()))? {
            let guard = item.map_err(StorageError::from)?;
            let learner_bytes: [u8; 16] = *guard.value();
            drop(guard);

            let standing = match standings.get((&learner_bytes, season.as_u32()))? {
                Some(value) => bincode::deserialize::<LeagueStanding>(value.value())
                    .map_err(|e| StorageError::serialization(e.to_string()))?,
                None => {
                    warn!(league = %league, season = %season, "Dangling league index entry");
                    continue;
                }
            };

            let display_name = match learners.get(&learner_bytes)? {
                Some(value) => {
                    bincode::deserialize::<LearnerState>(value.value())
                        .map_err(|e| StorageError::serialization(e.to_string()))?
                        .display_name
                }
                None => {
                    warn!(league = %league, season = %season, "Standing for missing learner");
                    continue;
                }
            };

            rows.push((standing, display_name));
        }

        Ok(rows)
    }

    fn commit_rollover(
        &self,
        closed: &[LeagueStanding],
        opened: &[LeagueStanding],
    ) -> Result<()> {
        let mut closed_rows = Vec::with_capacity(closed.len());
        for standing in closed {
            let bytes = bincode::serialize(standing)
                .map_err(|e| StorageError::serialization(e.to_string()))?;
            closed_rows.push((standing, bytes));
        }
        let mut opened_rows = Vec::with_capacity(opened.len());
        for standing in opened {
            let bytes = bincode::serialize(standing)
                .map_err(|e| StorageError::serialization(e.to_string()))?;
            opened_rows.push((standing, bytes));
        }

        let write_txn = self.begin_write()?;

        let mut inserted: Vec<&LeagueStanding> = Vec::new();
        {
            let mut table = write_txn.open_table(STANDINGS_TABLE)?;

            for (standing, bytes) in &closed_rows {
                table.insert(
                    (standing.learner_id.as_bytes(), standing.season.as_u32()),
                    bytes.as_slice(),
                )?;
            }

            // Skip rows that already exist so a rollover retry can never
            // reset weekly XP earned in the new season.
            for (standing, bytes) in &opened_rows {
                let key = (standing.learner_id.as_bytes(), standing.season.as_u32());
                let exists = table.get(key)?.is_some();
                if !exists {
                    table.insert(key, bytes.as_slice())?;
                    inserted.push(standing);
                }
            }
        }
        if !inserted.is_empty() {
            let mut index = write_txn.open_multimap_table(STANDINGS_BY_LEAGUE_TABLE)?;
            for standing in &inserted {
                index.insert(
                    (standing.league_id.as_bytes(), standing.season.as_u32()),
                    standing.learner_id.as_bytes(),
                )?;
            }
        }

        write_txn.commit().map_err(StorageError::from)?;

        debug!(
            closed = closed.len(),
            opened = inserted.len(),
            "Season rollover committed"
        );
        Ok(())
    }
}

// RedbStore is auto Send + Sync: Database, StoreMetadata, and PathBuf are
// all Send + Sync.
