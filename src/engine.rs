//! Stryde main struct and lifecycle operations.
//!
//! The [`Stryde`] struct is the primary interface for interacting with
//! the engine. It provides methods for:
//!
//! - Opening and closing the engine
//! - Managing learners and their profiles
//! - Spending and regenerating hearts
//! - Awarding XP, tracking streaks, quests, and achievements
//! - Weekly league standings and season rollover
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use stryde::{Stryde, Config, AttemptEvent, Timestamp};
//!
//! // Open or create an engine database
//! let engine = Stryde::open("./stryde.db", Config::default())?;
//!
//! // Create a learner
//! let learner = engine.create_learner("maya", Timestamp::now())?;
//!
//! // Apply a completed gameplay attempt
//! let outcome = engine.apply_attempt(AttemptEvent {
//!     learner_id: learner.id,
//!     attempt_id: "attempt-001".to_string(),
//!     topic: Some("fractions".to_string()),
//!     correct_count: 9,
//!     incorrect_count: 1,
//!     xp: 20,
//!     occurred_at: Timestamp::now(),
//! })?;
//!
//! // Close when done
//! engine.close()?;
//! ```
//!
//! # Thread Safety
//!
//! `Stryde` is `Send + Sync` and can be shared across threads using `Arc`.
//! The underlying storage uses MVCC for concurrent reads with exclusive
//! write locking; learner mutations are serialized by the per-learner
//! version check.

use std::path::Path;

use tracing::{debug, info, instrument};

use crate::config::Config;
use crate::error::{NotFoundError, Result, StrydeError};
use crate::events::{EventBus, EventSubscriber, ProgressionEvent};
use crate::learner::LearnerState;
use crate::storage::{open_store, EventBatch, ProgressionStore, StoreMetadata};
use crate::types::LearnerId;

/// The main Stryde engine handle.
///
/// This is the primary interface for all progression operations. Create an
/// instance with [`Stryde::open()`] and close it with [`Stryde::close()`].
///
/// # Ownership
///
/// `Stryde` owns its storage and event bus. When you call `close()`, the
/// engine is consumed and cannot be used afterward. This ensures resources
/// are properly released and all pending writes are flushed.
pub struct Stryde {
    /// Storage backend (redb).
    store: Box<dyn ProgressionStore>,

    /// Fan-out bus for post-commit milestone events.
    events: EventBus,

    /// Configuration used to open this engine.
    config: Config,
}

impl std::fmt::Debug for Stryde {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Stryde")
            .field("config", &self.config)
            .field("subscribers", &self.events.subscriber_count())
            .finish_non_exhaustive()
    }
}

impl Stryde {
    /// Opens or creates a Stryde engine at the specified path.
    ///
    /// If the database doesn't exist, it will be created with the given
    /// configuration. If it exists, the stored schema version is validated.
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the database file (created if it doesn't exist)
    /// * `config` - Configuration options for the engine
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Configuration is invalid (see [`Config::validate`])
    /// - Database file is corrupted
    /// - Database is locked by another process
    /// - Schema version doesn't match (needs migration)
    ///
    /// # Example
    ///
    /// ```rust,ignore
    /// use stryde::{Stryde, Config, HeartsConfig};
    ///
    /// // Open with default configuration
    /// let engine = Stryde::open("./stryde.db", Config::default())?;
    ///
    /// // Open with a custom heart cap
    /// let engine = Stryde::open("./stryde.db", Config {
    ///     hearts: HeartsConfig { cap: 3, regen_interval_minutes: 60 },
    ///     ..Default::default()
    /// })?;
    /// ```
    #[instrument(skip(config), fields(path = %path.as_ref().display()))]
    pub fn open(path: impl AsRef<Path>, config: Config) -> Result<Self> {
        // Validate configuration first
        config.validate()?;

        info!("Opening Stryde engine");

        // Open storage backend
        let store = open_store(&path, &config)?;

        let events = EventBus::new(config.event_buffer);

        info!(
            heart_cap = config.hearts.cap,
            sync_mode = ?config.sync_mode,
            "Stryde engine opened successfully"
        );

        Ok(Self {
            store,
            events,
            config,
        })
    }

    /// Closes the engine, flushing all pending writes.
    ///
    /// This method consumes the `Stryde` instance, ensuring it cannot be
    /// used after closing. Open [`EventStream`](crate::events::EventStream)s
    /// terminate once the engine is dropped.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage backend reports a flush failure.
    /// Note: the current redb backend flushes durably on drop, so this
    /// always returns `Ok(())` in practice.
    #[instrument(skip(self))]
    pub fn close(self) -> Result<()> {
        info!("Closing Stryde engine");

        // Close storage (flushes pending writes)
        self.store.close()?;

        info!("Stryde engine closed successfully");
        Ok(())
    }

    /// Returns a reference to the engine configuration.
    ///
    /// This is the configuration that was used to open the engine.
    #[inline]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Returns the store metadata.
    ///
    /// Metadata includes schema version and timestamps for when the
    /// database was created and last opened.
    #[inline]
    pub fn metadata(&self) -> &StoreMetadata {
        self.store.metadata()
    }

    /// Registers a subscriber for milestone events.
    ///
    /// Events are published after the owning transaction commits. See
    /// [`ProgressionEvent`] for the milestone taxonomy.
    pub fn subscribe(&self) -> EventSubscriber {
        self.events.subscribe()
    }

    // =========================================================================
    // Internal Accessors (for use by domain modules)
    // =========================================================================

    /// Returns a reference to the storage backend.
    ///
    /// This is for internal use by the domain modules.
    #[inline]
    pub(crate) fn store(&self) -> &dyn ProgressionStore {
        self.store.as_ref()
    }

    /// Publishes milestone events after a successful commit.
    #[inline]
    pub(crate) fn publish_all(&self, events: Vec<ProgressionEvent>) {
        for event in events {
            self.events.publish(event);
        }
    }

    /// Loads a learner or fails with `NotFound`.
    pub(crate) fn require_learner(&self, id: LearnerId) -> Result<LearnerState> {
        self.store
            .get_learner(id)?
            .ok_or_else(|| NotFoundError::learner(id).into())
    }

    /// Runs a learner mutation with optimistic-concurrency retry.
    ///
    /// `build` receives a fresh snapshot of the learner and produces the
    /// batch to commit plus the caller's outcome value. When the commit
    /// loses a version race the snapshot is re-read and `build` runs again,
    /// up to `config.max_event_retries` retries. Outcomes from abandoned
    /// iterations are discarded, so `build` must be side-effect free.
    pub(crate) fn commit_with_retry<T, F>(&self, learner: LearnerId, mut build: F) -> Result<T>
    where
        F: FnMut(LearnerState) -> Result<(EventBatch, T)>,
    {
        for attempt in 0..=self.config.max_event_retries {
            let state = self.require_learner(learner)?;
            let (batch, outcome) = build(state)?;

            if self.store.commit_event(&batch)? {
                return Ok(outcome);
            }

            debug!(
                learner = %learner,
                attempt = attempt + 1,
                "Commit lost version race, retrying"
            );
        }

        Err(StrydeError::conflict(learner))
    }
}

// Stryde is auto Send + Sync: Box<dyn ProgressionStore + Send + Sync>,
// EventBus, and Config are all Send + Sync.
