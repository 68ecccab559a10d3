//! Core type definitions for Stryde identifiers and timestamps.
//!
//! This module defines the fundamental ID types used throughout Stryde.
//! Entity IDs use UUID v7 for time-ordered unique identification; catalog
//! IDs (quests, achievements) are human-chosen string slugs.

use chrono::{DateTime, Datelike};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Learner identifier (UUID v7 for time-ordering).
///
/// Learners are the unit of isolation in Stryde: every heart, XP entry,
/// streak, quest assignment, and league standing belongs to exactly one
/// learner.
///
/// # Example
/// ```
/// use stryde::LearnerId;
///
/// let id = LearnerId::new();
/// println!("Created learner: {}", id);
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LearnerId(pub Uuid);

impl LearnerId {
    /// Creates a new LearnerId with a UUID v7 (time-ordered).
    #[inline]
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// Creates a nil (all zeros) LearnerId.
    /// Useful for testing or sentinel values.
    #[inline]
    pub fn nil() -> Self {
        Self(Uuid::nil())
    }

    /// Returns the raw UUID bytes for storage.
    #[inline]
    pub fn as_bytes(&self) -> &[u8; 16] {
        self.0.as_bytes()
    }

    /// Creates a LearnerId from raw bytes.
    #[inline]
    pub fn from_bytes(bytes: [u8; 16]) -> Self {
        Self(Uuid::from_bytes(bytes))
    }
}

impl Default for LearnerId {
    /// Returns a nil (all zeros) LearnerId.
    ///
    /// For a new unique ID, use [`LearnerId::new()`].
    fn default() -> Self {
        Self::nil()
    }
}

impl fmt::Display for LearnerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// XP ledger entry identifier (UUID v7 for time-ordering).
///
/// Every XP mutation appends exactly one ledger entry; the entry ID
/// doubles as the audit handle referenced by reward grants.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct XpEntryId(pub Uuid);

impl XpEntryId {
    /// Creates a new XpEntryId with a UUID v7 (time-ordered).
    #[inline]
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// Creates a nil (all zeros) XpEntryId.
    #[inline]
    pub fn nil() -> Self {
        Self(Uuid::nil())
    }

    /// Returns the raw UUID bytes for storage.
    #[inline]
    pub fn as_bytes(&self) -> &[u8; 16] {
        self.0.as_bytes()
    }

    /// Creates an XpEntryId from raw bytes.
    #[inline]
    pub fn from_bytes(bytes: [u8; 16]) -> Self {
        Self(Uuid::from_bytes(bytes))
    }
}

impl Default for XpEntryId {
    /// Returns a nil (all zeros) XpEntryId.
    ///
    /// For a new unique ID, use [`XpEntryId::new()`].
    fn default() -> Self {
        Self::nil()
    }
}

impl fmt::Display for XpEntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// League cohort identifier.
///
/// A league groups up to a configured number of learners competing over
/// one season. Fresh cohorts get UUID v7 ids; season rollover derives
/// successor ids deterministically (UUID v5) so a retried rollover lands
/// learners in the same cohorts instead of scattering them.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LeagueId(pub Uuid);

impl LeagueId {
    /// Creates a new LeagueId with a UUID v7 (time-ordered).
    #[inline]
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// Creates a nil (all zeros) LeagueId.
    #[inline]
    pub fn nil() -> Self {
        Self(Uuid::nil())
    }

    /// Derives a deterministic LeagueId from seed bytes (UUID v5).
    #[inline]
    pub fn derive(seed: &[u8]) -> Self {
        Self(Uuid::new_v5(&Uuid::NAMESPACE_OID, seed))
    }

    /// Returns the raw UUID bytes for storage.
    #[inline]
    pub fn as_bytes(&self) -> &[u8; 16] {
        self.0.as_bytes()
    }

    /// Creates a LeagueId from raw bytes.
    #[inline]
    pub fn from_bytes(bytes: [u8; 16]) -> Self {
        Self(Uuid::from_bytes(bytes))
    }
}

impl Default for LeagueId {
    /// Returns a nil (all zeros) LeagueId.
    ///
    /// For a new unique ID, use [`LeagueId::new()`].
    fn default() -> Self {
        Self::nil()
    }
}

impl fmt::Display for LeagueId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Quest identifier.
///
/// Quests are defined in a JSON catalog authored by the content team,
/// so their ids are human-chosen slugs ("daily-correct-10") rather than
/// generated UUIDs.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct QuestId(pub String);

impl QuestId {
    /// Creates a new QuestId from a string.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the quest ID as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for QuestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Achievement identifier.
///
/// Like quests, achievements come from a JSON catalog and use slug ids.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AchievementId(pub String);

impl AchievementId {
    /// Creates a new AchievementId from a string.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the achievement ID as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AchievementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unix timestamp in milliseconds.
///
/// Using i64 allows representing dates far into the future and past.
/// Millisecond precision is sufficient for progression events.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Timestamp(pub i64);

impl Timestamp {
    /// Creates a timestamp for the current moment.
    ///
    /// If the system clock is before the Unix epoch (should never happen
    /// in practice), returns a timestamp of 0 (epoch) rather than panicking.
    #[inline]
    pub fn now() -> Self {
        use std::time::{SystemTime, UNIX_EPOCH};
        let duration = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default();
        Self(duration.as_millis() as i64)
    }

    /// Creates a timestamp from Unix milliseconds.
    #[inline]
    pub const fn from_millis(millis: i64) -> Self {
        Self(millis)
    }

    /// Returns the timestamp as Unix milliseconds.
    #[inline]
    pub const fn as_millis(&self) -> i64 {
        self.0
    }

    /// Returns big-endian bytes for storage (enables lexicographic ordering).
    #[inline]
    pub fn to_be_bytes(&self) -> [u8; 8] {
        self.0.to_be_bytes()
    }

    /// Returns the UTC calendar view of this timestamp.
    ///
    /// Out-of-range timestamps (beyond ±262,000 years) clamp to the
    /// Unix epoch rather than panicking.
    #[inline]
    pub fn to_utc(&self) -> DateTime<chrono::Utc> {
        DateTime::from_timestamp_millis(self.0).unwrap_or(DateTime::UNIX_EPOCH)
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// League season identifier: one UTC ISO week, encoded as `year * 100 + week`.
///
/// Seasons are derived purely from timestamps, never stored as a mutable
/// counter, so every node computing a season for the same instant agrees.
/// The encoding is ordered: later weeks compare greater.
///
/// # Example
/// ```
/// use stryde::{SeasonId, Timestamp};
///
/// // 2025-01-06 is the Monday of ISO week 2 of 2025.
/// let season = SeasonId::from_timestamp(Timestamp::from_millis(1_736_121_600_000));
/// assert_eq!(season.as_u32(), 202502);
/// assert_eq!(season.to_string(), "2025-W02");
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SeasonId(pub u32);

impl SeasonId {
    /// Derives the season containing the given instant (UTC ISO week).
    pub fn from_timestamp(at: Timestamp) -> Self {
        let week = at.to_utc().iso_week();
        // ISO years before year 0 cannot occur for unix-epoch timestamps.
        let year = week.year().max(0) as u32;
        Self(year * 100 + week.week())
    }

    /// Returns the season immediately after this one.
    ///
    /// Calendar-correct across year boundaries, including 53-week ISO
    /// years. A season id that doesn't name a real ISO week (corrupt
    /// input) falls back to a plain numeric increment.
    pub fn next(&self) -> Self {
        use chrono::{Days, NaiveDate, Weekday};
        match NaiveDate::from_isoywd_opt(self.iso_year() as i32, self.iso_week(), Weekday::Mon) {
            Some(monday) => {
                let week = (monday + Days::new(7)).iso_week();
                Self(week.year().max(0) as u32 * 100 + week.week())
            }
            None => Self(self.0 + 1),
        }
    }

    /// Returns the raw `year * 100 + week` encoding (used as a table key).
    #[inline]
    pub const fn as_u32(&self) -> u32 {
        self.0
    }

    /// Returns the ISO week-numbering year.
    #[inline]
    pub const fn iso_year(&self) -> u32 {
        self.0 / 100
    }

    /// Returns the ISO week number (1 to 53).
    #[inline]
    pub const fn iso_week(&self) -> u32 {
        self.0 % 100
    }
}

impl fmt::Display for SeasonId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-W{:02}", self.iso_year(), self.iso_week())
    }
}
