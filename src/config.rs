//! Configuration types for Stryde.
//!
//! The [`Config`] struct controls engine behavior including:
//! - Hearts economy tuning (cap, regeneration interval)
//! - The XP-to-level curve
//! - League sizing and promotion/demotion cutoffs
//! - Quest and achievement catalogs
//!
//! # Example
//! ```rust
//! use stryde::{Config, LevelCurve, SyncMode};
//!
//! // Use defaults (5 hearts, 30 min regen, power curve)
//! let config = Config::default();
//!
//! // Customize for production
//! let config = Config {
//!     level_curve: LevelCurve::Stepped(vec![0, 100, 250, 500]),
//!     cache_size_mb: 128,
//!     sync_mode: SyncMode::Normal,
//!     ..Default::default()
//! };
//! ```

use serde::{Deserialize, Serialize};

use crate::achievements::AchievementCatalog;
use crate::error::ValidationError;
use crate::quests::QuestCatalog;

/// Engine configuration options.
///
/// All fields have sensible defaults. Use struct update syntax to override
/// specific settings:
///
/// ```rust
/// use stryde::Config;
///
/// let config = Config {
///     max_event_retries: 5,
///     ..Default::default()
/// };
/// ```
#[derive(Clone, Debug)]
pub struct Config {
    /// Hearts economy tuning.
    pub hearts: HeartsConfig,

    /// Mapping from lifetime XP to level.
    pub level_curve: LevelCurve,

    /// League sizing and promotion/demotion cutoffs.
    pub league: LeagueConfig,

    /// Quest catalog (usually loaded from JSON authored by content).
    pub quests: QuestCatalog,

    /// Achievement catalog (usually loaded from JSON authored by content).
    pub achievements: AchievementCatalog,

    /// UTC offset in minutes applied to learners created without an
    /// explicit timezone. Day boundaries for streaks use this offset.
    pub default_utc_offset_minutes: i32,

    /// How many times an event application is attempted before a
    /// concurrency conflict is surfaced to the caller.
    ///
    /// Default: 3
    pub max_event_retries: u32,

    /// Capacity of each subscriber's event channel.
    ///
    /// Slow subscribers drop events once their buffer fills rather than
    /// blocking commits. Default: 1024
    pub event_buffer: usize,

    /// Cache size in megabytes for the storage engine.
    ///
    /// Higher values improve read performance but use more memory.
    /// Default: 64 MB
    pub cache_size_mb: usize,

    /// Durability mode for write operations.
    pub sync_mode: SyncMode,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            hearts: HeartsConfig::default(),
            level_curve: LevelCurve::default(),
            league: LeagueConfig::default(),
            quests: QuestCatalog::default(),
            achievements: AchievementCatalog::default(),
            default_utc_offset_minutes: 0,
            max_event_retries: 3,
            event_buffer: 1024,
            cache_size_mb: 64,
            sync_mode: SyncMode::Normal,
        }
    }
}

impl Config {
    /// Creates a new Config with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a Config with an explicit stepped level curve.
    ///
    /// # Example
    /// ```rust
    /// use stryde::Config;
    ///
    /// // Level 1 at 0 XP, level 2 at 100, level 3 at 250, level 4 at 500.
    /// let config = Config::with_level_thresholds(vec![0, 100, 250, 500]);
    /// ```
    pub fn with_level_thresholds(thresholds: Vec<u64>) -> Self {
        Self {
            level_curve: LevelCurve::Stepped(thresholds),
            ..Default::default()
        }
    }

    /// Creates a Config with the given quest and achievement catalogs.
    ///
    /// # Example
    /// ```rust,ignore
    /// use stryde::{AchievementCatalog, Config, QuestCatalog};
    ///
    /// let quests = QuestCatalog::from_json_str(include_str!("quests.json"))?;
    /// let achievements = AchievementCatalog::from_json_str(include_str!("achievements.json"))?;
    /// let config = Config::with_catalogs(quests, achievements);
    /// ```
    pub fn with_catalogs(quests: QuestCatalog, achievements: AchievementCatalog) -> Self {
        Self {
            quests,
            achievements,
            ..Default::default()
        }
    }

    /// Validates the configuration.
    ///
    /// Called automatically by `Stryde::open()`. You can also call this
    /// explicitly to check configuration before attempting to open.
    ///
    /// # Errors
    /// Returns `ValidationError` if:
    /// - The heart cap or regeneration interval is 0
    /// - The level curve is empty, non-monotonic, or doesn't start at 0
    /// - League cutoffs exceed the cohort size
    /// - The default UTC offset is outside ±14 hours
    /// - `max_event_retries`, `event_buffer`, or `cache_size_mb` is 0
    /// - Either catalog contains duplicate or malformed definitions
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.hearts.validate()?;
        self.level_curve.validate()?;
        self.league.validate()?;
        self.quests.validate()?;
        self.achievements.validate()?;

        // ±14 hours covers every real-world UTC offset
        if self.default_utc_offset_minutes.abs() > 14 * 60 {
            return Err(ValidationError::invalid_field(
                "default_utc_offset_minutes",
                "must be within ±840 (14 hours)",
            ));
        }

        if self.max_event_retries == 0 {
            return Err(ValidationError::invalid_field(
                "max_event_retries",
                "must be greater than 0",
            ));
        }

        if self.event_buffer == 0 {
            return Err(ValidationError::invalid_field(
                "event_buffer",
                "must be greater than 0",
            ));
        }

        if self.cache_size_mb == 0 {
            return Err(ValidationError::invalid_field(
                "cache_size_mb",
                "must be greater than 0",
            ));
        }

        Ok(())
    }
}

/// Hearts economy tuning.
///
/// Hearts are a capped allowance that refills lazily: no background timer
/// runs, the engine recomputes accrued hearts from `last_heart_regen_at`
/// whenever hearts are read or spent.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeartsConfig {
    /// Maximum hearts a learner can hold.
    pub cap: u32,

    /// Minutes between single-heart regenerations.
    pub regen_interval_minutes: u32,
}

impl Default for HeartsConfig {
    fn default() -> Self {
        Self {
            cap: 5,
            regen_interval_minutes: 30,
        }
    }
}

impl HeartsConfig {
    /// Returns the regeneration interval in milliseconds.
    #[inline]
    pub const fn regen_interval_millis(&self) -> i64 {
        self.regen_interval_minutes as i64 * 60_000
    }

    fn validate(&self) -> Result<(), ValidationError> {
        if self.cap == 0 {
            return Err(ValidationError::invalid_field(
                "hearts.cap",
                "must be greater than 0",
            ));
        }
        if self.regen_interval_minutes == 0 {
            return Err(ValidationError::invalid_field(
                "hearts.regen_interval_minutes",
                "must be greater than 0",
            ));
        }
        Ok(())
    }
}

/// Mapping from lifetime XP to level.
///
/// Levels are always *derived* from lifetime XP through this curve, never
/// stored as an independently mutable counter, so concurrent awards can
/// never leave the level out of sync with the XP total.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum LevelCurve {
    /// Explicit cumulative thresholds: entry `i` is the lifetime XP
    /// required to reach level `i + 1`. Must start at 0 and be strictly
    /// increasing. Learners cap at level `thresholds.len()`.
    Stepped(Vec<u64>),

    /// Unbounded power curve: reaching level `n` requires
    /// `round(base * (n - 1) ^ exponent)` lifetime XP.
    Power {
        /// Scale factor (XP required to reach level 2).
        base: f64,
        /// Growth exponent (1.0 is linear).
        exponent: f64,
    },
}

impl Default for LevelCurve {
    /// A gentle power curve: 100 XP to level 2, ~283 to level 3, ~520 to 4.
    fn default() -> Self {
        Self::Power {
            base: 100.0,
            exponent: 1.5,
        }
    }
}

impl LevelCurve {
    /// Returns the level for the given lifetime XP total.
    ///
    /// Always at least 1. Monotonic: more XP never yields a lower level.
    ///
    /// # Example
    /// ```rust
    /// use stryde::LevelCurve;
    ///
    /// let curve = LevelCurve::Stepped(vec![0, 100, 250, 500]);
    /// assert_eq!(curve.level_for_xp(90), 1);
    /// assert_eq!(curve.level_for_xp(110), 2);
    /// assert_eq!(curve.level_for_xp(500), 4);
    /// ```
    pub fn level_for_xp(&self, total_xp: u64) -> u32 {
        match self {
            Self::Stepped(thresholds) => {
                thresholds.iter().take_while(|&&t| t <= total_xp).count() as u32
            }
            Self::Power { base, exponent } => {
                // Invert the curve for a starting estimate, then walk to the
                // exact boundary (float rounding can land one level off).
                // The float-to-int cast saturates, so absurd XP totals cap
                // the level at u32::MAX instead of overflowing.
                let estimate = (total_xp as f64 / base).powf(1.0 / exponent).floor() as u32;
                let mut level = estimate.saturating_add(1);
                while level < u32::MAX
                    && self
                        .xp_for_level(level + 1)
                        .is_some_and(|t| t <= total_xp)
                {
                    level += 1;
                }
                while level > 1 && self.xp_for_level(level).is_some_and(|t| t > total_xp) {
                    level -= 1;
                }
                level
            }
        }
    }

    /// Returns the lifetime XP required to reach the given level.
    ///
    /// Returns `None` for level 0 or for levels beyond a stepped curve's
    /// final threshold. Level 1 always costs 0.
    pub fn xp_for_level(&self, level: u32) -> Option<u64> {
        if level == 0 {
            return None;
        }
        match self {
            Self::Stepped(thresholds) => thresholds.get(level as usize - 1).copied(),
            Self::Power { base, exponent } => {
                Some((base * f64::from(level - 1).powf(*exponent)).round() as u64)
            }
        }
    }

    /// Returns the XP still needed to reach the next level, or `None`
    /// when the learner sits at a stepped curve's maximum level.
    pub fn xp_to_next(&self, total_xp: u64) -> Option<u64> {
        let next = self.level_for_xp(total_xp) + 1;
        self.xp_for_level(next)
            .map(|threshold| threshold.saturating_sub(total_xp))
    }

    fn validate(&self) -> Result<(), ValidationError> {
        match self {
            Self::Stepped(thresholds) => {
                if thresholds.is_empty() {
                    return Err(ValidationError::invalid_field(
                        "level_curve",
                        "stepped curve must have at least one threshold",
                    ));
                }
                if thresholds[0] != 0 {
                    return Err(ValidationError::invalid_field(
                        "level_curve",
                        "first threshold must be 0 (level 1 is free)",
                    ));
                }
                if thresholds.windows(2).any(|w| w[0] >= w[1]) {
                    return Err(ValidationError::invalid_field(
                        "level_curve",
                        "thresholds must be strictly increasing",
                    ));
                }
            }
            Self::Power { base, exponent } => {
                if !base.is_finite() || *base < 1.0 {
                    return Err(ValidationError::invalid_field(
                        "level_curve",
                        "power curve base must be finite and at least 1",
                    ));
                }
                if !exponent.is_finite() || *exponent < 1.0 {
                    return Err(ValidationError::invalid_field(
                        "level_curve",
                        "power curve exponent must be finite and at least 1",
                    ));
                }
            }
        }
        Ok(())
    }
}

/// League sizing and promotion/demotion cutoffs.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeagueConfig {
    /// Number of tiers, 0 (lowest) to `tier_count - 1` (highest).
    pub tier_count: u8,

    /// Target number of learners per league cohort.
    pub cohort_size: u32,

    /// How many of a league's top finishers move up a tier at rollover.
    pub promote_count: u32,

    /// How many of a league's bottom finishers move down a tier at rollover.
    pub demote_count: u32,
}

impl Default for LeagueConfig {
    fn default() -> Self {
        Self {
            tier_count: 5,
            cohort_size: 30,
            promote_count: 3,
            demote_count: 3,
        }
    }
}

impl LeagueConfig {
    fn validate(&self) -> Result<(), ValidationError> {
        if self.tier_count == 0 {
            return Err(ValidationError::invalid_field(
                "league.tier_count",
                "must be greater than 0",
            ));
        }
        if self.cohort_size == 0 {
            return Err(ValidationError::invalid_field(
                "league.cohort_size",
                "must be greater than 0",
            ));
        }
        if self.promote_count + self.demote_count > self.cohort_size {
            return Err(ValidationError::invalid_field(
                "league",
                "promote_count + demote_count must not exceed cohort_size",
            ));
        }
        Ok(())
    }
}

/// Durability mode for write operations.
///
/// Controls the trade-off between write performance and crash safety.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SyncMode {
    /// Sync to disk on transaction commit.
    ///
    /// This is the default and recommended setting. Provides good performance
    /// while ensuring committed data survives crashes.
    #[default]
    Normal,

    /// Async sync (faster writes, may lose recent data on crash).
    ///
    /// Use for development or when you can tolerate losing the last few
    /// seconds of writes. Significantly faster than `Normal`.
    Fast,
}

impl SyncMode {
    /// Returns true if this mode is async (may lose data on crash).
    pub fn is_fast(&self) -> bool {
        matches!(self, Self::Fast)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.hearts.cap, 5);
        assert_eq!(config.hearts.regen_interval_minutes, 30);
        assert_eq!(config.max_event_retries, 3);
        assert_eq!(config.cache_size_mb, 64);
        assert_eq!(config.sync_mode, SyncMode::Normal);
        assert!(config.quests.is_empty());
        assert!(config.achievements.is_empty());
    }

    #[test]
    fn test_with_level_thresholds() {
        let config = Config::with_level_thresholds(vec![0, 100, 250, 500]);
        assert_eq!(
            config.level_curve,
            LevelCurve::Stepped(vec![0, 100, 250, 500])
        );
    }

    #[test]
    fn test_validate_success() {
        let config = Config::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_heart_cap_zero() {
        let config = Config {
            hearts: HeartsConfig {
                cap: 0,
                regen_interval_minutes: 30,
            },
            ..Default::default()
        };
        let err = config.validate().unwrap_err();
        assert!(
            matches!(err, ValidationError::InvalidField { field, .. } if field == "hearts.cap")
        );
    }

    #[test]
    fn test_validate_regen_interval_zero() {
        let config = Config {
            hearts: HeartsConfig {
                cap: 5,
                regen_interval_minutes: 0,
            },
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_stepped_curve_must_start_at_zero() {
        let config = Config::with_level_thresholds(vec![100, 250]);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_stepped_curve_must_increase() {
        let config = Config::with_level_thresholds(vec![0, 250, 250]);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_power_curve_bad_base() {
        let config = Config {
            level_curve: LevelCurve::Power {
                base: 0.5,
                exponent: 1.5,
            },
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_offset_out_of_range() {
        let config = Config {
            default_utc_offset_minutes: 15 * 60,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_league_cutoffs() {
        let config = Config {
            league: LeagueConfig {
                tier_count: 5,
                cohort_size: 4,
                promote_count: 3,
                demote_count: 3,
            },
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_stepped_level_for_xp() {
        let curve = LevelCurve::Stepped(vec![0, 100, 250, 500]);
        assert_eq!(curve.level_for_xp(0), 1);
        assert_eq!(curve.level_for_xp(90), 1);
        assert_eq!(curve.level_for_xp(100), 2);
        assert_eq!(curve.level_for_xp(110), 2);
        assert_eq!(curve.level_for_xp(249), 2);
        assert_eq!(curve.level_for_xp(250), 3);
        assert_eq!(curve.level_for_xp(10_000), 4);
    }

    #[test]
    fn test_stepped_xp_to_next() {
        let curve = LevelCurve::Stepped(vec![0, 100, 250, 500]);
        assert_eq!(curve.xp_to_next(110), Some(140));
        assert_eq!(curve.xp_to_next(0), Some(100));
        // Max level: no next threshold
        assert_eq!(curve.xp_to_next(500), None);
    }

    #[test]
    fn test_power_level_for_xp() {
        let curve = LevelCurve::Power {
            base: 100.0,
            exponent: 1.5,
        };
        assert_eq!(curve.level_for_xp(0), 1);
        assert_eq!(curve.level_for_xp(99), 1);
        assert_eq!(curve.level_for_xp(100), 2);
        // round(100 * 2^1.5) = 283
        assert_eq!(curve.xp_for_level(3), Some(283));
        assert_eq!(curve.level_for_xp(282), 2);
        assert_eq!(curve.level_for_xp(283), 3);
    }

    #[test]
    fn test_power_curve_is_monotonic() {
        let curve = LevelCurve::default();
        let mut last = 0;
        for xp in (0..50_000).step_by(997) {
            let level = curve.level_for_xp(xp);
            assert!(level >= last, "level dropped at xp={}", xp);
            last = level;
        }
    }

    #[test]
    fn test_xp_for_level_zero_is_none() {
        assert_eq!(LevelCurve::default().xp_for_level(0), None);
        assert_eq!(LevelCurve::Stepped(vec![0, 100]).xp_for_level(0), None);
    }

    #[test]
    fn test_level_is_free_at_one() {
        assert_eq!(LevelCurve::default().xp_for_level(1), Some(0));
        assert_eq!(LevelCurve::Stepped(vec![0, 100]).xp_for_level(1), Some(0));
    }

    #[test]
    fn test_sync_mode_checks() {
        assert!(!SyncMode::Normal.is_fast());
        assert!(SyncMode::Fast.is_fast());
    }

    #[test]
    fn test_level_curve_serialization() {
        let curve = LevelCurve::Stepped(vec![0, 100, 250]);
        let bytes = bincode::serialize(&curve).unwrap();
        let restored: LevelCurve = bincode::deserialize(&bytes).unwrap();
        assert_eq!(curve, restored);
    }

    // ====================================================================
    // Property-based tests
    // ====================================================================

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        fn arb_curve() -> impl Strategy<Value = LevelCurve> {
            prop_oneof![
                prop::collection::vec(1u64..5_000, 1..12).prop_map(|deltas| {
                    let mut thresholds = vec![0u64];
                    let mut acc = 0u64;
                    for delta in deltas {
                        acc += delta;
                        thresholds.push(acc);
                    }
                    LevelCurve::Stepped(thresholds)
                }),
                (1.0f64..500.0, 1.0f64..3.0)
                    .prop_map(|(base, exponent)| LevelCurve::Power { base, exponent }),
            ]
        }

        proptest! {
            // Property: more XP never yields a lower level
            #[test]
            fn prop_level_for_xp_monotone(
                curve in arb_curve(),
                a in 0u64..1_000_000,
                b in 0u64..1_000_000,
            ) {
                let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
                prop_assert!(curve.level_for_xp(lo) <= curve.level_for_xp(hi));
            }

            // Property: the derived level's own threshold is affordable
            // and the next one is not
            #[test]
            fn prop_level_band_contains_xp(curve in arb_curve(), xp in 0u64..1_000_000) {
                let level = curve.level_for_xp(xp);
                prop_assert!(level >= 1);
                prop_assert!(curve.xp_for_level(level).unwrap() <= xp);
                if let Some(next) = curve.xp_for_level(level + 1) {
                    prop_assert!(next > xp);
                }
            }

            // Property: paying exactly the published shortfall lands
            // exactly one level up
            #[test]
            fn prop_xp_to_next_reaches_next_level(curve in arb_curve(), xp in 0u64..1_000_000) {
                let level = curve.level_for_xp(xp);
                match curve.xp_to_next(xp) {
                    Some(need) => {
                        prop_assert!(need >= 1);
                        prop_assert_eq!(curve.level_for_xp(xp + need), level + 1);
                    }
                    // Only a stepped curve tops out
                    None => prop_assert!(matches!(curve, LevelCurve::Stepped(_))),
                }
            }

            // Property: a level's threshold derives back to that level
            #[test]
            fn prop_threshold_roundtrips_to_level(curve in arb_curve(), level in 1u32..40) {
                if let Some(threshold) = curve.xp_for_level(level) {
                    prop_assert_eq!(curve.level_for_xp(threshold), level);
                }
            }
        }
    }
}
