//! Type definitions for weekly leagues.
//!
//! A **league** is a cohort of learners competing on weekly XP for one
//! season (a UTC ISO week). Each learner gets one [`LeagueStanding`] row
//! per season; ranks are computed from a consistent snapshot at read time
//! and only persisted as `final_rank` when the season is closed by
//! rollover.

use serde::{Deserialize, Serialize};

use crate::types::{LeagueId, LearnerId, SeasonId, Timestamp};

// ============================================================================
// LeagueStanding — One learner-season row
// ============================================================================

/// One learner's standing in one season.
///
/// `weekly_xp` accumulates every XP point the learner earns from applied
/// attempts during the season (attempt XP and bonus rewards alike). The
/// row is keyed by `(learner_id, season)`, so a learner can hold at most
/// one standing per season.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeagueStanding {
    /// The learner this standing belongs to.
    pub learner_id: LearnerId,

    /// The league cohort the learner competes in this season.
    pub league_id: LeagueId,

    /// The season (UTC ISO week) this standing covers.
    pub season: SeasonId,

    /// League tier, 0 (lowest) to `tier_count - 1` (highest).
    pub tier: u8,

    /// XP accumulated during this season.
    pub weekly_xp: u64,

    /// The learner's account creation time, denormalized for the
    /// seniority tie-break (it never changes after creation).
    pub learner_since: Timestamp,

    /// Rank stamped when the season was closed by rollover. `None` while
    /// the season is live.
    pub final_rank: Option<u32>,
}

impl LeagueStanding {
    /// Creates a fresh standing with zero weekly XP.
    pub fn new(
        learner_id: LearnerId,
        league_id: LeagueId,
        season: SeasonId,
        tier: u8,
        learner_since: Timestamp,
    ) -> Self {
        Self {
            learner_id,
            league_id,
            season,
            tier,
            weekly_xp: 0,
            learner_since,
            final_rank: None,
        }
    }
}

// ============================================================================
// RankedStanding — One row of a computed leaderboard
// ============================================================================

/// One row of a computed leaderboard, in rank order.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankedStanding {
    /// Dense 1-based rank within the league.
    pub rank: u32,

    /// The ranked learner.
    pub learner_id: LearnerId,

    /// Display name, joined from the learner record for UI convenience.
    pub display_name: String,

    /// XP accumulated during the season.
    pub weekly_xp: u64,

    /// League tier of this cohort.
    pub tier: u8,
}

// ============================================================================
// StandingSnapshot — Read model for one learner's own view
// ============================================================================

/// Point-in-time view of one learner's league position.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StandingSnapshot {
    /// The learner described.
    pub learner_id: LearnerId,

    /// The league cohort.
    pub league_id: LeagueId,

    /// The season this snapshot covers.
    pub season: SeasonId,

    /// League tier.
    pub tier: u8,

    /// XP accumulated during the season.
    pub weekly_xp: u64,

    /// Computed 1-based rank within the league at the read instant.
    pub rank: u32,

    /// Number of learners in the league this season.
    pub league_size: u32,
}

// ============================================================================
// Rollover outcome
// ============================================================================

/// Where a learner moved at season rollover.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Movement {
    /// Finished in the top cutoff and moved up a tier.
    Promoted,

    /// Finished mid-table and stayed at the same tier.
    Retained,

    /// Finished in the bottom cutoff and moved down a tier.
    Demoted,
}

impl Movement {
    /// Returns true for a promotion.
    pub fn is_promoted(&self) -> bool {
        matches!(self, Self::Promoted)
    }

    /// Returns true for a demotion.
    pub fn is_demoted(&self) -> bool {
        matches!(self, Self::Demoted)
    }
}

/// One learner's rollover placement.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Placement {
    /// The learner placed.
    pub learner_id: LearnerId,

    /// The league the learner finished the closed season in.
    pub from_league: LeagueId,

    /// The league the learner starts the next season in.
    pub to_league: LeagueId,

    /// The tier the learner starts the next season at.
    pub to_tier: u8,

    /// Promotion, retention, or demotion.
    pub movement: Movement,

    /// Final rank in the closed season.
    pub final_rank: u32,
}

/// Result of closing a season.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RolloverOutcome {
    /// The season that was closed.
    pub closed_season: SeasonId,

    /// The season the placements belong to.
    pub next_season: SeasonId,

    /// Every placement made, in rank order per closed league.
    pub placements: Vec<Placement>,
}

impl RolloverOutcome {
    /// Number of learners promoted.
    pub fn promoted(&self) -> usize {
        self.placements
            .iter()
            .filter(|p| p.movement.is_promoted())
            .count()
    }

    /// Number of learners demoted.
    pub fn demoted(&self) -> usize {
        self.placements
            .iter()
            .filter(|p| p.movement.is_demoted())
            .count()
    }
}
