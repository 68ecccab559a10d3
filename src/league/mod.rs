//! Weekly league standings: ranks, seasons, and rollover.
//!
//! A league is a cohort of learners competing on weekly XP for one season
//! (a UTC ISO week). Standings accumulate inside ordinary event commits;
//! ranks are recomputed from a consistent snapshot on every read and never
//! stored while a season is live:
//!
//! ```text
//! attempt XP ──▶ standing.weekly_xp += total   (same commit as the event)
//!
//! read  ──▶ list league rows ──▶ rank_standings() ──▶ 1-based ranks
//!
//! scheduler ──▶ rollover_season() ──▶ stamp final_rank, open next season
//! ```
//!
//! Rollover is the one externally scheduled operation: it closes the
//! season's rows, plans promotions and demotions from the final ranking,
//! and opens zeroed rows for the next season. Next-season league ids are
//! derived deterministically (UUID v5) from the closed league and the
//! destination tier, so a retried rollover lands every learner in the same
//! cohort instead of scattering them.

pub mod types;

pub use types::{
    LeagueStanding, Movement, Placement, RankedStanding, RolloverOutcome, StandingSnapshot,
};

use std::cmp::Ordering;

use tracing::{debug, info, instrument, warn};

use crate::config::LeagueConfig;
use crate::engine::Stryde;
use crate::error::{Result, ValidationError};
use crate::learner::LearnerState;
use crate::storage::ProgressionStore;
use crate::types::{LeagueId, LearnerId, SeasonId, Timestamp};

// ============================================================================
// Pure ranking
// ============================================================================

/// Total order for standings: descending weekly XP, ties to the longer
/// tenured learner, final disambiguation by learner id bytes.
fn rank_order(a: &LeagueStanding, b: &LeagueStanding) -> Ordering {
    b.weekly_xp
        .cmp(&a.weekly_xp)
        .then_with(|| a.learner_since.cmp(&b.learner_since))
        .then_with(|| a.learner_id.as_bytes().cmp(b.learner_id.as_bytes()))
}

/// Ranks one league's rows into a leaderboard.
///
/// Sorts descending by `weekly_xp`; ties go to the earlier-created account,
/// then to the smaller learner id, so the order is a deterministic total
/// order and stable under recomputation. Ranks are dense and 1-based.
pub fn rank_standings(mut rows: Vec<(LeagueStanding, String)>) -> Vec<RankedStanding> {
    rows.sort_by(|(a, _), (b, _)| rank_order(a, b));
    rows.into_iter()
        .enumerate()
        .map(|(i, (standing, display_name))| RankedStanding {
            rank: i as u32 + 1,
            learner_id: standing.learner_id,
            display_name,
            weekly_xp: standing.weekly_xp,
            tier: standing.tier,
        })
        .collect()
}

// ============================================================================
// Pure rollover planning
// ============================================================================

/// The rows a season rollover will write, before any storage commit.
#[derive(Debug)]
pub struct RolloverPlan {
    /// Closing rows with `final_rank` stamped, in rank order.
    pub closed: Vec<LeagueStanding>,

    /// Zeroed next-season rows, aligned index-for-index with `closed`.
    pub opened: Vec<LeagueStanding>,

    /// Per-learner placements, in rank order.
    pub placements: Vec<Placement>,
}

/// Plans a season rollover for one league's final standings.
///
/// The top `promote_count` finishers move up a tier (capped at the highest
/// tier), the bottom `demote_count` move down one (floored at tier 0), and
/// everyone else stays. When a league holds fewer rows than the two cutoffs
/// combined, promotion wins the overlap. `movement` reports the actual tier
/// change, so a top finisher already at the highest tier is `Retained`.
///
/// Destination league ids derive from the closed league, the next season,
/// and the destination tier, so replanning the same rollover produces
/// byte-identical rows.
pub fn plan_rollover(
    mut standings: Vec<LeagueStanding>,
    config: &LeagueConfig,
    next_season: SeasonId,
) -> RolloverPlan {
    standings.sort_by(rank_order);

    let total = standings.len();
    let top_tier = config.tier_count.saturating_sub(1);
    let promote_cutoff = (config.promote_count as usize).min(total);
    let demote_cutoff = total
        .saturating_sub(config.demote_count as usize)
        .max(promote_cutoff);

    let mut closed = Vec::with_capacity(total);
    let mut opened = Vec::with_capacity(total);
    let mut placements = Vec::with_capacity(total);

    for (i, mut standing) in standings.into_iter().enumerate() {
        let rank = i as u32 + 1;

        let to_tier = if i < promote_cutoff {
            standing.tier.saturating_add(1).min(top_tier)
        } else if i >= demote_cutoff {
            standing.tier.saturating_sub(1)
        } else {
            standing.tier
        };
        let movement = match to_tier.cmp(&standing.tier) {
            Ordering::Greater => Movement::Promoted,
            Ordering::Equal => Movement::Retained,
            Ordering::Less => Movement::Demoted,
        };

        let seed = format!(
            "league-rollover/{}/{}/tier-{}",
            standing.league_id,
            next_season.as_u32(),
            to_tier
        );
        let to_league = LeagueId::derive(seed.as_bytes());

        placements.push(Placement {
            learner_id: standing.learner_id,
            from_league: standing.league_id,
            to_league,
            to_tier,
            movement,
            final_rank: rank,
        });
        opened.push(LeagueStanding::new(
            standing.learner_id,
            to_league,
            next_season,
            to_tier,
            standing.learner_since,
        ));
        standing.final_rank = Some(rank);
        closed.push(standing);
    }

    RolloverPlan {
        closed,
        opened,
        placements,
    }
}

// ============================================================================
// Event staging
// ============================================================================

/// Stages the weekly XP increment for one event's total award.
///
/// Returns the standing row to include in the commit batch, or `None` when
/// there is nothing to write. A learner's first XP of a season auto-creates
/// the row, inheriting league and tier from their most recent prior
/// standing; learners who never joined a league accumulate nothing.
pub(crate) fn stage_weekly_xp(
    store: &dyn ProgressionStore,
    state: &LearnerState,
    amount: u64,
    at: Timestamp,
) -> Result<Option<LeagueStanding>> {
    if amount == 0 {
        return Ok(None);
    }

    let season = SeasonId::from_timestamp(at);
    let mut standing = match store.get_standing(state.id, season)? {
        Some(standing) => standing,
        None => match store.latest_standing(state.id)? {
            Some(prior) => {
                debug!(
                    learner = %state.id,
                    season = %season,
                    league = %prior.league_id,
                    "Standing auto-created for new season"
                );
                LeagueStanding::new(state.id, prior.league_id, season, prior.tier, state.joined_at)
            }
            None => return Ok(None),
        },
    };

    standing.weekly_xp = standing.weekly_xp.saturating_add(amount);
    Ok(Some(standing))
}

// ============================================================================
// Facade operations
// ============================================================================

impl Stryde {
    /// Places a learner into a league for the season containing `at`.
    ///
    /// A learner holds at most one standing per season: joining again in
    /// the same season returns the existing standing untouched, even for a
    /// different league, since switching cohorts mid-season would corrupt
    /// weekly totals.
    ///
    /// # Errors
    ///
    /// - Validation if `tier` is at or above the configured tier count
    /// - `NotFound` if the learner doesn't exist
    #[instrument(skip(self))]
    pub fn join_league(
        &self,
        learner: LearnerId,
        league: LeagueId,
        tier: u8,
        at: Timestamp,
    ) -> Result<StandingSnapshot> {
        let tier_count = self.config().league.tier_count;
        if tier >= tier_count {
            return Err(ValidationError::invalid_field(
                "tier",
                format!("must be below tier_count ({})", tier_count),
            )
            .into());
        }
        let state = self.require_learner(learner)?;
        let season = SeasonId::from_timestamp(at);

        let fresh = LeagueStanding::new(learner, league, season, tier, state.joined_at);
        let standing = if self.store().insert_standing(&fresh)? {
            info!(learner = %learner, league = %league, season = %season, "Learner joined league");
            fresh
        } else {
            debug!(learner = %learner, season = %season, "Standing already exists this season");
            match self.store().get_standing(learner, season)? {
                Some(existing) => existing,
                // Only a concurrent delete can remove the row here.
                None => fresh,
            }
        };

        self.snapshot_for(&standing)
    }

    /// Reads the learner's standing for the season containing `now`.
    ///
    /// Returns `None` for learners not competing this season. The rank is
    /// recomputed from a consistent snapshot of the whole league.
    pub fn standing(&self, learner: LearnerId, now: Timestamp) -> Result<Option<StandingSnapshot>> {
        self.require_learner(learner)?;
        let season = SeasonId::from_timestamp(now);

        match self.store().get_standing(learner, season)? {
            Some(standing) => Ok(Some(self.snapshot_for(&standing)?)),
            None => Ok(None),
        }
    }

    /// Computes the full leaderboard for a league and season.
    ///
    /// Unknown leagues and seasons yield an empty list.
    pub fn league_ranks(&self, league: LeagueId, season: SeasonId) -> Result<Vec<RankedStanding>> {
        let rows = self.store().list_league_rows(league, season)?;
        Ok(rank_standings(rows))
    }

    /// Closes a league's season and opens the next one.
    ///
    /// Stamps `final_rank` on every closing row, creates zeroed rows for
    /// the next season per the promotion/demotion cutoffs, and commits both
    /// atomically. Intended for an external scheduler at the season
    /// boundary. Retry-safe: rows that already exist for the next season
    /// keep their accumulated XP, and replanning yields identical
    /// placements.
    #[instrument(skip(self))]
    pub fn rollover_season(&self, league: LeagueId, season: SeasonId) -> Result<RolloverOutcome> {
        let rows = self.store().list_league_rows(league, season)?;
        let standings: Vec<LeagueStanding> = rows.into_iter().map(|(standing, _)| standing).collect();
        let next_season = season.next();

        if standings.is_empty() {
            debug!(league = %league, season = %season, "Rollover on empty league");
            return Ok(RolloverOutcome {
                closed_season: season,
                next_season,
                placements: Vec::new(),
            });
        }

        let plan = plan_rollover(standings, &self.config().league, next_season);
        self.store().commit_rollover(&plan.closed, &plan.opened)?;

        let outcome = RolloverOutcome {
            closed_season: season,
            next_season,
            placements: plan.placements,
        };
        info!(
            league = %league,
            closed = %season,
            opened = %next_season,
            learners = outcome.placements.len(),
            promoted = outcome.promoted(),
            demoted = outcome.demoted(),
            "Season rolled over"
        );
        Ok(outcome)
    }

    pub(crate) fn snapshot_for(&self, standing: &LeagueStanding) -> Result<StandingSnapshot> {
        let rows = self
            .store()
            .list_league_rows(standing.league_id, standing.season)?;
        let league_size = rows.len() as u32;
        let ranked = rank_standings(rows);

        let rank = match ranked.iter().find(|r| r.learner_id == standing.learner_id) {
            Some(row) => row.rank,
            None => {
                warn!(
                    learner = %standing.learner_id,
                    league = %standing.league_id,
                    "Standing missing from its league index"
                );
                league_size.saturating_add(1)
            }
        };

        Ok(StandingSnapshot {
            learner_id: standing.learner_id,
            league_id: standing.league_id,
            season: standing.season,
            tier: standing.tier,
            weekly_xp: standing.weekly_xp,
            rank,
            league_size,
        })
    }
}
