//! All-pairs scheduling and its report.
//!
//! Agents are ordered by id and every unordered pair plays exactly once, the
//! lower id seated first. Pairs are generated lexicographically and results are
//! reported in that same order whatever order the matches finished in.

use serde::{Deserialize, Serialize};

use crate::agent::{Agent, TournamentId};
use crate::game_interface::GameKind;
use crate::model::Match;
use crate::standings::{aggregate, group_standings, GroupStanding, LeaderboardEntry, ScoringScheme};

/// Every unordered pair of `agents`, in `(lower id, higher id)` lexicographic order.
pub fn pairings(agents: &[Agent]) -> Vec<(Agent, Agent)> {
    let mut sorted = agents.to_vec();
    sorted.sort_by_key(|a| a.id);
    sorted.dedup_by_key(|a| a.id);

    let mut pairs = Vec::with_capacity(sorted.len() * sorted.len().saturating_sub(1) / 2);
    for (i, a) in sorted.iter().enumerate() {
        for b in &sorted[i + 1..] {
            pairs.push((a.clone(), b.clone()));
        }
    }
    pairs
}

/// Outcome of a round-robin run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoundRobinReport {
    pub game: GameKind,
    /// Per-group results.
    pub summary: Vec<GroupStanding>,
    pub leaderboard: Vec<LeaderboardEntry>,
    /// Played matches in pairing order.
    pub matches: Vec<Match>,
    /// Number of matches played.
    pub total_matches: usize,
    /// Number of pairings generated, equal to `total_matches` unless cancelled.
    pub scheduled_matches: usize,
    /// New pairings stopped being issued before the end.
    pub cancelled: bool,
    /// Tournament the run was persisted as, if persisted.
    pub tournament: Option<TournamentId>,
}

impl RoundRobinReport {
    /// Builds the report of a run over `agents`.
    pub fn new(
        game: GameKind,
        agents: &[Agent],
        matches: Vec<Match>,
        scoring: ScoringScheme,
        scheduled_matches: usize,
        cancelled: bool,
    ) -> Self {
        RoundRobinReport {
            game,
            summary: group_standings(&matches, agents),
            leaderboard: aggregate(&matches, agents, scoring),
            total_matches: matches.len(),
            matches,
            scheduled_matches,
            cancelled,
            tournament: None,
        }
    }
}
